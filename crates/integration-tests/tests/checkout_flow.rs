//! The checkout flow: place the order, then (and only then) clear the cart.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;

use luxe_core::{Email, OrderId, OrderStatus, Price, ProductId, Rating, UserId};
use luxe_storefront::auth::AuthUser;
use luxe_storefront::backend::BackendError;
use luxe_storefront::cart::CartStore;
use luxe_storefront::catalog::Product;
use luxe_storefront::checkout::{Checkout, CheckoutError, ShippingForm};
use luxe_storefront::orders::{OrderDraft, OrderError, OrderGateway};
use luxe_storefront::storage::MemoryStore;

/// Gateway double that records accepted drafts.
#[derive(Default)]
struct RecordingGateway {
    placed: Mutex<Vec<OrderDraft>>,
}

impl OrderGateway for RecordingGateway {
    async fn place(&self, draft: &OrderDraft) -> Result<OrderId, OrderError> {
        let mut placed = self.placed.lock().unwrap();
        placed.push(draft.clone());
        Ok(OrderId::new(format!("order-{}", placed.len())))
    }
}

/// Gateway double that always fails with a retryable backend error.
struct UnavailableGateway;

impl OrderGateway for UnavailableGateway {
    async fn place(&self, _draft: &OrderDraft) -> Result<OrderId, OrderError> {
        Err(OrderError::Backend(BackendError::Status {
            status: 503,
            body: "service unavailable".to_owned(),
        }))
    }
}

fn product(id: &str, cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        title: format!("Product {id}"),
        price: Price::from_cents(cents),
        description: String::new(),
        category: "tests".to_owned(),
        image: None,
        rating: Rating::default(),
    }
}

fn filled_cart() -> CartStore {
    let mut cart = CartStore::new(Box::new(MemoryStore::new()));
    cart.add_item(&product("headphones", 10000)); // $100.00
    cart.add_item(&product("cable", 2500)); // $25.00
    cart
}

fn shopper() -> AuthUser {
    AuthUser {
        uid: UserId::new("u-1"),
        email: Email::parse("shopper@example.com").unwrap(),
    }
}

fn valid_form() -> ShippingForm {
    ShippingForm {
        first_name: "Ada".to_owned(),
        last_name: "Lovelace".to_owned(),
        email: "ada@example.com".to_owned(),
        address: "1 Analytical Way".to_owned(),
        city: "London".to_owned(),
        zip_code: "12345".to_owned(),
    }
}

#[tokio::test]
async fn successful_checkout_records_order_and_clears_cart() {
    let gateway = RecordingGateway::default();
    let checkout = Checkout::new(&gateway, "0.08".parse().unwrap());
    let mut cart = filled_cart();
    let user = shopper();

    let order_id = checkout
        .submit(&mut cart, &valid_form(), Some(&user))
        .await
        .unwrap();

    assert_eq!(order_id, OrderId::new("order-1"));
    assert!(cart.is_empty());
    assert_eq!(cart.subtotal(), Price::ZERO);

    let placed = gateway.placed.lock().unwrap();
    let draft = placed.first().unwrap();
    assert_eq!(draft.user_id, user.uid);
    assert_eq!(draft.items.len(), 2);
    assert_eq!(draft.subtotal, Price::from_cents(12500));
    assert_eq!(draft.tax, Price::from_cents(1000)); // 8% of $125.00
    assert_eq!(draft.total, Price::from_cents(13500));
    assert_eq!(draft.status, OrderStatus::Processing);
}

#[tokio::test]
async fn failed_submission_leaves_cart_untouched() {
    let checkout = Checkout::new(UnavailableGateway, "0.08".parse().unwrap());
    let mut cart = filled_cart();
    let lines_before = cart.lines().to_vec();

    let err = checkout
        .submit(&mut cart, &valid_form(), Some(&shopper()))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Submission(_)));
    assert!(err.is_retryable());
    assert_eq!(cart.lines(), lines_before.as_slice());
    assert_eq!(cart.subtotal(), Price::from_cents(12500));
}

#[tokio::test]
async fn checkout_requires_a_signed_in_user() {
    let gateway = RecordingGateway::default();
    let checkout = Checkout::new(&gateway, "0.08".parse().unwrap());
    let mut cart = filled_cart();

    let err = checkout
        .submit(&mut cart, &valid_form(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::NotSignedIn));
    assert!(!cart.is_empty());
    assert!(gateway.placed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn checkout_rejects_an_empty_cart() {
    let gateway = RecordingGateway::default();
    let checkout = Checkout::new(&gateway, "0.08".parse().unwrap());
    let mut cart = CartStore::new(Box::new(MemoryStore::new()));

    let err = checkout
        .submit(&mut cart, &valid_form(), Some(&shopper()))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[tokio::test]
async fn invalid_form_never_reaches_the_gateway() {
    let gateway = RecordingGateway::default();
    let checkout = Checkout::new(&gateway, "0.08".parse().unwrap());
    let mut cart = filled_cart();

    let err = checkout
        .submit(&mut cart, &ShippingForm::default(), Some(&shopper()))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::InvalidForm(_)));
    assert!(!err.is_retryable());
    assert!(gateway.placed.lock().unwrap().is_empty());
    assert!(!cart.is_empty());
}
