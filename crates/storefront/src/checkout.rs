//! Checkout: form validation, totals, and order submission.
//!
//! This is the one place the cart and the remote services meet. The flow
//! mirrors the checkout page: validate the shipping form, require a
//! signed-in user and a non-empty cart, derive the totals from the live
//! cart, place the order, and only then clear the cart. A failed placement
//! leaves the cart exactly as it was so the user can retry.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use luxe_core::{Email, OrderId, OrderStatus, Price};

use crate::auth::AuthUser;
use crate::cart::CartStore;
use crate::orders::{OrderDraft, OrderError, OrderGateway, ShippingInfo};

/// Raw checkout form input, prior to validation.
#[derive(Debug, Clone, Default)]
pub struct ShippingForm {
    /// First name field.
    pub first_name: String,
    /// Last name field.
    pub last_name: String,
    /// Email field.
    pub email: String,
    /// Street address field.
    pub address: String,
    /// City field.
    pub city: String,
    /// ZIP code field.
    pub zip_code: String,
}

/// Which shipping form field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    FirstName,
    LastName,
    Email,
    Address,
    City,
    ZipCode,
}

/// A single field validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The offending field.
    pub field: FormField,
    /// Message to show beside the field.
    pub message: &'static str,
}

impl ShippingForm {
    /// Validate every field at once, the way the form shows errors.
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per failing field; the form is valid only
    /// when the list would be empty.
    pub fn validate(&self) -> Result<ShippingInfo, Vec<FieldError>> {
        let mut errors = Vec::new();

        let first_name = required(&self.first_name, FormField::FirstName, "First name is required", &mut errors);
        let last_name = required(&self.last_name, FormField::LastName, "Last name is required", &mut errors);

        let email = if self.email.trim().is_empty() {
            errors.push(FieldError {
                field: FormField::Email,
                message: "Email is required",
            });
            None
        } else {
            match Email::parse(&self.email) {
                Ok(email) => Some(email),
                Err(_) => {
                    errors.push(FieldError {
                        field: FormField::Email,
                        message: "Email is invalid",
                    });
                    None
                }
            }
        };

        let address = required(&self.address, FormField::Address, "Address is required", &mut errors);
        let city = required(&self.city, FormField::City, "City is required", &mut errors);
        let zip_code = required(&self.zip_code, FormField::ZipCode, "ZIP code is required", &mut errors);

        match (errors.is_empty(), email) {
            (true, Some(email)) => Ok(ShippingInfo {
                first_name,
                last_name,
                email,
                address,
                city,
                zip_code,
            }),
            (_, _) => Err(errors),
        }
    }
}

/// Push an error if `value` is blank; always return the trimmed value.
fn required(
    value: &str,
    field: FormField,
    message: &'static str,
    errors: &mut Vec<FieldError>,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError { field, message });
    }
    trimmed.to_owned()
}

/// Checkout price summary derived from the live cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    /// Sum of line totals.
    pub subtotal: Price,
    /// Tax on the subtotal.
    pub tax: Price,
    /// Subtotal plus tax. Shipping is free.
    pub total: Price,
}

/// Errors from the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// One or more shipping form fields failed validation.
    #[error("shipping form is invalid")]
    InvalidForm(Vec<FieldError>),

    /// Checkout requires a signed-in user.
    #[error("sign in to place an order")]
    NotSignedIn,

    /// There is nothing in the cart to buy.
    #[error("cart is empty")]
    EmptyCart,

    /// The order service rejected or could not take the order.
    #[error("order submission failed: {0}")]
    Submission(#[from] OrderError),
}

impl CheckoutError {
    /// Whether retrying the same submission may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Submission(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// The checkout flow over some order gateway.
pub struct Checkout<G> {
    gateway: G,
    tax_rate: Decimal,
}

impl<G: OrderGateway> Checkout<G> {
    /// Create a checkout flow charging tax at `tax_rate`.
    pub const fn new(gateway: G, tax_rate: Decimal) -> Self {
        Self { gateway, tax_rate }
    }

    /// The totals the order summary displays for the current cart.
    #[must_use]
    pub fn totals(&self, cart: &CartStore) -> Totals {
        let subtotal = cart.subtotal();
        let tax = cart.tax(self.tax_rate);
        Totals {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }

    /// Place an order for the current cart contents.
    ///
    /// On success the new order's ID is returned and the cart is cleared.
    /// On any failure the cart is left untouched so the user can fix the
    /// problem (or just retry) without losing their selections.
    ///
    /// # Errors
    ///
    /// Returns `InvalidForm`, `NotSignedIn`, or `EmptyCart` for local
    /// rejections, and `Submission` when the order service fails.
    #[instrument(skip_all)]
    pub async fn submit(
        &self,
        cart: &mut CartStore,
        form: &ShippingForm,
        user: Option<&AuthUser>,
    ) -> Result<OrderId, CheckoutError> {
        let shipping_info = form.validate().map_err(CheckoutError::InvalidForm)?;
        let user = user.ok_or(CheckoutError::NotSignedIn)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let totals = self.totals(cart);
        let draft = OrderDraft {
            user_id: user.uid.clone(),
            items: cart.lines().to_vec(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            shipping_info,
            status: OrderStatus::Processing,
            created_at: chrono::Utc::now(),
        };

        let order_id = self.gateway.place(&draft).await?;

        // Only now is the cart no longer the source of truth.
        cart.clear();
        info!(order = %order_id, "order placed, cart cleared");
        Ok(order_id)
    }
}
