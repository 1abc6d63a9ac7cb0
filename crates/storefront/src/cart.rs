//! The shopping cart state machine.
//!
//! [`CartStore`] is the single source of truth for what the user intends to
//! purchase. It owns an ordered list of lines (insertion order, one line
//! per product) and a derived total that is recomputed synchronously after
//! every mutation, so no reader ever observes a total that disagrees with
//! the lines.
//!
//! Every committed mutation is written through to the injected
//! [`LocalStore`] under [`CART_STORAGE_KEY`], and a new store rehydrates
//! from that key at construction. Persistence is best-effort client-side
//! cache, not a system of record: a missing or undecodable snapshot
//! rehydrates as an empty cart, and a failed write leaves the in-memory
//! state authoritative. The order document created at checkout is the
//! durable record.
//!
//! Two processes sharing one `LocalStore` (two tabs over the same data
//! directory) race last-write-wins with no merge; this is accepted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use luxe_core::{Price, ProductId};

use crate::catalog::Product;
use crate::storage::LocalStore;

/// Fixed storage key the cart snapshot lives under.
pub const CART_STORAGE_KEY: &str = "shopping-cart";

/// One product plus the quantity of it held in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product, captured whole so the cart can render offline.
    #[serde(flatten)]
    pub product: Product,
    /// Units of this product. Always at least 1; a line that would drop to
    /// zero is removed from the cart instead.
    pub quantity: u32,
}

impl CartLine {
    /// Price of this line: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Persisted snapshot layout: `{ "items": [...], "total": "..." }`.
///
/// Both fields default so a legacy or partial record still decodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CartSnapshot {
    #[serde(default)]
    items: Vec<CartLine>,
    #[serde(default)]
    total: Price,
}

/// The cart: ordered lines plus a derived total, persisted write-through.
///
/// Mutations are synchronous and local (memory plus local storage); they
/// never suspend. The store is owned by exactly one caller (`&mut self`
/// mutations), which serializes the read-modify-recompute-persist sequence
/// within a process.
#[derive(Debug)]
pub struct CartStore {
    lines: Vec<CartLine>,
    total: Price,
    storage: Box<dyn LocalStore>,
}

impl CartStore {
    /// Create a cart over `storage`, rehydrating any previously persisted
    /// snapshot. A missing, corrupt, or schema-mismatched snapshot yields
    /// an empty cart; rehydration never fails.
    #[must_use]
    pub fn new(storage: Box<dyn LocalStore>) -> Self {
        let snapshot = rehydrate(storage.as_ref());
        let lines = sanitize(snapshot.items);
        // Recompute rather than trusting the persisted total, so the
        // total/lines invariant holds even over a tampered snapshot.
        let total = sum_lines(&lines);
        Self {
            lines,
            total,
            storage,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product` to the cart.
    ///
    /// An existing line for the same product ID gains a unit; otherwise a
    /// new line is appended, preserving the order products were first
    /// added. Never fails: repeated calls accumulate quantity.
    pub fn add_item(&mut self, product: &Product) {
        if let Some(line) = self.line_mut(&product.id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.lines.push(CartLine {
                product: product.clone(),
                quantity: 1,
            });
        }
        self.commit();
    }

    /// Remove the line for `product_id`, if present. Removing an absent
    /// product leaves the cart untouched.
    pub fn remove_item(&mut self, product_id: &ProductId) {
        let before = self.lines.len();
        self.lines.retain(|line| &line.product.id != product_id);
        if self.lines.len() != before {
            self.commit();
        }
    }

    /// Set the quantity of the line for `product_id` to exactly
    /// `new_quantity`.
    ///
    /// A quantity of zero or less removes the line, same as
    /// [`remove_item`](Self::remove_item). An unknown product ID is a
    /// no-op.
    pub fn update_quantity(&mut self, product_id: &ProductId, new_quantity: i64) {
        if new_quantity <= 0 {
            self.remove_item(product_id);
            return;
        }
        let quantity = u32::try_from(new_quantity).unwrap_or(u32::MAX);
        if let Some(line) = self.line_mut(product_id)
            && line.quantity != quantity
        {
            line.quantity = quantity;
            self.commit();
        }
    }

    /// Empty the cart. Called after successful order placement and on an
    /// explicit user-confirmed clear.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.commit();
    }

    // =========================================================================
    // Derived reads
    // =========================================================================

    /// The cart lines, in the order their products were first added.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines (the badge count).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .map(|line| line.quantity)
            .fold(0, u32::saturating_add)
    }

    /// Sum of `price x quantity` over all lines.
    #[must_use]
    pub const fn subtotal(&self) -> Price {
        self.total
    }

    /// Tax on the current subtotal at `rate`. Computed at checkout display
    /// time, never stored.
    #[must_use]
    pub fn tax(&self, rate: Decimal) -> Price {
        self.total.at_rate(rate)
    }

    /// Subtotal plus tax at `rate`.
    #[must_use]
    pub fn grand_total(&self, rate: Decimal) -> Price {
        self.total + self.tax(rate)
    }

    /// Quantity held for `product_id`, zero if absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lines
            .iter()
            .find(|line| &line.product.id == product_id)
            .map_or(0, |line| line.quantity)
    }

    // =========================================================================
    // Commit
    // =========================================================================

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| &line.product.id == product_id)
    }

    /// Settle a mutation: recompute the derived total, then write the
    /// snapshot through to local storage.
    ///
    /// The in-memory update always stands; a failed encode or write is
    /// logged and the cart keeps serving the fresh state.
    fn commit(&mut self) {
        self.total = sum_lines(&self.lines);

        let snapshot = CartSnapshot {
            items: self.lines.clone(),
            total: self.total,
        };
        match serde_json::to_vec(&snapshot) {
            Ok(bytes) => {
                if let Err(e) = self.storage.put(CART_STORAGE_KEY, &bytes) {
                    warn!(error = %e, "failed to persist cart snapshot");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode cart snapshot"),
        }
    }
}

/// Read and decode the persisted snapshot; any failure yields the empty
/// snapshot.
fn rehydrate(storage: &dyn LocalStore) -> CartSnapshot {
    let bytes = match storage.get(CART_STORAGE_KEY) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return CartSnapshot::default(),
        Err(e) => {
            warn!(error = %e, "failed to read cart snapshot, starting empty");
            return CartSnapshot::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "discarding undecodable cart snapshot");
            CartSnapshot::default()
        }
    }
}

/// Enforce the line invariants on rehydrated data: no zero-quantity lines,
/// one line per product ID (first occurrence wins).
fn sanitize(items: Vec<CartLine>) -> Vec<CartLine> {
    let mut seen: Vec<ProductId> = Vec::with_capacity(items.len());
    items
        .into_iter()
        .filter(|line| {
            if line.quantity == 0 || seen.contains(&line.product.id) {
                warn!(id = %line.product.id, "dropping invalid persisted cart line");
                return false;
            }
            seen.push(line.product.id.clone());
            true
        })
        .collect()
}

fn sum_lines(lines: &[CartLine]) -> Price {
    lines.iter().map(CartLine::line_total).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};

    fn product(id: &str, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            price: Price::from_cents(cents),
            description: String::new(),
            category: "test".to_owned(),
            image: None,
            rating: luxe_core::Rating::default(),
        }
    }

    fn empty_cart() -> CartStore {
        CartStore::new(Box::new(MemoryStore::new()))
    }

    /// Invariant: the derived total always equals the sum over the lines.
    fn assert_total_consistent(cart: &CartStore) {
        let expected: Price = cart.lines().iter().map(CartLine::line_total).sum();
        assert_eq!(cart.subtotal(), expected);
    }

    #[test]
    fn test_repeated_add_accumulates_quantity() {
        let mut cart = empty_cart();
        let p = product("a", 1000);

        for n in 1..=5_u32 {
            cart.add_item(&p);
            assert_eq!(cart.quantity_of(&p.id), n);
            assert_eq!(cart.subtotal(), p.price.times(n));
            assert_total_consistent(&cart);
        }
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut cart = empty_cart();
        let (a, b, c) = (product("a", 100), product("b", 200), product("c", 300));

        cart.add_item(&a);
        cart.add_item(&b);
        cart.add_item(&a); // bumps quantity, must not reorder
        cart.add_item(&c);

        let ids: Vec<&str> = cart
            .lines()
            .iter()
            .map(|l| l.product.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_update_quantity_sets_exactly() {
        let mut cart = empty_cart();
        let p = product("a", 1000);
        cart.add_item(&p);

        cart.update_quantity(&p.id, 7);
        assert_eq!(cart.quantity_of(&p.id), 7);
        assert_eq!(cart.subtotal(), Price::from_cents(7000));
        assert_total_consistent(&cart);
    }

    #[test]
    fn test_update_quantity_zero_or_negative_removes_line() {
        for bad_quantity in [0_i64, -5] {
            let mut cart = empty_cart();
            let p = product("a", 1000);
            cart.add_item(&p);

            cart.update_quantity(&p.id, bad_quantity);
            assert!(cart.is_empty());
            assert_eq!(cart.subtotal(), Price::ZERO);
            assert_total_consistent(&cart);
        }
    }

    #[test]
    fn test_update_quantity_unknown_id_is_noop() {
        let mut cart = empty_cart();
        cart.add_item(&product("a", 1000));

        cart.update_quantity(&ProductId::new("ghost"), 3);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.subtotal(), Price::from_cents(1000));
    }

    #[test]
    fn test_remove_missing_id_leaves_cart_unchanged() {
        let mut cart = empty_cart();
        cart.add_item(&product("a", 1000));
        let before = cart.lines().to_vec();

        cart.remove_item(&ProductId::new("ghost"));
        assert_eq!(cart.lines(), before.as_slice());
        assert_total_consistent(&cart);
    }

    #[test]
    fn test_checkout_scenario() {
        let mut cart = empty_cart();
        let a = product("a", 1000); // $10.00
        let b = product("b", 500); // $5.00

        cart.add_item(&a);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal(), Price::from_cents(1000));

        cart.add_item(&a);
        assert_eq!(cart.quantity_of(&a.id), 2);
        assert_eq!(cart.subtotal(), Price::from_cents(2000));

        cart.add_item(&b);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal(), Price::from_cents(2500));

        cart.update_quantity(&a.id, 1);
        assert_eq!(cart.subtotal(), Price::from_cents(1500));

        cart.clear();
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.subtotal(), Price::ZERO);
        assert_total_consistent(&cart);
    }

    #[test]
    fn test_tax_and_grand_total() {
        let mut cart = empty_cart();
        cart.add_item(&product("a", 1999));

        let rate = Decimal::new(8, 2); // 8%
        assert_eq!(cart.tax(rate), Price::from_cents(160));
        assert_eq!(cart.grand_total(rate), Price::from_cents(2159));
    }

    #[test]
    fn test_rehydrate_round_trip_preserves_order_and_quantities() {
        let storage = std::sync::Arc::new(MemoryStore::new());
        {
            let mut cart = CartStore::new(Box::new(SharedStore(storage.clone())));
            cart.add_item(&product("a", 1000));
            cart.add_item(&product("b", 500));
            cart.add_item(&product("a", 1000));
        }

        let cart = CartStore::new(Box::new(SharedStore(storage)));
        let ids: Vec<&str> = cart
            .lines()
            .iter()
            .map(|l| l.product.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(cart.quantity_of(&ProductId::new("a")), 2);
        assert_eq!(cart.subtotal(), Price::from_cents(2500));
    }

    #[test]
    fn test_rehydrate_corrupt_snapshot_yields_empty_cart() {
        let storage = MemoryStore::new();
        storage.put(CART_STORAGE_KEY, b"{not json").unwrap();

        let cart = CartStore::new(Box::new(storage));
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Price::ZERO);
    }

    #[test]
    fn test_rehydrate_missing_snapshot_yields_empty_cart() {
        let cart = empty_cart();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.subtotal(), Price::ZERO);
    }

    #[test]
    fn test_rehydrate_drops_invalid_lines_and_recomputes_total() {
        let storage = MemoryStore::new();
        // Duplicate id, a zero quantity, and a lying total.
        let snapshot = serde_json::json!({
            "items": [
                { "id": "a", "title": "A", "price": "10.00", "quantity": 1 },
                { "id": "a", "title": "A again", "price": "10.00", "quantity": 4 },
                { "id": "b", "title": "B", "price": "5.00", "quantity": 0 },
            ],
            "total": "999.00",
        });
        storage
            .put(CART_STORAGE_KEY, snapshot.to_string().as_bytes())
            .unwrap();

        let cart = CartStore::new(Box::new(storage));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.subtotal(), Price::from_cents(1000));
    }

    #[test]
    fn test_mutation_survives_persist_failure() {
        let mut cart = CartStore::new(Box::new(BrokenStore));
        let p = product("a", 1000);

        cart.add_item(&p);
        assert_eq!(cart.quantity_of(&p.id), 1);
        assert_eq!(cart.subtotal(), Price::from_cents(1000));
        assert_total_consistent(&cart);
    }

    /// Test double sharing one MemoryStore across CartStore instances.
    #[derive(Debug)]
    struct SharedStore(std::sync::Arc<MemoryStore>);

    impl LocalStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            self.0.get(key)
        }
        fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            self.0.put(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove(key)
        }
    }

    /// Test double whose writes always fail.
    #[derive(Debug)]
    struct BrokenStore;

    impl LocalStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(None)
        }
        fn put(&self, _key: &str, _value: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }
}
