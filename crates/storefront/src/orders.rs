//! Order placement and history.
//!
//! Orders are the durable record of a purchase: once [`Orders::place`]
//! succeeds, the backend document is the system of record and the local
//! cart is merely cleared. On failure nothing local changes, so the user
//! can retry without losing the cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{instrument, warn};

use luxe_core::{Email, OrderId, OrderStatus, Price, UserId};

use crate::backend::{BackendError, Document, DocumentClient};
use crate::cart::CartLine;

/// Collection orders live in.
pub const ORDERS_COLLECTION: &str = "orders";

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The backend could not be reached or rejected the call.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// An order draft or document could not be (de)serialized.
    #[error("order encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl OrderError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_retryable(),
            Self::Encoding(_) => false,
        }
    }
}

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    /// Recipient first name.
    pub first_name: String,
    /// Recipient last name.
    pub last_name: String,
    /// Contact email for order updates.
    pub email: Email,
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// ZIP / postal code.
    pub zip_code: String,
}

/// Everything written to the backend when an order is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    /// Who is buying.
    pub user_id: UserId,
    /// The cart lines at purchase time, captured whole.
    pub items: Vec<CartLine>,
    /// Sum of line totals.
    pub subtotal: Price,
    /// Tax charged on the subtotal.
    pub tax: Price,
    /// Subtotal plus tax.
    pub total: Price,
    /// Shipping destination.
    pub shipping_info: ShippingInfo,
    /// Initial status; new orders are recorded as `processing`.
    pub status: OrderStatus,
    /// Client-side placement timestamp.
    pub created_at: DateTime<Utc>,
}

/// A placed order, as read back from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Backend-assigned order ID.
    pub id: OrderId,
    /// Who bought.
    pub user_id: UserId,
    /// The purchased lines.
    #[serde(default)]
    pub items: Vec<CartLine>,
    /// Sum of line totals.
    pub subtotal: Price,
    /// Tax charged.
    pub tax: Price,
    /// Amount charged in total.
    pub total: Price,
    /// Shipping destination.
    pub shipping_info: ShippingInfo,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}

/// Order submission seam.
///
/// Checkout depends on this trait rather than on [`Orders`] directly so the
/// place-then-clear-cart flow can be exercised against a double without a
/// live backend.
pub trait OrderGateway {
    /// Durably record `draft` and return the new order's ID.
    ///
    /// Must be atomic from the caller's point of view: either the order
    /// exists afterwards, or an error is returned and nothing was recorded.
    fn place(
        &self,
        draft: &OrderDraft,
    ) -> impl Future<Output = Result<OrderId, OrderError>> + Send;
}

impl<G: OrderGateway + Sync> OrderGateway for &G {
    async fn place(&self, draft: &OrderDraft) -> Result<OrderId, OrderError> {
        (**self).place(draft).await
    }
}

/// Order operations over the backend `orders` collection.
#[derive(Clone)]
pub struct Orders {
    documents: DocumentClient,
}

impl Orders {
    /// Create an order service over the given backend client.
    #[must_use]
    pub const fn new(documents: DocumentClient) -> Self {
        Self { documents }
    }

    /// A user's placed orders, newest first.
    ///
    /// Orders that no longer decode are skipped with a warning rather than
    /// hiding the rest of the history.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Backend` if the backend cannot be reached.
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn history(&self, user_id: &UserId) -> Result<Vec<Order>, OrderError> {
        let docs = self
            .documents
            .query_eq(ORDERS_COLLECTION, "user_id", &json!(user_id))
            .await?;

        let mut orders: Vec<Order> = docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                match decode_order(doc) {
                    Ok(order) => Some(order),
                    Err(e) => {
                        warn!(id, error = %e, "skipping undecodable order document");
                        None
                    }
                }
            })
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

impl OrderGateway for Orders {
    #[instrument(skip_all, fields(user = %draft.user_id, total = %draft.total))]
    async fn place(&self, draft: &OrderDraft) -> Result<OrderId, OrderError> {
        let fields = serde_json::to_value(draft)?;
        let doc = self.documents.create(ORDERS_COLLECTION, &fields).await?;
        Ok(OrderId::new(doc.id))
    }
}

/// Decode one order document, merging the document key in as the ID.
fn decode_order(doc: Document) -> Result<Order, serde_json::Error> {
    let mut fields = doc.fields;
    if let Some(map) = fields.as_object_mut() {
        map.insert("id".to_owned(), Value::String(doc.id));
    }
    serde_json::from_value(fields)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            email: Email::parse("ada@example.com").unwrap(),
            address: "1 Analytical Way".to_owned(),
            city: "London".to_owned(),
            zip_code: "12345".to_owned(),
        }
    }

    #[test]
    fn test_draft_round_trips_through_document_fields() {
        let draft = OrderDraft {
            user_id: UserId::new("u-1"),
            items: Vec::new(),
            subtotal: Price::from_cents(2500),
            tax: Price::from_cents(200),
            total: Price::from_cents(2700),
            shipping_info: shipping(),
            status: OrderStatus::Processing,
            created_at: Utc::now(),
        };

        let fields = serde_json::to_value(&draft).unwrap();
        let doc = Document {
            id: "o-1".to_owned(),
            fields,
        };
        let order = decode_order(doc).unwrap();

        assert_eq!(order.id, OrderId::new("o-1"));
        assert_eq!(order.user_id, draft.user_id);
        assert_eq!(order.total, draft.total);
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.shipping_info, draft.shipping_info);
    }

    #[test]
    fn test_decode_order_rejects_missing_totals() {
        let doc = Document {
            id: "o-2".to_owned(),
            fields: json!({ "user_id": "u-1" }),
        };
        assert!(decode_order(doc).is_err());
    }
}
