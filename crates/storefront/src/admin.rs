//! Role-gated product and user management.
//!
//! Every mutating operation here checks that the acting user's profile
//! carries the admin role before touching the backend. The check is
//! fail-closed: a missing profile or an unreachable backend reads as
//! not-admin, and the operation is refused without being attempted.
//!
//! Product writes invalidate the catalog cache so shoppers see changes on
//! their next fetch rather than after the cache TTL.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{instrument, warn};

use luxe_core::{Price, ProductId, Rating, UserId, UserRole};

use crate::auth::{USERS_COLLECTION, UserProfile};
use crate::backend::{BackendError, DocumentClient};
use crate::catalog::{Catalog, PRODUCTS_COLLECTION};

/// Errors from admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The acting user does not hold the admin role.
    #[error("only admins can {0}")]
    PermissionDenied(&'static str),

    /// The backend could not be reached or rejected the call.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A draft could not be serialized.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Fields an admin supplies when creating or editing a product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDraft {
    /// Display title.
    pub title: String,
    /// Unit price.
    pub price: Price,
    /// Plain text description.
    pub description: String,
    /// Category name used for filtering.
    pub category: String,
    /// Image URL; omitted products fall back to the shared placeholder at
    /// display time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Review rating. New products start unreviewed.
    pub rating: Rating,
}

impl ProductDraft {
    /// A draft for a brand-new product: no image yet, no reviews.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        price: Price,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            price,
            description: description.into(),
            category: category.into(),
            image: None,
            rating: Rating::default(),
        }
    }
}

/// Admin operations over the `users` and `products` collections.
#[derive(Clone)]
pub struct AdminPanel {
    documents: DocumentClient,
    catalog: Catalog,
}

impl AdminPanel {
    /// Create an admin panel sharing the storefront's backend client and
    /// catalog (so product writes can invalidate its cache).
    #[must_use]
    pub const fn new(documents: DocumentClient, catalog: Catalog) -> Self {
        Self { documents, catalog }
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// Whether `uid` holds the admin role.
    ///
    /// Fail-closed: a missing profile, a profile without a role, or a
    /// backend failure all read as not-admin.
    #[instrument(skip(self))]
    pub async fn is_admin(&self, uid: &UserId) -> bool {
        match self.profile(uid).await {
            Ok(Some(profile)) => profile.role.is_admin(),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "admin check failed, treating as not-admin");
                false
            }
        }
    }

    /// Fetch a user's profile document, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` for transport failures; an undecodable
    /// profile also reads as `None`.
    pub async fn profile(&self, uid: &UserId) -> Result<Option<UserProfile>, BackendError> {
        let doc = match self.documents.get(USERS_COLLECTION, uid.as_str()).await {
            Ok(doc) => doc,
            Err(BackendError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut fields = doc.fields;
        if let Some(map) = fields.as_object_mut() {
            map.insert("uid".to_owned(), Value::String(doc.id));
        }
        match serde_json::from_value(fields) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!(uid = %uid, error = %e, "undecodable user profile");
                Ok(None)
            }
        }
    }

    /// Grant `uid` the admin role. `acting_admin` must already be one.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if `acting_admin` is not an admin, and
    /// `Backend` for remote failures.
    #[instrument(skip(self))]
    pub async fn promote(&self, uid: &UserId, acting_admin: &UserId) -> Result<(), AdminError> {
        self.require_admin(acting_admin, "promote users").await?;
        self.set_role(uid, UserRole::Admin).await
    }

    /// Revoke `uid`'s admin role. `acting_admin` must be an admin.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if `acting_admin` is not an admin, and
    /// `Backend` for remote failures.
    #[instrument(skip(self))]
    pub async fn demote(&self, uid: &UserId, acting_admin: &UserId) -> Result<(), AdminError> {
        self.require_admin(acting_admin, "demote admins").await?;
        self.set_role(uid, UserRole::User).await
    }

    /// Every profile holding the admin role.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if `acting_admin` is not an admin, and
    /// `Backend` for remote failures.
    #[instrument(skip(self))]
    pub async fn list_admins(&self, acting_admin: &UserId) -> Result<Vec<UserProfile>, AdminError> {
        self.require_admin(acting_admin, "view the admin list")
            .await?;

        let docs = self
            .documents
            .query_eq(USERS_COLLECTION, "role", &json!(UserRole::Admin))
            .await
            .map_err(AdminError::Backend)?;

        let admins = docs
            .into_iter()
            .filter_map(|doc| {
                let mut fields = doc.fields;
                if let Some(map) = fields.as_object_mut() {
                    map.insert("uid".to_owned(), Value::String(doc.id.clone()));
                }
                match serde_json::from_value::<UserProfile>(fields) {
                    Ok(profile) => Some(profile),
                    Err(e) => {
                        warn!(id = doc.id, error = %e, "skipping undecodable profile");
                        None
                    }
                }
            })
            .collect();
        Ok(admins)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if `acting_admin` is not an admin, and
    /// `Backend`/`Encoding` for remote or serialization failures.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_product(
        &self,
        draft: &ProductDraft,
        acting_admin: &UserId,
    ) -> Result<ProductId, AdminError> {
        self.require_admin(acting_admin, "add products").await?;

        let fields = serde_json::to_value(draft)?;
        let doc = self.documents.create(PRODUCTS_COLLECTION, &fields).await?;
        self.catalog.invalidate();
        Ok(ProductId::new(doc.id))
    }

    /// Replace an existing product's fields.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if `acting_admin` is not an admin,
    /// `Backend(NotFound)` for an unknown product, and other variants for
    /// remote or serialization failures.
    #[instrument(skip(self, draft))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
        acting_admin: &UserId,
    ) -> Result<(), AdminError> {
        self.require_admin(acting_admin, "edit products").await?;

        let fields = serde_json::to_value(draft)?;
        self.documents
            .update(PRODUCTS_COLLECTION, id.as_str(), &fields)
            .await?;
        self.catalog.invalidate();
        Ok(())
    }

    /// Remove a product from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if `acting_admin` is not an admin, and
    /// `Backend` for remote failures.
    #[instrument(skip(self))]
    pub async fn delete_product(
        &self,
        id: &ProductId,
        acting_admin: &UserId,
    ) -> Result<(), AdminError> {
        self.require_admin(acting_admin, "delete products").await?;

        self.documents
            .delete(PRODUCTS_COLLECTION, id.as_str())
            .await?;
        self.catalog.invalidate();
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn require_admin(
        &self,
        acting: &UserId,
        action: &'static str,
    ) -> Result<(), AdminError> {
        if self.is_admin(acting).await {
            Ok(())
        } else {
            Err(AdminError::PermissionDenied(action))
        }
    }

    async fn set_role(&self, uid: &UserId, role: UserRole) -> Result<(), AdminError> {
        self.documents
            .update(
                USERS_COLLECTION,
                uid.as_str(),
                &json!({ "role": role, "updated_at": Utc::now() }),
            )
            .await?;
        Ok(())
    }
}
