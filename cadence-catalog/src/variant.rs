use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    /// Whether this variant may be sold on a recurring subscription
    pub subscribable: bool,
}

impl Variant {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sku: sku.into(),
            name: name.into(),
            price_cents,
            subscribable: true,
        }
    }
}

/// Catalog lookup consumed by the consolidation engine.
///
/// Resolution and stock answers are the only things the engine needs from
/// the catalog; where the data lives is the implementor's concern.
pub trait VariantCatalog: Send + Sync {
    /// Resolve a variant by its id
    fn resolve(&self, id: Uuid) -> Result<Variant, CatalogError>;

    /// Whether the requested quantity can currently be supplied
    fn can_supply(&self, variant: &Variant, quantity: i32) -> bool;
}

/// Catalog-related errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Variant not found: {0}")]
    NotFound(Uuid),

    #[error("Variant {0} cannot be subscribed to")]
    Unsubscribable(Uuid),

    #[error("Variant {id} cannot supply quantity {requested}")]
    OutOfStock { id: Uuid, requested: i32 },
}
