use crate::variant::{CatalogError, Variant, VariantCatalog};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Stock tracking for a single variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockItem {
    pub variant_id: Uuid,
    pub count_on_hand: i32,
    pub backorderable: bool,
}

/// In-memory variant catalog with stock levels (will integrate with the
/// inventory store later)
pub struct InMemoryCatalog {
    variants: HashMap<Uuid, Variant>,
    stock: HashMap<Uuid, StockItem>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            variants: HashMap::new(),
            stock: HashMap::new(),
        }
    }

    /// Register a variant with an initial stock level
    pub fn add_variant(&mut self, variant: Variant, count_on_hand: i32) {
        self.stock.insert(
            variant.id,
            StockItem {
                variant_id: variant.id,
                count_on_hand,
                backorderable: false,
            },
        );
        self.variants.insert(variant.id, variant);
    }

    /// Overwrite the stock level for a variant
    pub fn set_stock(&mut self, variant_id: &Uuid, count_on_hand: i32, backorderable: bool) {
        self.stock.insert(
            *variant_id,
            StockItem {
                variant_id: *variant_id,
                count_on_hand,
                backorderable,
            },
        );
    }

    pub fn stock_item(&self, variant_id: &Uuid) -> Option<&StockItem> {
        self.stock.get(variant_id)
    }
}

impl VariantCatalog for InMemoryCatalog {
    fn resolve(&self, id: Uuid) -> Result<Variant, CatalogError> {
        self.variants
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }

    fn can_supply(&self, variant: &Variant, quantity: i32) -> bool {
        match self.stock.get(&variant.id) {
            Some(item) => item.backorderable || item.count_on_hand >= quantity,
            None => false,
        }
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}
