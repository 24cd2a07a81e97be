pub mod inventory;
pub mod variant;

pub use inventory::InMemoryCatalog;
pub use variant::{CatalogError, Variant, VariantCatalog};
