use crate::models::SubscriptionLineItem;
use cadence_catalog::{CatalogError, VariantCatalog};
use cadence_order::LineItem;
use tracing::debug;

/// Converts subscription line item templates into concrete order line items.
///
/// A variant that cannot currently supply the requested quantity contributes
/// nothing to the output; callers detect the shortfall by comparing input and
/// output counts. A non-subscribable variant is upstream data corruption and
/// fails the whole build.
pub struct LineItemBuilder<'a> {
    subscription_line_items: &'a [SubscriptionLineItem],
    catalog: &'a dyn VariantCatalog,
}

impl<'a> LineItemBuilder<'a> {
    pub fn new(
        subscription_line_items: &'a [SubscriptionLineItem],
        catalog: &'a dyn VariantCatalog,
    ) -> Self {
        Self {
            subscription_line_items,
            catalog,
        }
    }

    /// One line item per satisfiable request, in request order
    pub fn line_items(&self) -> Result<Vec<LineItem>, CatalogError> {
        let mut line_items = Vec::with_capacity(self.subscription_line_items.len());

        for request in self.subscription_line_items {
            match self.build(request) {
                Ok(line_item) => line_items.push(line_item),
                // Recovered locally: the item is dropped, not the build
                Err(err @ CatalogError::OutOfStock { .. }) => {
                    debug!(%err, "dropping line item");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(line_items)
    }

    fn build(&self, request: &SubscriptionLineItem) -> Result<LineItem, CatalogError> {
        let variant = self.catalog.resolve(request.subscribable_id)?;

        if !variant.subscribable {
            return Err(CatalogError::Unsubscribable(variant.id));
        }

        if !self.catalog.can_supply(&variant, request.quantity) {
            return Err(CatalogError::OutOfStock {
                id: variant.id,
                requested: request.quantity,
            });
        }

        Ok(LineItem::new(
            variant.id,
            request.quantity,
            variant.price_cents,
        ))
    }
}
