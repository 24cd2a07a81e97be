use cadence_order::{LineItem, Order};

/// Append-only aggregation of validated line items into the draft order.
/// Assumes [`crate::LineItemBuilder`] output; no validation of its own.
pub struct OrderBuilder<'a> {
    order: &'a mut Order,
}

impl<'a> OrderBuilder<'a> {
    pub fn new(order: &'a mut Order) -> Self {
        Self { order }
    }

    /// Merge a set of line items into the order and refresh its totals
    pub fn add_line_items(&mut self, line_items: Vec<LineItem>) {
        for line_item in line_items {
            self.order.add_line_item(line_item);
        }
        self.order.update_totals();
    }
}
