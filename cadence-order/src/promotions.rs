use crate::models::Order;
use tracing::debug;

/// Promotion rule evaluation consumed by the consolidation engine.
///
/// Rule matching lives in the promotion engine proper; this boundary only
/// lets it adjust the order before checkout. Implementations mutate the
/// order's adjustment total; callers recompute totals afterwards.
pub trait PromotionHandler: Send + Sync {
    fn activate(&self, order: &mut Order);
}

/// Handler used when no promotion engine is wired in
pub struct NoPromotions;

impl PromotionHandler for NoPromotions {
    fn activate(&self, _order: &mut Order) {}
}

/// Flat order adjustment once the item total crosses a threshold
pub struct ItemTotalPromotion {
    pub threshold_cents: i64,
    pub discount_cents: i64,
}

impl PromotionHandler for ItemTotalPromotion {
    fn activate(&self, order: &mut Order) {
        if order.item_total_cents >= self.threshold_cents {
            debug!(
                order_id = %order.id,
                discount = self.discount_cents,
                "applying item total promotion"
            );
            order.adjustment_total_cents -= self.discount_cents;
        }
    }
}
