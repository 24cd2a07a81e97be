use crate::config::SubscriptionsConfig;
use crate::models::Installment;
use cadence_order::Order;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

pub const SUCCESS_MESSAGE: &str = "fulfilled";
pub const OUT_OF_STOCK_MESSAGE: &str = "out of stock";
pub const PAYMENT_FAILED_MESSAGE: &str = "payment failed";
pub const FAILURE_MESSAGE: &str = "processing failed";

/// One outcome channel. Implementations record the outcome on each
/// installment and hand the notification off to delivery, which is an
/// external collaborator; the built-in implementations log it.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, installments: &mut [Installment], order: Option<&Order>);
}

/// The four channels the orchestrator routes outcomes through
#[derive(Clone)]
pub struct Dispatchers {
    pub success: Arc<dyn Dispatcher>,
    pub out_of_stock: Arc<dyn Dispatcher>,
    pub payment_failed: Arc<dyn Dispatcher>,
    pub failure: Arc<dyn Dispatcher>,
}

impl Dispatchers {
    pub fn from_config(config: &SubscriptionsConfig) -> Self {
        let interval = config.reprocessing_interval();
        Self {
            success: Arc::new(SuccessDispatcher),
            out_of_stock: Arc::new(OutOfStockDispatcher),
            payment_failed: Arc::new(PaymentFailedDispatcher { interval }),
            failure: Arc::new(FailureDispatcher { interval }),
        }
    }
}

/// Checkout completed: mark each installment fulfilled by the order
pub struct SuccessDispatcher;

impl Dispatcher for SuccessDispatcher {
    fn dispatch(&self, installments: &mut [Installment], order: Option<&Order>) {
        let order_id = order.map(|o| o.id);
        for installment in installments.iter_mut() {
            installment.record_detail(true, SUCCESS_MESSAGE, order_id);
        }
        info!(
            count = installments.len(),
            order_id = ?order_id,
            "installments fulfilled"
        );
    }
}

/// The installment could supply none of its requested items. Marks the
/// failure; the scheduler picks the installment up again on its own cadence.
pub struct OutOfStockDispatcher;

impl Dispatcher for OutOfStockDispatcher {
    fn dispatch(&self, installments: &mut [Installment], _order: Option<&Order>) {
        for installment in installments.iter_mut() {
            installment.record_detail(false, OUT_OF_STOCK_MESSAGE, None);
        }
        warn!(count = installments.len(), "installments out of stock");
    }
}

/// The freshly created payment was declined: mark the failure and push the
/// next attempt out by the reprocessing interval.
pub struct PaymentFailedDispatcher {
    pub interval: Duration,
}

impl Dispatcher for PaymentFailedDispatcher {
    fn dispatch(&self, installments: &mut [Installment], order: Option<&Order>) {
        let order_id = order.map(|o| o.id);
        for installment in installments.iter_mut() {
            installment.record_detail(false, PAYMENT_FAILED_MESSAGE, order_id);
            installment.advance_actionable_date(self.interval);
        }
        warn!(
            count = installments.len(),
            order_id = ?order_id,
            "payment failed for consolidated order"
        );
    }
}

/// Catch-all for installments left unfulfilled after an attempt, for any
/// reason including errors escaping the pipeline.
pub struct FailureDispatcher {
    pub interval: Duration,
}

impl Dispatcher for FailureDispatcher {
    fn dispatch(&self, installments: &mut [Installment], order: Option<&Order>) {
        let order_id = order.map(|o| o.id);
        for installment in installments.iter_mut() {
            installment.record_detail(false, FAILURE_MESSAGE, order_id);
            installment.advance_actionable_date(self.interval);
        }
        warn!(
            count = installments.len(),
            order_id = ?order_id,
            "installments failed to process, rescheduled"
        );
    }
}
