pub mod config;
pub mod consolidated_installment;
pub mod dispatcher;
pub mod line_item_builder;
pub mod models;
pub mod order_builder;

pub use config::SubscriptionsConfig;
pub use consolidated_installment::{ConsolidatedInstallment, ProcessError, ProcessingContext};
pub use dispatcher::{Dispatcher, Dispatchers};
pub use line_item_builder::LineItemBuilder;
pub use models::{Installment, InstallmentDetail, RootOrder, Subscription, SubscriptionLineItem};
pub use order_builder::OrderBuilder;

/// Installment batches handed to the engine must share a single owner
#[derive(Debug, thiserror::Error)]
#[error("Installments in a consolidated batch must have the same user (found {0:?})")]
pub struct UserMismatchError(pub Vec<uuid::Uuid>);
