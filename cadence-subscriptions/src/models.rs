use cadence_shared::{Address, CreditCard, User};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Template request for one recurring item on a subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionLineItem {
    pub id: Uuid,
    pub subscribable_id: Uuid,
    pub quantity: i32,
}

impl SubscriptionLineItem {
    pub fn new(subscribable_id: Uuid, quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscribable_id,
            quantity,
        }
    }
}

/// The order the subscription was originally created from. Used as the
/// fallback source for shipping address and payment source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootOrder {
    pub ship_address: Option<Address>,
    pub credit_card: Option<CreditCard>,
}

/// A recurring purchase agreement. Read-only to the consolidation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user: User,
    pub store: Option<String>,
    pub root_order: Option<RootOrder>,
    pub line_items: Vec<SubscriptionLineItem>,
}

impl Subscription {
    pub fn new(user: User, line_items: Vec<SubscriptionLineItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            store: None,
            root_order: None,
            line_items,
        }
    }
}

/// Immutable outcome record appended after each processing attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentDetail {
    pub id: Uuid,
    pub installment_id: Uuid,
    pub success: bool,
    pub message: String,
    /// The order that fulfilled (or tried to fulfill) this attempt
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One scheduled charge for one subscription.
///
/// Created by the external scheduler; the engine only reschedules its
/// actionable date and appends outcome details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    pub id: Uuid,
    pub subscription: Subscription,
    pub actionable_date: DateTime<Utc>,
    pub details: Vec<InstallmentDetail>,
}

impl Installment {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscription,
            actionable_date: Utc::now(),
            details: Vec::new(),
        }
    }

    /// An installment is unfulfilled until its latest attempt succeeded
    pub fn unfulfilled(&self) -> bool {
        self.details.last().map(|d| !d.success).unwrap_or(true)
    }

    pub fn fulfilled(&self) -> bool {
        !self.unfulfilled()
    }

    /// Append an outcome record for the attempt just made
    pub fn record_detail(&mut self, success: bool, message: &str, order_id: Option<Uuid>) {
        self.details.push(InstallmentDetail {
            id: Uuid::new_v4(),
            installment_id: self.id,
            success,
            message: message.to_string(),
            order_id,
            created_at: Utc::now(),
        });
    }

    /// Push the next eligible processing date forward
    pub fn advance_actionable_date(&mut self, interval: Duration) {
        self.actionable_date = Utc::now() + interval;
    }
}
