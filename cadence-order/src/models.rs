use crate::payment::{Payment, PaymentStatus};
use cadence_shared::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Checkout states in the order lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Cart,
    Address,
    Delivery,
    Payment,
    Confirm,
    Complete,
}

/// An individual variant entry on an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
    /// Unit price captured at build time
    pub price_cents: i64,
}

impl LineItem {
    pub fn new(variant_id: Uuid, quantity: i32, price_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            variant_id,
            quantity,
            price_cents,
        }
    }

    pub fn amount_cents(&self) -> i64 {
        self.price_cents * self.quantity as i64
    }
}

/// Shipment record created when the order enters delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub address: Address,
    pub created_at: DateTime<Utc>,
}

impl Shipment {
    pub fn new(order_id: Uuid, address: Address) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            address,
            created_at: Utc::now(),
        }
    }
}

/// The single source of truth for a customer's purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub store: String,
    pub state: OrderState,
    pub line_items: Vec<LineItem>,
    pub ship_address: Option<Address>,
    pub shipments: Vec<Shipment>,
    pub payments: Vec<Payment>,
    pub item_total_cents: i64,
    /// Promotion adjustments, negative when a discount applies
    pub adjustment_total_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(user_id: Uuid, email: impl Into<String>, store: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            email: email.into(),
            store: store.into(),
            state: OrderState::Cart,
            line_items: Vec::new(),
            ship_address: None,
            shipments: Vec::new(),
            payments: Vec::new(),
            item_total_cents: 0,
            adjustment_total_cents: 0,
            total_cents: 0,
            currency: "USD".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a line item, merging quantities when the variant is already present
    pub fn add_line_item(&mut self, line_item: LineItem) {
        match self
            .line_items
            .iter_mut()
            .find(|existing| existing.variant_id == line_item.variant_id)
        {
            Some(existing) => existing.quantity += line_item.quantity,
            None => self.line_items.push(line_item),
        }
        self.updated_at = Utc::now();
    }

    pub fn add_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
        self.updated_at = Utc::now();
    }

    /// Recompute item and grand totals from current contents
    pub fn update_totals(&mut self) {
        self.item_total_cents = self.line_items.iter().map(LineItem::amount_cents).sum();
        self.total_cents = self.item_total_cents + self.adjustment_total_cents;
        self.updated_at = Utc::now();
    }

    pub fn has_failed_payment(&self) -> bool {
        self.payments
            .iter()
            .any(|payment| payment.status == PaymentStatus::Failed)
    }

    pub fn complete(&self) -> bool {
        self.state == OrderState::Complete
    }
}
