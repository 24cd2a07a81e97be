use cadence_shared::CreditCard;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
}

/// A payment attempt recorded against an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Token of the card the gateway charged
    pub source_token: String,
    pub amount_cents: i64,
    pub gateway: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        order_id: Uuid,
        source_token: impl Into<String>,
        amount_cents: i64,
        gateway: impl Into<String>,
        status: PaymentStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            source_token: source_token.into(),
            amount_cents,
            gateway: gateway.into(),
            status,
            created_at: Utc::now(),
        }
    }
}

/// Gateway adapter the engine charges stored cards through.
///
/// A declined card is an expected outcome and comes back as
/// [`PaymentStatus::Failed`]; `Err` is reserved for the gateway itself
/// misbehaving.
pub trait PaymentGateway: Send + Sync {
    fn authorize(
        &self,
        source: &CreditCard,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentStatus, PaymentError>;
}

/// Payment-related errors
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Invalid payment amount: {0}")]
    InvalidAmount(i64),
}

/// Test double standing in for a real gateway adapter
pub struct MockGateway;

impl PaymentGateway for MockGateway {
    fn authorize(
        &self,
        source: &CreditCard,
        amount_cents: i64,
        _currency: &str,
    ) -> Result<PaymentStatus, PaymentError> {
        if amount_cents < 0 {
            return Err(PaymentError::InvalidAmount(amount_cents));
        }
        // Trigger for testing gateway outages
        if source.token == "fail-gateway" {
            return Err(PaymentError::GatewayUnavailable(
                "Simulated Payment Gateway Failure".to_string(),
            ));
        }
        // Trigger for testing declines
        if source.token.starts_with("decline") {
            return Ok(PaymentStatus::Failed);
        }
        Ok(PaymentStatus::Succeeded)
    }
}
