use crate::models::{Order, OrderState, Shipment};
use crate::payment::PaymentStatus;

impl Order {
    /// Advance the order one checkout state forward.
    ///
    /// Cart → Address → Delivery → Payment → Confirm. The final transition to
    /// Complete is not reachable here; a declined payment is an expected
    /// outcome, so it goes through the quiet [`Order::complete_checkout`]
    /// instead of an error path.
    pub fn advance(&mut self) -> Result<OrderState, CheckoutError> {
        let next = match self.state {
            OrderState::Cart => {
                if self.line_items.is_empty() {
                    return Err(CheckoutError::EmptyCart(self.id));
                }
                OrderState::Address
            }
            OrderState::Address => {
                let address = self
                    .ship_address
                    .clone()
                    .ok_or(CheckoutError::MissingShipAddress(self.id))?;
                self.shipments.push(Shipment::new(self.id, address));
                OrderState::Delivery
            }
            OrderState::Delivery => OrderState::Payment,
            OrderState::Payment => {
                if self.payments.is_empty() {
                    return Err(CheckoutError::MissingPayment(self.id));
                }
                OrderState::Confirm
            }
            from @ (OrderState::Confirm | OrderState::Complete) => {
                return Err(CheckoutError::InvalidTransition {
                    from: format!("{:?}", from),
                });
            }
        };

        self.state = next;
        self.updated_at = chrono::Utc::now();
        Ok(next)
    }

    /// Quiet completion: reports success or failure as a boolean rather than
    /// an error. Returns false without changing state when the order is not
    /// at Confirm or any payment failed to capture.
    pub fn complete_checkout(&mut self) -> bool {
        if self.state != OrderState::Confirm {
            return false;
        }
        let payments_ok = !self.payments.is_empty()
            && self
                .payments
                .iter()
                .all(|payment| payment.status == PaymentStatus::Succeeded);
        if !payments_ok {
            return false;
        }

        self.state = OrderState::Complete;
        self.updated_at = chrono::Utc::now();
        true
    }
}

/// Checkout transition errors
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Order {0} has no line items to check out")]
    EmptyCart(uuid::Uuid),

    #[error("Order {0} has no shipping address")]
    MissingShipAddress(uuid::Uuid),

    #[error("Order {0} has no payment attached")]
    MissingPayment(uuid::Uuid),

    #[error("No forward transition from state {from}")]
    InvalidTransition { from: String },
}
