use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shipping destination attached to orders and users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub zip: String,
    pub country: String,
}

/// Stored payment source belonging to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreditCard {
    pub id: Uuid,
    /// Opaque token the payment gateway resolves to the real card
    pub token: String,
    pub last_digits: String,
    pub default: bool,
}

impl CreditCard {
    pub fn new(token: impl Into<String>, last_digits: impl Into<String>, default: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: token.into(),
            last_digits: last_digits.into(),
            default,
        }
    }
}

/// The customer owning subscriptions and orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub ship_address: Option<Address>,
    pub credit_cards: Vec<CreditCard>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            ship_address: None,
            credit_cards: Vec::new(),
        }
    }

    /// The most recently stored card flagged as the default source
    pub fn default_credit_card(&self) -> Option<&CreditCard> {
        self.credit_cards.iter().rev().find(|card| card.default)
    }
}
