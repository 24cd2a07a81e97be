pub mod models;

pub use models::{Address, CreditCard, User};
