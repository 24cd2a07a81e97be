pub mod checkout;
pub mod models;
pub mod payment;
pub mod promotions;

pub use checkout::CheckoutError;
pub use models::{LineItem, Order, OrderState, Shipment};
pub use payment::{MockGateway, Payment, PaymentError, PaymentGateway, PaymentStatus};
pub use promotions::{ItemTotalPromotion, NoPromotions, PromotionHandler};
