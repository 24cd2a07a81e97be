use crate::config::SubscriptionsConfig;
use crate::dispatcher::Dispatchers;
use crate::line_item_builder::LineItemBuilder;
use crate::models::{Installment, Subscription};
use crate::order_builder::OrderBuilder;
use crate::UserMismatchError;
use cadence_catalog::{CatalogError, VariantCatalog};
use cadence_order::{CheckoutError, Order, Payment, PaymentError, PaymentGateway, PromotionHandler};
use cadence_shared::{Address, CreditCard};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Collaborators and configuration the engine processes a batch against
#[derive(Clone)]
pub struct ProcessingContext {
    pub catalog: Arc<dyn VariantCatalog>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub promotions: Arc<dyn PromotionHandler>,
    pub dispatchers: Dispatchers,
    pub config: SubscriptionsConfig,
}

/// Errors surfaced out of [`ConsolidatedInstallment::process`]. All of them
/// are fatal for the attempt; the failure sweep has already rescheduled the
/// affected installments by the time one of these reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("User {0} has no stored payment source")]
    MissingPaymentSource(Uuid),
}

/// Consolidates a batch of same-user installments into a single order and
/// drives it through checkout.
///
/// Installments due on the same day for one user are grouped into one cart
/// so the customer is charged and shipped once. Each instance owns its batch
/// and order exclusively for the duration of one `process` call.
pub struct ConsolidatedInstallment {
    installments: Vec<Installment>,
    /// Installments taken out of the in-flight batch (out of stock, payment
    /// failed), retained so callers can inspect their outcome records
    removed: Vec<Installment>,
    /// Lead subscription, captured at construction. Fallback source for the
    /// order's store, shipping address and payment source.
    subscription: Subscription,
    order: Option<Order>,
    ctx: ProcessingContext,
}

impl ConsolidatedInstallment {
    /// Build an engine for one batch. The batch must contain at least one
    /// installment and every installment must belong to the same user.
    pub fn new(
        installments: Vec<Installment>,
        ctx: ProcessingContext,
    ) -> Result<Self, UserMismatchError> {
        let mut users: Vec<Uuid> = Vec::new();
        for installment in &installments {
            let user_id = installment.subscription.user.id;
            if !users.contains(&user_id) {
                users.push(user_id);
            }
        }
        if users.len() != 1 {
            return Err(UserMismatchError(users));
        }

        let subscription = installments[0].subscription.clone();
        Ok(Self {
            installments,
            removed: Vec::new(),
            subscription,
            order: None,
            ctx,
        })
    }

    /// The in-flight batch
    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    /// Installments removed from the in-flight batch during processing,
    /// with their outcome details recorded
    pub fn removed_installments(&self) -> &[Installment] {
        &self.removed
    }

    /// The order fulfilling this batch. Created lazily, at most once per
    /// instance; repeated calls return the same order.
    pub fn order(&mut self) -> &Order {
        self.order_mut()
    }

    /// Process the batch: populate the order, drive it through checkout,
    /// classify the outcome and dispatch notifications.
    ///
    /// Returns the completed order, or `None` when the attempt failed
    /// recoverably (nothing in stock, payment declined). Errors are fatal
    /// for the attempt but the failure sweep runs on every exit path, so
    /// affected installments are always rescheduled rather than left stuck.
    pub fn process(&mut self) -> Result<Option<Order>, ProcessError> {
        info!(
            count = self.installments.len(),
            user_id = %self.subscription.user.id,
            "processing consolidated installments"
        );
        let result = self.run();
        // Guaranteed sweep, including when run() bailed out with an error
        self.reschedule_unfulfilled();
        result
    }

    fn run(&mut self) -> Result<Option<Order>, ProcessError> {
        self.populate()?;

        // Out-of-stock installments were removed and set for future
        // processing. Nothing left in flight means nothing to check out.
        if self.installments.is_empty() {
            return Ok(None);
        }

        if self.checkout()? {
            let order = self.order.clone();
            self.ctx
                .dispatchers
                .success
                .dispatch(&mut self.installments, order.as_ref());
            return Ok(order);
        }

        // This instance creates at most one order with at most one payment,
        // so a failed payment here can only be the one just created.
        if let Some(order) = self.order.clone() {
            debug_assert!(
                order.payments.len() <= 1,
                "consolidated order carries at most one payment"
            );
            if order.has_failed_payment() {
                self.ctx
                    .dispatchers
                    .payment_failed
                    .dispatch(&mut self.installments, Some(&order));
                self.removed.append(&mut self.installments);
            }
        }

        Ok(None)
    }

    /// Convert every installment's requested items into order line items.
    /// Installments supplying nothing are removed from the in-flight batch
    /// and routed to the out-of-stock channel before checkout proceeds.
    fn populate(&mut self) -> Result<(), ProcessError> {
        let mut built = Vec::with_capacity(self.installments.len());
        for installment in &self.installments {
            let builder = LineItemBuilder::new(
                &installment.subscription.line_items,
                self.ctx.catalog.as_ref(),
            );
            built.push(builder.line_items()?);
        }

        let mut stocked_out = Vec::new();
        let mut kept = Vec::new();
        let mut line_items = Vec::new();
        for (installment, items) in std::mem::take(&mut self.installments)
            .into_iter()
            .zip(built)
        {
            if items.is_empty() {
                stocked_out.push(installment);
            } else {
                line_items.extend(items);
                kept.push(installment);
            }
        }
        self.installments = kept;

        if !stocked_out.is_empty() {
            self.ctx
                .dispatchers
                .out_of_stock
                .dispatch(&mut stocked_out, None);
            self.removed.append(&mut stocked_out);
        }

        if self.installments.is_empty() {
            return Ok(());
        }

        let order = self.order_mut();
        OrderBuilder::new(order).add_line_items(line_items);
        Ok(())
    }

    /// Drive the populated order through the checkout states. The final
    /// transition is the quiet one: a declined payment comes back as
    /// `Ok(false)`, not an error.
    fn checkout(&mut self) -> Result<bool, ProcessError> {
        let ship_address = self.ship_address();
        let source = self
            .active_card()
            .ok_or(ProcessError::MissingPaymentSource(self.subscription.user.id))?;
        let gateway = Arc::clone(&self.ctx.gateway);
        let promotions = Arc::clone(&self.ctx.promotions);
        let gateway_name = self.ctx.config.default_gateway.clone();
        let currency = self.ctx.config.currency.clone();

        let order = self.order_mut();
        order.update_totals();
        promotions.activate(order);
        order.update_totals();

        order.advance()?; // cart -> address

        order.ship_address = ship_address;
        order.advance()?; // address -> delivery
        order.advance()?; // delivery -> payment

        let status = gateway.authorize(&source, order.total_cents, &currency)?;
        let payment = Payment::new(
            order.id,
            source.token.clone(),
            order.total_cents,
            gateway_name,
            status,
        );
        order.add_payment(payment);
        order.advance()?; // payment -> confirm

        Ok(order.complete_checkout())
    }

    /// Route anything still unfulfilled to the failure channel so it is
    /// rescheduled for a later attempt
    fn reschedule_unfulfilled(&mut self) {
        let (mut unfulfilled, mut fulfilled): (Vec<Installment>, Vec<Installment>) =
            std::mem::take(&mut self.installments)
                .into_iter()
                .partition(|installment| installment.unfulfilled());

        if !unfulfilled.is_empty() {
            self.ctx
                .dispatchers
                .failure
                .dispatch(&mut unfulfilled, self.order.as_ref());
        }

        fulfilled.append(&mut unfulfilled);
        self.installments = fulfilled;
    }

    fn order_mut(&mut self) -> &mut Order {
        if self.order.is_none() {
            let store = self
                .subscription
                .store
                .clone()
                .unwrap_or_else(|| self.ctx.config.fallback_store.clone());
            let user = &self.subscription.user;
            let mut order = Order::new(user.id, user.email.clone(), store);
            order.currency = self.ctx.config.currency.clone();
            info!(order_id = %order.id, user_id = %user.id, "created consolidated order");
            self.order = Some(order);
        }
        self.order.as_mut().expect("order memoized above")
    }

    fn ship_address(&self) -> Option<Address> {
        self.subscription.user.ship_address.clone().or_else(|| {
            self.subscription
                .root_order
                .as_ref()
                .and_then(|root| root.ship_address.clone())
        })
    }

    fn active_card(&self) -> Option<CreditCard> {
        self.subscription
            .user
            .default_credit_card()
            .cloned()
            .or_else(|| {
                self.subscription
                    .root_order
                    .as_ref()
                    .and_then(|root| root.credit_card.clone())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{
        FAILURE_MESSAGE, OUT_OF_STOCK_MESSAGE, PAYMENT_FAILED_MESSAGE, SUCCESS_MESSAGE,
    };
    use crate::models::{RootOrder, SubscriptionLineItem};
    use cadence_catalog::{InMemoryCatalog, Variant};
    use cadence_order::{ItemTotalPromotion, MockGateway, NoPromotions, PaymentStatus};
    use cadence_shared::User;
    use chrono::{Duration, Utc};

    fn address() -> Address {
        Address {
            name: "Test User".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            zip: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    fn subscription_user(card_token: &str) -> User {
        let mut user = User::new("subscriber@example.com");
        user.ship_address = Some(address());
        user.credit_cards
            .push(CreditCard::new(card_token, "4242", true));
        user
    }

    fn installment_for(user: &User, variant_id: Uuid, quantity: i32) -> Installment {
        let subscription = Subscription::new(
            user.clone(),
            vec![SubscriptionLineItem::new(variant_id, quantity)],
        );
        Installment::new(subscription)
    }

    fn context(catalog: InMemoryCatalog) -> ProcessingContext {
        let config = SubscriptionsConfig::default();
        ProcessingContext {
            catalog: Arc::new(catalog),
            gateway: Arc::new(MockGateway),
            promotions: Arc::new(NoPromotions),
            dispatchers: Dispatchers::from_config(&config),
            config,
        }
    }

    /// Catalog with two subscribable variants at 24.99, the returned pair of
    /// ids in insertion order
    fn two_variant_catalog(stock_a: i32, stock_b: i32) -> (InMemoryCatalog, Uuid, Uuid) {
        let mut catalog = InMemoryCatalog::new();
        let variant_a = Variant::new("SKU-A", "Coffee", 2499);
        let variant_b = Variant::new("SKU-B", "Tea", 2499);
        let (id_a, id_b) = (variant_a.id, variant_b.id);
        catalog.add_variant(variant_a, stock_a);
        catalog.add_variant(variant_b, stock_b);
        (catalog, id_a, id_b)
    }

    #[test]
    fn test_mixed_user_batch_is_rejected() {
        let (catalog, id_a, id_b) = two_variant_catalog(10, 10);
        let user_a = subscription_user("tok_a");
        let user_b = subscription_user("tok_b");
        let installments = vec![
            installment_for(&user_a, id_a, 1),
            installment_for(&user_b, id_b, 1),
        ];

        let result = ConsolidatedInstallment::new(installments, context(catalog));

        match result {
            Err(err) => assert!(err.to_string().contains("must have the same user")),
            Ok(_) => panic!("expected UserMismatchError"),
        }
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let (catalog, _, _) = two_variant_catalog(10, 10);
        assert!(ConsolidatedInstallment::new(Vec::new(), context(catalog)).is_err());
    }

    #[test]
    fn test_completed_checkout() {
        let (catalog, id_a, id_b) = two_variant_catalog(10, 10);
        let user = subscription_user("tok_visa");
        let installments = vec![
            installment_for(&user, id_a, 1),
            installment_for(&user, id_b, 1),
        ];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let order = engine.process().unwrap().expect("order should complete");

        assert!(order.complete());
        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.total_cents, 4998);
        assert!(!order.shipments.is_empty());
        assert_eq!(order.payments.len(), 1);
        assert_eq!(order.payments[0].status, PaymentStatus::Succeeded);
        assert_eq!(order.payments[0].amount_cents, order.total_cents);

        for installment in engine.installments() {
            assert!(installment.fulfilled());
            let detail = installment.details.last().unwrap();
            assert_eq!(detail.message, SUCCESS_MESSAGE);
            assert_eq!(detail.order_id, Some(order.id));
        }
    }

    #[test]
    fn test_line_items_match_requests() {
        let (catalog, id_a, _) = two_variant_catalog(10, 10);
        let user = subscription_user("tok_visa");
        let installments = vec![installment_for(&user, id_a, 3)];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let order = engine.process().unwrap().expect("order should complete");

        assert_eq!(order.line_items[0].variant_id, id_a);
        assert_eq!(order.line_items[0].quantity, 3);
    }

    #[test]
    fn test_out_of_stock_installment_is_removed() {
        let (catalog, id_a, id_b) = two_variant_catalog(0, 10);
        let user = subscription_user("tok_visa");
        let installments = vec![
            installment_for(&user, id_a, 1),
            installment_for(&user, id_b, 1),
        ];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let order = engine.process().unwrap().expect("order should complete");

        // The order only covers the remaining installment
        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.line_items[0].variant_id, id_b);
        assert_eq!(order.total_cents, 2499);

        assert_eq!(engine.installments().len(), 1);
        assert_eq!(engine.removed_installments().len(), 1);

        let detail = engine.removed_installments()[0].details.last().unwrap();
        assert!(!detail.success);
        assert_eq!(detail.message, OUT_OF_STOCK_MESSAGE);
    }

    #[test]
    fn test_all_installments_out_of_stock() {
        let (catalog, id_a, id_b) = two_variant_catalog(0, 0);
        let user = subscription_user("tok_visa");
        let installments = vec![
            installment_for(&user, id_a, 1),
            installment_for(&user, id_b, 1),
        ];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let result = engine.process().unwrap();

        assert!(result.is_none());
        assert!(engine.installments().is_empty());
        assert_eq!(engine.removed_installments().len(), 2);
        for installment in engine.removed_installments() {
            let detail = installment.details.last().unwrap();
            assert!(!detail.success);
            assert_eq!(detail.message, OUT_OF_STOCK_MESSAGE);
            // No order was ever created for the batch
            assert_eq!(detail.order_id, None);
        }
    }

    #[test]
    fn test_declined_payment_marks_and_reschedules() {
        let (catalog, id_a, id_b) = two_variant_catalog(10, 10);
        let user = subscription_user("decline-visa");
        let installments = vec![
            installment_for(&user, id_a, 1),
            installment_for(&user, id_b, 1),
        ];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let before = Utc::now();
        let result = engine.process().unwrap();

        assert!(result.is_none());
        assert!(engine.installments().is_empty());
        assert_eq!(engine.removed_installments().len(), 2);
        for installment in engine.removed_installments() {
            let detail = installment.details.last().unwrap();
            assert!(!detail.success);
            assert_eq!(detail.message, PAYMENT_FAILED_MESSAGE);
            // Rescheduled exactly one reprocessing interval out
            let advanced = installment.actionable_date - before;
            assert!(advanced >= Duration::hours(23));
            assert!(advanced <= Duration::hours(25));
            // Dispatched exactly once, so the sweep did not double-process
            assert_eq!(installment.details.len(), 1);
        }
    }

    #[test]
    fn test_unknown_variant_propagates_after_sweep() {
        let (catalog, id_a, _) = two_variant_catalog(10, 10);
        let user = subscription_user("tok_visa");
        let installments = vec![
            installment_for(&user, id_a, 1),
            installment_for(&user, Uuid::new_v4(), 1),
        ];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let before = Utc::now();
        let result = engine.process();

        assert!(matches!(
            result,
            Err(ProcessError::Catalog(CatalogError::NotFound(_)))
        ));
        // The sweep still ran: every installment rescheduled and marked
        assert_eq!(engine.installments().len(), 2);
        for installment in engine.installments() {
            let detail = installment.details.last().unwrap();
            assert_eq!(detail.message, FAILURE_MESSAGE);
            assert!(installment.actionable_date - before >= Duration::hours(23));
        }
    }

    #[test]
    fn test_unsubscribable_variant_propagates_after_sweep() {
        let mut catalog = InMemoryCatalog::new();
        let mut variant = Variant::new("SKU-A", "Coffee", 2499);
        variant.subscribable = false;
        let id = variant.id;
        catalog.add_variant(variant, 10);

        let user = subscription_user("tok_visa");
        let installments = vec![installment_for(&user, id, 1)];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let result = engine.process();

        assert!(matches!(
            result,
            Err(ProcessError::Catalog(CatalogError::Unsubscribable(_)))
        ));
        assert!(engine.installments()[0].unfulfilled());
    }

    #[test]
    fn test_missing_ship_address_fails_checkout() {
        let (catalog, id_a, _) = two_variant_catalog(10, 10);
        let mut user = subscription_user("tok_visa");
        user.ship_address = None;
        let installments = vec![installment_for(&user, id_a, 1)];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let result = engine.process();

        assert!(matches!(
            result,
            Err(ProcessError::Checkout(CheckoutError::MissingShipAddress(_)))
        ));
        let detail = engine.installments()[0].details.last().unwrap();
        assert_eq!(detail.message, FAILURE_MESSAGE);
    }

    #[test]
    fn test_root_order_address_fallback() {
        let (catalog, id_a, _) = two_variant_catalog(10, 10);
        let mut user = subscription_user("tok_visa");
        user.ship_address = None;

        let mut installment = installment_for(&user, id_a, 1);
        installment.subscription.root_order = Some(RootOrder {
            ship_address: Some(address()),
            credit_card: None,
        });

        let mut engine =
            ConsolidatedInstallment::new(vec![installment], context(catalog)).unwrap();
        let order = engine.process().unwrap().expect("order should complete");

        assert_eq!(order.ship_address, Some(address()));
    }

    #[test]
    fn test_root_order_card_fallback() {
        let (catalog, id_a, _) = two_variant_catalog(10, 10);
        let mut user = subscription_user("tok_visa");
        user.credit_cards.clear();

        let mut installment = installment_for(&user, id_a, 1);
        installment.subscription.root_order = Some(RootOrder {
            ship_address: None,
            credit_card: Some(CreditCard::new("tok_root", "1881", true)),
        });

        let mut engine =
            ConsolidatedInstallment::new(vec![installment], context(catalog)).unwrap();
        let order = engine.process().unwrap().expect("order should complete");

        assert_eq!(order.payments.len(), 1);
        assert_eq!(order.payments[0].source_token, "tok_root");
        assert_eq!(order.payments[0].status, PaymentStatus::Succeeded);
    }

    #[test]
    fn test_missing_payment_source() {
        let (catalog, id_a, _) = two_variant_catalog(10, 10);
        let mut user = subscription_user("tok_visa");
        user.credit_cards.clear();
        let installments = vec![installment_for(&user, id_a, 1)];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let result = engine.process();

        assert!(matches!(result, Err(ProcessError::MissingPaymentSource(_))));
        assert!(engine.installments()[0].unfulfilled());
    }

    #[test]
    fn test_order_accessor_is_memoized() {
        let (catalog, id_a, _) = two_variant_catalog(10, 10);
        let user = subscription_user("tok_visa");
        let installments = vec![installment_for(&user, id_a, 1)];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let first = engine.order().id;
        let second = engine.order().id;

        assert_eq!(first, second);
    }

    #[test]
    fn test_order_accessor_attributes() {
        let (catalog, id_a, _) = two_variant_catalog(10, 10);
        let user = subscription_user("tok_visa");
        let mut installment = installment_for(&user, id_a, 1);
        installment.subscription.store = Some("eu".to_string());

        let mut engine =
            ConsolidatedInstallment::new(vec![installment], context(catalog)).unwrap();
        let order = engine.order();

        assert_eq!(order.user_id, user.id);
        assert_eq!(order.email, user.email);
        assert_eq!(order.store, "eu");
    }

    #[test]
    fn test_order_accessor_fallback_store() {
        let (catalog, id_a, _) = two_variant_catalog(10, 10);
        let user = subscription_user("tok_visa");
        let installments = vec![installment_for(&user, id_a, 1)];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        assert_eq!(engine.order().store, "default");
    }

    #[test]
    fn test_promotions_adjust_the_total() {
        let (catalog, id_a, id_b) = two_variant_catalog(10, 10);
        let user = subscription_user("tok_visa");
        let installments = vec![
            installment_for(&user, id_a, 1),
            installment_for(&user, id_b, 1),
        ];

        let mut ctx = context(catalog);
        ctx.promotions = Arc::new(ItemTotalPromotion {
            threshold_cents: 4000,
            discount_cents: 1000,
        });

        let mut engine = ConsolidatedInstallment::new(installments, ctx).unwrap();
        let order = engine.process().unwrap().expect("order should complete");

        assert_eq!(order.item_total_cents, 4998);
        assert_eq!(order.total_cents, 3998);
        assert_eq!(order.payments[0].amount_cents, 3998);
    }

    #[test]
    fn test_processed_order_is_returned_and_memoized() {
        let (catalog, id_a, _) = two_variant_catalog(10, 10);
        let user = subscription_user("tok_visa");
        let installments = vec![installment_for(&user, id_a, 1)];

        let mut engine = ConsolidatedInstallment::new(installments, context(catalog)).unwrap();
        let order = engine.process().unwrap().expect("order should complete");

        assert_eq!(engine.order().id, order.id);
    }
}
