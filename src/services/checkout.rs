use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::common::GatewayKind;
use crate::models::order::{CheckoutResponse, Order, OrderItem, Payment};
use crate::services::database::DatabaseService;
use crate::services::gateway::{GatewayRegistry, PaymentGateway, PaymentOutcome};
use crate::services::inventory::InventoryLedger;
use crate::services::notify::NotificationService;

/// Owns the order/payment lifecycle: cart snapshot, slot reservation,
/// gateway initiation, and the one-shot settlement transition shared by
/// webhooks and manual re-verification.
#[derive(Clone)]
pub struct CheckoutService {
    db: DatabaseService,
    inventory: InventoryLedger,
    gateways: GatewayRegistry,
    notifier: NotificationService,
    default_gateway: GatewayKind,
}

impl CheckoutService {
    pub fn new(
        db: DatabaseService,
        gateways: GatewayRegistry,
        notifier: NotificationService,
        default_gateway: GatewayKind,
    ) -> Self {
        Self {
            inventory: InventoryLedger::new(db.clone()),
            db,
            gateways,
            notifier,
            default_gateway,
        }
    }

    /// Freeze the cart into an order, reserve inventory, create the pending
    /// payment, and hand the caller a redirect target. The live cart stays
    /// untouched until the payment actually succeeds, so a failed gateway
    /// round leaves everything retryable.
    pub async fn checkout(
        &self,
        user_id: Uuid,
        requested_gateway: Option<String>,
    ) -> Result<CheckoutResponse, ApiError> {
        let gateway_kind = match requested_gateway {
            Some(name) => GatewayKind::parse(&name)
                .ok_or_else(|| ApiError::Validation(format!("Unknown gateway '{}'", name)))?,
            None => self.default_gateway,
        };

        let cart = self.db.get_cart(&user_id).await?;
        if cart.is_empty() {
            return Err(ApiError::Validation("Cart is empty".to_string()));
        }

        // Snapshot with frozen prices.
        let mut items = Vec::with_capacity(cart.items.len());
        let mut total = Decimal::ZERO;
        for line in &cart.items {
            let plan = self
                .db
                .get_plan(&line.plan_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Plan {}", line.plan_id)))?;
            if !plan.plan.is_active {
                return Err(ApiError::Validation(format!(
                    "Plan '{}' is no longer available",
                    plan.plan.name
                )));
            }
            let duration = plan
                .durations
                .iter()
                .find(|d| d.label == line.duration_label && d.is_active)
                .ok_or_else(|| {
                    ApiError::Validation(format!(
                        "Duration '{}' of plan '{}' is no longer available",
                        line.duration_label, plan.plan.name
                    ))
                })?;

            total += duration.price * Decimal::from(line.quantity);
            items.push(OrderItem {
                plan_id: line.plan_id,
                plan_name: plan.plan.name.clone(),
                duration_label: line.duration_label.clone(),
                unit_price: duration.price,
                quantity: line.quantity,
            });
        }

        // Reserve every line before any row is written; roll back the lines
        // already taken if one runs dry.
        let mut reserved: Vec<&OrderItem> = Vec::new();
        for item in &items {
            let ok = self
                .inventory
                .reserve(&item.plan_id, &item.duration_label, item.quantity)
                .await?;
            if !ok {
                for taken in &reserved {
                    let _ = self
                        .inventory
                        .release(&taken.plan_id, &taken.duration_label, taken.quantity)
                        .await;
                }
                return Err(ApiError::OutOfStock(format!(
                    "{} ({})",
                    item.plan_name, item.duration_label
                )));
            }
            reserved.push(item);
        }

        let order = Order::new(user_id, items, total);
        self.db.create_order(&order).await?;

        let mut payment = Payment::new(order.id, user_id, total, gateway_kind);
        self.db.create_payment(&payment).await?;

        log::info!(
            "checkout order={} payment={} ref={} amount={} gateway={}",
            order.id,
            payment.id,
            payment.merchant_transaction_id,
            total,
            gateway_kind
        );

        // A gateway outage leaves the order pending and the reservation in
        // place; releasing here could oversell if the charge went through.
        let initiated = self
            .gateways
            .get(gateway_kind)
            .initiate(&payment)
            .await
            .map_err(ApiError::from)?;

        if let Some(gateway_order_id) = &initiated.gateway_order_id {
            self.db
                .set_gateway_order_id(&payment.id, gateway_order_id)
                .await?;
            payment.gateway_order_id = Some(gateway_order_id.clone());
        }

        Ok(CheckoutResponse {
            order_id: order.id,
            payment_id: payment.id,
            merchant_transaction_id: payment.merchant_transaction_id,
            amount: total,
            redirect: initiated.redirect,
        })
    }

    /// Apply a trusted gateway verdict to the payment a reference points at.
    /// Safe to call any number of times: the underlying transition is a
    /// compare-and-set, and a replay returns the settled payment without
    /// granting or notifying twice.
    pub async fn apply_outcome(
        &self,
        reference: &str,
        outcome: PaymentOutcome,
    ) -> Result<Payment, ApiError> {
        let payment = self
            .db
            .get_payment_by_reference(reference)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No payment for reference {}", reference)))?;

        match outcome {
            PaymentOutcome::Success { gateway_payment_id } => {
                let applied = self
                    .db
                    .settle_payment_success(&payment.id, gateway_payment_id.as_deref())
                    .await?;
                if applied {
                    self.grant_order(&payment).await?;
                }
                self.reload_payment(&payment.id).await
            }
            PaymentOutcome::Failed { reason } => {
                let applied = self.db.settle_payment_failed(&payment.id, &reason).await?;
                if applied {
                    self.release_order(&payment).await?;
                    log::warn!(
                        "payment failed ref={} order={} reason={}",
                        reference,
                        payment.order_id,
                        reason
                    );
                }
                self.reload_payment(&payment.id).await
            }
            PaymentOutcome::Pending => Ok(payment),
        }
    }

    /// User-initiated re-poll for gateways without a push channel.
    pub async fn verify_manual(
        &self,
        user_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Payment, ApiError> {
        let payment = self
            .db
            .get_payment(&payment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Payment {}", payment_id)))?;

        if payment.user_id != user_id {
            return Err(ApiError::Forbidden(
                "Payment belongs to another user".to_string(),
            ));
        }

        if payment.is_final() {
            return Ok(payment);
        }

        let outcome = self
            .gateways
            .get(payment.gateway)
            .check_status(&payment)
            .await
            .map_err(ApiError::from)?;

        self.apply_outcome(&payment.merchant_transaction_id, outcome)
            .await
    }

    /// Verified webhook path. The signature check happens inside the
    /// provider binding before anything in the body is trusted.
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        header_signature: &str,
    ) -> Result<Payment, ApiError> {
        let event = self
            .gateways
            .razorpay()
            .handle_webhook(raw_body, header_signature)
            .map_err(ApiError::from)?;

        // The notes must agree with the payment the reference resolves to.
        if let Some(notes_order_id) = &event.notes_order_id {
            let payment = self
                .db
                .get_payment_by_reference(&event.reference)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("No payment for reference {}", event.reference))
                })?;
            if payment.order_id.to_string() != *notes_order_id {
                log::error!(
                    "webhook notes mismatch ref={} order={} notes_order={}",
                    event.reference,
                    payment.order_id,
                    notes_order_id
                );
                return Err(ApiError::Validation(
                    "Webhook notes do not match the referenced payment".to_string(),
                ));
            }
        }

        self.apply_outcome(&event.reference, event.outcome).await
    }

    async fn reload_payment(&self, payment_id: &Uuid) -> Result<Payment, ApiError> {
        self.db
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Payment {}", payment_id)))
    }

    /// Post-success effects: subscription window, ownership, inventory
    /// commit, cart clearing, confirmation. Runs exactly once per payment
    /// because the caller only invokes it when the CAS applied.
    async fn grant_order(&self, payment: &Payment) -> Result<(), ApiError> {
        let order = self
            .db
            .get_order(&payment.order_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Order {}", payment.order_id)))?;

        if let Some(primary) = order.primary_item() {
            if let Some(duration) = self
                .db
                .get_duration(&primary.plan_id, &primary.duration_label)
                .await?
            {
                self.db
                    .set_order_end_date(&order.id, duration.end_date)
                    .await?;
            }
        }

        for item in &order.items {
            self.db
                .add_user_subscription(&order.user_id, &item.plan_id)
                .await?;
            self.inventory
                .commit(&item.plan_id, &item.duration_label, item.quantity)
                .await?;
        }

        self.db.clear_cart(&order.user_id).await?;

        if let Some(user) = self.db.get_user(&order.user_id).await? {
            self.notifier.send(
                &user.phone,
                "Payment confirmed",
                &format!("Your order {} is now active.", order.id),
            );
        }

        log::info!(
            "payment settled ref={} order={} user={}",
            payment.merchant_transaction_id,
            order.id,
            order.user_id
        );
        Ok(())
    }

    async fn release_order(&self, payment: &Payment) -> Result<(), ApiError> {
        let order = self
            .db
            .get_order(&payment.order_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Order {}", payment.order_id)))?;

        for item in &order.items {
            self.inventory
                .release(&item.plan_id, &item.duration_label, item.quantity)
                .await?;
        }
        Ok(())
    }
}
