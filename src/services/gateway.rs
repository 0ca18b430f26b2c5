use async_trait::async_trait;

use crate::errors::GatewayError;
use crate::models::common::GatewayKind;
use crate::models::order::{Payment, RedirectTarget};
use crate::services::phonepe::PhonePeGateway;
use crate::services::razorpay::RazorpayGateway;

/// What a provider reports about a payment. `Pending` is the absence of a
/// verdict; only an explicit provider confirmation produces `Success` or
/// `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Success { gateway_payment_id: Option<String> },
    Failed { reason: String },
    Pending,
}

pub struct InitiateOutcome {
    pub redirect: RedirectTarget,
    /// Remote order handle to persist, for providers that create one.
    pub gateway_order_id: Option<String>,
}

/// A verified push notification from a provider. `reference` locates our
/// Payment; the notes are only populated after signature verification.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub reference: String,
    pub outcome: PaymentOutcome,
    pub notes_user_id: Option<String>,
    pub notes_order_id: Option<String>,
}

/// Uniform provider contract. Providers without a push channel keep the
/// default `handle_webhook` and are settled by status polling instead.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn kind(&self) -> GatewayKind;

    async fn initiate(&self, payment: &Payment) -> Result<InitiateOutcome, GatewayError>;

    async fn check_status(&self, payment: &Payment) -> Result<PaymentOutcome, GatewayError>;

    fn handle_webhook(
        &self,
        _raw_body: &[u8],
        _signature: &str,
    ) -> Result<WebhookEvent, GatewayError> {
        Err(GatewayError::Malformed(format!(
            "{} does not deliver webhooks",
            self.kind()
        )))
    }
}

#[derive(Clone)]
pub struct GatewayRegistry {
    phonepe: PhonePeGateway,
    razorpay: RazorpayGateway,
}

impl GatewayRegistry {
    pub fn new(phonepe: PhonePeGateway, razorpay: RazorpayGateway) -> Self {
        Self { phonepe, razorpay }
    }

    pub fn get(&self, kind: GatewayKind) -> &dyn PaymentGateway {
        match kind {
            GatewayKind::PhonePe => &self.phonepe,
            GatewayKind::Razorpay => &self.razorpay,
        }
    }

    pub fn razorpay(&self) -> &RazorpayGateway {
        &self.razorpay
    }
}
