use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::RazorpayConfig;
use crate::errors::GatewayError;
use crate::models::common::GatewayKind;
use crate::models::order::{Payment, RedirectTarget};
use crate::services::gateway::{InitiateOutcome, PaymentGateway, PaymentOutcome, WebhookEvent};
use crate::services::signature;

/// Order + webhook provider. A remote order is created up front; settlement
/// confirmation arrives as an HMAC-signed webhook over the raw JSON body.
#[derive(Clone)]
pub struct RazorpayGateway {
    client: Client,
    config: RazorpayConfig,
}

#[derive(Debug, Deserialize)]
struct RemoteOrder {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentList {
    #[serde(default)]
    items: Vec<PaymentEntity>,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    status: String,
    order_id: Option<String>,
    error_description: Option<String>,
    notes: Option<WebhookNotes>,
}

#[derive(Debug, Deserialize)]
struct WebhookNotes {
    user_id: Option<String>,
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    event: String,
    payload: WebhookPayload,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    payment: Option<WebhookPaymentEntity>,
}

#[derive(Debug, Deserialize)]
struct WebhookPaymentEntity {
    entity: PaymentEntity,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn outcome_from_entity(entity: &PaymentEntity) -> PaymentOutcome {
        match entity.status.as_str() {
            "captured" => PaymentOutcome::Success {
                gateway_payment_id: Some(entity.id.clone()),
            },
            "failed" => PaymentOutcome::Failed {
                reason: entity
                    .error_description
                    .clone()
                    .unwrap_or_else(|| "payment failed".to_string()),
            },
            // created/authorized/refund states carry no settlement verdict.
            _ => PaymentOutcome::Pending,
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Razorpay
    }

    async fn initiate(&self, payment: &Payment) -> Result<InitiateOutcome, GatewayError> {
        let request = json!({
            "amount": payment.amount_paise(),
            "currency": "INR",
            "receipt": payment.merchant_transaction_id,
            "notes": {
                "user_id": payment.user_id,
                "order_id": payment.order_id,
            }
        });

        log::info!(
            "creating remote order ref={}",
            payment.merchant_transaction_id
        );

        let response = self
            .client
            .post(format!("{}/orders", self.config.api_base_url))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "order creation returned {}",
                response.status()
            )));
        }

        let order: RemoteOrder = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        Ok(InitiateOutcome {
            redirect: RedirectTarget::RazorpayOrder {
                order_id: order.id.clone(),
                key_id: self.config.key_id.clone(),
                amount_paise: payment.amount_paise(),
                currency: "INR".to_string(),
            },
            gateway_order_id: Some(order.id),
        })
    }

    async fn check_status(&self, payment: &Payment) -> Result<PaymentOutcome, GatewayError> {
        let gateway_order_id = payment.gateway_order_id.as_deref().ok_or_else(|| {
            GatewayError::Malformed("payment has no remote order to poll".to_string())
        })?;

        let response = self
            .client
            .get(format!(
                "{}/orders/{}/payments",
                self.config.api_base_url, gateway_order_id
            ))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "payment listing returned {}",
                response.status()
            )));
        }

        let list: PaymentList = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        // A captured attempt settles the order even if earlier attempts failed.
        if let Some(captured) = list.items.iter().find(|p| p.status == "captured") {
            return Ok(Self::outcome_from_entity(captured));
        }
        if let Some(failed) = list.items.iter().find(|p| p.status == "failed") {
            return Ok(Self::outcome_from_entity(failed));
        }
        Ok(PaymentOutcome::Pending)
    }

    /// Verify the HMAC over the raw body before trusting anything in it,
    /// the embedded notes included.
    fn handle_webhook(
        &self,
        raw_body: &[u8],
        header_signature: &str,
    ) -> Result<WebhookEvent, GatewayError> {
        if !signature::hmac_verify(&self.config.webhook_secret, raw_body, header_signature) {
            log::error!(
                "webhook signature verification failed (body {} bytes)",
                raw_body.len()
            );
            return Err(GatewayError::SignatureInvalid);
        }

        let body: WebhookBody = serde_json::from_slice(raw_body)
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        let entity = body
            .payload
            .payment
            .map(|p| p.entity)
            .ok_or_else(|| GatewayError::Malformed("webhook carries no payment entity".to_string()))?;

        let reference = entity.order_id.clone().ok_or_else(|| {
            GatewayError::Malformed("webhook payment has no order reference".to_string())
        })?;

        let outcome = match body.event.as_str() {
            "payment.captured" => PaymentOutcome::Success {
                gateway_payment_id: Some(entity.id.clone()),
            },
            "payment.failed" => PaymentOutcome::Failed {
                reason: entity
                    .error_description
                    .clone()
                    .unwrap_or_else(|| "payment failed".to_string()),
            },
            _ => Self::outcome_from_entity(&entity),
        };

        let (notes_user_id, notes_order_id) = entity
            .notes
            .map(|n| (n.user_id, n.order_id))
            .unwrap_or((None, None));

        Ok(WebhookEvent {
            reference,
            outcome,
            notes_user_id,
            notes_order_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gateway() -> RazorpayGateway {
        RazorpayGateway::new(
            RazorpayConfig {
                api_base_url: "https://api.razorpay.example".to_string(),
                key_id: "rzp_test_123".to_string(),
                key_secret: "key_secret".to_string(),
                webhook_secret: "webhook_secret".to_string(),
            },
            5,
        )
        .unwrap()
    }

    fn captured_body(order_id: &str, our_order: &str) -> Vec<u8> {
        serde_json::json!({
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_123",
                        "status": "captured",
                        "order_id": order_id,
                        "notes": { "user_id": "u-1", "order_id": our_order }
                    }
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_webhook_accepts_valid_signature() {
        let gateway = test_gateway();
        let body = captured_body("order_rzp_1", "11111111-2222-3333-4444-555555555555");
        let sig = signature::hmac_sign("webhook_secret", &body);

        let event = gateway.handle_webhook(&body, &sig).unwrap();
        assert_eq!(event.reference, "order_rzp_1");
        assert_eq!(
            event.outcome,
            PaymentOutcome::Success {
                gateway_payment_id: Some("pay_123".to_string())
            }
        );
        assert_eq!(
            event.notes_order_id.as_deref(),
            Some("11111111-2222-3333-4444-555555555555")
        );
    }

    #[test]
    fn test_webhook_rejects_tampered_body() {
        let gateway = test_gateway();
        let body = captured_body("order_rzp_1", "o-1");
        let sig = signature::hmac_sign("webhook_secret", &body);

        // Same signature, altered amount-bearing payload.
        let tampered = String::from_utf8(body.clone())
            .unwrap()
            .replace("captured", "authorized");
        let err = gateway.handle_webhook(tampered.as_bytes(), &sig).unwrap_err();
        assert!(matches!(err, GatewayError::SignatureInvalid));

        // And a signature from the wrong secret.
        let wrong = signature::hmac_sign("other_secret", &body);
        let err = gateway.handle_webhook(&body, &wrong).unwrap_err();
        assert!(matches!(err, GatewayError::SignatureInvalid));
    }

    #[test]
    fn test_webhook_failed_event() {
        let gateway = test_gateway();
        let body = serde_json::json!({
            "event": "payment.failed",
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_456",
                        "status": "failed",
                        "order_id": "order_rzp_2",
                        "error_description": "card declined"
                    }
                }
            }
        })
        .to_string()
        .into_bytes();
        let sig = signature::hmac_sign("webhook_secret", &body);

        let event = gateway.handle_webhook(&body, &sig).unwrap();
        assert_eq!(
            event.outcome,
            PaymentOutcome::Failed {
                reason: "card declined".to_string()
            }
        );
    }
}
