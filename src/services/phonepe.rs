use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::PhonePeConfig;
use crate::errors::GatewayError;
use crate::models::common::GatewayKind;
use crate::models::order::{Payment, RedirectTarget};
use crate::services::gateway::{InitiateOutcome, PaymentGateway, PaymentOutcome};
use crate::services::signature;

const PAY_ENDPOINT: &str = "/pg/v1/pay";
const STATUS_ENDPOINT: &str = "/pg/v1/status";

/// Checksum/redirect provider. The charge happens on the provider's hosted
/// page; settlement is confirmed by polling the status endpoint with a
/// checksum computed over the endpoint path alone.
#[derive(Clone)]
pub struct PhonePeGateway {
    client: Client,
    config: PhonePeConfig,
}

impl PhonePeGateway {
    pub fn new(config: PhonePeConfig, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn pay_payload(&self, payment: &Payment) -> Value {
        json!({
            "merchantId": self.config.merchant_id,
            "merchantTransactionId": payment.merchant_transaction_id,
            "merchantUserId": payment.user_id,
            "amount": payment.amount_paise(),
            "redirectUrl": format!(
                "{}?txn={}",
                self.config.redirect_url, payment.merchant_transaction_id
            ),
            "redirectMode": "REDIRECT",
            "callbackUrl": self.config.callback_url,
            "paymentInstrument": { "type": "PAY_PAGE" }
        })
    }

    fn outcome_from_status(response: &Value) -> PaymentOutcome {
        let code = response.get("code").and_then(|c| c.as_str()).unwrap_or("");
        match code {
            "PAYMENT_SUCCESS" => PaymentOutcome::Success {
                gateway_payment_id: response
                    .pointer("/data/transactionId")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            },
            "PAYMENT_ERROR" | "PAYMENT_DECLINED" | "TIMED_OUT" => PaymentOutcome::Failed {
                reason: code.to_string(),
            },
            // PAYMENT_PENDING and anything unrecognized: no verdict yet.
            _ => PaymentOutcome::Pending,
        }
    }
}

#[async_trait]
impl PaymentGateway for PhonePeGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::PhonePe
    }

    async fn initiate(&self, payment: &Payment) -> Result<InitiateOutcome, GatewayError> {
        let encoded = signature::encode_payload(&self.pay_payload(payment));
        let checksum = signature::checksum_sign(
            &encoded,
            PAY_ENDPOINT,
            &self.config.salt_key,
            &self.config.salt_index,
        );

        log::info!(
            "initiating hosted-page payment ref={}",
            payment.merchant_transaction_id
        );

        let response = self
            .client
            .post(format!("{}{}", self.config.base_url, PAY_ENDPOINT))
            .header("Content-Type", "application/json")
            .header("X-VERIFY", checksum)
            .json(&json!({ "request": encoded }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "pay request returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let redirect_url = body
            .pointer("/data/instrumentResponse/redirectInfo/url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                GatewayError::Malformed("pay response missing redirect url".to_string())
            })?;

        Ok(InitiateOutcome {
            redirect: RedirectTarget::Url {
                url: redirect_url.to_string(),
            },
            gateway_order_id: None,
        })
    }

    async fn check_status(&self, payment: &Payment) -> Result<PaymentOutcome, GatewayError> {
        let path = format!(
            "{}/{}/{}",
            STATUS_ENDPOINT, self.config.merchant_id, payment.merchant_transaction_id
        );
        let checksum =
            signature::checksum_sign("", &path, &self.config.salt_key, &self.config.salt_index);

        let response = self
            .client
            .get(format!("{}{}", self.config.base_url, path))
            .header("Content-Type", "application/json")
            .header("X-VERIFY", checksum)
            .header("X-MERCHANT-ID", &self.config.merchant_id)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "status request returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        log::debug!(
            "status check ref={} code={:?}",
            payment.merchant_transaction_id,
            body.get("code")
        );

        Ok(Self::outcome_from_status(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn test_gateway() -> PhonePeGateway {
        PhonePeGateway::new(
            PhonePeConfig {
                base_url: "https://sandbox.example.com/apis/hermes".to_string(),
                merchant_id: "MERCHANT1".to_string(),
                salt_key: "salt-key".to_string(),
                salt_index: "1".to_string(),
                redirect_url: "https://shop.example.com/payment-result".to_string(),
                callback_url: "https://shop.example.com/api/v1/payments/callback".to_string(),
            },
            5,
        )
        .unwrap()
    }

    fn test_payment() -> Payment {
        Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Decimal::new(199_00, 2),
            GatewayKind::PhonePe,
        )
    }

    #[test]
    fn test_pay_payload_uses_minor_units() {
        let gateway = test_gateway();
        let payment = test_payment();
        let payload = gateway.pay_payload(&payment);

        assert_eq!(payload["amount"], 19900);
        assert_eq!(payload["merchantId"], "MERCHANT1");
        assert_eq!(
            payload["merchantTransactionId"],
            payment.merchant_transaction_id.as_str()
        );
        assert_eq!(payload["paymentInstrument"]["type"], "PAY_PAGE");
    }

    #[test]
    fn test_status_outcome_mapping() {
        let success = serde_json::json!({
            "code": "PAYMENT_SUCCESS",
            "data": { "transactionId": "T1234" }
        });
        assert_eq!(
            PhonePeGateway::outcome_from_status(&success),
            PaymentOutcome::Success {
                gateway_payment_id: Some("T1234".to_string())
            }
        );

        let declined = serde_json::json!({ "code": "PAYMENT_DECLINED" });
        assert_eq!(
            PhonePeGateway::outcome_from_status(&declined),
            PaymentOutcome::Failed {
                reason: "PAYMENT_DECLINED".to_string()
            }
        );

        let pending = serde_json::json!({ "code": "PAYMENT_PENDING" });
        assert_eq!(PhonePeGateway::outcome_from_status(&pending), PaymentOutcome::Pending);

        // An unknown code is never treated as success.
        let unknown = serde_json::json!({ "code": "SOMETHING_NEW" });
        assert_eq!(PhonePeGateway::outcome_from_status(&unknown), PaymentOutcome::Pending);
    }

    #[test]
    fn test_webhook_not_supported() {
        let gateway = test_gateway();
        assert!(gateway.handle_webhook(b"{}", "sig").is_err());
    }
}
