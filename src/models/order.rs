use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::common::GatewayKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

/// Immutable copy of a cart line taken at checkout time. Prices are frozen
/// here so later catalog edits cannot change what the user agreed to pay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub plan_id: Uuid,
    pub plan_name: String,
    pub duration_label: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub merchant_transaction_id: String,
    pub gateway: GatewayKind,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where the client goes next after checkout. The checksum provider hands
/// back a hosted-page URL; the order provider hands back an order the
/// client-side SDK opens itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RedirectTarget {
    Url {
        url: String,
    },
    RazorpayOrder {
        order_id: String,
        key_id: String,
        amount_paise: u64,
        currency: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub gateway: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub payment_id: Uuid,
    pub merchant_transaction_id: String,
    pub amount: Decimal,
    pub redirect: RedirectTarget,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub payment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PaymentDetailsResponse {
    pub payment: Payment,
    pub order: Order,
}

impl Order {
    pub fn new(user_id: Uuid, items: Vec<OrderItem>, total_amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            items,
            total_amount,
            start_date: now,
            end_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The plan line the subscription window is derived from. The current
    /// flow creates one order per checkout with the cart's lines; the first
    /// line carries the subscription the order exists for.
    pub fn primary_item(&self) -> Option<&OrderItem> {
        self.items.first()
    }
}

impl Payment {
    pub fn new(order_id: Uuid, user_id: Uuid, amount: Decimal, gateway: GatewayKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            user_id,
            merchant_transaction_id: format!("TXN_{}", Uuid::new_v4().simple()),
            gateway,
            gateway_order_id: None,
            gateway_payment_id: None,
            amount,
            status: PaymentStatus::Pending,
            failure_reason: None,
            payment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self.status, PaymentStatus::Success | PaymentStatus::Failed)
    }

    /// Amount in minor currency units (paise) as the gateways expect it.
    pub fn amount_paise(&self) -> u64 {
        use rust_decimal::prelude::ToPrimitive;
        (self.amount * Decimal::from(100)).to_u64().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_starts_pending() {
        let payment = Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Decimal::new(199_00, 2),
            GatewayKind::PhonePe,
        );
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(!payment.is_final());
        assert!(payment.merchant_transaction_id.starts_with("TXN_"));
    }

    #[test]
    fn test_amount_paise_conversion() {
        let payment = Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Decimal::new(199_00, 2),
            GatewayKind::Razorpay,
        );
        assert_eq!(payment.amount_paise(), 19900);
    }
}
