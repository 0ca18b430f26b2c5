use actix_web::web::{Bytes, Data, Json, Path};
use actix_web::{get, post, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::common::ApiResponse;
use crate::models::order::{CheckoutRequest, PaymentDetailsResponse, VerifyPaymentRequest};
use crate::services::checkout::CheckoutService;
use crate::services::database::DatabaseService;
use crate::services::token::AuthedUser;

const RAZORPAY_SIGNATURE_HEADER: &str = "x-razorpay-signature";

// POST /payments/checkout
#[post("/checkout")]
pub async fn checkout(
    user: AuthedUser,
    service: Data<CheckoutService>,
    payload: Json<CheckoutRequest>,
) -> Result<HttpResponse, ApiError> {
    let response = service
        .checkout(user.user_id, payload.into_inner().gateway)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(response)))
}

// POST /payments/webhook/razorpay
//
// Raw body in, because the signature covers the exact bytes on the wire.
#[post("/webhook/razorpay")]
pub async fn razorpay_webhook(
    req: HttpRequest,
    body: Bytes,
    service: Data<CheckoutService>,
) -> Result<HttpResponse, ApiError> {
    let signature = req
        .headers()
        .get(RAZORPAY_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Validation("Missing signature header".to_string()))?;

    let payment = service.handle_webhook(&body, signature).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        payment.id,
        "Webhook processed".to_string(),
    )))
}

// POST /payments/verify (manual re-verification for redirect-flow gateways)
#[post("/verify")]
pub async fn verify_payment(
    user: AuthedUser,
    db: Data<DatabaseService>,
    service: Data<CheckoutService>,
    payload: Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, ApiError> {
    let payment = service
        .verify_manual(user.user_id, payload.payment_id)
        .await?;

    let order = db
        .get_order(&payment.order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {}", payment.order_id)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(PaymentDetailsResponse {
        payment,
        order,
    })))
}

// GET /payments
#[get("")]
pub async fn list_payments(
    user: AuthedUser,
    db: Data<DatabaseService>,
) -> Result<HttpResponse, ApiError> {
    let payments = db.list_payments_by_user(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(payments)))
}

// GET /payments/{payment_id}
#[get("/{payment_id}")]
pub async fn payment_details(
    user: AuthedUser,
    db: Data<DatabaseService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let payment_id = path.into_inner();
    let payment = db
        .get_payment(&payment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Payment {}", payment_id)))?;

    if payment.user_id != user.user_id && user.require_admin().is_err() {
        return Err(ApiError::Forbidden(
            "Payment belongs to another user".to_string(),
        ));
    }

    let order = db
        .get_order(&payment.order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {}", payment.order_id)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(PaymentDetailsResponse {
        payment,
        order,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, PhonePeConfig, RazorpayConfig};
    use crate::models::common::{AccountType, GatewayKind};
    use crate::models::user::User;
    use crate::services::gateway::GatewayRegistry;
    use crate::services::notify::NotificationService;
    use crate::services::phonepe::PhonePeGateway;
    use crate::services::razorpay::RazorpayGateway;
    use crate::services::signature;
    use crate::services::token::TokenService;
    use actix_web::{test, web, App};

    fn registry() -> GatewayRegistry {
        GatewayRegistry::new(
            PhonePeGateway::new(
                PhonePeConfig {
                    base_url: "http://127.0.0.1:1".to_string(),
                    merchant_id: "M1".to_string(),
                    salt_key: "salt".to_string(),
                    salt_index: "1".to_string(),
                    redirect_url: "http://127.0.0.1:1/r".to_string(),
                    callback_url: "http://127.0.0.1:1/c".to_string(),
                },
                1,
            )
            .unwrap(),
            RazorpayGateway::new(
                RazorpayConfig {
                    api_base_url: "http://127.0.0.1:1".to_string(),
                    key_id: "rzp_test".to_string(),
                    key_secret: "secret".to_string(),
                    webhook_secret: "webhook_secret".to_string(),
                },
                1,
            )
            .unwrap(),
        )
    }

    #[actix_web::test]
    async fn test_webhook_rejects_bad_signature() {
        let db = DatabaseService::new("memory://").await.unwrap();
        let service = CheckoutService::new(
            db.clone(),
            registry(),
            NotificationService::new(),
            GatewayKind::PhonePe,
        );

        let app = test::init_service(
            App::new()
                .app_data(Data::new(db.clone()))
                .app_data(Data::new(service.clone()))
                .service(web::scope("/payments").service(razorpay_webhook)),
        )
        .await;

        let body = serde_json::json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "id": "pay_1", "status": "captured", "order_id": "order_1"
            }}}
        })
        .to_string();

        // Missing header entirely.
        let req = test::TestRequest::post()
            .uri("/payments/webhook/razorpay")
            .set_payload(body.clone())
            .insert_header(("content-type", "application/json"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

        // Forged signature.
        let req = test::TestRequest::post()
            .uri("/payments/webhook/razorpay")
            .set_payload(body)
            .insert_header(("content-type", "application/json"))
            .insert_header((RAZORPAY_SIGNATURE_HEADER, "deadbeef"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_payment_details_requires_owner() {
        let db = DatabaseService::new("memory://").await.unwrap();
        let auth = AuthConfig {
            jwt_secret: "test-jwt-secret".to_string(),
            admin_secret: "admin".to_string(),
            token_ttl_hours: 24,
            otp_ttl_secs: 300,
        };
        let tokens = TokenService::new(&auth);

        let owner = User::new(
            "Owner".to_string(),
            "owner@example.com".to_string(),
            "9876543210".to_string(),
            AccountType::User,
        );
        let other = User::new(
            "Other".to_string(),
            "other@example.com".to_string(),
            "9876543211".to_string(),
            AccountType::User,
        );
        db.create_user(&owner).await.unwrap();
        db.create_user(&other).await.unwrap();

        let order = crate::models::order::Order::new(
            owner.id,
            Vec::new(),
            rust_decimal::Decimal::new(199_00, 2),
        );
        db.create_order(&order).await.unwrap();
        let payment = crate::models::order::Payment::new(
            order.id,
            owner.id,
            order.total_amount,
            GatewayKind::PhonePe,
        );
        db.create_payment(&payment).await.unwrap();

        let app = test::init_service(
            App::new()
                .app_data(Data::new(db.clone()))
                .app_data(Data::new(tokens.clone()))
                .service(web::scope("/payments").service(payment_details)),
        )
        .await;

        let owner_token = tokens.issue(&owner).unwrap();
        let req = test::TestRequest::get()
            .uri(&format!("/payments/{}", payment.id))
            .insert_header(("Authorization", format!("Bearer {}", owner_token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let other_token = tokens.issue(&other).unwrap();
        let req = test::TestRequest::get()
            .uri(&format!("/payments/{}", payment.id))
            .insert_header(("Authorization", format!("Bearer {}", other_token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);

        // No token at all.
        let req = test::TestRequest::get()
            .uri(&format!("/payments/{}", payment.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }

    #[core::prelude::v1::test]
    fn test_signature_helper_matches_header_contract() {
        // The webhook handler passes the exact raw bytes to the verifier.
        let body = br#"{"event":"payment.captured"}"#;
        let sig = signature::hmac_sign("webhook_secret", body);
        assert!(signature::hmac_verify("webhook_secret", body, &sig));
    }
}
