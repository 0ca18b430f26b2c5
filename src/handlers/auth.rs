use actix_web::web::{Data, Json};
use actix_web::{post, HttpResponse};
use validator::Validate;

use crate::config::Config;
use crate::errors::ApiError;
use crate::models::common::{AccountType, ApiResponse};
use crate::models::otp::{OtpPurpose, SendOtpRequest, SendOtpResponse};
use crate::models::user::{
    AdminLoginRequest, AdminSignupRequest, AuthResponse, LoginRequest, SignupRequest, User,
};
use crate::services::database::DatabaseService;
use crate::services::otp::OtpService;
use crate::services::token::TokenService;

// POST /auth/otp/send
#[post("/otp/send")]
pub async fn send_otp(
    db: Data<DatabaseService>,
    otps: Data<OtpService>,
    payload: Json<SendOtpRequest>,
) -> Result<HttpResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let purpose = OtpPurpose::parse(&payload.purpose)
        .ok_or_else(|| ApiError::Validation(format!("Unknown purpose '{}'", payload.purpose)))?;

    let existing = db.get_user_by_phone(&payload.phone).await?;
    match purpose {
        OtpPurpose::Signup | OtpPurpose::AdminSignup => {
            if existing.is_some() {
                return Err(ApiError::Validation(
                    "Phone number is already registered".to_string(),
                ));
            }
        }
        OtpPurpose::Login | OtpPurpose::AdminLogin => {
            if existing.is_none() {
                return Err(ApiError::NotFound(
                    "No account for this phone number".to_string(),
                ));
            }
        }
    }

    // The code travels only through the notification channel.
    otps.issue(&payload.phone, purpose).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(SendOtpResponse {
        subject: payload.phone.clone(),
        purpose,
        expires_in_secs: otps.ttl_secs(),
    })))
}

// POST /auth/signup
#[post("/signup")]
pub async fn signup(
    db: Data<DatabaseService>,
    otps: Data<OtpService>,
    tokens: Data<TokenService>,
    payload: Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if db.get_user_by_phone(&payload.phone).await?.is_some() {
        return Err(ApiError::Validation(
            "Phone number is already registered".to_string(),
        ));
    }

    otps.verify(&payload.phone, OtpPurpose::Signup, &payload.otp)
        .await?;

    let payload = payload.into_inner();
    let user = db
        .create_user(&User::new(
            payload.name,
            payload.email,
            payload.phone,
            AccountType::User,
        ))
        .await?;

    let token = tokens.issue(&user)?;
    Ok(HttpResponse::Created().json(ApiResponse::success(AuthResponse { token, user })))
}

// POST /auth/login
#[post("/login")]
pub async fn login(
    db: Data<DatabaseService>,
    otps: Data<OtpService>,
    tokens: Data<TokenService>,
    payload: Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    otps.verify(&payload.phone, OtpPurpose::Login, &payload.otp)
        .await?;

    let user = db
        .get_user_by_phone(&payload.phone)
        .await?
        .ok_or_else(|| ApiError::NotFound("No account for this phone number".to_string()))?;

    let token = tokens.issue(&user)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(AuthResponse { token, user })))
}

// POST /auth/admin/signup
#[post("/admin/signup")]
pub async fn admin_signup(
    db: Data<DatabaseService>,
    otps: Data<OtpService>,
    tokens: Data<TokenService>,
    config: Data<Config>,
    payload: Json<AdminSignupRequest>,
) -> Result<HttpResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    // Account promotion is gated by the shared admin secret.
    if payload.admin_secret != config.auth.admin_secret {
        return Err(ApiError::Forbidden("Invalid admin secret".to_string()));
    }

    if db.get_user_by_phone(&payload.phone).await?.is_some() {
        return Err(ApiError::Validation(
            "Phone number is already registered".to_string(),
        ));
    }

    otps.verify(&payload.phone, OtpPurpose::AdminSignup, &payload.otp)
        .await?;

    let payload = payload.into_inner();
    let user = db
        .create_user(&User::new(
            payload.name,
            payload.email,
            payload.phone,
            AccountType::Admin,
        ))
        .await?;

    let token = tokens.issue(&user)?;
    Ok(HttpResponse::Created().json(ApiResponse::success(AuthResponse { token, user })))
}

// POST /auth/admin/login
#[post("/admin/login")]
pub async fn admin_login(
    db: Data<DatabaseService>,
    otps: Data<OtpService>,
    tokens: Data<TokenService>,
    config: Data<Config>,
    payload: Json<AdminLoginRequest>,
) -> Result<HttpResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if payload.admin_secret != config.auth.admin_secret {
        return Err(ApiError::Forbidden("Invalid admin secret".to_string()));
    }

    otps.verify(&payload.phone, OtpPurpose::AdminLogin, &payload.otp)
        .await?;

    let user = db
        .get_user_by_phone(&payload.phone)
        .await?
        .ok_or_else(|| ApiError::NotFound("No account for this phone number".to_string()))?;

    if !user.is_admin() {
        return Err(ApiError::Forbidden(
            "This account has no admin access".to_string(),
        ));
    }

    let token = tokens.issue(&user)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(AuthResponse { token, user })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, AuthConfig, PhonePeConfig, RazorpayConfig};
    use crate::services::notify::NotificationService;
    use actix_web::{test, web, App};

    fn test_config() -> Config {
        Config {
            database_url: "memory://".to_string(),
            auth: AuthConfig {
                jwt_secret: "test-jwt-secret".to_string(),
                admin_secret: "test-admin-secret".to_string(),
                token_ttl_hours: 24,
                otp_ttl_secs: 300,
            },
            phonepe: PhonePeConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                merchant_id: "M1".to_string(),
                salt_key: "salt".to_string(),
                salt_index: "1".to_string(),
                redirect_url: "http://127.0.0.1:1/r".to_string(),
                callback_url: "http://127.0.0.1:1/c".to_string(),
            },
            razorpay: RazorpayConfig {
                api_base_url: "http://127.0.0.1:1".to_string(),
                key_id: "rzp_test".to_string(),
                key_secret: "secret".to_string(),
                webhook_secret: "webhook".to_string(),
            },
            app: AppConfig::default(),
        }
    }

    #[actix_web::test]
    async fn test_signup_flow_end_to_end() {
        let config = test_config();
        let db = DatabaseService::new("memory://").await.unwrap();
        let otps = OtpService::new(db.clone(), NotificationService::new(), 300);
        let tokens = TokenService::new(&config.auth);

        let app = test::init_service(
            App::new()
                .app_data(Data::new(db.clone()))
                .app_data(Data::new(otps.clone()))
                .app_data(Data::new(tokens.clone()))
                .app_data(Data::new(config.clone()))
                .service(
                    web::scope("/auth")
                        .service(send_otp)
                        .service(signup)
                        .service(login)
                        .service(admin_signup),
                ),
        )
        .await;

        // Request a signup OTP.
        let req = test::TestRequest::post()
            .uri("/auth/otp/send")
            .set_json(serde_json::json!({ "phone": "9876543210", "purpose": "signup" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        // The code is delivered out of band; fetch it the way the SMS
        // channel would have received it.
        let code = db
            .latest_otp("9876543210", OtpPurpose::Signup)
            .await
            .unwrap()
            .unwrap()
            .code;

        let req = test::TestRequest::post()
            .uri("/auth/signup")
            .set_json(serde_json::json!({
                "name": "Asha Rao",
                "email": "asha@example.com",
                "phone": "9876543210",
                "otp": code
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert!(body["data"]["token"].as_str().unwrap().len() > 20);
        assert_eq!(body["data"]["user"]["is_phone_verified"], true);
        assert_eq!(body["data"]["user"]["phone"], "9876543210");

        // The OTP was single-use: replaying the signup fails.
        let req = test::TestRequest::post()
            .uri("/auth/signup")
            .set_json(serde_json::json!({
                "name": "Asha Rao",
                "email": "asha2@example.com",
                "phone": "9876543210",
                "otp": "000000"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_client_error());
    }

    #[actix_web::test]
    async fn test_login_otp_requires_existing_account() {
        let config = test_config();
        let db = DatabaseService::new("memory://").await.unwrap();
        let otps = OtpService::new(db.clone(), NotificationService::new(), 300);
        let tokens = TokenService::new(&config.auth);

        let app = test::init_service(
            App::new()
                .app_data(Data::new(db.clone()))
                .app_data(Data::new(otps.clone()))
                .app_data(Data::new(tokens.clone()))
                .service(web::scope("/auth").service(send_otp)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/otp/send")
            .set_json(serde_json::json!({ "phone": "9876543210", "purpose": "login" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_admin_signup_rejects_wrong_secret() {
        let config = test_config();
        let db = DatabaseService::new("memory://").await.unwrap();
        let otps = OtpService::new(db.clone(), NotificationService::new(), 300);
        let tokens = TokenService::new(&config.auth);

        let app = test::init_service(
            App::new()
                .app_data(Data::new(db.clone()))
                .app_data(Data::new(otps.clone()))
                .app_data(Data::new(tokens.clone()))
                .app_data(Data::new(config.clone()))
                .service(web::scope("/auth").service(admin_signup)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/admin/signup")
            .set_json(serde_json::json!({
                "name": "Root",
                "email": "root@example.com",
                "phone": "9876543211",
                "otp": "123456",
                "admin_secret": "wrong"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);
    }
}
