use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::errors::ApiError;
use crate::models::common::AccountType;
use crate::models::user::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub account_type: AccountType,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl_hours: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            ttl_hours: config.token_ttl_hours,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            account_type: user.account_type,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.ttl_hours)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("token encoding failed: {}", e)))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::Auth("Session expired, please log in again".to_string())
            }
            _ => ApiError::Auth("Invalid bearer token".to_string()),
        })
    }
}

/// The authenticated caller, extracted from the `Authorization` header.
/// Routes receive a typed result; there is no shared expiry callback.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub user_id: Uuid,
    pub account_type: AccountType,
}

impl AuthedUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.account_type == AccountType::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

impl FromRequest for AuthedUser {
    type Error = ApiError;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        std::future::ready(extract_user(req))
    }
}

fn extract_user(req: &HttpRequest) -> Result<AuthedUser, ApiError> {
    let tokens = req
        .app_data::<web::Data<TokenService>>()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("TokenService not configured")))?;

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Auth("Missing bearer token".to_string()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Auth("Missing bearer token".to_string()))?;

    let claims = tokens.decode(token)?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Auth("Invalid bearer token".to_string()))?;

    Ok(AuthedUser {
        user_id,
        account_type: claims.account_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(ttl_hours: i64) -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-jwt-secret".to_string(),
            admin_secret: "test-admin-secret".to_string(),
            token_ttl_hours: ttl_hours,
            otp_ttl_secs: 300,
        }
    }

    fn test_user(account_type: AccountType) -> User {
        User::new(
            "Asha Rao".to_string(),
            "asha@example.com".to_string(),
            "9876543210".to_string(),
            account_type,
        )
    }

    #[test]
    fn test_issue_decode_round_trip() {
        let service = TokenService::new(&test_config(24));
        let user = test_user(AccountType::Admin);

        let token = service.issue(&user).unwrap();
        let claims = service.decode(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.account_type, AccountType::Admin);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let service = TokenService::new(&test_config(24));
        let other = TokenService::new(&AuthConfig {
            jwt_secret: "other-secret".to_string(),
            ..test_config(24)
        });

        let token = other.issue(&test_user(AccountType::User)).unwrap();
        assert!(service.decode(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = TokenService::new(&test_config(-2));
        let token = service.issue(&test_user(AccountType::User)).unwrap();

        match service.decode(&token) {
            Err(ApiError::Auth(message)) => assert!(message.contains("expired")),
            other => panic!("expected expired-session error, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn test_require_admin() {
        let admin = AuthedUser {
            user_id: Uuid::new_v4(),
            account_type: AccountType::Admin,
        };
        assert!(admin.require_admin().is_ok());

        let user = AuthedUser {
            user_id: Uuid::new_v4(),
            account_type: AccountType::User,
        };
        assert!(user.require_admin().is_err());
    }
}
