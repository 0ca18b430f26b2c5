use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub auth: AuthConfig,
    pub phonepe: PhonePeConfig,
    pub razorpay: RazorpayConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_secret: String,
    pub token_ttl_hours: i64,
    pub otp_ttl_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhonePeConfig {
    pub base_url: String,
    pub merchant_id: String,
    pub salt_key: String,
    pub salt_index: String,
    pub redirect_url: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayConfig {
    pub api_base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub default_gateway: String,
    pub gateway_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "file://substore.db".to_string()),

            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")?,
                admin_secret: env::var("ADMIN_SECRET")?,
                token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .unwrap_or(24),
                otp_ttl_secs: env::var("OTP_TTL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
            },

            phonepe: PhonePeConfig {
                base_url: env::var("PHONEPE_BASE_URL")
                    .unwrap_or_else(|_| "https://api.phonepe.com/apis/hermes".to_string()),
                merchant_id: env::var("PHONEPE_MERCHANT_ID")?,
                salt_key: env::var("PHONEPE_SALT_KEY")?,
                salt_index: env::var("PHONEPE_SALT_INDEX")
                    .unwrap_or_else(|_| "1".to_string()),
                redirect_url: env::var("PHONEPE_REDIRECT_URL")?,
                callback_url: env::var("PHONEPE_CALLBACK_URL")?,
            },

            razorpay: RazorpayConfig {
                api_base_url: env::var("RAZORPAY_API_BASE_URL")
                    .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
                key_id: env::var("RAZORPAY_KEY_ID")?,
                key_secret: env::var("RAZORPAY_KEY_SECRET")?,
                webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET")?,
            },

            app: AppConfig {
                default_gateway: env::var("DEFAULT_GATEWAY")
                    .unwrap_or_else(|_| "phonepe".to_string()),
                gateway_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .unwrap_or(15),
            },
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_gateway: "phonepe".to_string(),
            gateway_timeout_secs: 15,
        }
    }
}
