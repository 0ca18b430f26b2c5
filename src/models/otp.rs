use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const OTP_LENGTH: usize = 6;
pub const OTP_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OtpPurpose {
    Signup,
    Login,
    AdminSignup,
    AdminLogin,
}

impl OtpPurpose {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "signup" => Some(OtpPurpose::Signup),
            "login" => Some(OtpPurpose::Login),
            "admin-signup" => Some(OtpPurpose::AdminSignup),
            "admin-login" => Some(OtpPurpose::AdminLogin),
            _ => None,
        }
    }
}

impl std::fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OtpPurpose::Signup => write!(f, "signup"),
            OtpPurpose::Login => write!(f, "login"),
            OtpPurpose::AdminSignup => write!(f, "admin-signup"),
            OtpPurpose::AdminLogin => write!(f, "admin-login"),
        }
    }
}

/// A short-lived one-time code bound to a phone number and purpose.
/// At most one live code per subject is ever trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneTimeCode {
    pub id: Uuid,
    pub subject: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub created_at: DateTime<Utc>,
}

impl OneTimeCode {
    pub fn new(subject: String, code: String, purpose: OtpPurpose) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject,
            code,
            purpose,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, ttl_secs: i64) -> bool {
        Utc::now() - self.created_at > Duration::seconds(ttl_secs)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(regex(path = "crate::models::user::PHONE_RE", message = "Invalid phone number"))]
    pub phone: String,

    pub purpose: String,
}

#[derive(Debug, Serialize)]
pub struct SendOtpResponse {
    pub subject: String,
    pub purpose: OtpPurpose,
    pub expires_in_secs: i64,
}
