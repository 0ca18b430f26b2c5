use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::AccountType;

lazy_static! {
    pub static ref PHONE_RE: Regex = Regex::new(r"^[6-9]\d{9}$").unwrap();
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub is_phone_verified: bool,
    pub is_email_verified: bool,
    pub account_type: AccountType,
    pub subscriptions: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(regex(path = "PHONE_RE", message = "Invalid phone number"))]
    pub phone: String,

    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(regex(path = "PHONE_RE", message = "Invalid phone number"))]
    pub phone: String,

    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub otp: String,
}

/// Admin signup/login carry the shared admin secret in addition to the OTP.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminSignupRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(regex(path = "PHONE_RE", message = "Invalid phone number"))]
    pub phone: String,

    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub otp: String,

    pub admin_secret: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(regex(path = "PHONE_RE", message = "Invalid phone number"))]
    pub phone: String,

    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub otp: String,

    pub admin_secret: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

impl User {
    pub fn new(name: String, email: String, phone: String, account_type: AccountType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email: email.to_lowercase(),
            phone,
            // Signup only completes after the phone OTP has been consumed.
            is_phone_verified: true,
            is_email_verified: false,
            account_type,
            subscriptions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }
}
