use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Error taxonomy for the HTTP surface. Every variant maps to a status code
/// and a JSON body in the `ApiResponse` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0} is out of stock")]
    OutOfStock(String),

    #[error("invalid signature")]
    SignatureInvalid,

    #[error("payment gateway unavailable")]
    GatewayUnavailable,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::OutOfStock(_) => StatusCode::CONFLICT,
            ApiError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            ApiError::GatewayUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(err) = self {
            log::error!("internal error: {:#}", err);
        }
        HttpResponse::build(self.status_code())
            .json(crate::models::common::ApiResponse::<()>::error(self.to_string()))
    }
}

/// Outcomes of OTP verification and issuance. `Mismatch` and `Expired` are
/// distinct so the client can decide between re-entering and resending.
#[derive(Debug, Error, PartialEq)]
pub enum OtpError {
    #[error("no code has been issued for this number")]
    NotFound,

    #[error("the code does not match")]
    Mismatch,

    #[error("the code has expired, request a new one")]
    Expired,

    #[error("could not generate a unique code")]
    ExhaustedRetries,

    #[error("otp storage failed: {0}")]
    Storage(String),
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::NotFound | OtpError::Mismatch | OtpError::Expired => {
                ApiError::Auth(err.to_string())
            }
            OtpError::ExhaustedRetries | OtpError::Storage(_) => {
                ApiError::Internal(anyhow::anyhow!(err.to_string()))
            }
        }
    }
}

/// Errors surfaced by the payment gateway bindings. An HTTP-level failure is
/// `Unavailable` and never a payment verdict.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Unavailable(String),

    #[error("invalid signature")]
    SignatureInvalid,

    #[error("malformed gateway payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Unavailable(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(detail) => {
                log::warn!("gateway unavailable: {}", detail);
                ApiError::GatewayUnavailable
            }
            GatewayError::SignatureInvalid => ApiError::SignatureInvalid,
            GatewayError::Malformed(detail) => ApiError::Validation(detail),
        }
    }
}
