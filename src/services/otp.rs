use chrono::{Duration, Utc};
use rand::Rng;

use crate::errors::OtpError;
use crate::models::otp::{OneTimeCode, OtpPurpose, OTP_LENGTH};
use crate::services::database::DatabaseService;
use crate::services::notify::NotificationService;

const MAX_GENERATION_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct OtpService {
    db: DatabaseService,
    notifier: NotificationService,
    ttl_secs: i64,
}

impl OtpService {
    pub fn new(db: DatabaseService, notifier: NotificationService, ttl_secs: i64) -> Self {
        Self {
            db,
            notifier,
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a fresh code for the subject, invalidating any code issued
    /// before it. The code itself never reaches the logs.
    pub async fn issue(&self, subject: &str, purpose: OtpPurpose) -> Result<String, OtpError> {
        let code = self.generate_unique_code().await?;
        let otp = OneTimeCode::new(subject.to_string(), code, purpose);

        self.db
            .replace_otp(&otp)
            .await
            .map_err(|e| OtpError::Storage(e.to_string()))?;

        log::info!("otp issued subject={} purpose={}", subject, purpose);

        self.notifier.send(
            subject,
            "Your verification code",
            &format!(
                "Your one-time code is {}. It expires in {} minutes.",
                otp.code,
                self.ttl_secs / 60
            ),
        );

        Ok(otp.code)
    }

    /// A generated code must not collide with any live code for any subject.
    async fn generate_unique_code(&self) -> Result<String, OtpError> {
        let cutoff = Utc::now() - Duration::seconds(self.ttl_secs);
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let code = generate_code();
            let exists = self
                .db
                .live_code_exists(&code, cutoff)
                .await
                .map_err(|e| OtpError::Storage(e.to_string()))?;
            if !exists {
                return Ok(code);
            }
        }
        Err(OtpError::ExhaustedRetries)
    }

    /// Single-use verification against the most recent code for the subject.
    /// Expired records are deleted as soon as they are observed.
    pub async fn verify(
        &self,
        subject: &str,
        purpose: OtpPurpose,
        submitted: &str,
    ) -> Result<(), OtpError> {
        let otp = self
            .db
            .latest_otp(subject, purpose)
            .await
            .map_err(|e| OtpError::Storage(e.to_string()))?
            .ok_or(OtpError::NotFound)?;

        if otp.code != submitted {
            return Err(OtpError::Mismatch);
        }

        if otp.is_expired(self.ttl_secs) {
            let _ = self.db.delete_otp(&otp.id).await;
            return Err(OtpError::Expired);
        }

        self.db
            .delete_otp(&otp.id)
            .await
            .map_err(|e| OtpError::Storage(e.to_string()))?;

        log::info!("otp verified subject={} purpose={}", subject, purpose);
        Ok(())
    }
}

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::otp::OTP_TTL_SECS;

    async fn test_service() -> OtpService {
        let db = DatabaseService::new("memory://").await.unwrap();
        OtpService::new(db, NotificationService::new(), OTP_TTL_SECS)
    }

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..20 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_issue_then_verify_is_single_use() {
        let service = test_service().await;

        let code = service.issue("9876543210", OtpPurpose::Signup).await.unwrap();
        assert!(service.verify("9876543210", OtpPurpose::Signup, &code).await.is_ok());

        // Consumed on success.
        assert_eq!(
            service.verify("9876543210", OtpPurpose::Signup, &code).await,
            Err(OtpError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_code() {
        let service = test_service().await;

        let old = service.issue("9876543210", OtpPurpose::Login).await.unwrap();
        let new = service.issue("9876543210", OtpPurpose::Login).await.unwrap();

        // The old record was deleted at reissue time; only the new code passes.
        assert!(service.verify("9876543210", OtpPurpose::Login, &old).await.is_err());
        assert!(service.verify("9876543210", OtpPurpose::Login, &new).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_code_is_mismatch() {
        let service = test_service().await;

        let code = service.issue("9876543210", OtpPurpose::Login).await.unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        assert_eq!(
            service.verify("9876543210", OtpPurpose::Login, wrong).await,
            Err(OtpError::Mismatch)
        );
        // A mismatch does not consume the live code.
        assert!(service.verify("9876543210", OtpPurpose::Login, &code).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected_and_deleted() {
        let db = DatabaseService::new("memory://").await.unwrap();
        let service = OtpService::new(db.clone(), NotificationService::new(), OTP_TTL_SECS);

        // Plant a code created beyond the TTL window.
        let mut otp = OneTimeCode::new(
            "9876543210".to_string(),
            "123456".to_string(),
            OtpPurpose::Login,
        );
        otp.created_at = Utc::now() - Duration::seconds(OTP_TTL_SECS + 10);
        db.replace_otp(&otp).await.unwrap();

        assert_eq!(
            service.verify("9876543210", OtpPurpose::Login, "123456").await,
            Err(OtpError::Expired)
        );
        // The stale record is gone, so a retry reports NotFound.
        assert_eq!(
            service.verify("9876543210", OtpPurpose::Login, "123456").await,
            Err(OtpError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_verify_without_issue_is_not_found() {
        let service = test_service().await;
        assert_eq!(
            service.verify("9999999999", OtpPurpose::Login, "123456").await,
            Err(OtpError::NotFound)
        );
    }
}
