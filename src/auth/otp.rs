//! One-time passcodes bound to a (user, provider) link

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, Rng};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::AuthError;
use super::models::{ProviderData, ProviderKind, UserAuth};
use super::store::IdentityStore;
use crate::common::{generate_user_auth_id, safe_email_log};

pub const OTP_TTL_MINUTES: i64 = 10;
pub const MAX_OTP_ATTEMPTS: i64 = 3;

/// Uniform six-digit code, zero padded
pub fn generate_code() -> String {
    format!("{:06}", OsRng.gen_range(0..1_000_000u32))
}

/// Sends a freshly generated code to the person
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(
        &self,
        channel: ProviderKind,
        destination: &str,
        code: &str,
    ) -> Result<(), AuthError>;
}

/// Writes codes to the log. Suitable for development only.
pub struct TracingDelivery;

#[async_trait]
impl OtpDelivery for TracingDelivery {
    async fn deliver(
        &self,
        channel: ProviderKind,
        destination: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        let masked = match channel {
            ProviderKind::EmailOtp => safe_email_log(destination),
            _ => mask_phone(destination),
        };
        info!(channel = %channel, destination = %masked, "OTP issued");
        debug!(channel = %channel, code = %code, "OTP code for development delivery");
        Ok(())
    }
}

fn mask_phone(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 4 {
        return "***".to_string();
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("***{}", tail)
}

#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn IdentityStore>,
    ttl: Duration,
}

impl OtpService {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self {
            store,
            ttl: Duration::minutes(OTP_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Issue a new code for the link, creating the link on first use.
    /// Any earlier code is replaced and the attempt counter reset.
    pub async fn generate(
        &self,
        user_id: &str,
        provider_id: &str,
        email: &str,
    ) -> Result<UserAuth, AuthError> {
        let now = Utc::now();
        let code = generate_code();
        let expires_at = now + self.ttl;

        let link = match self.store.auth_by_user(user_id, provider_id).await? {
            Some(mut link) => {
                link.otp_code = Some(code);
                link.otp_expires_at = Some(expires_at);
                link.otp_attempts = 0;
                link.is_verified = false;
                link.verified_at = None;
                self.store.update_user_auth(&link).await?
            }
            None => {
                let link = UserAuth {
                    id: generate_user_auth_id(),
                    user_id: user_id.to_string(),
                    auth_provider_id: provider_id.to_string(),
                    provider_user_id: None,
                    provider_email: Some(email.to_string()),
                    username: None,
                    provider_data: ProviderData::Empty,
                    is_verified: false,
                    verified_at: None,
                    otp_code: Some(code),
                    otp_expires_at: Some(expires_at),
                    otp_attempts: 0,
                    version: 0,
                    created_at: now,
                    updated_at: now,
                };
                self.store.create_user_auth(&link).await?;
                link
            }
        };

        debug!(user_id = %user_id, link_id = %link.id, "Generated OTP");
        Ok(link)
    }

    /// Check order: expiry, then the attempt budget, then the code itself.
    /// A wrong code still consumes an attempt.
    pub async fn verify(
        &self,
        user_id: &str,
        provider_id: &str,
        code: &str,
    ) -> Result<UserAuth, AuthError> {
        let mut link = self
            .store
            .auth_by_user(user_id, provider_id)
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        let now = Utc::now();
        if link.otp_expires_at.map_or(false, |expires| now > expires) {
            return Err(AuthError::OtpExpired);
        }

        if link.otp_attempts >= MAX_OTP_ATTEMPTS {
            warn!(user_id = %user_id, link_id = %link.id, "OTP verification locked");
            return Err(AuthError::TooManyAttempts);
        }

        link.otp_attempts += 1;

        if link.otp_code.as_deref() != Some(code) {
            self.store.update_user_auth(&link).await?;
            debug!(
                user_id = %user_id,
                attempts = link.otp_attempts,
                "OTP mismatch"
            );
            return Err(AuthError::InvalidOtp);
        }

        link.is_verified = true;
        link.verified_at = Some(now);
        link.otp_code = None;
        link.otp_expires_at = None;
        let link = self.store.update_user_auth(&link).await?;

        info!(user_id = %user_id, link_id = %link.id, "OTP verified");
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::linker::{IdentityAssertion, ProfileFields};
    use crate::auth::test_support::{fixture, Fixture};
    use std::collections::HashSet;

    /// Registered user plus the email_otp provider id
    async fn setup() -> (Fixture, OtpService, String, String) {
        let f = fixture().await;
        let linked = f
            .linker
            .create_account(IdentityAssertion {
                provider: ProviderKind::Local,
                external_id: None,
                email: "otp@example.com".to_string(),
                username: Some("otp-user".to_string()),
                profile: ProfileFields::default(),
                provider_data: ProviderData::Empty,
            })
            .await
            .unwrap();
        let provider = f.providers.get(ProviderKind::EmailOtp).await.unwrap();
        let service = OtpService::new(f.store.clone());
        (f, service, linked.user.id, provider.id)
    }

    fn wrong_code(code: &str) -> String {
        if code == "000000" {
            "000001".to_string()
        } else {
            "000000".to_string()
        }
    }

    #[test]
    fn test_generate_code_shape() {
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            seen.insert(code);
        }
        assert!(seen.len() > 150);
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+91 98765 43210"), "***3210");
        assert_eq!(mask_phone("123"), "***");
    }

    #[tokio::test]
    async fn test_generate_creates_link_then_reuses_it() {
        let (f, otp, user_id, provider_id) = setup().await;

        let first = otp.generate(&user_id, &provider_id, "otp@example.com").await.unwrap();
        assert!(first.otp_code.is_some());
        assert!(!first.is_verified);
        let expires = first.otp_expires_at.unwrap();
        assert!(expires > Utc::now() + Duration::minutes(9));
        assert!(expires <= Utc::now() + Duration::minutes(10));

        let second = otp.generate(&user_id, &provider_id, "otp@example.com").await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.otp_attempts, 0);
        assert_eq!(f.store.link_count(), 2);
    }

    #[tokio::test]
    async fn test_verify_correct_code() {
        let (_f, otp, user_id, provider_id) = setup().await;
        let issued = otp.generate(&user_id, &provider_id, "otp@example.com").await.unwrap();
        let code = issued.otp_code.unwrap();

        let verified = otp.verify(&user_id, &provider_id, &code).await.unwrap();
        assert!(verified.is_verified);
        assert!(verified.verified_at.is_some());
        assert!(verified.otp_code.is_none());
        assert_eq!(verified.otp_attempts, 1);

        assert!(matches!(
            otp.verify(&user_id, &provider_id, &code).await,
            Err(AuthError::InvalidOtp)
        ));
    }

    #[tokio::test]
    async fn test_three_wrong_codes_lock_even_the_right_one() {
        let (_f, otp, user_id, provider_id) = setup().await;
        let issued = otp.generate(&user_id, &provider_id, "otp@example.com").await.unwrap();
        let code = issued.otp_code.unwrap();
        let wrong = wrong_code(&code);

        for _ in 0..3 {
            assert!(matches!(
                otp.verify(&user_id, &provider_id, &wrong).await,
                Err(AuthError::InvalidOtp)
            ));
        }

        assert!(matches!(
            otp.verify(&user_id, &provider_id, &code).await,
            Err(AuthError::TooManyAttempts)
        ));
    }

    #[tokio::test]
    async fn test_regenerate_resets_attempts() {
        let (_f, otp, user_id, provider_id) = setup().await;
        let issued = otp.generate(&user_id, &provider_id, "otp@example.com").await.unwrap();
        let wrong = wrong_code(issued.otp_code.as_deref().unwrap());
        for _ in 0..3 {
            let _ = otp.verify(&user_id, &provider_id, &wrong).await;
        }

        let fresh = otp.generate(&user_id, &provider_id, "otp@example.com").await.unwrap();
        let verified = otp
            .verify(&user_id, &provider_id, fresh.otp_code.as_deref().unwrap())
            .await
            .unwrap();
        assert!(verified.is_verified);
    }

    #[tokio::test]
    async fn test_regenerate_after_verify_clears_verification() {
        let (_f, otp, user_id, provider_id) = setup().await;
        let issued = otp.generate(&user_id, &provider_id, "otp@example.com").await.unwrap();
        otp.verify(&user_id, &provider_id, issued.otp_code.as_deref().unwrap())
            .await
            .unwrap();

        let fresh = otp.generate(&user_id, &provider_id, "otp@example.com").await.unwrap();
        assert!(!fresh.is_verified);
        assert!(fresh.verified_at.is_none());
        assert_eq!(fresh.otp_attempts, 0);
        assert!(fresh.otp_code.is_some());
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected_before_comparison() {
        let (_f, otp, user_id, provider_id) = setup().await;
        let otp = otp.with_ttl(Duration::seconds(-1));
        let issued = otp.generate(&user_id, &provider_id, "otp@example.com").await.unwrap();

        assert!(matches!(
            otp.verify(&user_id, &provider_id, issued.otp_code.as_deref().unwrap())
                .await,
            Err(AuthError::OtpExpired)
        ));
    }

    #[tokio::test]
    async fn test_verify_without_link_is_invalid() {
        let (_f, otp, user_id, provider_id) = setup().await;
        assert!(matches!(
            otp.verify(&user_id, &provider_id, "123456").await,
            Err(AuthError::InvalidOtp)
        ));
    }

    #[tokio::test]
    async fn test_tracing_delivery_succeeds() {
        TracingDelivery
            .deliver(ProviderKind::MobileOtp, "+1 555 0100", "123456")
            .await
            .unwrap();
    }
}
