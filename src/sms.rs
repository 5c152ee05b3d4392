use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("sms provider is not configured")]
    NotConfigured,
    #[error("sms provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("sms provider rejected the request: {0}")]
    Rejected(String),
}

/// Phone-number verification provider (send a code, check a code).
#[async_trait]
pub trait SmsVerifier: Send + Sync + 'static {
    async fn start_verification(&self, phone: &str) -> Result<(), SmsError>;

    /// Returns true when the submitted code matches the pending verification.
    async fn check_verification(&self, phone: &str, code: &str) -> Result<bool, SmsError>;
}

/// Twilio Verify v2 client.
pub struct TwilioVerify {
    http: Client,
    account_sid: String,
    auth_token: String,
    service_sid: String,
}

#[derive(Deserialize)]
struct VerificationResponse {
    status: String,
}

impl TwilioVerify {
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let account_sid = config.twilio_account_sid.clone()?;
        let auth_token = config.twilio_auth_token.clone()?;
        let service_sid = config.twilio_verify_service.clone()?;
        Some(Self {
            http: Client::new(),
            account_sid,
            auth_token,
            service_sid,
        })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "https://verify.twilio.com/v2/Services/{}/{resource}",
            self.service_sid
        )
    }
}

#[async_trait]
impl SmsVerifier for TwilioVerify {
    async fn start_verification(&self, phone: &str) -> Result<(), SmsError> {
        let response = self
            .http
            .post(self.endpoint("Verifications"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone), ("Channel", "sms")])
            .send()
            .await?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SmsError::Rejected(detail));
        }
        Ok(())
    }

    async fn check_verification(&self, phone: &str, code: &str) -> Result<bool, SmsError> {
        let response = self
            .http
            .post(self.endpoint("VerificationCheck"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone), ("Code", code)])
            .send()
            .await?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SmsError::Rejected(detail));
        }

        let body: VerificationResponse = response.json().await?;
        Ok(body.status == "approved")
    }
}

/// Placeholder used when no SMS credentials are present; every call fails
/// with `NotConfigured` so the account-verification routes surface a clear
/// error instead of silently passing.
pub struct UnconfiguredSms;

#[async_trait]
impl SmsVerifier for UnconfiguredSms {
    async fn start_verification(&self, _phone: &str) -> Result<(), SmsError> {
        Err(SmsError::NotConfigured)
    }

    async fn check_verification(&self, _phone: &str, _code: &str) -> Result<bool, SmsError> {
        Err(SmsError::NotConfigured)
    }
}
