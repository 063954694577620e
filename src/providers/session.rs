//! Session-based provider client.
//!
//! The provider issues a session id on login (optionally guarded by a TOTP
//! code) which authorizes record updates until it expires.

use super::UpdateClient;
use crate::config::Credentials;
use crate::error::{DdnsError, Result};
use crate::target::RecordType;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use totp_rs::{Algorithm, Secret, TOTP};

pub const DEFAULT_API_URL: &str = "https://api.dns-provider.example/v1";

const SESSION_HEADER: &str = "X-Session-Id";
const DEFAULT_SESSION_LIFETIME_SECS: i64 = 1200;
const MAX_SESSION_LIFETIME_SECS: i64 = 86_400;
/// Sessions are renewed this long before the provider would expire them.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Provider client holding at most one live session.
pub struct SessionClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    domain_number: String,
    contract: String,
    session: Option<Session>,
}

#[derive(Debug, Clone)]
struct Session {
    id: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    otp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    session_id: String,
    #[serde(default = "default_session_lifetime")]
    expires_in: i64,
}

fn default_session_lifetime() -> i64 {
    DEFAULT_SESSION_LIFETIME_SECS
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    record_type: RecordType,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Current TOTP code for a base32 seed, or `None` when no seed is configured.
pub fn current_otp(otp_key: &str) -> Result<Option<String>> {
    let otp_key = otp_key.trim();
    if otp_key.is_empty() {
        return Ok(None);
    }

    let secret = Secret::Encoded(otp_key.to_string())
        .to_bytes()
        .map_err(|e| DdnsError::Authentication(format!("Invalid OTP_KEY: {}", e)))?;
    let totp = TOTP::new_unchecked(Algorithm::SHA1, 6, 1, 30, secret);
    let code = totp
        .generate_current()
        .map_err(|e| DdnsError::Authentication(format!("System clock error: {}", e)))?;

    Ok(Some(code))
}

impl SessionClient {
    /// Create a new client. No request is made until the first login.
    pub fn new(
        base_url: String,
        credentials: Credentials,
        domain_number: String,
        contract: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            domain_number,
            contract,
            session: None,
        })
    }

    /// Whether a session exists that is not about to expire.
    pub fn has_valid_session(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.is_valid_at(Utc::now()))
    }

    async fn login(&self) -> Result<Session> {
        tracing::debug!(
            "Logging in to {} as {}",
            self.base_url,
            self.credentials.username
        );

        let request = LoginRequest {
            username: &self.credentials.username,
            password: &self.credentials.password,
            otp: current_otp(&self.credentials.otp_key)?,
        };

        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DdnsError::Authentication(format!(
                "login rejected with HTTP {}",
                status
            )));
        }

        let body: LoginResponse = serde_json::from_str(&response.text().await?)?;
        let lifetime = body.expires_in.clamp(0, MAX_SESSION_LIFETIME_SECS);
        let session = Session {
            id: body.session_id,
            expires_at: Utc::now() + ChronoDuration::seconds(lifetime),
        };

        tracing::info!("Logged in, session valid until {}", session.expires_at);
        Ok(session)
    }

    fn records_url(&self) -> String {
        format!(
            "{}/contracts/{}/domains/{}/records",
            self.base_url, self.contract, self.domain_number
        )
    }
}

#[async_trait]
impl UpdateClient for SessionClient {
    async fn ensure_authenticated(&mut self) -> Result<()> {
        if self.has_valid_session() {
            tracing::debug!("Reusing existing session");
            return Ok(());
        }

        self.session = None;
        let session = self.login().await?;
        self.session = Some(session);
        Ok(())
    }

    async fn update_record(
        &mut self,
        name: &str,
        record_type: RecordType,
        address: &str,
    ) -> Result<bool> {
        self.ensure_authenticated().await?;
        let session_id = match &self.session {
            Some(session) => session.id.clone(),
            None => return Err(DdnsError::Authentication("no session".to_string())),
        };

        let request = UpdateRequest {
            name,
            record_type,
            content: address,
        };

        let response = self
            .client
            .put(self.records_url())
            .header(SESSION_HEADER, session_id)
            .json(&request)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.session = None;
                Err(DdnsError::Authentication(format!(
                    "session rejected while updating {} ({})",
                    name, record_type
                )))
            }
            status if !status.is_success() => Err(DdnsError::Update(format!(
                "HTTP {} while updating {} ({})",
                status, name, record_type
            ))),
            _ => {
                let body: UpdateResponse = serde_json::from_str(&response.text().await?)?;
                if !body.success {
                    tracing::warn!(
                        "Provider rejected update of {} ({}): {}",
                        name,
                        record_type,
                        body.message.as_deref().unwrap_or("no reason given")
                    );
                }
                Ok(body.success)
            }
        }
    }
}
