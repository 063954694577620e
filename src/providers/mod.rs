//! DNS provider update clients.

mod session;

pub use session::{current_otp, SessionClient, DEFAULT_API_URL};

use crate::config::Config;
use crate::error::Result;
use crate::target::RecordType;
use async_trait::async_trait;

/// Authenticated client that applies record updates at the DNS provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpdateClient: Send {
    /// Make sure a usable session exists, logging in only when there is none
    /// or the current one has expired.
    async fn ensure_authenticated(&mut self) -> Result<()>;

    /// Point `name` at `address`. Returns whether the provider accepted it.
    async fn update_record(
        &mut self,
        name: &str,
        record_type: RecordType,
        address: &str,
    ) -> Result<bool>;
}

/// Create the provider client for a validated configuration.
pub fn create_client(config: &Config) -> Result<SessionClient> {
    SessionClient::new(
        config.api_url.clone(),
        config.credentials.clone(),
        config.domain_number.clone(),
        config.contract.clone(),
    )
}
