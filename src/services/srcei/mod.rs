pub mod catalog;
pub mod client;
pub mod driver;
pub mod extract;
#[cfg(test)]
pub(crate) mod fake;
pub mod session;

use async_trait::async_trait;

use crate::config::Credentials;
use crate::models::{RawSlotRecord, SlotQuery};

pub use client::SrceiClient;

/// Classified failures of one scraping session. Driver errors never cross
/// this boundary unwrapped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeError {
    #[error("authentication with SRCEI failed: {0}")]
    Authentication(String),

    #[error("SRCEI navigation failed: {0}")]
    Navigation(String),

    #[error("SRCEI scraping timed out: {0}")]
    Timeout(String),

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("unexpected scraping failure: {0}")]
    Unclassified(String),
}

impl ScrapeError {
    /// Only navigation failures are worth another session; repeated logins
    /// risk locking the account.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScrapeError::Navigation(_))
    }
}

#[async_trait]
pub trait SlotSource: Send + Sync {
    async fn fetch_slots(
        &self,
        credentials: &Credentials,
        query: &SlotQuery,
    ) -> Result<Vec<RawSlotRecord>, ScrapeError>;
}
