use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use super::driver::{ChromeLauncher, Launcher};
use super::extract::site_today;
use super::session::Session;
use super::{ScrapeError, SlotSource};
use crate::config::{Credentials, ScrapeSettings};
use crate::models::{RawSlotRecord, SlotQuery};

/// Scrapes the live site with a fresh browser session per call.
pub struct SrceiClient<L: Launcher = ChromeLauncher> {
    settings: ScrapeSettings,
    launcher: Arc<L>,
}

impl SrceiClient<ChromeLauncher> {
    pub fn new(settings: ScrapeSettings) -> Self {
        Self::with_launcher(settings, ChromeLauncher)
    }
}

impl<L: Launcher> SrceiClient<L> {
    pub fn with_launcher(settings: ScrapeSettings, launcher: L) -> Self {
        Self {
            settings,
            launcher: Arc::new(launcher),
        }
    }
}

#[async_trait]
impl<L: Launcher> SlotSource for SrceiClient<L> {
    async fn fetch_slots(
        &self,
        credentials: &Credentials,
        query: &SlotQuery,
    ) -> Result<Vec<RawSlotRecord>, ScrapeError> {
        let settings = self.settings.clone();
        let launcher = Arc::clone(&self.launcher);
        let credentials = credentials.clone();
        let query = *query;
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "srcei_session",
            %session_id,
            procedure = query.procedure_id(),
            region = query.region_id()
        );

        // The blocking task owns the browser. If this future is dropped at the
        // ceiling, the task still runs to the end and tears the browser down.
        let blocking_span = span.clone();
        tokio::task::spawn_blocking(move || {
            let _entered = blocking_span.enter();
            scrape(launcher.as_ref(), &settings, &credentials, &query, session_id)
        })
        .instrument(span)
        .await
        .map_err(|e| ScrapeError::Unclassified(format!("scraping task failed: {e}")))?
    }
}

fn scrape<L: Launcher>(
    launcher: &L,
    settings: &ScrapeSettings,
    credentials: &Credentials,
    query: &SlotQuery,
    session_id: Uuid,
) -> Result<Vec<RawSlotRecord>, ScrapeError> {
    let started = Instant::now();
    let deadline = started.checked_add(settings.operation_timeout).ok_or_else(|| {
        ScrapeError::Unclassified(format!(
            "operation timeout {:?} is out of range",
            settings.operation_timeout
        ))
    })?;

    let browser = launcher.launch(settings, session_id)?;
    let result = Session::new(&*browser, settings, deadline).run(
        credentials,
        query,
        site_today(Utc::now()),
    );
    drop(browser);

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(records) => tracing::info!(count = records.len(), elapsed_ms, "session finished"),
        Err(e) => tracing::warn!(error = %e, elapsed_ms, "session failed"),
    }
    result
}
