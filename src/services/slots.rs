use tracing::{info, warn};

use crate::config::{Credentials, ScrapeSettings};
use crate::errors::AppError;
use crate::models::{RawSlotRecord, SlotQuery, SlotResponse};
use crate::services::normalize;
use crate::services::srcei::{ScrapeError, SlotSource};

/// Run one scrape for `query` under the operation ceiling and build the
/// sorted response.
pub async fn collect_slots(
    source: &dyn SlotSource,
    credentials: &Credentials,
    settings: &ScrapeSettings,
    query: SlotQuery,
) -> Result<SlotResponse, AppError> {
    let raw = tokio::time::timeout(
        settings.operation_timeout,
        fetch_with_retry(source, credentials, &query, settings.max_attempts),
    )
    .await
    .map_err(|_| {
        ScrapeError::Timeout(format!(
            "no result within {}s",
            settings.operation_timeout.as_secs_f32()
        ))
    })??;

    let extracted = raw.len();
    let slots = normalize::normalize_and_sort(raw);
    if slots.len() < extracted {
        warn!(
            dropped = extracted - slots.len(),
            "dropped slots with unparseable date/time"
        );
    }

    Ok(SlotResponse::new(query.procedure_id(), query.region_id(), slots))
}

async fn fetch_with_retry(
    source: &dyn SlotSource,
    credentials: &Credentials,
    query: &SlotQuery,
    max_attempts: u32,
) -> Result<Vec<RawSlotRecord>, ScrapeError> {
    let mut attempt = 1;
    loop {
        match source.fetch_slots(credentials, query).await {
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %e, "scrape failed, retrying with a new session");
                attempt += 1;
            }
            Ok(records) => {
                if attempt > 1 {
                    info!(attempt, "scrape succeeded after retry");
                }
                return Ok(records);
            }
            Err(e) => return Err(e),
        }
    }
}
