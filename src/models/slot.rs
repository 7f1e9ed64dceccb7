use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One slot card as read from the page. Nothing is parsed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSlotRecord {
    pub office_name: String,
    pub office_address: String,
    pub date_text: String,
    pub time_text: String,
    #[serde(default)]
    pub office_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSlot {
    pub office_name: String,
    pub office_address: String,
    /// Site format, `DD/MM/YYYY`.
    pub date: String,
    /// `HH:MM`, 24-hour.
    pub time: String,
    /// `YYYY-MM-DDTHH:MM:SS`.
    pub datetime_iso: String,
    #[serde(default)]
    pub office_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotResponse {
    pub slots: Vec<NormalizedSlot>,
    pub count: usize,
    pub procedure_id: u8,
    pub region_id: u8,
    pub scraped_at: DateTime<Utc>,
}

impl SlotResponse {
    pub fn new(procedure_id: u8, region_id: u8, slots: Vec<NormalizedSlot>) -> Self {
        Self {
            count: slots.len(),
            slots,
            procedure_id,
            region_id,
            scraped_at: Utc::now(),
        }
    }
}
