pub mod query;
pub mod slot;

pub use query::SlotQuery;
pub use slot::{NormalizedSlot, RawSlotRecord, SlotResponse};
