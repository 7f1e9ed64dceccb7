use chrono::NaiveDateTime;

use crate::models::{NormalizedSlot, RawSlotRecord};

/// The site's date and time, joined with a space.
pub const SITE_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";
pub const ISO_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn parse_slot_datetime(date_text: &str, time_text: &str) -> Option<NaiveDateTime> {
    let joined = format!("{} {}", date_text.trim(), time_text.trim());
    NaiveDateTime::parse_from_str(&joined, SITE_DATETIME_FORMAT).ok()
}

pub fn normalize_slot(raw: RawSlotRecord) -> Option<(NaiveDateTime, NormalizedSlot)> {
    let Some(at) = parse_slot_datetime(&raw.date_text, &raw.time_text) else {
        tracing::debug!(
            office = %raw.office_name,
            date = %raw.date_text,
            time = %raw.time_text,
            "dropping slot with unparseable date/time"
        );
        return None;
    };

    let slot = NormalizedSlot {
        office_name: raw.office_name,
        office_address: raw.office_address,
        date: raw.date_text,
        time: raw.time_text,
        datetime_iso: at.format(ISO_DATETIME_FORMAT).to_string(),
        office_id: raw.office_id,
    };
    Some((at, slot))
}

/// Parse, drop failures, sort ascending. Equal timestamps keep discovery order.
pub fn normalize_and_sort<I>(records: I) -> Vec<NormalizedSlot>
where
    I: IntoIterator<Item = RawSlotRecord>,
{
    let mut parsed: Vec<_> = records.into_iter().filter_map(normalize_slot).collect();
    parsed.sort_by_key(|(at, _)| *at);
    parsed.into_iter().map(|(_, slot)| slot).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(office: &str, date: &str, time: &str) -> RawSlotRecord {
        RawSlotRecord {
            office_name: office.to_string(),
            office_address: format!("{office} 123"),
            date_text: date.to_string(),
            time_text: time.to_string(),
            office_id: String::new(),
        }
    }

    #[test]
    fn test_iso_datetime() {
        let (_, slot) = normalize_slot(raw("A", "29/01/2026", "09:30")).unwrap();
        assert_eq!(slot.datetime_iso, "2026-01-29T09:30:00");
        assert_eq!(slot.date, "29/01/2026");
        assert_eq!(slot.time, "09:30");
    }

    #[test]
    fn test_parse_variants() {
        assert!(parse_slot_datetime("01/12/2025", "15:00").is_some());
        assert!(parse_slot_datetime("", "09:30").is_none());
        assert!(parse_slot_datetime("29/01/2026", "").is_none());
        assert!(parse_slot_datetime("31/02/2026", "09:30").is_none());
        assert!(parse_slot_datetime("29/01/2026", "25:00").is_none());
        assert!(parse_slot_datetime("2026-01-29", "09:30").is_none());
    }

    #[test]
    fn test_sorted_ascending() {
        let slots = normalize_and_sort(vec![
            raw("B", "30/01/2026", "10:00"),
            raw("A", "29/01/2026", "15:00"),
            raw("C", "29/01/2026", "09:30"),
        ]);
        let names: Vec<_> = slots.iter().map(|s| s.office_name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_sort_across_month_and_year_boundaries() {
        let slots = normalize_and_sort(vec![
            raw("Jan", "02/01/2027", "08:00"),
            raw("Dec", "31/12/2026", "17:00"),
            raw("Feb", "01/02/2026", "08:00"),
        ]);
        let names: Vec<_> = slots.iter().map(|s| s.office_name.as_str()).collect();
        assert_eq!(names, vec!["Feb", "Dec", "Jan"]);
        assert!(slots.windows(2).all(|w| w[0].datetime_iso <= w[1].datetime_iso));
    }

    #[test]
    fn test_unparseable_records_dropped_one_for_one() {
        let slots = normalize_and_sort(vec![
            raw("A", "29/01/2026", "09:30"),
            raw("B", "", "09:30"),
            raw("C", "30/01/2026", "10:00"),
            raw("D", "not a date", "10:00"),
        ]);
        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|s| s.office_name != "B" && s.office_name != "D"));
    }

    #[test]
    fn test_equal_timestamps_keep_discovery_order() {
        let slots = normalize_and_sort(vec![
            raw("Second", "29/01/2026", "10:00"),
            raw("Tie-1", "29/01/2026", "09:30"),
            raw("Tie-2", "29/01/2026", "09:30"),
            raw("Tie-3", "29/01/2026", "09:30"),
        ]);
        let names: Vec<_> = slots.iter().map(|s| s.office_name.as_str()).collect();
        assert_eq!(names, vec!["Tie-1", "Tie-2", "Tie-3", "Second"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize_and_sort(Vec::new()).is_empty());
    }
}
