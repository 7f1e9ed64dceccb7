//! Turning slot cards (as visible text lines) into raw slot records.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::Deserialize;

use crate::models::RawSlotRecord;

/// Text a card must contain to count as a bookable slot.
pub const BOOK_ACTION: &str = "Agendar";

const MONTHS: [(&str, u32); 13] = [
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

/// One card as returned by the extraction script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardText {
    pub lines: Vec<String>,
    #[serde(default, rename = "officeId")]
    pub office_id: String,
}

/// Parse every card, skipping the ones that are not slots and repeated
/// (office, date, time) triples. Discovery order is kept.
pub fn records_from_cards<I>(cards: I, today: NaiveDate) -> Vec<RawSlotRecord>
where
    I: IntoIterator<Item = CardText>,
{
    let mut seen = HashSet::new();
    cards
        .into_iter()
        .filter_map(|card| parse_card(&card, today))
        .filter(|r| seen.insert((r.office_name.clone(), r.date_text.clone(), r.time_text.clone())))
        .collect()
}

/// Layout: office name, then address, then day / month / time somewhere in
/// the remaining lines. The page shows no year.
pub fn parse_card(card: &CardText, today: NaiveDate) -> Option<RawSlotRecord> {
    let lines: Vec<&str> = card
        .lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    if !lines.iter().any(|l| l.contains(BOOK_ACTION)) {
        return None;
    }

    let office_name = lines.first()?.to_string();
    let office_address = lines.get(1).map(|s| s.to_string()).unwrap_or_default();

    let mut day = None;
    let mut month = None;
    let mut time = None;
    for line in &lines {
        if let Some(d) = parse_day(line) {
            day = Some(d);
        }
        if let Some(m) = parse_month(line) {
            month = Some(m);
        }
        if let Some(t) = parse_time(line) {
            time = Some(t);
        }
    }

    let (day, month) = (day?, month?);
    let year = infer_year(month, today);

    Some(RawSlotRecord {
        office_name,
        office_address,
        date_text: format!("{day:02}/{month:02}/{year}"),
        time_text: time.unwrap_or_else(|| "00:00".to_string()),
        office_id: card.office_id.trim().to_string(),
    })
}

/// Chile's standard offset (UTC-4). During summer time the site is an hour
/// ahead, so right after midnight this still reports the previous day and the
/// year rollover never happens early.
const SITE_UTC_OFFSET_SECS: i32 = -4 * 3600;

/// The calendar date the site's cards are relative to, independent of the
/// server's own time zone.
pub fn site_today(now: DateTime<Utc>) -> NaiveDate {
    match FixedOffset::east_opt(SITE_UTC_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}

/// Months already behind us belong to next year's calendar.
fn infer_year(month: u32, today: NaiveDate) -> i32 {
    if month < today.month() {
        today.year() + 1
    } else {
        today.year()
    }
}

fn parse_day(line: &str) -> Option<u32> {
    if line.is_empty() || line.len() > 2 || !line.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    line.parse().ok().filter(|d| (1..=31).contains(d))
}

fn parse_month(line: &str) -> Option<u32> {
    let lower = line.to_lowercase();
    MONTHS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, n)| *n)
}

fn parse_time(line: &str) -> Option<String> {
    let (h, m) = line.split_once(':')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(h) || h.len() > 2 || !digits(m) || m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    Some(format!("{hour:02}:{m}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 20).unwrap()
    }

    fn card(lines: &[&str]) -> CardText {
        CardText {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            office_id: String::new(),
        }
    }

    #[test]
    fn test_parse_full_card() {
        let c = card(&["Oficina Santiago Centro", "Huérfanos 1570", "29", "Enero", "09:30", "Agendar"]);
        let r = parse_card(&c, today()).unwrap();
        assert_eq!(r.office_name, "Oficina Santiago Centro");
        assert_eq!(r.office_address, "Huérfanos 1570");
        assert_eq!(r.date_text, "29/01/2026");
        assert_eq!(r.time_text, "09:30");
    }

    #[test]
    fn test_single_digit_day_and_hour_are_padded() {
        let c = card(&["Oficina Ñuñoa", "Irarrázaval 3550", "5", "marzo", "8:15", "Agendar"]);
        let r = parse_card(&c, today()).unwrap();
        assert_eq!(r.date_text, "05/03/2026");
        assert_eq!(r.time_text, "08:15");
    }

    #[test]
    fn test_missing_time_defaults_to_midnight() {
        let c = card(&["Oficina Talca", "1 Norte 931", "12", "Febrero", "Agendar"]);
        assert_eq!(parse_card(&c, today()).unwrap().time_text, "00:00");
    }

    #[test]
    fn test_earlier_month_rolls_into_next_year() {
        let december = NaiveDate::from_ymd_opt(2025, 12, 28).unwrap();
        let c = card(&["Oficina Temuco", "Claro Solar 880", "3", "Enero", "10:00", "Agendar"]);
        assert_eq!(parse_card(&c, december).unwrap().date_text, "03/01/2026");
    }

    #[test]
    fn test_card_without_book_action_is_skipped() {
        let c = card(&["Oficina Arica", "21 de Mayo 510", "4", "Febrero", "11:00"]);
        assert!(parse_card(&c, today()).is_none());
    }

    #[test]
    fn test_card_without_month_is_skipped() {
        let c = card(&["Oficina Arica", "21 de Mayo 510", "4", "11:00", "Agendar"]);
        assert!(parse_card(&c, today()).is_none());
    }

    #[test]
    fn test_day_out_of_range_is_ignored() {
        assert_eq!(parse_day("31"), Some(31));
        assert_eq!(parse_day("32"), None);
        assert_eq!(parse_day("0"), None);
        assert_eq!(parse_day("123"), None);
    }

    #[test]
    fn test_time_shapes() {
        assert_eq!(parse_time("14:45").as_deref(), Some("14:45"));
        assert_eq!(parse_time("7:05").as_deref(), Some("07:05"));
        assert_eq!(parse_time("7:5"), None);
        assert_eq!(parse_time("Horario: 9"), None);
    }

    #[test]
    fn test_duplicates_removed_in_discovery_order() {
        let cards = vec![
            card(&["Oficina A", "Dir A", "29", "Enero", "09:30", "Agendar"]),
            card(&["Oficina B", "Dir B", "29", "Enero", "09:30", "Agendar"]),
            card(&["Oficina A", "Dir A", "29", "Enero", "09:30", "Agendar"]),
            card(&["Sin horas"]),
        ];
        let records = records_from_cards(cards, today());
        let names: Vec<_> = records.iter().map(|r| r.office_name.as_str()).collect();
        assert_eq!(names, vec!["Oficina A", "Oficina B"]);
    }

    #[test]
    fn test_office_id_carried_over() {
        let mut c = card(&["Oficina A", "Dir A", "2", "Abril", "09:30", "Agendar"]);
        c.office_id = " 148 ".to_string();
        assert_eq!(parse_card(&c, today()).unwrap().office_id, "148");
    }

    #[test]
    fn test_site_today_uses_chile_date_not_utc() {
        let now = DateTime::parse_from_rfc3339("2026-02-01T02:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(site_today(now), NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());

        let later = DateTime::parse_from_rfc3339("2026-02-01T05:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(site_today(later), NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    }

    #[test]
    fn test_month_end_card_keeps_current_year_before_chile_midnight() {
        // 02:00 UTC on Feb 1 is still Jan 31 in Chile: a January card is this year.
        let now = DateTime::parse_from_rfc3339("2026-02-01T02:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let c = card(&["Oficina A", "Dir A", "31", "Enero", "09:30", "Agendar"]);
        let record = parse_card(&c, site_today(now)).unwrap();
        assert_eq!(record.date_text, "31/01/2026");
    }
}
