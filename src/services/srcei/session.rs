//! The login → select → extract sequence against the booking site.
//!
//! Every wait polls a small script that returns a marker string once the page
//! reaches the expected state (or `null` while it has not). Each wait is
//! bounded by the per-step timeout and by the session deadline; crossing the
//! deadline is a timeout, running out of step time is interpreted by the
//! caller of the wait.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::catalog::{Procedure, Region};
use super::driver::PageDriver;
use super::extract::{self, CardText};
use super::ScrapeError;
use crate::config::{Credentials, MissingControlPolicy, ScrapeSettings};
use crate::models::{RawSlotRecord, SlotQuery};

pub const ENTRY_PATH: &str = "/web/init.srcei";
pub const RUT_INPUT: &str = r#"input[name="run"]"#;
pub const PASSWORD_INPUT: &str = r#"input[name="pass"]"#;
pub const SUBMIT_BUTTON: &str = r#"button[type="submit"], input[type="submit"], .btn-primary"#;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

// Shared helper prepended to checks that must recognise the "nothing available" notice.
const NO_AVAILABILITY_FN: &str = r#"const noAvailability = () => /no hay horas disponibles|no existen horas|sin horas disponibles|no hay disponibilidad/i.test(document.body ? document.body.innerText : '');"#;

const CARD_SELECTOR: &str = r#".card, [class*="card"], .col-md-6 > div, .col-lg-4 > div"#;

pub const ENTRY_CHECK: &str = r#"(() => {
    if (document.title.includes('Request Rejected')) return 'rejected';
    if (document.querySelector('input[name="run"]')) return 'login';
    return null;
})()"#;

pub const LOGIN_CHECK: &str = r#"(() => {
    if (document.title.includes('Request Rejected')) return 'rejected';
    const onForm = !!document.querySelector('input[name="pass"]');
    const url = window.location.href.toLowerCase();
    if (!onForm && (url.includes('seleccion') || document.title.includes('Reserva de Hora'))) return 'ok';
    const alert = document.querySelector('.alert-danger, .alert-error, .invalid-feedback, .error');
    if (onForm && alert && alert.innerText.trim()) return 'error:' + alert.innerText.trim();
    return null;
})()"#;

/// Called with `(label, keyword)`.
pub const PROCEDURE_CHECK: &str = r#"((label, keyword) => {
    __NO_AVAILABILITY__
    const norm = s => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
    const buttons = Array.from(document.querySelectorAll('button, a.btn, .btn'));
    const target = buttons.find(b => norm(b.innerText) === norm(label))
        || buttons.find(b => norm(b.innerText).includes(norm(label)))
        || buttons.find(b => norm(b.innerText).includes(norm(keyword)));
    if (target) { target.click(); return 'clicked'; }
    if (noAvailability()) return 'no-availability';
    return null;
})"#;

/// Called with the region option value.
pub const REGION_CHECK: &str = r#"((value) => {
    __NO_AVAILABILITY__
    const selectors = ['select[name="idRegion"]', 'select#idRegion', 'select.form-control', 'select'];
    for (const sel of selectors) {
        const el = document.querySelector(sel);
        if (!el) continue;
        const options = Array.from(el.options);
        if (!options.some(o => o.value === value)) {
            if (noAvailability()) return 'no-availability';
            return options.length > 1 ? 'no-option' : null;
        }
        el.value = value;
        el.dispatchEvent(new Event('input', { bubbles: true }));
        el.dispatchEvent(new Event('change', { bubbles: true }));
        return 'selected';
    }
    if (noAvailability()) return 'no-availability';
    return null;
})"#;

pub const RESULTS_CHECK: &str = r#"(() => {
    __NO_AVAILABILITY__
    const cards = Array.from(document.querySelectorAll('__CARDS__'));
    if (cards.some(c => (c.innerText || '').includes('Agendar'))) return 'slots';
    if (noAvailability()) return 'empty';
    return null;
})()"#;

pub const EXTRACT_SCRIPT: &str = r#"JSON.stringify(
    Array.from(document.querySelectorAll('__CARDS__'))
        .filter(c => (c.innerText || '').includes('Agendar'))
        .map(c => ({
            lines: (c.innerText || '').split('\n').map(t => t.trim()).filter(t => t),
            officeId: c.getAttribute('data-id-oficina') || c.getAttribute('data-oficina') || ''
        }))
)"#;

pub(super) fn with_helpers(template: &str) -> String {
    template
        .replace("__NO_AVAILABILITY__", NO_AVAILABILITY_FN)
        .replace("__CARDS__", CARD_SELECTOR)
}

/// Check script for the procedure button, applied to its arguments.
pub fn procedure_script(procedure: &Procedure) -> String {
    format!(
        "({})({}, {})",
        with_helpers(PROCEDURE_CHECK),
        js_string(procedure.label),
        js_string(procedure.keyword)
    )
}

pub fn region_script(region: &Region) -> String {
    format!(
        "({})({})",
        with_helpers(REGION_CHECK),
        js_string(&region.option_value())
    )
}

pub fn results_script() -> String {
    with_helpers(RESULTS_CHECK)
}

pub fn extract_script() -> String {
    with_helpers(EXTRACT_SCRIPT)
}

fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Whether the selection flow still has something to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Continue,
    NoSlots,
}

pub struct Session<'a, P: PageDriver> {
    page: &'a P,
    settings: &'a ScrapeSettings,
    deadline: Instant,
    poll_interval: Duration,
}

impl<'a, P: PageDriver> Session<'a, P> {
    pub fn new(page: &'a P, settings: &'a ScrapeSettings, deadline: Instant) -> Self {
        Self {
            page,
            settings,
            deadline,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn run(
        &self,
        credentials: &Credentials,
        query: &SlotQuery,
        today: NaiveDate,
    ) -> Result<Vec<RawSlotRecord>, ScrapeError> {
        self.open_entry()?;
        self.login(credentials)?;

        if self.select_procedure(query.procedure())? == Outcome::NoSlots
            || self.select_region(query.region())? == Outcome::NoSlots
            || self.wait_for_results()? == Outcome::NoSlots
        {
            info!("no slots available for this selection");
            return Ok(Vec::new());
        }

        self.extract(today)
    }

    fn open_entry(&self) -> Result<(), ScrapeError> {
        let url = format!("{}{}", self.settings.base_url, ENTRY_PATH);
        info!("opening login page");
        self.page
            .goto(&url)
            .map_err(|e| ScrapeError::Authentication(format!("login page unreachable: {e:#}")))?;

        match self.wait_for("login form", ENTRY_CHECK)?.as_deref() {
            Some("login") => Ok(()),
            Some("rejected") => Err(ScrapeError::Authentication(
                "request rejected by the site firewall".to_string(),
            )),
            Some(other) => Err(ScrapeError::Unclassified(format!(
                "unexpected login page state {other:?}"
            ))),
            None => Err(ScrapeError::Authentication(
                "login form did not appear".to_string(),
            )),
        }
    }

    fn login(&self, credentials: &Credentials) -> Result<(), ScrapeError> {
        let form_error = |e: anyhow::Error| {
            ScrapeError::Authentication(format!("could not submit login form: {e:#}"))
        };
        self.page
            .type_into(RUT_INPUT, &credentials.rut)
            .map_err(form_error)?;
        self.page
            .type_into(PASSWORD_INPUT, &credentials.password)
            .map_err(form_error)?;
        self.page.click(SUBMIT_BUTTON).map_err(form_error)?;

        match self.wait_for("post-login page", LOGIN_CHECK)?.as_deref() {
            Some("ok") => {
                info!("login successful");
                Ok(())
            }
            Some("rejected") => Err(ScrapeError::Authentication(
                "request rejected by the site firewall after login".to_string(),
            )),
            Some(marker) if marker.starts_with("error:") => Err(ScrapeError::Authentication(
                format!("credentials rejected: {}", &marker["error:".len()..]),
            )),
            _ => Err(ScrapeError::Authentication(
                "post-login page never appeared".to_string(),
            )),
        }
    }

    fn select_procedure(&self, procedure: &Procedure) -> Result<Outcome, ScrapeError> {
        info!(procedure = procedure.label, "selecting procedure");
        match self
            .wait_for("procedure button", &procedure_script(procedure))?
            .as_deref()
        {
            Some("clicked") => Ok(Outcome::Continue),
            Some("no-availability") => Ok(Outcome::NoSlots),
            _ => self.missing_control(format!("procedure button {:?} not found", procedure.label)),
        }
    }

    fn select_region(&self, region: &Region) -> Result<Outcome, ScrapeError> {
        info!(region = region.name, "selecting region");
        match self
            .wait_for("region dropdown", &region_script(region))?
            .as_deref()
        {
            Some("selected") => Ok(Outcome::Continue),
            Some("no-availability") => Ok(Outcome::NoSlots),
            Some("no-option") => {
                self.missing_control(format!("region {} is not offered for this procedure", region.id))
            }
            _ => self.missing_control("region dropdown not found".to_string()),
        }
    }

    fn wait_for_results(&self) -> Result<Outcome, ScrapeError> {
        match self.wait_for("slot list", &results_script())?.as_deref() {
            Some("slots") => Ok(Outcome::Continue),
            Some("empty") => Ok(Outcome::NoSlots),
            _ => self.missing_control("slot list never rendered".to_string()),
        }
    }

    fn extract(&self, today: NaiveDate) -> Result<Vec<RawSlotRecord>, ScrapeError> {
        let value = self
            .page
            .evaluate(&extract_script())
            .map_err(|e| ScrapeError::Navigation(format!("slot extraction failed: {e:#}")))?;
        let json = value.as_str().ok_or_else(|| {
            ScrapeError::Unclassified(format!("extraction returned {value} instead of a string"))
        })?;
        let cards: Vec<CardText> = serde_json::from_str(json)
            .map_err(|e| ScrapeError::Unclassified(format!("malformed extraction payload: {e}")))?;

        let card_count = cards.len();
        let records = extract::records_from_cards(cards, today);
        info!(cards = card_count, slots = records.len(), "slots extracted");
        Ok(records)
    }

    /// An expected control is absent and the page does not say "no slots".
    fn missing_control(&self, reason: String) -> Result<Outcome, ScrapeError> {
        match self.settings.missing_control {
            MissingControlPolicy::Error => Err(ScrapeError::Navigation(reason)),
            MissingControlPolicy::Empty => {
                warn!(%reason, "treating missing control as zero slots");
                Ok(Outcome::NoSlots)
            }
        }
    }

    /// Poll `check` until it yields a marker. `Ok(None)` means the step ran
    /// out of time before the session deadline did.
    fn wait_for(&self, what: &str, check: &str) -> Result<Option<String>, ScrapeError> {
        let started = Instant::now();
        let step_end = started
            .checked_add(self.settings.step_timeout)
            .map_or(self.deadline, |end| end.min(self.deadline));

        loop {
            match self.page.evaluate(check) {
                Ok(Value::String(marker)) if !marker.is_empty() => {
                    debug!(
                        step = what,
                        %marker,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "marker found"
                    );
                    return Ok(Some(marker));
                }
                Ok(_) => {}
                Err(e) => debug!(step = what, error = %e, "check failed, page may be navigating"),
            }

            let now = Instant::now();
            if now >= self.deadline {
                return Err(ScrapeError::Timeout(format!(
                    "operation ceiling reached while waiting for {what}"
                )));
            }
            if now >= step_end {
                warn!(step = what, "step timed out");
                return Ok(None);
            }
            std::thread::sleep(self.poll_interval.min(step_end - now));
        }
    }
}
