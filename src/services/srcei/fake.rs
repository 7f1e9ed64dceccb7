use std::cell::{Cell, RefCell};
use std::time::Duration;

use serde_json::Value;

use super::driver::PageDriver;
use super::session::{
    extract_script, results_script, with_helpers, ENTRY_CHECK, LOGIN_CHECK, PROCEDURE_CHECK,
    REGION_CHECK, SUBMIT_BUTTON,
};

/// Scripted page: each check answers with a fixed marker (or never).
pub(crate) struct FakePage {
    pub(crate) entry: Option<&'static str>,
    pub(crate) login: Option<&'static str>,
    pub(crate) procedure: Option<&'static str>,
    pub(crate) region: Option<&'static str>,
    pub(crate) results: Option<&'static str>,
    pub(crate) cards: Value,
    pub(crate) submitted: Cell<bool>,
    pub(crate) typed: RefCell<Vec<(String, String)>>,
    pub(crate) visited: RefCell<Vec<String>>,
    pub(crate) evaluated: RefCell<Vec<String>>,
    /// Blocks every navigation, to hold a session open.
    pub(crate) goto_delay: Duration,
}

impl Default for FakePage {
    fn default() -> Self {
        Self {
            entry: Some("login"),
            login: Some("ok"),
            procedure: Some("clicked"),
            region: Some("selected"),
            results: Some("slots"),
            cards: serde_json::json!([
                {"lines": ["Oficina B", "Dir B", "30", "Enero", "10:00", "Agendar"], "officeId": "2"},
                {"lines": ["Oficina A", "Dir A", "29", "Enero", "15:00", "Agendar"], "officeId": "1"}
            ]),
            submitted: Cell::new(false),
            typed: RefCell::new(Vec::new()),
            visited: RefCell::new(Vec::new()),
            evaluated: RefCell::new(Vec::new()),
            goto_delay: Duration::ZERO,
        }
    }
}

impl PageDriver for FakePage {
    fn goto(&self, url: &str) -> anyhow::Result<()> {
        std::thread::sleep(self.goto_delay);
        self.visited.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn evaluate(&self, script: &str) -> anyhow::Result<Value> {
        self.evaluated.borrow_mut().push(script.to_string());
        let marker = if script == ENTRY_CHECK {
            self.entry
        } else if script == LOGIN_CHECK {
            self.submitted.get().then_some(self.login).flatten()
        } else if script.starts_with(&format!("({})", with_helpers(PROCEDURE_CHECK))) {
            self.procedure
        } else if script.starts_with(&format!("({})", with_helpers(REGION_CHECK))) {
            self.region
        } else if script == results_script() {
            self.results
        } else if script == extract_script() {
            return Ok(Value::String(self.cards.to_string()));
        } else {
            anyhow::bail!("unexpected script");
        };
        Ok(marker.map(|m| Value::String(m.to_string())).unwrap_or(Value::Null))
    }

    fn type_into(&self, selector: &str, text: &str) -> anyhow::Result<()> {
        self.typed
            .borrow_mut()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    fn click(&self, selector: &str) -> anyhow::Result<()> {
        assert_eq!(selector, SUBMIT_BUTTON);
        self.submitted.set(true);
        Ok(())
    }
}
