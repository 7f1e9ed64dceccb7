use std::ffi::OsStr;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use headless_chrome::{Browser, LaunchOptions, Tab};
use uuid::Uuid;

use super::ScrapeError;
use crate::config::ScrapeSettings;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE: &str = "es-CL,es;q=0.9";
const WINDOW_SIZE: (u32, u32) = (1280, 720);

/// The handful of page operations a session needs. Blocking; callers run it
/// off the async runtime.
pub trait PageDriver {
    fn goto(&self, url: &str) -> anyhow::Result<()>;

    /// Evaluate a script and return its primitive result (`Null` when the
    /// script returns `null`/`undefined`).
    fn evaluate(&self, script: &str) -> anyhow::Result<serde_json::Value>;

    fn type_into(&self, selector: &str, text: &str) -> anyhow::Result<()>;

    fn click(&self, selector: &str) -> anyhow::Result<()>;
}

pub struct ChromePage {
    tab: Arc<Tab>,
}

impl PageDriver for ChromePage {
    fn goto(&self, url: &str) -> anyhow::Result<()> {
        self.tab
            .navigate_to(url)
            .with_context(|| format!("failed to open {url}"))?
            .wait_until_navigated()
            .context("page never finished loading")?;
        Ok(())
    }

    fn evaluate(&self, script: &str) -> anyhow::Result<serde_json::Value> {
        let object = self
            .tab
            .evaluate(script, false)
            .context("script evaluation failed")?;
        Ok(object.value.unwrap_or(serde_json::Value::Null))
    }

    fn type_into(&self, selector: &str, text: &str) -> anyhow::Result<()> {
        self.tab
            .find_element(selector)
            .with_context(|| format!("no element matches {selector}"))?
            .focus()?
            .type_into(text)?;
        Ok(())
    }

    fn click(&self, selector: &str) -> anyhow::Result<()> {
        self.tab
            .find_element(selector)
            .with_context(|| format!("no element matches {selector}"))?
            .click()?;
        Ok(())
    }
}

/// Starts one browser session per scrape. The returned session shuts the
/// browser down when dropped.
pub trait Launcher: Send + Sync + 'static {
    type Page: PageDriver;
    type Session: Deref<Target = Self::Page>;

    fn launch(&self, settings: &ScrapeSettings, id: Uuid) -> Result<Self::Session, ScrapeError>;
}

pub struct ChromeLauncher;

impl Launcher for ChromeLauncher {
    type Page = ChromePage;
    type Session = BrowserSession;

    fn launch(&self, settings: &ScrapeSettings, id: Uuid) -> Result<BrowserSession, ScrapeError> {
        BrowserSession::launch(settings, id)
    }
}

/// One browser process with a single tab. Dropping it closes the tab and
/// kills the process, whichever way the session ended.
pub struct BrowserSession {
    id: Uuid,
    page: ChromePage,
    _browser: Browser,
}

impl BrowserSession {
    pub fn launch(settings: &ScrapeSettings, id: Uuid) -> Result<Self, ScrapeError> {
        let options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .sandbox(false)
            .window_size(Some(WINDOW_SIZE))
            .idle_browser_timeout(settings.operation_timeout.saturating_add(Duration::from_secs(5)))
            .args(vec![OsStr::new("--disable-blink-features=AutomationControlled")])
            .build()
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| ScrapeError::Launch(format!("{e:#}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Launch(format!("could not open tab: {e:#}")))?;

        tab.set_default_timeout(settings.step_timeout);
        tab.set_user_agent(USER_AGENT, Some(ACCEPT_LANGUAGE), None)
            .map_err(|e| ScrapeError::Launch(format!("could not set user agent: {e:#}")))?;
        tab.enable_stealth_mode()
            .map_err(|e| ScrapeError::Launch(format!("could not enable stealth mode: {e:#}")))?;

        tracing::debug!(session_id = %id, "browser launched");

        Ok(Self {
            id,
            page: ChromePage { tab },
            _browser: browser,
        })
    }
}

impl Deref for BrowserSession {
    type Target = ChromePage;

    fn deref(&self) -> &ChromePage {
        &self.page
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.page.tab.close(false) {
            tracing::debug!(session_id = %self.id, error = %e, "tab close failed, killing browser anyway");
        }
        tracing::debug!(session_id = %self.id, "browser session closed");
    }
}
