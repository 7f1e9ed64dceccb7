use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_BASE_URL: &str = "https://solicitudeswebrc.srcei.cl/ReservaDeHoraSRCEI";

/// Number of bounded waits in one session (entry, login, procedure, region, results).
pub const SESSION_WAIT_STEPS: u32 = 5;

/// Upper bound for the whole-request ceiling. Keeps deadline arithmetic far
/// away from `Instant` overflow.
pub const MAX_OPERATION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub environment: String,
    pub credentials: Credentials,
    pub scrape: ScrapeSettings,
}

/// Login for the remote site. `Debug` never prints the password and shows
/// only the RUT's check digit.
#[derive(Clone)]
pub struct Credentials {
    pub rut: String,
    pub password: String,
}

impl Credentials {
    pub fn new(rut: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            rut: rut.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.rut.trim().is_empty(), "SRCEI_RUT must be set");
        anyhow::ensure!(!self.password.is_empty(), "SRCEI_PASSWORD must be set");
        anyhow::ensure!(
            self.rut.contains('-'),
            "SRCEI_RUT must contain a dash separator (e.g. 12345678-9)"
        );
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("rut", &masked_rut(&self.rut))
            .field("password", &"<redacted>")
            .finish()
    }
}

fn masked_rut(rut: &str) -> String {
    match rut.rsplit_once('-') {
        Some((_, check)) => format!("***-{check}"),
        None => "***".to_string(),
    }
}

/// What to do when a procedure button or the region dropdown is missing and
/// the page shows no "no availability" notice either.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingControlPolicy {
    /// Fail the request as a navigation error.
    Error,
    /// Report zero slots.
    Empty,
}

impl FromStr for MissingControlPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(MissingControlPolicy::Error),
            "empty" => Ok(MissingControlPolicy::Empty),
            other => anyhow::bail!(
                "unknown missing-control policy {other:?}, expected \"error\" or \"empty\""
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScrapeSettings {
    pub base_url: String,
    pub headless: bool,
    pub step_timeout: Duration,
    pub operation_timeout: Duration,
    pub max_attempts: u32,
    pub missing_control: MissingControlPolicy,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: true,
            step_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(60),
            max_attempts: 1,
            missing_control: MissingControlPolicy::Error,
        }
    }
}

impl ScrapeSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.step_timeout.is_zero(), "step timeout must be positive");
        anyhow::ensure!(self.max_attempts >= 1, "SRCEI_MAX_ATTEMPTS must be at least 1");
        anyhow::ensure!(
            self.operation_timeout <= MAX_OPERATION_TIMEOUT,
            "operation timeout ({:?}) exceeds the maximum of {:?}",
            self.operation_timeout,
            MAX_OPERATION_TIMEOUT
        );
        let all_steps = self
            .step_timeout
            .checked_mul(SESSION_WAIT_STEPS)
            .context("step timeout is too large")?;
        anyhow::ensure!(
            all_steps <= self.operation_timeout,
            "{SESSION_WAIT_STEPS} x step timeout ({:?}) exceeds the operation timeout ({:?})",
            self.step_timeout,
            self.operation_timeout
        );
        Ok(())
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = ScrapeSettings::default();
        let missing_control = match env::var("SRCEI_MISSING_CONTROL") {
            Ok(v) => v.parse().context("invalid SRCEI_MISSING_CONTROL")?,
            Err(_) => defaults.missing_control,
        };
        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "production".to_string()),
            credentials: Credentials {
                rut: env::var("SRCEI_RUT").unwrap_or_default(),
                password: env::var("SRCEI_PASSWORD").unwrap_or_default(),
            },
            scrape: ScrapeSettings {
                base_url: env::var("SRCEI_BASE_URL")
                    .ok()
                    .map(|v| v.trim_end_matches('/').to_string())
                    .filter(|v| !v.is_empty())
                    .unwrap_or(defaults.base_url),
                headless: env::var("SRCEI_HEADLESS")
                    .map(|v| v != "false" && v != "0")
                    .unwrap_or(defaults.headless),
                step_timeout: env::var("SRCEI_STEP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.step_timeout),
                operation_timeout: env::var("SRCEI_OPERATION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.operation_timeout),
                max_attempts: env::var("SRCEI_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.max_attempts),
                missing_control,
            },
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.credentials.validate()?;
        self.scrape.validate()
    }
}
