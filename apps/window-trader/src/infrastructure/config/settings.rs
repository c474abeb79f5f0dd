//! Trader Configuration Settings
//!
//! Configuration types for the trader, loaded from environment variables.
//! [`TraderConfig::from_lookup`] takes any key lookup so tests can supply
//! values without touching the process environment.

use std::time::Duration;

use rust_decimal::Decimal;

use crate::application::pipeline::PipelineSettings;
use crate::application::supervisor::SupervisorSettings;
use crate::domain::instrument::Instrument;
use crate::domain::order::{Basis, ContractTerms, ContractType, DurationUnit};
use crate::infrastructure::notify::{DEFAULT_TELEGRAM_API_BASE, TelegramConfig};
use crate::infrastructure::venue::DEFAULT_VENUE_URL;

/// Venue API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_token: String,
    app_id: u32,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(api_token: String, app_id: u32) -> Self {
        Self { api_token, app_id }
    }

    /// Get the API token.
    #[must_use]
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// Get the registered application id.
    #[must_use]
    pub const fn app_id(&self) -> u32 {
        self.app_id
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"[REDACTED]")
            .field("app_id", &self.app_id)
            .finish()
    }
}

/// Pipeline and supervisor timing.
#[derive(Debug, Clone)]
pub struct TimingSettings {
    /// Per-instrument observation window.
    pub window: Duration,
    /// Wait before continuous monitoring begins.
    pub initial_wait: Duration,
    /// Pause between monitoring cycles.
    pub poll_interval: Duration,
    /// Keep-alive interval.
    pub heartbeat_interval: Duration,
    /// Read timeout (`None` = disabled).
    pub read_timeout: Option<Duration>,
    /// Acknowledgment grace after a purchase is sent.
    pub purchase_ack_grace: Duration,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(3600),
            initial_wait: Duration::from_secs(3600),
            poll_interval: Duration::from_secs(60),
            heartbeat_interval: Duration::from_secs(30),
            read_timeout: None,
            purchase_ack_grace: Duration::from_secs(10),
        }
    }
}

/// Complete trader configuration.
#[derive(Debug, Clone)]
pub struct TraderConfig {
    /// Venue credentials.
    pub credentials: Credentials,
    /// Venue WebSocket base URL, without `app_id`.
    pub venue_url: String,
    /// Instruments to trade.
    pub instruments: Vec<Instrument>,
    /// Timing.
    pub timing: TimingSettings,
    /// Contract terms for every purchase.
    pub contract: ContractTerms,
    /// Telegram delivery, when configured.
    pub telegram: Option<TelegramConfig>,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl TraderConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if required keys are missing or a value cannot be
    /// parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let api_token = env.required("API_TOKEN")?;
        let app_id = env
            .parse::<u32>("APP_ID")?
            .ok_or_else(|| ConfigError::MissingEnvVar("APP_ID".to_string()))?;

        let venue_url = env
            .optional("VENUE_WS_URL")
            .unwrap_or_else(|| DEFAULT_VENUE_URL.to_string());

        let instruments = match env.optional("TRADER_INSTRUMENTS") {
            Some(list) => parse_instruments(&list)?,
            None => Instrument::defaults(),
        };

        let defaults = TimingSettings::default();
        let timing = TimingSettings {
            window: env.duration_secs("TRADER_WINDOW_SECS", defaults.window)?,
            initial_wait: env.duration_secs("TRADER_INITIAL_WAIT_SECS", defaults.initial_wait)?,
            poll_interval: env.duration_secs("TRADER_POLL_INTERVAL_SECS", defaults.poll_interval)?,
            heartbeat_interval: env.duration_secs(
                "TRADER_HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval,
            )?,
            read_timeout: Some(env.duration_secs("TRADER_READ_TIMEOUT_SECS", Duration::ZERO)?)
                .filter(|timeout| !timeout.is_zero()),
            purchase_ack_grace: env.duration_secs(
                "TRADER_PURCHASE_ACK_GRACE_SECS",
                defaults.purchase_ack_grace,
            )?,
        };
        if timing.heartbeat_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "TRADER_HEARTBEAT_INTERVAL_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let contract = parse_contract(&env)?;
        let telegram = parse_telegram(&env)?;
        let metrics_port = env.parse::<u16>("TRADER_METRICS_PORT")?.unwrap_or(0);

        Ok(Self {
            credentials: Credentials::new(api_token, app_id),
            venue_url,
            instruments,
            timing,
            contract,
            telegram,
            metrics_port,
        })
    }

    /// Full venue URL including the application id.
    #[must_use]
    pub fn venue_endpoint(&self) -> String {
        format!("{}?app_id={}", self.venue_url, self.credentials.app_id())
    }

    /// Settings shared by every pipeline run.
    #[must_use]
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            api_token: self.credentials.api_token().to_string(),
            window: self.timing.window,
            heartbeat_interval: self.timing.heartbeat_interval,
            read_timeout: self.timing.read_timeout,
            purchase_ack_grace: self.timing.purchase_ack_grace,
            contract: self.contract.clone(),
        }
    }

    /// Supervisor timing.
    #[must_use]
    pub const fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            initial_wait: self.timing.initial_wait,
            poll_interval: self.timing.poll_interval,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Offending variable.
        key: String,
        /// What was wrong with it.
        reason: String,
    },
}

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value, treating blank as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        let value = (self.0)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::EmptyValue(key.to_string()));
        }
        Ok(value.to_string())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|v| {
                v.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        Ok(self
            .parse::<u64>(key)?
            .map_or(default, Duration::from_secs))
    }
}

fn parse_instruments(list: &str) -> Result<Vec<Instrument>, ConfigError> {
    let mut instruments: Vec<Instrument> = Vec::new();
    for symbol in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let instrument = Instrument::new(symbol);
        if !instruments.contains(&instrument) {
            instruments.push(instrument);
        }
    }
    if instruments.is_empty() {
        return Err(ConfigError::EmptyValue("TRADER_INSTRUMENTS".to_string()));
    }
    Ok(instruments)
}

fn parse_contract<F>(env: &Env<'_, F>) -> Result<ContractTerms, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ContractTerms::default();

    let amount = env.parse::<Decimal>("TRADER_STAKE")?.unwrap_or(defaults.amount);
    if amount <= Decimal::ZERO {
        return Err(ConfigError::InvalidValue {
            key: "TRADER_STAKE".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    let contract_type = match env.optional("TRADER_CONTRACT_TYPE") {
        Some(value) => ContractType::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
            key: "TRADER_CONTRACT_TYPE".to_string(),
            reason: format!("expected CALL or PUT, got {value}"),
        })?,
        None => defaults.contract_type,
    };

    let duration_unit = match env.optional("TRADER_CONTRACT_DURATION_UNIT") {
        Some(value) => DurationUnit::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
            key: "TRADER_CONTRACT_DURATION_UNIT".to_string(),
            reason: format!("expected one of t, s, m, h, d, got {value}"),
        })?,
        None => defaults.duration_unit,
    };

    Ok(ContractTerms {
        amount,
        basis: Basis::Stake,
        contract_type,
        currency: env
            .optional("TRADER_CURRENCY")
            .unwrap_or(defaults.currency),
        duration: env
            .parse::<u32>("TRADER_CONTRACT_DURATION")?
            .unwrap_or(defaults.duration),
        duration_unit,
    })
}

fn parse_telegram<F>(env: &Env<'_, F>) -> Result<Option<TelegramConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match (
        env.optional("TELEGRAM_BOT_TOKEN"),
        env.optional("TELEGRAM_CHAT_ID"),
    ) {
        (Some(bot_token), Some(chat_id)) => Ok(Some(TelegramConfig {
            api_base: env
                .optional("TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            bot_token,
            chat_id,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::MissingEnvVar("TELEGRAM_CHAT_ID".to_string())),
        (None, Some(_)) => Err(ConfigError::MissingEnvVar(
            "TELEGRAM_BOT_TOKEN".to_string(),
        )),
    }
}
