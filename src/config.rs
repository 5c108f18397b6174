use chrono::Duration;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Deployment mode. Selects the session-lifetime policy when the periods are
/// not set explicitly.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    Development,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    pub mode: Mode,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Session lifetimes in seconds. Unset fields fall back to the mode policy:
/// production keeps sessions active for 24 hours and idle-renewable for 14
/// days; development stretches both to 30 days so local sessions survive
/// between work sessions.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SessionConfig {
    pub active_period_secs: Option<u64>,
    pub idle_period_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Development,
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

const DAY_SECS: u64 = 24 * 60 * 60;

impl AuthConfig {
    /// Load configuration from multiple sources in priority order:
    /// 1. Built-in defaults
    /// 2. Latchkey.toml (base configuration file)
    /// 3. Environment variables (prefixed with LATCHKEY_, `__` as separator,
    ///    e.g. LATCHKEY_MODE or LATCHKEY_SESSION__IDLE_PERIOD_SECS)
    pub fn load() -> Result<Self, figment::Error> {
        let figment = Figment::from(Serialized::defaults(AuthConfig::default()))
            .merge(Toml::file("Latchkey.toml"))
            .merge(Env::prefixed("LATCHKEY_").split("__"));

        figment.extract()
    }

    /// How long a fresh or renewed session stays active before turning idle.
    pub fn active_period(&self) -> Duration {
        let secs = self.session.active_period_secs.unwrap_or(match self.mode {
            Mode::Production => DAY_SECS,
            Mode::Development => 30 * DAY_SECS,
        });
        Duration::seconds(secs as i64)
    }

    /// How long a session stays renewable after creation or renewal. Past
    /// this deadline the session is dead.
    pub fn idle_period(&self) -> Duration {
        let secs = self.session.idle_period_secs.unwrap_or(match self.mode {
            Mode::Production => 14 * DAY_SECS,
            Mode::Development => 30 * DAY_SECS,
        });
        Duration::seconds(secs as i64)
    }
}
