use serde::Deserialize;
use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use tally_client::{ApiToken, DEFAULT_BASE_URL, LedgerConfig, LedgerError};
use tally_types::UserId;

use crate::directory::SearchSettings;
use crate::notices::NoticeTimings;

pub const BASE_URL_ENV: &str = "TALLY_BASE_URL";
pub const TOKEN_ENV: &str = "TALLY_TOKEN";

#[derive(Debug, Default, Deserialize)]
pub struct TallyConfig {
    pub ledger: Option<LedgerSection>,
    pub session: Option<SessionSection>,
    pub ui: Option<UiSection>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Default, Deserialize)]
pub struct LedgerSection {
    pub base_url: Option<String>,
    /// Bearer token. `${VAR}` references are expanded at load time.
    pub token: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    /// Permit plain `http://` base URLs (local ledgers only).
    #[serde(default)]
    pub allow_http: bool,
}

// Manual Debug impl to prevent leaking the bearer token in logs.
impl std::fmt::Debug for LedgerSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = if self.token.is_some() { "[REDACTED]" } else { "None" };
        f.debug_struct("LedgerSection")
            .field("base_url", &self.base_url)
            .field("token", &token)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("allow_http", &self.allow_http)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionSection {
    /// The signed-in user; expenses are paid by them and groups created by them.
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UiSection {
    /// Prefix for amounts in settlement notices. Default: "₹".
    pub currency_symbol: Option<String>,
    /// Quiet period before a directory lookup fires. Default: 500.
    pub search_debounce_ms: Option<u64>,
    /// Queries shorter than this never reach the ledger. Default: 2.
    pub min_query_chars: Option<usize>,
    pub settled_notice_secs: Option<u64>,
    pub reminder_notice_secs: Option<u64>,
    pub expense_notice_secs: Option<u64>,
}

pub const DEFAULT_CURRENCY: &str = "₹";

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

impl TallyConfig {
    /// Load `~/.tally/config.toml`. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {:?}: {}", path, source);
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Self::parse(&content).map(Some).map_err(|source| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, source);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        if let Some(ledger) = config.ledger.as_mut() {
            ledger.base_url = ledger.base_url.as_deref().map(expand_env_vars);
            ledger.token = ledger.token.as_deref().map(expand_env_vars);
        }
        Ok(config)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Environment overrides win over the file.
    pub fn apply_env_overrides(&mut self) {
        let ledger = self.ledger.get_or_insert_with(LedgerSection::default);
        if let Some(url) = non_empty_env(BASE_URL_ENV) {
            ledger.base_url = Some(url);
        }
        if let Some(token) = non_empty_env(TOKEN_ENV) {
            ledger.token = Some(token);
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.ledger
            .as_ref()
            .and_then(|l| l.base_url.as_deref())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn token(&self) -> Option<ApiToken> {
        self.ledger
            .as_ref()
            .and_then(|l| l.token.as_deref())
            .filter(|t| !t.trim().is_empty())
            .map(ApiToken::new)
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.session
            .as_ref()
            .and_then(|s| s.user_id.as_deref())
            .filter(|id| !id.trim().is_empty())
            .map(UserId::from)
    }

    /// Assemble the HTTP client settings.
    pub fn ledger_config(&self) -> Result<LedgerConfig, LedgerError> {
        let mut config = LedgerConfig::new(self.base_url())?;
        if let Some(section) = self.ledger.as_ref() {
            config = config.allow_http(section.allow_http);
            if let Some(secs) = section.connect_timeout_secs {
                config = config.with_connect_timeout(Duration::from_secs(secs));
            }
            if let Some(secs) = section.request_timeout_secs {
                config = config.with_request_timeout(Some(Duration::from_secs(secs)));
            }
        }
        if let Some(token) = self.token() {
            config = config.with_token(token);
        }
        Ok(config)
    }

    #[must_use]
    pub fn currency(&self) -> &str {
        self.ui
            .as_ref()
            .and_then(|ui| ui.currency_symbol.as_deref())
            .unwrap_or(DEFAULT_CURRENCY)
    }

    #[must_use]
    pub fn search_settings(&self) -> SearchSettings {
        let mut settings = SearchSettings::default();
        if let Some(ui) = self.ui.as_ref() {
            if let Some(ms) = ui.search_debounce_ms {
                settings.debounce = Duration::from_millis(ms);
            }
            if let Some(min) = ui.min_query_chars {
                settings.min_query_chars = min;
            }
        }
        settings
    }

    #[must_use]
    pub fn notice_timings(&self) -> NoticeTimings {
        let mut timings = NoticeTimings::default();
        if let Some(ui) = self.ui.as_ref() {
            if let Some(secs) = ui.settled_notice_secs {
                timings.settled = Duration::from_secs(secs);
            }
            if let Some(secs) = ui.reminder_notice_secs {
                timings.reminder = Duration::from_secs(secs);
            }
            if let Some(secs) = ui.expense_notice_secs {
                timings.expense_added = Duration::from_secs(secs);
            }
        }
        timings
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tally").join("config.toml"))
}
