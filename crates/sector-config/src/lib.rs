//! Configuration for Sector Alarm hubs.
//!
//! TOML profiles merged with `SECTOR_`-prefixed environment variables,
//! credential resolution (env var or plaintext), validation, and
//! translation to `sector_core::HubConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use sector_core::{Credentials, HubConfig, PinPolicy};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("no profile named '{0}'")]
    UnknownProfile(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Seconds between polling cycles. Values under 60 are raised to 60.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Commands must carry a PIN.
    #[serde(default = "default_require_pin")]
    pub require_pin: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
            require_pin: default_require_pin(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60
}
fn default_timeout() -> u64 {
    10
}
fn default_require_pin() -> bool {
    true
}

/// A named Sector account.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Account e-mail.
    #[serde(default)]
    pub username: String,

    /// Password (plaintext; prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Panel to use. The account's first panel when unset.
    pub panel_id: Option<String>,

    /// Override the service base URL.
    pub base_url: Option<String>,

    pub poll_interval: Option<u64>,

    pub timeout: Option<u64>,

    pub require_pin: Option<bool>,

    /// Code sent when `require_pin` is off and no code is given.
    pub default_code: Option<String>,

    /// Environment variable holding the default code.
    pub default_code_env: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "sector", "sector").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sector");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the platform config file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// A missing file is not an error. Environment variables use `__` between
/// levels, e.g. `SECTOR_PROFILES__HOME__PANEL_ID`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading configuration");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SECTOR_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Credential resolution ───────────────────────────────────────────

/// Look up a secret: named env var first, then plaintext.
fn resolve_secret(env_name: Option<&str>, plaintext: Option<&str>) -> Option<SecretString> {
    if let Some(name) = env_name {
        if let Ok(val) = std::env::var(name) {
            return Some(SecretString::from(val));
        }
    }
    plaintext.map(|s| SecretString::from(s.to_owned()))
}

/// Resolve the account credentials of a profile.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Result<Credentials, ConfigError> {
    if profile.username.trim().is_empty() {
        return Err(ConfigError::NoCredentials {
            profile: profile_name.into(),
        });
    }
    let password = resolve_secret(profile.password_env.as_deref(), profile.password.as_deref())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;
    Ok(Credentials::new(profile.username.trim(), password))
}

fn resolve_pin_policy(profile: &Profile, defaults: &Defaults) -> Result<PinPolicy, ConfigError> {
    let require_pin = profile.require_pin.unwrap_or(defaults.require_pin);
    let default_code = match profile.default_code_env.as_deref() {
        Some(name) => std::env::var(name).ok(),
        None => None,
    }
    .or_else(|| profile.default_code.clone());

    if let Some(ref code) = default_code {
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("default_code", "must contain digits only"));
        }
    }
    if !require_pin && default_code.is_none() {
        return Err(invalid(
            "require_pin",
            "a default_code is needed when require_pin is false",
        ));
    }

    Ok(PinPolicy {
        require_pin,
        default_code: default_code.map(SecretString::from),
    })
}

// ── HubConfig translation ───────────────────────────────────────────

/// Build a `HubConfig` from a profile, falling back to `defaults`.
pub fn profile_to_hub_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<HubConfig, ConfigError> {
    let credentials = resolve_credentials(profile, profile_name)?;

    let poll_interval = profile.poll_interval.unwrap_or(defaults.poll_interval);
    if poll_interval == 0 {
        return Err(invalid("poll_interval", "must be greater than zero"));
    }
    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(invalid("timeout", "must be greater than zero"));
    }

    let mut config = HubConfig::new(credentials)
        .with_poll_interval(Duration::from_secs(poll_interval))
        .with_pin_policy(resolve_pin_policy(profile, defaults)?);
    config.transport.timeout = Duration::from_secs(timeout);

    if let Some(ref id) = profile.panel_id {
        if id.trim().is_empty() {
            return Err(invalid("panel_id", "must not be empty"));
        }
        config = config.with_panel_id(id.trim());
    }

    if let Some(ref base) = profile.base_url {
        let url: url::Url = base
            .parse()
            .map_err(|_| invalid("base_url", format!("invalid URL: {base}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("base_url", format!("unsupported scheme: {}", url.scheme())));
        }
        config = config.with_base_url(base.clone());
    }

    Ok(config)
}

impl Config {
    /// The named profile, or the default one.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownProfile(name.into()))
    }

    /// `HubConfig` for the named profile, or the default one.
    pub fn hub_config(&self, profile: Option<&str>) -> Result<HubConfig, ConfigError> {
        let (name, profile) = self.profile(profile)?;
        profile_to_hub_config(profile, name, &self.defaults)
    }
}
