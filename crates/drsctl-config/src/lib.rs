//! Profile configuration for `drsctl`.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `drsctl_core::ConnectionConfig`. The CLI layers its
//! `GlobalOpts` flag overrides on top of this.

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

use drsctl_core::{ConnectionConfig, DEFAULT_PORT, TlsVerification};

/// Keyring service name; entries are keyed `{profile}/password`.
pub const KEYRING_SERVICE: &str = "drsctl";

/// Environment prefix for config overrides and credentials.
pub const ENV_PREFIX: &str = "DRSCTL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {message}")]
    Keyring { message: String },

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

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named vCenter profiles.
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

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// How long `apply` waits for the remote task (humantime, e.g. `"2m"`).
    #[serde(default = "default_wait")]
    pub wait: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            wait: default_wait(),
        }
    }
}

fn default_output() -> String {
    "json".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_wait() -> String {
    "30s".into()
}

/// A named vCenter profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// vCenter hostname, IP, or full URL.
    pub hostname: String,

    pub port: Option<u16>,

    pub username: Option<String>,

    /// Plaintext password (prefer keyring or `password_env`).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Verify the server certificate against the system store.
    pub validate_certs: Option<bool>,

    /// Path to custom CA certificate (implies validation).
    pub ca_cert: Option<PathBuf>,

    /// Override HTTP timeout (seconds).
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn tls(&self) -> TlsVerification {
        if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else if self.validate_certs.unwrap_or(false) {
            TlsVerification::SystemDefaults
        } else {
            TlsVerification::DangerAcceptInvalid
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "drsctl", "drsctl").map_or_else(
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
    p.push("drsctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit path. A missing file yields defaults; nested keys
/// are reachable from the environment as `DRSCTL_DEFAULTS__OUTPUT`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_key(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name))
        .ok()?
        .get_password()
        .ok()
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name)).map_err(|e| {
        ConfigError::Keyring {
            message: format!("failed to access keyring: {e}"),
        }
    })?;
    entry
        .set_password(password)
        .map_err(|e| ConfigError::Keyring {
            message: format!("failed to store password: {e}"),
        })
}

/// Resolve the password from the credential chain (no CLI flag step).
///
/// Order: `password_env` → `DRSCTL_PASSWORD` → keyring → plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    password_chain(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

fn password_chain(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(pw));
    }

    // 2. Global env var
    if let Some(pw) = env("DRSCTL_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if let Some(pw) = keyring(profile_name) {
        return Ok(SecretString::from(pw));
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Build a `ConnectionConfig` from a profile, no CLI flag overrides.
pub fn profile_to_connection(
    profile: &Profile,
    profile_name: &str,
) -> Result<ConnectionConfig, ConfigError> {
    profile_to_connection_with(profile, profile_name, || {
        resolve_password(profile, profile_name)
    })
}

/// Like [`profile_to_connection`], with the password supplied by the
/// caller. `password` runs only after hostname and username are known.
pub fn profile_to_connection_with(
    profile: &Profile,
    profile_name: &str,
    password: impl FnOnce() -> Result<SecretString, ConfigError>,
) -> Result<ConnectionConfig, ConfigError> {
    if profile.hostname.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "hostname".into(),
            reason: format!("profile '{profile_name}' has no hostname"),
        });
    }

    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var("DRSCTL_USERNAME").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;
    let password = password()?;

    let mut config = ConnectionConfig::new(profile.hostname.clone(), username, password);
    config.port = profile.port.unwrap_or(DEFAULT_PORT);
    config.tls = profile.tls();
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout));
    Ok(config)
}
