//! CLI configuration: thin wrapper around `drsctl_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--hostname, --username, --password, ...).

use std::time::Duration;

use secrecy::SecretString;

use drsctl_core::{ConnectionConfig, DEFAULT_PORT, TlsVerification};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use drsctl_config::{
    Config, Profile, config_path, load_config, load_config_or_default, save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Output format: flag > env > config default > JSON.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    if let Some(format) = global.output {
        return format;
    }
    match config.defaults.output.as_str() {
        "json-compact" | "json_compact" => OutputFormat::JsonCompact,
        "yaml" => OutputFormat::Yaml,
        "table" => OutputFormat::Table,
        _ => OutputFormat::Json,
    }
}

/// Reconcile wait: flag > config default.
pub fn wait_timeout(flag: Option<Duration>, config: &Config) -> Result<Duration, CliError> {
    if let Some(wait) = flag {
        return Ok(wait);
    }
    humantime::parse_duration(&config.defaults.wait).map_err(|e| CliError::Validation {
        field: "defaults.wait".into(),
        reason: format!("'{}': {e}", config.defaults.wait),
    })
}

/// Build a `ConnectionConfig` from the config file, profile, and CLI overrides.
pub fn build_connection(global: &GlobalOpts, config: &Config) -> Result<ConnectionConfig, CliError> {
    let profile_name = active_profile_name(global, config);

    if let Some(profile) = config.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, global, config);
    }

    // An explicitly requested profile must exist.
    if global.profile.is_some() {
        let mut available: Vec<_> = config.profiles.keys().cloned().collect();
        available.sort();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        });
    }

    // No profile -- flags / env vars alone.
    let hostname = global.hostname.clone().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let (Some(username), Some(password)) = (global.username.clone(), global.password.clone())
    else {
        return Err(CliError::NoCredentials {
            profile: profile_name,
        });
    };

    let mut conn = ConnectionConfig::new(hostname, username, SecretString::from(password));
    conn.port = global.port.unwrap_or(DEFAULT_PORT);
    conn.tls = if global.validate_certs {
        TlsVerification::SystemDefaults
    } else {
        TlsVerification::DangerAcceptInvalid
    };
    conn.timeout = Duration::from_secs(global.timeout.unwrap_or(config.defaults.timeout));
    Ok(conn)
}

/// Translate a `Profile` + global flags into a `ConnectionConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    config: &Config,
) -> Result<ConnectionConfig, CliError> {
    let merged = Profile {
        hostname: global
            .hostname
            .clone()
            .unwrap_or_else(|| profile.hostname.clone()),
        port: global.port.or(profile.port),
        username: global.username.clone().or_else(|| profile.username.clone()),
        validate_certs: if global.validate_certs {
            Some(true)
        } else {
            profile.validate_certs
        },
        timeout: global
            .timeout
            .or(profile.timeout)
            .or(Some(config.defaults.timeout)),
        ..profile.clone()
    };

    // Password flag beats the whole credential chain.
    let conn = match global.password {
        Some(ref password) => {
            drsctl_config::profile_to_connection_with(&merged, profile_name, || {
                Ok(SecretString::from(password.clone()))
            })?
        }
        None => drsctl_config::profile_to_connection(&merged, profile_name)?,
    };
    Ok(conn)
}
