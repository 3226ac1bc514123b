//! CLI error types with miette diagnostics.
//!
//! Maps core, config, and reconcile errors into user-facing errors with
//! actionable help text and a stable exit code per kind.

use miette::Diagnostic;
use thiserror::Error;

use drsctl_config::ConfigError;
use drsctl_core::{CoreError, ReconcileError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to vCenter at {url}")]
    #[diagnostic(
        code(drsctl::connection_failed),
        help(
            "{reason}\n\
             Check the hostname and port. For self-signed appliances leave \
             --validate-certs off or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(drsctl::auth_failed),
        help("Verify the username and password, or run: drsctl config set-password")
    )]
    AuthFailed { message: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(
        code(drsctl::permission_denied),
        help("The account needs Host.Inventory.EditCluster on the VM's cluster.")
    )]
    PermissionDenied { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(drsctl::no_credentials),
        help(
            "Pass --username and --password, set DRSCTL_USERNAME / DRSCTL_PASSWORD,\n\
             or store the password with: drsctl config set-password"
        )
    )]
    NoCredentials { profile: String },

    // ── Reconcile outcomes ───────────────────────────────────────────
    #[error("VM '{vm}' not found")]
    #[diagnostic(
        code(drsctl::not_found),
        help("VM names are matched exactly and must belong to a DRS cluster.")
    )]
    NotFound { vm: String },

    #[error("DRS configuration is only supported in vCenter environments")]
    #[diagnostic(code(drsctl::unsupported_context), help("{reason}"))]
    UnsupportedContext { reason: String },

    #[error("Invalid DRS behavior '{value}'")]
    #[diagnostic(code(drsctl::invalid_state), help("Expected one of: {allowed}"))]
    InvalidState { value: String, allowed: String },

    #[error("Failed to set DRS override: {message}")]
    #[diagnostic(code(drsctl::remote_operation))]
    RemoteOperation { message: String },

    #[error("Task {operation} did not finish within {timeout_ms}ms")]
    #[diagnostic(
        code(drsctl::timeout),
        help(
            "The change may still complete on the server. Increase --wait, \
             then run the same command again to confirm."
        )
    )]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Request timed out")]
    #[diagnostic(
        code(drsctl::request_timeout),
        help("Increase --timeout or check vCenter responsiveness.")
    )]
    RequestTimeout,

    #[error("Cancelled")]
    #[diagnostic(code(drsctl::cancelled))]
    Cancelled,

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(drsctl::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(drsctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(code(drsctl::profile_not_found), help("Available profiles: {available}"))]
    ProfileNotFound { name: String, available: String },

    #[error("No vCenter configured")]
    #[diagnostic(
        code(drsctl::no_config),
        help(
            "Pass --hostname (or DRSCTL_HOSTNAME), or add a profile to the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(drsctl::config))]
    Config { message: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(drsctl::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    #[diagnostic(code(drsctl::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::PermissionDenied { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::UnsupportedContext { .. } => exit_code::UNSUPPORTED,
            Self::Timeout { .. } | Self::RequestTimeout => exit_code::TIMEOUT,
            Self::Cancelled => exit_code::CANCELLED,
            Self::InvalidState { .. } | Self::Validation { .. } | Self::ProfileNotFound { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::PermissionDenied { message } => CliError::PermissionDenied { message },
            CoreError::Timeout => CliError::RequestTimeout,
            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::ApiError {
                message: format!("{entity_type} {identifier} not found"),
            },
            CoreError::InvalidResponse { message } | CoreError::Api { message, .. } => {
                CliError::ApiError { message }
            }
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ReconcileError → CliError mapping ────────────────────────────────

impl From<ReconcileError> for CliError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::NotFound { target } => CliError::NotFound { vm: target },
            ReconcileError::UnsupportedContext { reason } => CliError::UnsupportedContext { reason },
            ReconcileError::InvalidState { value, allowed } => CliError::InvalidState {
                value,
                allowed: allowed.join(", "),
            },
            ReconcileError::InvalidArgument { field, reason } => {
                CliError::Validation { field, reason }
            }
            ReconcileError::RemoteOperation { message } => CliError::RemoteOperation { message },
            ReconcileError::Timeout {
                operation,
                timeout_ms,
            } => CliError::Timeout {
                operation,
                timeout_ms,
            },
            ReconcileError::Cancelled => CliError::Cancelled,
            ReconcileError::Store { message } => CliError::ApiError { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Keyring { message } => CliError::Validation {
                field: "keyring".into(),
                reason: message,
            },
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => {
                CliError::Config {
                    message: other.to_string(),
                }
            }
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
