// ── Core error types ──
//
// `CoreError` is what a `StateStore` adapter reports when it cannot do its
// job (transport, auth, bad responses). Consumers never see HTTP status
// codes or JSON parse failures directly; `From<drsctl_api::Error>`
// translates them.
//
// `ReconcileError` is the classified outcome carried inside a
// `ReconcileResult`. It is serializable so the CLI can print it verbatim.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::model::DrsBehavior;

/// Unified error type for store adapters and connection setup.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Unexpected response from server: {message}")]
    InvalidResponse { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<drsctl_api::Error> for CoreError {
    fn from(err: drsctl_api::Error) -> Self {
        match err {
            drsctl_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            drsctl_api::Error::NoSession => CoreError::AuthenticationFailed {
                message: "no active session".into(),
            },
            drsctl_api::Error::Forbidden { message } => CoreError::PermissionDenied { message },
            drsctl_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            drsctl_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            drsctl_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            drsctl_api::Error::NotFound { path } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: path,
            },
            drsctl_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            drsctl_api::Error::Deserialization { message, body: _ } => {
                CoreError::InvalidResponse { message }
            }
        }
    }
}

// ── Reconcile outcome classification ─────────────────────────────────

/// Why a reconcile call did not converge.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum ReconcileError {
    #[error("VM '{target}' not found")]
    #[serde(rename = "NotFoundError")]
    NotFound { target: String },

    #[error("DRS configuration is not supported here: {reason}")]
    #[serde(rename = "UnsupportedContextError")]
    UnsupportedContext { reason: String },

    #[error("invalid DRS behavior '{value}' (expected one of: {})", .allowed.join(", "))]
    #[serde(rename = "InvalidStateError")]
    InvalidState { value: String, allowed: Vec<String> },

    #[error("invalid {field}: {reason}")]
    #[serde(rename = "InvalidArgumentError")]
    InvalidArgument { field: String, reason: String },

    #[error("Failed to set DRS override: {message}")]
    #[serde(rename = "RemoteOperationError")]
    RemoteOperation { message: String },

    #[error("operation {operation} did not finish within {timeout_ms}ms")]
    #[serde(rename = "TimeoutError")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("reconcile cancelled")]
    #[serde(rename = "CancelledError")]
    Cancelled,

    #[error("state store failure: {message}")]
    #[serde(rename = "StoreError")]
    Store { message: String },
}

impl ReconcileError {
    pub fn invalid_state(value: &str) -> Self {
        Self::InvalidState {
            value: value.to_owned(),
            allowed: DrsBehavior::allowed()
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }

    pub fn timeout(operation: &str, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.to_owned(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Classify a store failure without consuming it.
    pub fn store(err: &CoreError) -> Self {
        Self::Store {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for ReconcileError {
    fn from(err: CoreError) -> Self {
        Self::store(&err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_failure_serializes_with_kind() {
        let err = ReconcileError::RemoteOperation {
            message: "Cluster is locked".into(),
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "kind": "RemoteOperationError", "message": "Cluster is locked" })
        );
        assert_eq!(
            err.to_string(),
            "Failed to set DRS override: Cluster is locked"
        );
    }

    #[test]
    fn timeout_fields_are_camel_case() {
        let err = ReconcileError::timeout("task-9", Duration::from_secs(30));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "kind": "TimeoutError", "operation": "task-9", "timeoutMs": 30000 })
        );
    }

    #[test]
    fn invalid_state_lists_allowed_values() {
        let err = ReconcileError::invalid_state("auto");
        assert_eq!(
            err.to_string(),
            "invalid DRS behavior 'auto' (expected one of: manual, partiallyAutomated, fullyAutomated)"
        );
    }

    #[test]
    fn api_not_found_maps_to_core_not_found() {
        let core: CoreError = drsctl_api::Error::NotFound {
            path: "/api/vcenter/vm".into(),
        }
        .into();
        assert!(matches!(core, CoreError::NotFound { .. }));
    }

    #[test]
    fn store_errors_keep_the_message() {
        let err: ReconcileError = CoreError::AuthenticationFailed {
            message: "session expired".into(),
        }
        .into();
        assert_eq!(
            err,
            ReconcileError::Store {
                message: "Authentication failed: session expired".into()
            }
        );
    }
}
