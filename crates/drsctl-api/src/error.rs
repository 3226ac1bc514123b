use thiserror::Error;

/// Top-level error type for the `drsctl-api` crate.
///
/// Covers every failure mode of the management endpoint: session auth,
/// transport, HTTP status classes, and response decoding.
/// `drsctl-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed, or the session was rejected (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// No session token -- `login()` has not been called.
    #[error("Not logged in -- call login() first")]
    NoSession,

    /// The session lacks privileges for the request (HTTP 403).
    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// The requested object does not exist (HTTP 404).
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Any other non-success response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}
