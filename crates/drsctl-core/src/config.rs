// ── Runtime connection configuration ──
//
// These types describe *how* to reach a vCenter endpoint. They carry
// credential data and connection tuning, but never touch disk.
// The CLI constructs a `ConnectionConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

pub const DEFAULT_PORT: u16 = 443;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed appliances). Matches the
    /// `validate_certs: false` default of the endpoint module.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for connecting to a single vCenter.
///
/// Built by the CLI, passed to `VsphereStore` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Hostname or IP of the vCenter server. A full URL
    /// (`https://host:port/`) is accepted as well and wins over `port`.
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Endpoint root URL derived from `hostname` and `port`.
    pub fn base_url(&self) -> Result<Url, CoreError> {
        let raw = if self.hostname.contains("://") {
            self.hostname.clone()
        } else {
            format!("https://{}:{}/", self.hostname, self.port)
        };
        Url::parse(&raw).map_err(|e| CoreError::Config {
            message: format!("invalid hostname '{}': {e}", self.hostname),
        })
    }
}
