// vCenter HTTP client
//
// Wraps `reqwest::Client` with session-header injection, URL construction,
// and status/body decoding. Endpoint methods live in `auth.rs` and
// `vcenter.rs` as inherent impls to keep this module on transport mechanics.

use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Header carrying the session token on every authenticated request.
pub const SESSION_HEADER: &str = "vmware-api-session-id";

/// Raw HTTP client for a vCenter management endpoint.
///
/// Holds the session token obtained by [`login()`](Self::login). All
/// request helpers return decoded bodies; non-success statuses are mapped
/// into [`Error`] variants before the caller sees them.
pub struct VsphereClient {
    http: reqwest::Client,
    base_url: Url,
    session: RwLock<Option<SecretString>>,
}

impl VsphereClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the endpoint root, e.g. `https://vcenter.example.com:443/`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            session: RwLock::new(None),
        }
    }

    /// The endpoint base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client (for auth flows that need direct access).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Whether a session token is currently held.
    pub fn has_session(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    // ── Session token management ──────────────────────────────────────

    pub(crate) fn set_session(&self, token: SecretString) {
        debug!("storing session token");
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub(crate) fn clear_session(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Attach the session header, failing if there is no session.
    pub(crate) fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let guard = self.session.read().unwrap_or_else(PoisonError::into_inner);
        let token = guard.as_ref().ok_or(Error::NoSession)?;
        Ok(builder.header(SESSION_HEADER, token.expose_secret()))
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build an endpoint URL from path segments, percent-encoding each one.
    ///
    /// `endpoint(&["api", "vcenter", "vm"])` → `{base}/api/vcenter/vm`
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated GET, decoding the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let builder = self.authorize(self.http.get(url))?;
        let resp = builder.send().await.map_err(Error::Transport)?;
        decode(check_status(resp).await?).await
    }

    /// Authenticated GET where HTTP 404 means "absent" rather than failure.
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Option<T>, Error> {
        match self.get(url).await {
            Ok(value) => Ok(Some(value)),
            Err(Error::NotFound { path }) => {
                trace!(%path, "object absent");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Authenticated POST with a JSON body, decoding the JSON response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let builder = self.authorize(self.http.post(url).json(body))?;
        let resp = builder.send().await.map_err(Error::Transport)?;
        decode(check_status(resp).await?).await
    }
}

/// Map non-success statuses into typed errors, passing 2xx through.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let path = resp.url().path().to_owned();
    let body = resp.text().await.unwrap_or_default();
    let preview: String = body.chars().take(200).collect();

    Err(match status {
        reqwest::StatusCode::UNAUTHORIZED => Error::Authentication {
            message: if preview.is_empty() {
                "session expired or invalid credentials".into()
            } else {
                preview
            },
        },
        reqwest::StatusCode::FORBIDDEN => Error::Forbidden {
            message: format!("insufficient privileges for {path}"),
        },
        reqwest::StatusCode::NOT_FOUND => Error::NotFound { path },
        _ => Error::Api {
            status: status.as_u16(),
            message: preview,
        },
    })
}

/// Decode a JSON body, keeping the raw text on failure.
pub(crate) async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await.map_err(Error::Transport)?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}
