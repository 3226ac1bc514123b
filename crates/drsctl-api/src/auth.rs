// Session authentication
//
// `POST /api/session` with HTTP Basic credentials returns a session token
// as a bare JSON string. The token is kept on the client and sent in the
// `vmware-api-session-id` header on every later request.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::{VsphereClient, check_status, decode};
use crate::error::Error;

impl VsphereClient {
    /// Authenticate with username/password and store the session token.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.endpoint(&["api", "session"])?;

        debug!("logging in at {}", url);

        let resp = self
            .http()
            .post(url)
            .basic_auth(username, Some(password.expose_secret()))
            .send()
            .await
            .map_err(Error::Transport)?;

        let resp = match check_status(resp).await {
            Ok(resp) => resp,
            Err(Error::Authentication { message }) => {
                return Err(Error::Authentication {
                    message: format!("login failed for '{username}': {message}"),
                });
            }
            Err(e) => return Err(e),
        };

        let token: String = decode(resp).await?;
        if token.is_empty() {
            return Err(Error::Authentication {
                message: "server returned an empty session token".into(),
            });
        }
        self.set_session(SecretString::from(token));

        debug!("login successful");
        Ok(())
    }

    /// End the current session. A no-op when not logged in.
    pub async fn logout(&self) -> Result<(), Error> {
        if !self.has_session() {
            return Ok(());
        }

        let url = self.endpoint(&["api", "session"])?;
        debug!("logging out at {}", url);

        let builder = self.authorize(self.http().delete(url))?;
        let resp = builder.send().await.map_err(Error::Transport);
        self.clear_session();
        check_status(resp?).await?;

        debug!("logout complete");
        Ok(())
    }
}
