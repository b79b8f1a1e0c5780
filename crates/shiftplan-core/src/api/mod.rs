//! HTTP client wrapper for the scheduling backend.
//!
//! Session requests go through [`ApiClient::execute`], which attaches the
//! bearer credential held by the installed [`AuthHooks`] and reports `401`
//! responses back to them before the caller sees the response. The login
//! exchange uses [`ApiClient::execute_unauthenticated`].

mod endpoints;
mod error;
mod types;

use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::{Method, RequestBuilder, Response, StatusCode};

pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use types::{NewUser, Plan, PlanningPeriod, Profile, User};

use crate::config::Config;

/// Standard User-Agent header for shiftplan API requests.
pub const USER_AGENT: &str = concat!("shiftplan/", env!("CARGO_PKG_VERSION"));

/// Credential source and unauthorized-response sink for [`ApiClient`].
///
/// Implemented by the session store.
pub trait AuthHooks: Send + Sync {
    /// Credential to attach to the next outgoing request, if any.
    fn credential(&self) -> Option<String>;

    /// Called when a response came back `401`, before it is returned to the
    /// caller. `sent_credential` is the credential the request carried.
    fn on_unauthorized(&self, sent_credential: Option<&str>);
}

/// The single network egress point.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    hooks: OnceLock<Weak<dyn AuthHooks>>,
}

impl ApiClient {
    /// Creates a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            hooks: OnceLock::new(),
        })
    }

    /// Creates a client from configuration (env > config > default URL).
    ///
    /// # Errors
    /// Returns an error if the API URL is invalid or the client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.effective_api_url()?, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Installs the auth hooks. Allowed exactly once per client.
    ///
    /// # Errors
    /// Returns an error if hooks were already installed.
    pub fn install_auth_hooks(&self, hooks: Weak<dyn AuthHooks>) -> Result<()> {
        if self.hooks.set(hooks).is_err() {
            bail!("auth hooks already installed on this API client");
        }
        Ok(())
    }

    pub fn has_auth_hooks(&self) -> bool {
        self.hooks.get().is_some()
    }

    fn hooks(&self) -> Option<Arc<dyn AuthHooks>> {
        self.hooks.get().and_then(Weak::upgrade)
    }

    /// Starts a request for `path` relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.http.request(method, url)
    }

    /// Sends a request through the auth decorator.
    ///
    /// Non-2xx responses are returned as-is; only transport failures become
    /// errors here. A `401` notifies the hooks first.
    ///
    /// # Errors
    /// Returns `NetworkUnavailable` if the request could not be sent.
    pub async fn execute(&self, request: RequestBuilder) -> ApiResult<Response> {
        self.send(request, true).await
    }

    /// Sends a request without the session credential. A `401` goes straight
    /// back to the caller; the hooks are not notified.
    ///
    /// Used for the credential exchange.
    ///
    /// # Errors
    /// Returns `NetworkUnavailable` if the request could not be sent.
    pub async fn execute_unauthenticated(&self, request: RequestBuilder) -> ApiResult<Response> {
        self.send(request, false).await
    }

    async fn send(&self, request: RequestBuilder, authenticated: bool) -> ApiResult<Response> {
        let sent_credential = if authenticated {
            self.hooks().and_then(|hooks| hooks.credential())
        } else {
            None
        };
        let request = match &sent_credential {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|err| ApiError::network(&err))?;

        if authenticated && response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!(
                path = %response.url().path(),
                with_credential = sent_credential.is_some(),
                "unauthorized response"
            );
            if let Some(hooks) = self.hooks() {
                hooks.on_unauthorized(sent_credential.as_deref());
            }
        }

        Ok(response)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("hooks_installed", &self.has_auth_hooks())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoCredential;

    impl AuthHooks for NoCredential {
        fn credential(&self) -> Option<String> {
            None
        }

        fn on_unauthorized(&self, _sent_credential: Option<&str>) {}
    }

    #[test]
    fn test_hooks_install_only_once() {
        let client = ApiClient::new("http://localhost:1/api/", Duration::from_secs(1)).unwrap();
        let hooks: Arc<dyn AuthHooks> = Arc::new(NoCredential);

        client.install_auth_hooks(Arc::downgrade(&hooks)).unwrap();
        let err = client.install_auth_hooks(Arc::downgrade(&hooks)).unwrap_err();
        assert!(err.to_string().contains("already installed"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:1/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:1/api");
        let request = client.request(Method::GET, "/plans").build().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:1/api/plans");
    }

    #[test]
    fn test_dropped_hooks_are_ignored() {
        let client = ApiClient::new("http://localhost:1", Duration::from_secs(1)).unwrap();
        let hooks: Arc<dyn AuthHooks> = Arc::new(NoCredential);
        client.install_auth_hooks(Arc::downgrade(&hooks)).unwrap();
        drop(hooks);

        assert!(client.has_auth_hooks());
        assert!(client.hooks().is_none());
    }
}
