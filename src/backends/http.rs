//! HTTP backend for the daemon's JSON web control API
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | fetch     | `GET /0/api/config` |
//! | submit    | `POST /{scope}/api/config/batch` with `{"changes": {...}}` |
//! | restart   | `POST /{scope}/api/config/restart` |
//! | login     | `POST /0/api/auth/login` |
//! | logout    | `POST /0/api/auth/logout` |
//! | status    | `GET /0/api/auth/status` |
//!
//! `{scope}` is `0` for the default scope and the camera id otherwise. The
//! session token goes out as `X-Session-Token` on every request; mutating
//! requests also carry the latest CSRF token as `X-CSRF-Token`. The CSRF
//! token is replaced from every config fetch, login and status check.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, trace, warn};

use crate::backend::ConfigBackend;
use crate::config::PanelConfig;
use crate::snapshot::ConfigSnapshot;
use crate::types::{BatchRequest, BatchResponse, ParamValue, Scope};
use crate::{PanelError, Result};

pub const SESSION_HEADER: &str = "X-Session-Token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Role granted by a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Role {
    Admin,
    User,
}

/// Body of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_token: String,
    pub csrf_token: String,
    pub role: Role,
    /// Session lifetime in seconds
    #[serde(default)]
    pub expires_in: u64,
}

/// Body of an auth status check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthStatus {
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Default)]
struct Tokens {
    session: Option<String>,
    csrf: Option<String>,
}

/// [`ConfigBackend`] speaking to the daemon over HTTP.
#[derive(Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    tokens: RwLock<Tokens>,
}

impl HttpBackend {
    /// Build a backend from `config`, using its timeouts and session token.
    pub fn new(config: &PanelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| PanelError::config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, &config.base_url, config.session_token.clone()))
    }

    /// Build a backend around an existing client.
    pub fn with_client(client: Client, base_url: &str, session_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens: RwLock::new(Tokens { session: session_token, csrf: None }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current session token, if logged in.
    pub fn session_token(&self) -> Option<String> {
        self.tokens().session
    }

    /// Latest CSRF token seen from the daemon.
    pub fn csrf_token(&self) -> Option<String> {
        self.tokens().csrf
    }

    /// Log in and keep the returned session and CSRF tokens.
    ///
    /// # Errors
    ///
    /// - [`PanelError::Unauthorized`] for bad credentials (HTTP 401)
    /// - [`PanelError::RateLimited`] after too many attempts (HTTP 429)
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let url = self.url(Scope::Default, "auth/login");
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(&Credentials { username, password })
            .send()
            .await?;

        let login: LoginResponse = match response.status() {
            StatusCode::UNAUTHORIZED => {
                warn!("Login rejected for user '{}'", username);
                return Err(PanelError::Unauthorized {
                    reason: "Invalid username or password".to_string(),
                });
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(PanelError::RateLimited),
            _ => check_status(response, "auth/login")?.json().await?,
        };

        {
            let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
            tokens.session = Some(login.session_token.clone());
            tokens.csrf = Some(login.csrf_token.clone());
        }
        info!(role = ?login.role, expires_in = login.expires_in, "Logged in");
        Ok(login)
    }

    /// End the session. Remote errors are ignored; local tokens are always
    /// cleared.
    pub async fn logout(&self) {
        let session = {
            let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
            tokens.csrf = None;
            tokens.session.take()
        };
        let Some(session) = session else {
            return;
        };

        let url = self.url(Scope::Default, "auth/logout");
        debug!("POST {}", url);
        if let Err(e) = self.client.post(&url).header(SESSION_HEADER, session).send().await {
            debug!("Logout request failed, ignoring: {}", e);
        }
        info!("Logged out");
    }

    /// Ask the daemon whether auth is required and whether we hold a valid
    /// session.
    pub async fn auth_status(&self) -> Result<AuthStatus> {
        let url = self.url(Scope::Default, "auth/status");
        debug!("GET {}", url);
        let response = self.authorize(self.client.get(&url), false).send().await?;
        let status: AuthStatus = check_status(response, "auth/status")?.json().await?;

        if let Some(csrf) = &status.csrf_token {
            self.set_csrf(csrf.clone());
        }
        Ok(status)
    }

    fn tokens(&self) -> Tokens {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_csrf(&self, csrf: String) {
        trace!("CSRF token refreshed");
        self.tokens.write().unwrap_or_else(PoisonError::into_inner).csrf = Some(csrf);
    }

    fn url(&self, scope: Scope, path: &str) -> String {
        endpoint_url(&self.base_url, scope, path)
    }

    fn authorize(&self, request: RequestBuilder, mutating: bool) -> RequestBuilder {
        let tokens = self.tokens();
        let mut request = request;
        if let Some(session) = tokens.session {
            request = request.header(SESSION_HEADER, session);
        }
        if let (true, Some(csrf)) = (mutating, tokens.csrf) {
            request = request.header(CSRF_HEADER, csrf);
        }
        request
    }
}

#[async_trait::async_trait]
impl ConfigBackend for HttpBackend {
    async fn fetch_config(&self) -> Result<ConfigSnapshot> {
        let url = self.url(Scope::Default, "config");
        debug!("GET {}", url);
        let response = self.authorize(self.client.get(&url), false).send().await?;
        let body = check_status(response, "config")?.text().await?;

        let snapshot = ConfigSnapshot::from_json(&body)?;
        if let Some(csrf) = snapshot.csrf_token() {
            self.set_csrf(csrf.to_string());
        }
        Ok(snapshot)
    }

    async fn submit_batch(
        &self,
        scope: Scope,
        changes: &BTreeMap<String, ParamValue>,
    ) -> Result<BatchResponse> {
        let url = self.url(scope, "config/batch");
        debug!("POST {} ({} change(s))", url, changes.len());
        let response = self
            .authorize(self.client.post(&url), true)
            .json(&BatchRequest { changes })
            .send()
            .await?;
        let body = check_status(response, "config/batch")?.text().await?;
        parse_batch_response(&body)
    }

    async fn apply_restart(&self, scope: Scope) -> Result<()> {
        let url = self.url(scope, "config/restart");
        debug!("POST {}", url);
        let response = self
            .authorize(self.client.post(&url), true)
            .send()
            .await
            .map_err(|e| PanelError::restart_failed(scope.to_string(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PanelError::restart_failed(scope.to_string(), format!("HTTP {}", status)));
        }
        Ok(())
    }
}

/// `{base}/{scope id}/api/{path}`
fn endpoint_url(base_url: &str, scope: Scope, path: &str) -> String {
    format!("{}/{}/api/{}", base_url, scope.id(), path)
}

fn check_status(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    trace!("{} returned {}", endpoint, status);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PanelError::Unauthorized {
            reason: format!("{} returned {}", endpoint, status),
        }),
        StatusCode::TOO_MANY_REQUESTS => Err(PanelError::RateLimited),
        _ => Err(PanelError::http_status(status.as_u16(), endpoint)),
    }
}

/// An empty body carries no per-parameter detail and counts as unstructured
/// success.
fn parse_batch_response(body: &str) -> Result<BatchResponse> {
    if body.trim().is_empty() {
        return Ok(BatchResponse::unstructured());
    }
    serde_json::from_str(body).map_err(|e| PanelError::decode("batch response", e.to_string()))
}
