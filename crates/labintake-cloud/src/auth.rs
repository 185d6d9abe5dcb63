//! OAuth2 PKCE authentication flow for the mail and storage APIs
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) for a
//! native application, plus the non-interactive side used during runs.
//!
//! ## Components
//!
//! - [`OAuthConfig`] - Client, endpoints and scopes for one login
//! - [`StoredToken`] / [`TokenFileStorage`] - Token persistence as a JSON file
//! - [`PKCEFlow`] - OAuth2 PKCE challenge/exchange/refresh logic
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`OAuthLogin`] - Orchestrates the interactive consent flow
//! - [`OAuthCredentialProvider`] - `ICredentialProvider` with silent refresh

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use labintake_core::config::AuthConfig;
use labintake_core::ports::credentials::{AccessToken, ICredentialProvider};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Scope allowing mail to be sent from the authorized account
pub const MAIL_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

/// Scope allowing objects to be written to storage buckets
pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";

/// Tokens this close to expiry are refreshed before use
const EXPIRY_SKEW_SECS: i64 = 60;

/// Which API a login grants access to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    /// Sending rejection alerts
    Mail,
    /// Uploading to buckets
    Storage,
}

impl TokenPurpose {
    /// OAuth scopes requested for this purpose
    pub fn scopes(&self) -> Vec<String> {
        match self {
            TokenPurpose::Mail => vec![MAIL_SCOPE.to_string()],
            TokenPurpose::Storage => vec![STORAGE_SCOPE.to_string()],
        }
    }
}

impl std::fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenPurpose::Mail => "mail",
            TokenPurpose::Storage => "storage",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// OAuthConfig
// ============================================================================

/// Configuration for one OAuth2 login
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret, if the client type has one
    pub client_secret: Option<String>,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// Loopback port the callback server binds to
    pub redirect_port: u16,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Builds the login configuration for `purpose` from the `auth` section
    ///
    /// # Errors
    /// Fails if no client ID is configured.
    pub fn from_settings(auth: &AuthConfig, purpose: TokenPurpose) -> Result<Self> {
        let client_id = auth
            .client_id
            .clone()
            .context("auth.client_id is not set in the configuration")?;
        Ok(Self {
            client_id,
            client_secret: auth.client_secret.clone(),
            auth_url: auth.auth_url.clone(),
            token_url: auth.token_url.clone(),
            redirect_port: auth.redirect_port,
            scopes: purpose.scopes(),
        })
    }

    /// Redirect URI registered for the loopback callback
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.redirect_port)
    }

    /// Replaces the requested scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

// ============================================================================
// Token persistence
// ============================================================================

/// OAuth tokens as persisted on disk
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Bearer token
    pub access_token: String,
    /// Long-lived token used for silent refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    /// Scopes the token was granted for
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    /// Returns true if the access token is expired or about to expire
    pub fn needs_refresh(&self) -> bool {
        self.expires_at <= Utc::now() + Duration::seconds(EXPIRY_SKEW_SECS)
    }

    /// The access token in port form
    pub fn access(&self) -> AccessToken {
        AccessToken::new(self.access_token.clone(), Some(self.expires_at))
    }
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Stores OAuth tokens as a JSON file readable only by the owner
#[derive(Debug, Clone)]
pub struct TokenFileStorage {
    path: PathBuf,
}

impl TokenFileStorage {
    /// Creates a storage backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the token file, creating its directory if needed
    pub async fn store(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_vec_pretty(token).context("Failed to serialize token")?;

        // Write next to the target and rename, so a crash never leaves half a token
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        restrict_permissions(&tmp).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Stored token");
        Ok(())
    }

    /// Loads the token file
    ///
    /// # Returns
    /// `Some(token)` if the file exists, `None` if it does not
    pub async fn load(&self) -> Result<Option<StoredToken>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let token = serde_json::from_slice(&bytes).with_context(|| {
                    format!("Failed to parse token file {}", self.path.display())
                })?;
                Ok(Some(token))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No token file");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to read token file {}", self.path.display()))),
        }
    }

    /// Removes the token file
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Cleared token");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete token file")),
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .with_context(|| format!("Failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
///
/// Handles generating authorization URLs with PKCE challenges,
/// exchanging authorization codes for tokens, and refreshing tokens.
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    scopes: Vec<String>,
    http: reqwest::Client,
}

impl PKCEFlow {
    /// Creates a new PKCEFlow with the given configuration
    pub fn new(config: &OAuthConfig) -> Result<Self> {
        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri()).context("Invalid redirect URI")?,
            );
        if let Some(secret) = &config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        // Token endpoints must not redirect; following one would leak the code
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            scopes: config.scopes.clone(),
            http,
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Offline access is requested so the consent yields a refresh token.
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    /// The `pkce_verifier` must be kept until the code exchange step.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent");

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request.set_pkce_challenge(pkce_challenge).url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for OAuth tokens
    ///
    /// # Arguments
    /// * `code` - The authorization code received from the callback
    /// * `pkce_verifier` - The PKCE verifier generated alongside the auth URL
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<StoredToken> {
        info!("Exchanging authorization code for tokens");

        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http)
            .await
            .context("Failed to exchange authorization code")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        let token = StoredToken {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at,
            scopes: self.scopes.clone(),
        };

        info!("Successfully obtained OAuth tokens");
        Ok(token)
    }

    /// Refreshes an expired access token using a refresh token
    ///
    /// The refresh token is kept when the response does not rotate it.
    pub async fn refresh_token(&self, current: &StoredToken) -> Result<StoredToken> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .context("Token has no refresh token")?;

        info!("Refreshing access token");

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .context("Failed to refresh token")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        let token = StoredToken {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at,
            scopes: current.scopes.clone(),
        };

        info!("Successfully refreshed access token");
        Ok(token)
    }
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Minimal HTTP server that listens on localhost for the OAuth2 redirect callback.
///
/// Waits for the browser to be redirected back with an authorization code,
/// answers with a small HTML page, and shuts down.
pub struct LocalCallbackServer;

/// Parameters extracted from the OAuth2 callback
#[derive(Debug)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

impl LocalCallbackServer {
    /// Starts the local callback server on `127.0.0.1:{port}` and waits for
    /// the OAuth redirect
    ///
    /// Requests without a code (favicon fetches, user-denied consent) get an
    /// error page and the server keeps waiting.
    ///
    /// # Returns
    /// The callback parameters (code and state) extracted from the redirect URL
    pub async fn start(port: u16) -> Result<CallbackParams> {
        use std::convert::Infallible;

        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, Response, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::net::TcpListener;
        use tokio::sync::mpsc;

        let addr = format!("127.0.0.1:{port}");
        info!(%addr, "Starting local OAuth callback server");

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind callback server to {addr}"))?;

        let (tx, mut rx) = mpsc::channel::<CallbackParams>(1);

        loop {
            tokio::select! {
                received = rx.recv() => {
                    let params = received
                        .context("Callback server channel closed without receiving parameters")?;
                    info!("Received OAuth callback with authorization code");
                    return Ok(params);
                }
                accepted = listener.accept() => {
                    let (stream, _addr) =
                        accepted.context("Failed to accept connection on callback server")?;
                    let io = TokioIo::new(stream);
                    let tx = tx.clone();

                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let tx = tx.clone();
                        async move {
                            let uri = req.uri().to_string();
                            debug!("Callback server received request: {}", uri);

                            let (status, html) = match parse_callback_params(&uri) {
                                Some(params) => {
                                    let _ = tx.send(params).await;
                                    (StatusCode::OK, success_html())
                                }
                                None => (
                                    StatusCode::BAD_REQUEST,
                                    error_html("Missing authorization code in callback"),
                                ),
                            };

                            let mut response = Response::new(Full::new(Bytes::from(html)));
                            *response.status_mut() = status;
                            response.headers_mut().insert(
                                hyper::header::CONTENT_TYPE,
                                hyper::header::HeaderValue::from_static("text/html; charset=utf-8"),
                            );
                            Ok::<_, Infallible>(response)
                        }
                    });

                    tokio::spawn(async move {
                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            warn!("Callback server connection error: {}", e);
                        }
                    });
                }
            }
        }
    }
}

/// Parses the authorization code and state from a callback URI
fn parse_callback_params(uri: &str) -> Option<CallbackParams> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    let mut code = None;
    let mut state = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            _ => {}
        }
    }

    Some(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

/// Returns the HTML for a successful authentication page
fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>LabIntake - Authorization Complete</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Complete</h1>
    <p>LabIntake can now use this account.</p>
    <p>You can close this window and return to the terminal.</p>
</body>
</html>"#
        .to_string()
}

/// Returns the HTML for an authentication error page
fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>LabIntake - Authorization Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Error</h1>
    <p>{}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#,
        message
    )
}

// ============================================================================
// OAuthLogin
// ============================================================================

/// Interactive consent flow, run by `labintake auth login`
///
/// 1. Generates a PKCE authorization URL
/// 2. Opens the user's browser (the URL is also returned for printing)
/// 3. Waits on the loopback callback server
/// 4. Verifies the CSRF state and exchanges the code for tokens
/// 5. Persists the tokens
pub struct OAuthLogin {
    config: OAuthConfig,
    storage: TokenFileStorage,
}

impl OAuthLogin {
    /// Creates a login flow persisting into `storage`
    pub fn new(config: OAuthConfig, storage: TokenFileStorage) -> Self {
        Self { config, storage }
    }

    /// Performs the full interactive login
    ///
    /// # Arguments
    /// * `on_url` - Called with the authorization URL before waiting, so the
    ///   caller can print it when no browser can be opened
    pub async fn login(&self, on_url: impl FnOnce(&str)) -> Result<StoredToken> {
        info!(scopes = ?self.config.scopes, "Starting OAuth2 PKCE login flow");

        let flow = PKCEFlow::new(&self.config)?;
        let (auth_url, csrf_token, pkce_verifier) = flow.generate_auth_url();

        on_url(&auth_url);
        if let Err(e) = webbrowser::open(&auth_url) {
            warn!(error = %e, "Failed to open browser; use the printed URL");
        }

        let callback = LocalCallbackServer::start(self.config.redirect_port).await?;
        if callback.state != *csrf_token.secret() {
            anyhow::bail!("OAuth state mismatch; the callback did not come from this login");
        }

        let token = flow.exchange_code(callback.code, pkce_verifier).await?;
        self.storage.store(&token).await?;

        info!(path = %self.storage.path().display(), "OAuth2 PKCE login completed successfully");
        Ok(token)
    }

    /// Returns a reference to the current configuration
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }
}

// ============================================================================
// OAuthCredentialProvider
// ============================================================================

/// Non-interactive token source used during runs
///
/// Loads the persisted token, refreshes it silently when it is about to
/// expire, and persists the refreshed token. Never prompts: when no usable
/// token can be produced it answers `None`.
pub struct OAuthCredentialProvider {
    storage: TokenFileStorage,
    config: Option<OAuthConfig>,
}

impl OAuthCredentialProvider {
    /// Creates a provider
    ///
    /// # Arguments
    /// * `storage` - Where the token lives
    /// * `config` - Client settings for refresh; `None` disables refresh
    pub fn new(storage: TokenFileStorage, config: Option<OAuthConfig>) -> Self {
        Self { storage, config }
    }

    /// Token storage used by this provider
    pub fn storage(&self) -> &TokenFileStorage {
        &self.storage
    }
}

#[async_trait::async_trait]
impl ICredentialProvider for OAuthCredentialProvider {
    async fn authorized_token(&self) -> Result<Option<AccessToken>> {
        let Some(token) = self.storage.load().await? else {
            return Ok(None);
        };

        if !token.needs_refresh() {
            return Ok(Some(token.access()));
        }

        let Some(config) = &self.config else {
            warn!("Access token expired and no OAuth client is configured for refresh");
            return Ok(None);
        };
        if token.refresh_token.is_none() {
            warn!(path = %self.storage.path().display(), "Access token expired and no refresh token is stored");
            return Ok(None);
        }

        let refreshed = match PKCEFlow::new(config)?.refresh_token(&token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Token refresh failed");
                return Ok(None);
            }
        };

        if let Err(e) = self.storage.store(&refreshed).await {
            // The fresh token is still usable for this run
            warn!(error = %format!("{e:#}"), "Failed to persist refreshed token");
        }
        Ok(Some(refreshed.access()))
    }
}
