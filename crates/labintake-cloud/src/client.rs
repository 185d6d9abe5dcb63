//! Authenticated HTTP client
//!
//! Wraps `reqwest::Client` with base URL handling and bearer authentication.
//! The access token is fetched from an [`ICredentialProvider`] for every
//! request, so a token refreshed between requests is picked up without
//! rebuilding the client.

use std::sync::Arc;

use labintake_core::ports::credentials::ICredentialProvider;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::{debug, warn};
use url::Url;

use crate::CloudError;

/// Longest response body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// HTTP client bound to one service base URL and one credential source
#[derive(Clone)]
pub struct CloudClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: Url,
    /// Source of bearer tokens
    credentials: Arc<dyn ICredentialProvider>,
}

impl CloudClient {
    /// Creates a client for the service at `base_url`
    ///
    /// # Arguments
    /// * `base_url` - Service root, e.g. `https://storage.googleapis.com`
    /// * `credentials` - Source of bearer tokens
    ///
    /// # Errors
    /// Returns [`CloudError::InvalidEndpoint`] if `base_url` does not parse
    /// or cannot carry path segments.
    pub fn with_base_url(
        base_url: &str,
        credentials: Arc<dyn ICredentialProvider>,
    ) -> Result<Self, CloudError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CloudError::InvalidEndpoint(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CloudError::InvalidEndpoint(base_url.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            credentials,
        })
    }

    /// The service base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds a URL by appending percent-encoded path segments to the base
    ///
    /// Each segment is encoded on its own, so a `/` inside an object key
    /// stays part of the key.
    pub fn url(&self, segments: &[&str]) -> Result<Url, CloudError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| CloudError::InvalidEndpoint(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// Creates an authenticated request builder for the given method and URL
    ///
    /// # Errors
    /// Returns [`CloudError::MissingToken`] when the credential provider has
    /// no usable token. Store read failures are reported the same way after
    /// being logged.
    pub async fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder, CloudError> {
        let token = match self.credentials.authorized_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(CloudError::MissingToken),
            Err(e) => {
                warn!(error = %e, "Failed to load access token");
                return Err(CloudError::MissingToken);
            }
        };

        debug!(%method, %url, "Sending authorized request");
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(token.secret()))
    }

    /// Turns a non-success response into a classified [`CloudError`]
    pub async fn check(response: Response) -> Result<Response, CloudError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Err(CloudError::from_status(status, body))
    }
}
