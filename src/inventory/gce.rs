use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::models::AggregatedList;
use super::{Error, InstanceLister, InstancePage, Result};

pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before the metadata server says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Only running instances are worth scraping.
const RUNNING_FILTER: &str = "status = RUNNING";

/// Where bearer tokens for the compute API come from.
pub enum TokenSource {
    /// A fixed token supplied by the operator.
    Static(String),
    /// The instance service account, via the GCE metadata server.
    Metadata,
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.debug_tuple("Static").field(&"<redacted>").finish(),
            Self::Metadata => f.write_str("Metadata"),
        }
    }
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Lists instances through the Compute Engine REST API.
#[derive(Debug)]
pub struct GceLister {
    client: reqwest::Client,
    endpoint: String,
    metadata_url: String,
    token_source: TokenSource,
    cached_token: Mutex<Option<CachedToken>>,
}

impl GceLister {
    /// Creates a lister talking to `endpoint`, e.g. [`DEFAULT_COMPUTE_ENDPOINT`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, token_source: TokenSource) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gcesd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Client)?;
        let endpoint = endpoint.into().trim_end_matches('/').to_owned();

        Ok(Self {
            client,
            endpoint,
            metadata_url: METADATA_TOKEN_URL.to_owned(),
            token_source,
            cached_token: Mutex::new(None),
        })
    }

    /// Fetches [`TokenSource::Metadata`] tokens from `url` instead of the
    /// GCE metadata server.
    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = url.into();
        self
    }

    async fn access_token(&self) -> Result<String> {
        match &self.token_source {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata => {
                let mut cached = self.cached_token.lock().await;
                if let Some(token) = cached.as_ref() {
                    if Instant::now() < token.expires_at {
                        return Ok(token.token.clone());
                    }
                }

                let token = self.fetch_metadata_token().await?;
                let value = token.token.clone();
                *cached = Some(token);
                Ok(value)
            }
        }
    }

    async fn fetch_metadata_token(&self) -> Result<CachedToken> {
        log::debug!("requesting access token from metadata server");
        let response = self
            .client
            .get(&self.metadata_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(Error::Token)?;
        if !response.status().is_success() {
            return Err(Error::TokenStatus {
                status: response.status().as_u16(),
            });
        }
        let body: TokenResponse = response.json().await.map_err(Error::Token)?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        Ok(CachedToken {
            token: body.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}

impl InstanceLister for GceLister {
    async fn list_page(&self, project: &str, page_token: Option<&str>) -> Result<InstancePage> {
        let token = self.access_token().await?;
        let url = format!("{}/projects/{}/aggregated/instances", self.endpoint, project);

        let mut request = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("filter", RUNNING_FILTER)]);
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let request_error = |source| Error::Request {
            project: project.to_owned(),
            source,
        };
        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                project: project.to_owned(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(request_error)?;
        let list: AggregatedList =
            serde_json::from_slice(&body).map_err(|source| Error::Decode {
                project: project.to_owned(),
                source,
            })?;

        Ok(list.into_page(project))
    }
}
