//! GitHub Enterprise REST client

use crate::core::shutdown::ShutdownSignal;
use crate::core::validation::{non_blank, validate_http_url};
use crate::directory::error::{DirectoryError, DirectoryResult};
use crate::directory::pagination::{next_link, rate_limit_delay};
use crate::directory::types::{Organization, RepositoryMetadata, User};
use crate::directory::{GHE_API_PATH, PAGE_SIZE};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use url::Url;

/// Source of organizations and repository listings
///
/// Implemented by [`GheClient`] against the live API; discovery only depends
/// on this trait.
#[async_trait]
pub trait RepositoryDirectory: Send + Sync {
    /// Every organization visible to the credential, in API order
    async fn organizations(&self) -> DirectoryResult<Vec<String>>;

    /// Lazy page-by-page listing of one organization's repositories
    ///
    /// The stream ends after yielding the first error.
    fn repository_pages<'a>(
        &'a self,
        org: &'a str,
    ) -> BoxStream<'a, DirectoryResult<Vec<RepositoryMetadata>>>;
}

/// Connection settings for the enterprise API
#[derive(Clone, Default)]
pub struct DirectorySettings {
    pub base_url: String,
    pub token: String,
}

impl std::fmt::Debug for DirectorySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySettings")
            .field("base_url", &self.base_url)
            .field("token", &"REDACTED")
            .finish()
    }
}

/// Authenticated client for one enterprise instance
pub struct GheClient {
    http: reqwest::Client,
    api_root: Url,
    login: String,
    shutdown: ShutdownSignal,
}

impl GheClient {
    /// Validate settings, build the HTTP client and verify the credential
    pub async fn connect(
        settings: &DirectorySettings,
        shutdown: ShutdownSignal,
    ) -> DirectoryResult<Self> {
        let token = non_blank(Some(&settings.token)).ok_or_else(|| DirectoryError::Config {
            message: "GitHub Enterprise token is required".to_string(),
        })?;
        let base_url =
            non_blank(Some(&settings.base_url)).ok_or_else(|| DirectoryError::Config {
                message: "GitHub Enterprise API base URL is required".to_string(),
            })?;
        let api_root = api_root(base_url)?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            DirectoryError::Config {
                message: "GitHub Enterprise token contains invalid characters".to_string(),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let http = reqwest::Client::builder()
            .user_agent(concat!("reposec/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| DirectoryError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let mut client = Self {
            http,
            api_root,
            login: String::new(),
            shutdown,
        };

        let user: User = match client.get_json(client.endpoint(&["user"], false)?).await {
            Ok((user, _)) => user,
            Err(DirectoryError::Cancelled) => return Err(DirectoryError::Cancelled),
            Err(e) => {
                return Err(DirectoryError::Auth {
                    message: e.to_string(),
                })
            }
        };
        log::debug!("GitHub Enterprise token owner: {}", user.login);
        client.login = user.login;

        Ok(client)
    }

    /// Login of the identity behind the token
    pub fn login(&self) -> &str {
        &self.login
    }

    /// API root (`<base>/api/v3/`)
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    fn endpoint(&self, segments: &[&str], paginated: bool) -> DirectoryResult<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| DirectoryError::Config {
                message: format!("'{}' cannot be used as an API base URL", self.api_root),
            })?
            .pop_if_empty()
            .extend(segments);
        if paginated {
            url.query_pairs_mut()
                .append_pair("per_page", &PAGE_SIZE.to_string());
        }
        Ok(url)
    }

    /// Fetch one JSON document, waiting out rate limits
    ///
    /// Returns the decoded payload and the next page URL, if advertised.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> DirectoryResult<(T, Option<Url>)> {
        loop {
            let response = tokio::select! {
                result = self.http.get(url.clone()).send() => {
                    result.map_err(|e| DirectoryError::Network {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?
                }
                _ = self.shutdown.cancelled() => return Err(DirectoryError::Cancelled),
            };

            let status = response.status();
            if let Some(wait) = rate_limit_delay(status, response.headers(), chrono::Utc::now()) {
                log::warn!(
                    "Rate limited by GitHub Enterprise on {}, sleeping {}s until reset",
                    url.path(),
                    wait.as_secs()
                );
                tokio::select! {
                    _ = tokio::time::sleep(wait) => continue,
                    _ = self.shutdown.cancelled() => return Err(DirectoryError::Cancelled),
                }
            }

            let next = next_link(response.headers()).and_then(|link| match Url::parse(&link) {
                Ok(next) => Some(next),
                Err(e) => {
                    log::warn!("Ignoring unparsable pagination link '{}': {}", link, e);
                    None
                }
            });

            let body = tokio::select! {
                result = response.bytes() => result.map_err(|e| DirectoryError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                })?,
                _ = self.shutdown.cancelled() => return Err(DirectoryError::Cancelled),
            };

            if !status.is_success() {
                return Err(DirectoryError::Http {
                    url: url.to_string(),
                    status: status.as_u16(),
                    message: api_error_message(&body),
                });
            }

            let payload = serde_json::from_slice(&body).map_err(|e| DirectoryError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })?;

            return Ok((payload, next));
        }
    }
}

#[async_trait]
impl RepositoryDirectory for GheClient {
    async fn organizations(&self) -> DirectoryResult<Vec<String>> {
        log::debug!("listing organizations");
        let mut all_orgs = Vec::new();
        let mut next = Some(self.endpoint(&["organizations"], true)?);

        while let Some(url) = next {
            let (orgs, next_url): (Vec<Organization>, Option<Url>) = self.get_json(url).await?;
            all_orgs.extend(orgs.into_iter().map(|org| org.login));
            next = next_url;
        }

        log::debug!("listing organizations completed: {} organizations", all_orgs.len());
        Ok(all_orgs)
    }

    fn repository_pages<'a>(
        &'a self,
        org: &'a str,
    ) -> BoxStream<'a, DirectoryResult<Vec<RepositoryMetadata>>> {
        let first = match self.endpoint(&["orgs", org, "repos"], true) {
            Ok(url) => url,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        stream::try_unfold(Some(first), move |next| async move {
            let Some(url) = next else {
                return Ok::<_, DirectoryError>(None);
            };
            let (page, next_url): (Vec<RepositoryMetadata>, Option<Url>) =
                self.get_json(url).await?;
            Ok(Some((page, next_url)))
        })
        .boxed()
    }
}

/// Join the enterprise base URL with the fixed API path
fn api_root(base_url: &str) -> DirectoryResult<Url> {
    let trimmed = base_url.trim_end_matches('/');
    validate_http_url(trimmed).map_err(|message| DirectoryError::Config { message })?;
    Url::parse(&format!("{}{}", trimmed, GHE_API_PATH)).map_err(|e| DirectoryError::Config {
        message: format!("failed to parse GitHub Enterprise API URL: {}", e),
    })
}

/// Pull the `message` field out of an API error body, falling back to the raw text
fn api_error_message(body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct ApiError {
        message: String,
    }

    match serde_json::from_slice::<ApiError>(body) {
        Ok(err) => err.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}
