//! HTTP fetch wrapper over the Changes REST API.
//!
//! [`ApiClient`] owns one `reqwest` client bound to the API base URL
//! and classifies every response into the dashboard's taxonomy:
//! success is 2xx or 304, anything else is an error carrying the raw
//! status code and body. Authentication rides along on cookies; there
//! is no token handling.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::link::{PageLinks, QueryParams, parse_link_header};
use crate::state::FetchState;

/// One successfully-fetched response: the decoded body plus the
/// pagination targets parsed from the `Link` header.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiPage<T> {
    /// Decoded response body.
    pub data: T,
    /// Pagination targets, empty when the endpoint is not paginated.
    pub links: PageLinks,
}

/// Client for the Changes REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// The configured API base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issue a GET and decode the JSON body.
    ///
    /// # Errors
    ///
    /// [`ApiError::Transport`] when the request cannot be completed,
    /// [`ApiError::Status`] for any response outside 2xx/304, and
    /// [`ApiError::Decode`] when the body does not match `T`. (A 304
    /// only appears when conditional headers were sent; this client
    /// sends none, so in practice 304 never reaches the decoder.)
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<ApiPage<T>, ApiError> {
        let url = self.url_for(path);
        debug!(url = url, "GET");

        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        let links = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|value| value.to_str().ok())
            .map(parse_link_header)
            .unwrap_or_default();

        if !(status.is_success() || status == reqwest::StatusCode::NOT_MODIFIED) {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(format!("GET {url} body read failed: {e}")))?;
        let data: T = serde_json::from_slice(&bytes)?;

        Ok(ApiPage { data, links })
    }

    /// Issue a POST with a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::get_json`].
    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url_for(path);
        debug!(url = url, "POST");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: T = response.json().await.map_err(|e| {
            ApiError::Transport(format!("POST {url} response decode failed: {e}"))
        })?;
        Ok(data)
    }

    /// Issue a GET and fold the outcome into a view-facing
    /// [`FetchState`] instead of a `Result`.
    ///
    /// This is the fetch surface views hold directly: failures are
    /// state to render, never errors to propagate.
    pub async fn get_state<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> FetchState<T> {
        FetchState::from_result(self.get_json(path, params).await.map(|page| page.data))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
