//! Network boundary between fetch clients and the backend routes.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::FetchError;

/// Status line and body of a completed backend response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GET requests against backend routes.
///
/// Implementations only fail with [`FetchError::Network`]; any HTTP
/// response, including non-2xx, is returned as a [`RawResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// `path` is relative to the backend root and may carry a query string.
    /// `force` asks the backend to bypass its own cache.
    async fn get(&self, path: &str, force: bool) -> Result<RawResponse, FetchError>;
}

/// reqwest-backed transport rooted at the dashboard API.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: with_trailing_slash(base_url),
        })
    }

    /// Resolve a route path against the base URL.
    pub fn route_url(&self, path: &str, force: bool) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::Network(format!("invalid route {path}: {e}")))?;
        if force {
            url.query_pairs_mut().append_pair("force", "true");
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, force: bool) -> Result<RawResponse, FetchError> {
        let url = self.route_url(path, force)?;
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        tracing::debug!(url = %url, status = status.as_u16(), "Backend responded");
        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        })
    }
}

// `Url::join` drops the last segment unless the base ends with '/'.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn route_url_keeps_api_prefix() {
        let t = transport("http://localhost:3000/api");
        let url = t.route_url("/teams/100?leagueId=5", false).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/teams/100?leagueId=5");
    }

    #[test]
    fn route_url_appends_force_flag() {
        let t = transport("http://localhost:3000/api/");
        let url = t.route_url("matches/7", true).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/matches/7?force=true");

        let url = t.route_url("teams/1?leagueId=2", true).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/teams/1?leagueId=2&force=true"
        );
    }
}
