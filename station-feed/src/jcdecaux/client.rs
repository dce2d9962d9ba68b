//! JCDecaux OpenData HTTP client.

use std::time::Duration;

use super::error::FetchError;
use super::types::RawStation;

/// Default stations endpoint (Paris contract).
pub const DEFAULT_STATIONS_URL: &str = "https://api.jcdecaux.com/vls/v1/stations?contract=Paris";

/// How much of an undecodable body is kept for diagnostics.
const BODY_EXCERPT_CHARS: usize = 500;

/// Configuration for the JCDecaux client.
#[derive(Debug, Clone)]
pub struct JcDecauxConfig {
    /// Full URL of the stations endpoint
    pub stations_url: String,
    /// API key, sent as the `apiKey` query parameter
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl JcDecauxConfig {
    /// Create a config pointing at the given endpoint.
    pub fn new(stations_url: impl Into<String>) -> Self {
        Self {
            stations_url: stations_url.into(),
            api_key: None,
            timeout_secs: 30,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for JcDecauxConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STATIONS_URL)
    }
}

/// Client for the JCDecaux stations endpoint.
#[derive(Debug, Clone)]
pub struct JcDecauxClient {
    http: reqwest::Client,
    stations_url: String,
    api_key: Option<String>,
}

impl JcDecauxClient {
    /// Create a new client.
    pub fn new(config: JcDecauxConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            stations_url: config.stations_url,
            api_key: config.api_key,
        })
    }

    /// The endpoint this client queries.
    pub fn stations_url(&self) -> &str {
        &self.stations_url
    }

    /// Fetch every station from the endpoint.
    pub async fn fetch_all(&self) -> Result<Vec<RawStation>, FetchError> {
        let mut request = self.http.get(&self.stations_url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apiKey", key)]);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| FetchError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(BODY_EXCERPT_CHARS).collect()),
        })
    }
}
