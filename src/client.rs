use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GraphError, Result};

pub const GRAPH_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_API_VERSION: &str = "v21.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelope of Graph API list endpoints (`/posts`, `/media`).
#[derive(Debug, Deserialize)]
pub struct GraphList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Thin GET-only client for the Meta Graph API.
///
/// Every request goes to `<base>/<api_version>/<path>` with the access token
/// appended as a query parameter. There is no retry and no pagination: callers
/// ask for a single page capped by `limit`.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: Client,
    base_url: String,
    api_version: String,
    access_token: String,
}

impl GraphClient {
    pub fn new(access_token: impl Into<String>, api_version: impl Into<String>) -> Result<Self> {
        Self::with_base_url(GRAPH_API_BASE, access_token, api_version)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            access_token: access_token.into(),
        })
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.endpoint(path);
        tracing::debug!(%url, "Graph API request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GraphError::Api {
                status: status.as_u16(),
                message: extract_error_message(status, &body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get_as<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let value = self.get(path, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Pull `error.message` out of a Graph API error body, falling back to the
/// raw body and then to the status line.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    let structured = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .get("error")?
            .get("message")?
            .as_str()
            .filter(|message| !message.is_empty())
            .map(str::to_string)
    });

    match structured {
        Some(message) => message,
        None if !body.trim().is_empty() => body.to_string(),
        None => format!(
            "HTTP Error {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ),
    }
}
