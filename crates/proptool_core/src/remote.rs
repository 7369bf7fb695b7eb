use std::env;
use std::thread::sleep;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ImportConfig;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_RETRIES: usize = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 350;

pub const VALIDATE_PATH: &str = "/api/admin/properties/validate";
pub const IMPORT_PATH: &str = "/api/admin/properties";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingPreview {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Outcome of the remote validate-only operation. The server's rules are
/// an authoritative superset of the local checks; its error string is
/// surfaced verbatim and never decomposed locally.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteValidation {
    pub valid: bool,
    #[serde(default)]
    pub preview: Option<ListingPreview>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedListing {
    pub id: String,
}

/// The remote boundary: a validate-only round trip and the import itself.
/// Both accept the normalized, category-overridden record.
pub trait ListingApi {
    fn validate_listing(&self, record: &Map<String, Value>) -> Result<RemoteValidation>;
    fn import_listing(&self, record: &Map<String, Value>) -> Result<ImportedListing>;
}

pub struct HttpListingApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    user_agent: String,
    retries: usize,
    retry_delay_ms: u64,
}

impl HttpListingApi {
    pub fn from_config(config: &ImportConfig) -> Result<Self> {
        let Some(base_url) = config.base_url() else {
            bail!("admin API base URL is not configured; set PROPTOOL_API_URL or [api].base_url");
        };
        let timeout_ms = env_u64("PROPTOOL_HTTP_TIMEOUT_MS", DEFAULT_TIMEOUT_MS);
        let retries = env_u64("PROPTOOL_HTTP_RETRIES", DEFAULT_RETRIES as u64) as usize;
        let retry_delay_ms = env_u64("PROPTOOL_HTTP_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS);
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("failed to build admin API HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: config.token(),
            user_agent: config.user_agent(),
            retries,
            retry_delay_ms,
        })
    }

    /// POST a record and return the response body. Transport failures and
    /// 5xx responses retry with linear backoff; anything else is final.
    fn post_json(&self, path: &str, body: &Map<String, Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = None::<String>;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                sleep(Duration::from_millis(
                    self.retry_delay_ms.saturating_mul(attempt as u64),
                ));
            }

            let mut request = self
                .client
                .post(&url)
                .header("User-Agent", self.user_agent.clone())
                .json(body);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            match request.send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() {
                        last_error = Some(format!("HTTP {status}"));
                        continue;
                    }
                    let payload: Value = response
                        .json()
                        .with_context(|| format!("failed to decode response from {url}"))?;
                    if !status.is_success() && status.as_u16() != 422 {
                        let detail = payload
                            .get("error")
                            .and_then(Value::as_str)
                            .unwrap_or("request rejected");
                        bail!("HTTP {status}: {detail}");
                    }
                    return Ok(payload);
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                }
            }
        }

        let message = last_error.unwrap_or_else(|| "admin API request failed".to_string());
        bail!("{message}")
    }
}

impl ListingApi for HttpListingApi {
    fn validate_listing(&self, record: &Map<String, Value>) -> Result<RemoteValidation> {
        let payload = self.post_json(VALIDATE_PATH, record)?;
        serde_json::from_value(payload).context("unexpected validate-only response shape")
    }

    fn import_listing(&self, record: &Map<String, Value>) -> Result<ImportedListing> {
        let payload = self.post_json(IMPORT_PATH, record)?;
        let id = match payload.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                let detail = payload
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("response carried no id");
                bail!("import failed: {detail}");
            }
        };
        Ok(ImportedListing { id })
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
