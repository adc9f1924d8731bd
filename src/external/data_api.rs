use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{config::Config, error::Result};

/// GET-only client for a JSON data service answering with an envelope such as
/// `{ "data": [ ... ] }`.
#[derive(Debug, Clone)]
pub struct DataApiClient {
    client: Client,
    base: String,
    api_key: Option<String>,
}

impl DataApiClient {
    /// `None` when `MARKET_API_BASE` is not configured.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        let Some(base) = cfg.get("MARKET_API_BASE") else {
            return Ok(None);
        };
        Self::new(base, cfg.get("MARKET_API_KEY"), cfg.request_timeout()).map(Some)
    }

    pub fn new(base: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base: base.into(), api_key })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.base.trim_end_matches('/'), endpoint.trim_start_matches('/'));
        let mut req = self.client.get(&url).query(params);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?.error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }
}

/// Follows a dot-separated path (`data`, `result.records`) to an array.
pub fn array_at<'a>(value: &'a Value, path: &str) -> Option<&'a Vec<Value>> {
    path.split('.')
        .filter(|seg| !seg.is_empty())
        .try_fold(value, |v, seg| v.get(seg))
        .and_then(Value::as_array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_at_walks_nested_objects() {
        let body = json!({"result": {"records": [1, 2]}, "data": []});
        assert_eq!(array_at(&body, "result.records").map(Vec::len), Some(2));
        assert_eq!(array_at(&body, "data").map(Vec::len), Some(0));
        assert!(array_at(&body, "result").is_none());
        assert!(array_at(&body, "missing.path").is_none());
    }

    #[test]
    fn unconfigured_base_yields_no_client() {
        let cfg = Config::from_pairs(Vec::<(String, String)>::new());
        assert!(DataApiClient::from_config(&cfg).unwrap().is_none());
    }
}
