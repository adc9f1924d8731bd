//! Farmer-facing lookups built on the fallback cascade: mandi prices and
//! government schemes, each tried against the AI model, the local database
//! and the market data API in that order.

use std::{cmp::Ordering, sync::Arc};

use serde_json::Value;
use tracing::debug;

use crate::{
    config::Config,
    error::Result,
    external::DataApiClient,
    fallback::{EndpointQuery, FallbackRequest, FallbackResolver, FallbackResult, StoreQuery},
    llm::LlmClient,
    store::{Filter, JsonStore, RecordStore},
};

mod prompts;

pub const PRICES_COLLECTION: &str = "market_prices";
pub const SCHEMES_COLLECTION: &str = "schemes";

#[derive(Debug, Clone)]
pub struct AdvisorSettings {
    pub use_ai: bool,
    pub result_limit: usize,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self { use_ai: true, result_limit: 20 }
    }
}

impl AdvisorSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            use_ai: cfg.get_bool("USE_AI"),
            result_limit: cfg.get_usize("RESULT_LIMIT").filter(|n| *n > 0).unwrap_or(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub crop: String,
    pub state: Option<String>,
}

impl PriceQuery {
    pub fn new(crop: impl Into<String>) -> Self {
        Self { crop: crop.into(), state: None }
    }

    pub fn in_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    fn filter(&self) -> Filter {
        let filter = Filter::new().field("crop", &self.crop);
        match &self.state {
            Some(state) => filter.field("state", state),
            None => filter,
        }
    }
}

pub struct Advisor {
    store: Arc<dyn RecordStore>,
    llm: Option<LlmClient>,
    api: Option<DataApiClient>,
    settings: AdvisorSettings,
}

impl Advisor {
    pub fn new(store: Arc<dyn RecordStore>, settings: AdvisorSettings) -> Self {
        Self { store, llm: None, api: None, settings }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let settings = AdvisorSettings::from_config(cfg);
        let llm = if settings.use_ai {
            match LlmClient::from_config(cfg) {
                Ok(client) => Some(client),
                Err(e) => {
                    debug!(error = %e, "AI source unavailable");
                    None
                }
            }
        } else {
            None
        };
        let store = Arc::new(JsonStore::new(cfg.data_store_path()));
        let api = DataApiClient::from_config(cfg)?;
        Ok(Self { store, llm, api, settings })
    }

    pub fn with_llm(mut self, llm: LlmClient) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_api(mut self, api: DataApiClient) -> Self {
        self.api = Some(api);
        self
    }

    pub fn without_ai(mut self) -> Self {
        self.llm = None;
        self
    }

    pub fn prices_request(&self, query: &PriceQuery) -> FallbackRequest {
        let mut req = FallbackRequest::new();

        if let Some(llm) = &self.llm {
            let llm = llm.clone();
            let prompt = prompts::prices_user(query);
            req = req.primary(move || {
                let llm = llm.clone();
                let prompt = prompt.clone();
                async move { llm.complete_json(prompts::PRICES_SYSTEM, &prompt).await }
            });
        }

        let limit = self.settings.result_limit;
        req = req.store(
            StoreQuery::new(self.store.clone(), PRICES_COLLECTION, query.filter())
                .map(move |rows| newest_first(rows, limit)),
        );

        if let Some(api) = &self.api {
            let mut endpoint = EndpointQuery::new(api.clone(), "prices").param("crop", &query.crop);
            if let Some(state) = &query.state {
                endpoint = endpoint.param("state", state);
            }
            req = req.endpoint(endpoint);
        }
        req
    }

    pub fn schemes_request(&self, category: Option<&str>) -> FallbackRequest {
        let mut req = FallbackRequest::new();

        if let Some(llm) = &self.llm {
            let llm = llm.clone();
            let prompt = prompts::schemes_user(category);
            req = req.primary(move || {
                let llm = llm.clone();
                let prompt = prompt.clone();
                async move { llm.complete_json(prompts::SCHEMES_SYSTEM, &prompt).await }
            });
        }

        let filter = match category {
            Some(c) => Filter::new().field("category", c),
            None => Filter::new(),
        };
        let limit = self.settings.result_limit;
        req = req.store(
            StoreQuery::new(self.store.clone(), SCHEMES_COLLECTION, filter)
                .map(move |rows| Value::Array(rows.into_iter().take(limit).collect())),
        );

        if let Some(api) = &self.api {
            let mut endpoint = EndpointQuery::new(api.clone(), "schemes");
            if let Some(c) = category {
                endpoint = endpoint.param("category", c);
            }
            req = req.endpoint(endpoint);
        }
        req
    }

    pub async fn market_prices(&self, query: &PriceQuery) -> FallbackResult {
        FallbackResolver::resolve(&self.prices_request(query)).await
    }

    pub async fn schemes(&self, category: Option<&str>) -> FallbackResult {
        FallbackResolver::resolve(&self.schemes_request(category)).await
    }
}

/// Sorts price records by their `date` field, newest first, and keeps `limit`.
fn newest_first(mut rows: Vec<Value>, limit: usize) -> Value {
    rows.sort_by(|a, b| {
        let da = a.get("date").and_then(Value::as_str);
        let db = b.get("date").and_then(Value::as_str);
        match (da, db) {
            (Some(x), Some(y)) => y.cmp(x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    rows.truncate(limit);
    Value::Array(rows)
}
