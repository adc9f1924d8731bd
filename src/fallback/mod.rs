//! Priority-ordered fallback over an AI producer, record stores and HTTP data
//! endpoints.
//!
//! A [`FallbackRequest`] names the sources to try; [`FallbackResolver::resolve`]
//! walks them in order and returns the first acceptable payload together with
//! the [`OriginSource`] that produced it. Resolution never fails: when every
//! source declines the result is an explicit "no data" value.

use std::{future::Future, sync::Arc};

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::Result,
    external::DataApiClient,
    store::{Filter, RecordStore},
};

mod resolver;

pub use resolver::FallbackResolver;

pub type Producer = Box<dyn Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync>;
pub type ResultMapper = Box<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// Which stage of the cascade satisfied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginSource {
    Primary,
    Store,
    ExternalApi,
    None,
}

impl OriginSource {
    pub fn label(self) -> &'static str {
        match self {
            OriginSource::Primary => "AI model",
            OriginSource::Store => "local database",
            OriginSource::ExternalApi => "external API",
            OriginSource::None => "no source",
        }
    }
}

pub struct StoreQuery {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) collection: String,
    pub(crate) filter: Filter,
    pub(crate) mapper: Option<ResultMapper>,
    pub(crate) minimum: usize,
}

impl StoreQuery {
    pub fn new(store: Arc<dyn RecordStore>, collection: impl Into<String>, filter: Filter) -> Self {
        Self { store, collection: collection.into(), filter, mapper: None, minimum: 1 }
    }

    pub fn map<F>(mut self, mapper: F) -> Self
    where
        F: Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    {
        self.mapper = Some(Box::new(mapper));
        self
    }

    /// Values below 1 are raised to 1: an accepted payload is never empty.
    pub fn minimum(mut self, count: usize) -> Self {
        self.minimum = count;
        self
    }
}

pub struct EndpointQuery {
    pub(crate) client: DataApiClient,
    pub(crate) endpoint: String,
    pub(crate) params: Vec<(String, String)>,
    pub(crate) result_path: String,
}

impl EndpointQuery {
    pub fn new(client: DataApiClient, endpoint: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into(), params: Vec::new(), result_path: "data".into() }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = path.into();
        self
    }
}

pub enum SecondarySource {
    Store(StoreQuery),
    ExternalApi(EndpointQuery),
}

#[derive(Default)]
pub struct FallbackRequest {
    pub(crate) primary: Option<Producer>,
    pub(crate) secondary: Vec<SecondarySource>,
}

impl FallbackRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary<F, Fut>(mut self, producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.primary = Some(Box::new(move || -> BoxFuture<'static, Result<Value>> { Box::pin(producer()) }));
        self
    }

    pub fn store(mut self, query: StoreQuery) -> Self {
        self.secondary.push(SecondarySource::Store(query));
        self
    }

    pub fn endpoint(mut self, query: EndpointQuery) -> Self {
        self.secondary.push(SecondarySource::ExternalApi(query));
        self
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn source_count(&self) -> usize {
        self.secondary.len() + usize::from(self.primary.is_some())
    }
}

/// Outcome of a cascade. `origin` is `None` exactly when nothing succeeded,
/// and a successful payload is never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackResult {
    succeeded: bool,
    payload: Option<Value>,
    origin: OriginSource,
}

impl FallbackResult {
    pub(crate) fn resolved(origin: OriginSource, payload: Value) -> Self {
        debug_assert!(origin != OriginSource::None);
        debug_assert!(payload_len(&payload) > 0);
        Self { succeeded: true, payload: Some(payload), origin }
    }

    pub(crate) fn exhausted() -> Self {
        Self { succeeded: false, payload: None, origin: OriginSource::None }
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<Value> {
        self.payload
    }

    pub fn origin(&self) -> OriginSource {
        self.origin
    }
}

/// Element count of a sequence or key count of a mapping; anything else is 0.
pub fn payload_len(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    }
}
