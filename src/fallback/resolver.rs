use serde_json::Value;
use tracing::{debug, info, warn};

use super::{payload_len, EndpointQuery, FallbackRequest, FallbackResult, OriginSource, SecondarySource, StoreQuery};
use crate::{error::Declined, external::data_api::array_at};

/// Walks a [`FallbackRequest`] in fixed priority order: primary producer, then
/// every store query, then every external endpoint. Each source gets exactly
/// one attempt and any failure only moves resolution to the next source.
pub struct FallbackResolver;

impl FallbackResolver {
    pub async fn resolve(request: &FallbackRequest) -> FallbackResult {
        if let Some(producer) = &request.primary {
            match Self::accept_primary(producer().await) {
                Ok(payload) => return Self::done(OriginSource::Primary, payload),
                Err(reason) => debug!(stage = "primary", %reason, "source declined"),
            }
        }

        let stores = request.secondary.iter().filter_map(|s| match s {
            SecondarySource::Store(q) => Some(q),
            SecondarySource::ExternalApi(_) => None,
        });
        for query in stores {
            match Self::query_store(query).await {
                Ok(payload) => return Self::done(OriginSource::Store, payload),
                Err(reason) => debug!(stage = "store", collection = %query.collection, %reason, "source declined"),
            }
        }

        let endpoints = request.secondary.iter().filter_map(|s| match s {
            SecondarySource::ExternalApi(q) => Some(q),
            SecondarySource::Store(_) => None,
        });
        for query in endpoints {
            match Self::call_endpoint(query).await {
                Ok(payload) => return Self::done(OriginSource::ExternalApi, payload),
                Err(reason) => debug!(stage = "external_api", endpoint = %query.endpoint, %reason, "source declined"),
            }
        }

        warn!(sources = request.source_count(), "all fallback sources exhausted");
        FallbackResult::exhausted()
    }

    fn done(origin: OriginSource, payload: Value) -> FallbackResult {
        info!(origin = ?origin, items = payload_len(&payload), "fallback resolved");
        FallbackResult::resolved(origin, payload)
    }

    fn accept_primary(output: crate::error::Result<Value>) -> Result<Value, Declined> {
        let value = output?;
        if payload_len(&value) == 0 {
            return Err(Declined::Empty);
        }
        Ok(value)
    }

    async fn query_store(query: &StoreQuery) -> Result<Value, Declined> {
        let records = query.store.find(&query.collection, &query.filter).await?;
        let payload = match &query.mapper {
            Some(mapper) => mapper(records),
            None => Value::Array(records),
        };
        let found = payload_len(&payload);
        let required = query.minimum.max(1);
        if found < required {
            return Err(Declined::Insufficient { found, required });
        }
        Ok(payload)
    }

    async fn call_endpoint(query: &EndpointQuery) -> Result<Value, Declined> {
        let body = query.client.fetch(&query.endpoint, &query.params).await?;
        match array_at(&body, &query.result_path) {
            Some(items) if !items.is_empty() => Ok(Value::Array(items.clone())),
            Some(_) => Err(Declined::Empty),
            None => Err(Declined::MissingPath(query.result_path.clone())),
        }
    }
}
