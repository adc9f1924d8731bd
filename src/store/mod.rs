//! Record stores consulted by the fallback cascade, plus the flat-file memory.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub mod memory;

pub use memory::MemoryStore;

/// Point queries by filter criteria. Implementations own their consistency.
pub trait RecordStore: Send + Sync {
    fn find<'a>(&'a self, collection: &'a str, filter: &'a Filter) -> BoxFuture<'a, Result<Vec<Value>>>;
}

/// Case-insensitive field equality. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    fields: BTreeMap<String, String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matches(&self, record: &Value) -> bool {
        let Some(obj) = record.as_object() else {
            return self.is_empty();
        };
        self.fields.iter().all(|(field, want)| match obj.get(field) {
            Some(Value::String(s)) => s.eq_ignore_ascii_case(want),
            Some(Value::Null) | None => false,
            Some(other) => other.to_string().eq_ignore_ascii_case(want),
        })
    }
}

/// JSON file shaped `{ "<collection>": [ {record}, ... ], ... }`, re-read on
/// every query so edits show up without a restart.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn collections(&self) -> Result<Map<String, Value>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::Store(format!("{} is not a JSON object", self.path.display()))),
        }
    }
}

impl RecordStore for JsonStore {
    fn find<'a>(&'a self, collection: &'a str, filter: &'a Filter) -> BoxFuture<'a, Result<Vec<Value>>> {
        Box::pin(async move {
            let mut collections = self.collections().await?;
            let records = match collections.remove(collection) {
                Some(Value::Array(items)) => items,
                Some(_) => return Err(Error::Store(format!("collection `{collection}` is not an array"))),
                None => Vec::new(),
            };
            let matched: Vec<Value> = records.into_iter().filter(|r| filter.matches(r)).collect();
            tracing::debug!(collection, matched = matched.len(), "store query");
            Ok(matched)
        })
    }
}
