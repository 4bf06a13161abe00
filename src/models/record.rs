//! Record model
//!
//! A record is one case file: an id, creation and modification timestamps,
//! and an arbitrary nested JSON payload. The payload fields are flattened
//! into the record object on disk, so `{"id": "a", "name": "x", ...}` keeps
//! `name` at the top level.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::RecordId;

/// A document the record store can persist
///
/// Anything serializable with a stable string id can live in a
/// [`RecordStore`](crate::storage::RecordStore).
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// The unique key of this document
    fn id(&self) -> &str;
}

/// A case record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, assigned once at creation
    pub id: RecordId,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the record was last modified
    pub updated_at: DateTime<Utc>,

    /// Arbitrary nested payload
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Record {
    /// Create a new record with a fresh id
    pub fn new() -> Self {
        Self::with_id(RecordId::new())
    }

    /// Create a new record with the given id
    pub fn with_id(id: impl Into<RecordId>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            payload: Map::new(),
        }
    }

    /// Create a record from a JSON object
    ///
    /// `id` and the timestamps are taken from the object when present,
    /// otherwise they are generated. Every other field becomes payload.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };

        let id = match fields.remove("id") {
            Some(Value::String(id)) => RecordId::from(id),
            Some(_) => return None,
            None => RecordId::new(),
        };

        let now = Utc::now();
        let created_at = take_timestamp(&mut fields, "created_at").unwrap_or(now);
        let updated_at = take_timestamp(&mut fields, "updated_at").unwrap_or(now);

        Some(Self {
            id,
            created_at,
            updated_at,
            payload: fields,
        })
    }

    /// Set a payload field, returning self for chaining
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Get a payload field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Get a payload field as a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Set a payload field and refresh the modification time
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.payload.insert(key.into(), value.into());
        self.touch();
    }

    /// Refresh the modification time
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for Record {
    fn id(&self) -> &str {
        self.id.as_str()
    }
}

fn take_timestamp(fields: &mut Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let raw = fields.remove(key)?;
    raw.as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
