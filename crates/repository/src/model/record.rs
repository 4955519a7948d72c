//! Records - Dynamic field/value rows exchanged with data sources

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RepositoryError, RepositoryResult};

/// A single row: a JSON object of field values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from a JSON value, which must be an object
    pub fn from_value(value: Value) -> RepositoryResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(RepositoryError::Serialization(format!(
                "expected a JSON object for a record, got {}",
                other
            ))),
        }
    }

    /// Serialize a typed model into a record
    pub fn from_model<T: Serialize>(model: &T) -> RepositoryResult<Self> {
        Self::from_value(serde_json::to_value(model)?)
    }

    /// Deserialize this record into a typed model
    pub fn into_model<T: DeserializeOwned>(self) -> RepositoryResult<T> {
        Ok(serde_json::from_value(Value::Object(self.0))?)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value, treating explicit nulls as absent
    pub fn value_of(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|value| !value.is_null())
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Builder-style `set`
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Overwrite fields with the values from `patch`
    pub fn merge(&mut self, patch: &Record) {
        for (field, value) in patch.iter() {
            self.0.insert(field.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = RepositoryError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}
