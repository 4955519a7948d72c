//! In-memory data source with generated ids and expiring key-value entries

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;
use wildmatch::WildMatch;

use super::{DataSource, DataSourceError, DataSourceResult, KeyTtl, KeyValueDataSource};
use crate::filter::{values_equal, Filter, Where};
use crate::model::{FieldType, ModelDefinition, Record};

/// Rows of one model plus its id sequence
#[derive(Debug, Default)]
struct Collection {
    rows: Vec<Record>,
    last_id: i64,
}

impl Collection {
    fn position(&self, id_field: &str, id: &Value) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.value_of(id_field)
                .map_or(false, |candidate| values_equal(candidate, id))
        })
    }

    fn observe_id(&mut self, id: &Value) {
        if let Some(id) = id.as_i64() {
            self.last_id = self.last_id.max(id);
        }
    }

    fn generate_id(&mut self, field_type: FieldType) -> Value {
        match field_type {
            FieldType::String => Value::String(Uuid::new_v4().to_string()),
            _ => {
                self.last_id += 1;
                Value::from(self.last_id)
            }
        }
    }
}

/// Entry in the key-value store
#[derive(Debug, Clone)]
struct KeyValueEntry {
    value: Record,
    expires_at: Option<Instant>,
}

impl KeyValueEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |exp| Instant::now() >= exp)
    }
}

/// In-process data source
///
/// Collections are created on first write. Plain models (no id field) are
/// stored as-is; entities get integer ids, or UUID strings when the id field
/// is string-typed.
#[derive(Debug)]
pub struct MemoryDataSource {
    name: String,
    collections: RwLock<HashMap<String, Collection>>,
    entries: RwLock<HashMap<String, HashMap<String, KeyValueEntry>>>,
}

impl Default for MemoryDataSource {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryDataSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: RwLock::new(HashMap::new()),
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn id_field<'a>(model: &'a ModelDefinition, operation: &str) -> DataSourceResult<&'a str> {
        model.id_name().ok_or_else(|| DataSourceError::Unsupported {
            operation: format!("{} on model '{}' without an id", operation, model.name),
        })
    }

    /// Drop the id from a patch; changing an id in place is rejected
    fn strip_id(model: &ModelDefinition, id: &Value, data: &Record) -> DataSourceResult<Record> {
        let mut patch = data.clone();
        if let Some(id_field) = model.id_name() {
            if let Some(new_id) = patch.remove(id_field) {
                if !new_id.is_null() && !values_equal(&new_id, id) {
                    return Err(DataSourceError::ConstraintViolation {
                        model: model.name.clone(),
                        message: format!("id cannot be changed from {} to {}", id, new_id),
                    });
                }
            }
        }
        Ok(patch)
    }

    fn live_entry(&self, model: &str, key: &str) -> Option<KeyValueEntry> {
        self.entries
            .read()
            .get(model)
            .and_then(|entries| entries.get(key))
            .filter(|entry| !entry.is_expired())
            .cloned()
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, model: &ModelDefinition, mut data: Record) -> DataSourceResult<Record> {
        let mut collections = self.collections.write();
        let collection = collections.entry(model.name.clone()).or_default();

        if let Some(id_field) = model.id_field() {
            match data.value_of(&id_field.name).cloned() {
                Some(id) => {
                    if collection.position(&id_field.name, &id).is_some() {
                        return Err(DataSourceError::DuplicateId {
                            model: model.name.clone(),
                            id,
                        });
                    }
                    collection.observe_id(&id);
                }
                None if id_field.generated => {
                    let id = collection.generate_id(id_field.field_type);
                    data.set(id_field.name.clone(), id);
                }
                None => {
                    return Err(DataSourceError::ConstraintViolation {
                        model: model.name.clone(),
                        message: format!("id field '{}' is required", id_field.name),
                    });
                }
            }
        }

        collection.rows.push(data.clone());
        Ok(data)
    }

    async fn find_by_id(&self, model: &ModelDefinition, id: &Value) -> DataSourceResult<Option<Record>> {
        let id_field = Self::id_field(model, "findById")?;
        let collections = self.collections.read();
        Ok(collections.get(&model.name).and_then(|collection| {
            collection
                .position(id_field, id)
                .map(|index| collection.rows[index].clone())
        }))
    }

    async fn find(&self, model: &ModelDefinition, filter: &Filter) -> DataSourceResult<Vec<Record>> {
        let collections = self.collections.read();
        Ok(collections
            .get(&model.name)
            .map(|collection| filter.apply(collection.rows.iter().cloned()))
            .unwrap_or_default())
    }

    async fn update_by_id(&self, model: &ModelDefinition, id: &Value, data: &Record) -> DataSourceResult<bool> {
        let id_field = Self::id_field(model, "updateById")?;
        let patch = Self::strip_id(model, id, data)?;
        let mut collections = self.collections.write();
        let Some(collection) = collections.get_mut(&model.name) else {
            return Ok(false);
        };
        match collection.position(id_field, id) {
            Some(index) => {
                collection.rows[index].merge(&patch);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_by_id(&self, model: &ModelDefinition, id: &Value, data: &Record) -> DataSourceResult<bool> {
        let id_field = Self::id_field(model, "replaceById")?;
        let mut replacement = Self::strip_id(model, id, data)?;
        replacement.set(id_field, id.clone());
        let mut collections = self.collections.write();
        let Some(collection) = collections.get_mut(&model.name) else {
            return Ok(false);
        };
        match collection.position(id_field, id) {
            Some(index) => {
                collection.rows[index] = replacement;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_all(
        &self,
        model: &ModelDefinition,
        data: &Record,
        where_clause: Option<&Where>,
    ) -> DataSourceResult<u64> {
        let mut patch = data.clone();
        if let Some(id_field) = model.id_name() {
            patch.remove(id_field);
        }
        let mut collections = self.collections.write();
        let Some(collection) = collections.get_mut(&model.name) else {
            return Ok(0);
        };
        let mut updated = 0;
        for row in collection
            .rows
            .iter_mut()
            .filter(|row| where_clause.map_or(true, |clause| clause.matches(row)))
        {
            row.merge(&patch);
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_by_id(&self, model: &ModelDefinition, id: &Value) -> DataSourceResult<bool> {
        let id_field = Self::id_field(model, "deleteById")?;
        let mut collections = self.collections.write();
        let Some(collection) = collections.get_mut(&model.name) else {
            return Ok(false);
        };
        match collection.position(id_field, id) {
            Some(index) => {
                collection.rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_all(&self, model: &ModelDefinition, where_clause: Option<&Where>) -> DataSourceResult<u64> {
        let mut collections = self.collections.write();
        let Some(collection) = collections.get_mut(&model.name) else {
            return Ok(0);
        };
        let before = collection.rows.len();
        collection
            .rows
            .retain(|row| !where_clause.map_or(true, |clause| clause.matches(row)));
        Ok((before - collection.rows.len()) as u64)
    }

    async fn count(&self, model: &ModelDefinition, where_clause: Option<&Where>) -> DataSourceResult<u64> {
        let collections = self.collections.read();
        Ok(collections
            .get(&model.name)
            .map(|collection| {
                collection
                    .rows
                    .iter()
                    .filter(|row| where_clause.map_or(true, |clause| clause.matches(row)))
                    .count() as u64
            })
            .unwrap_or(0))
    }
}

#[async_trait]
impl KeyValueDataSource for MemoryDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, model: &str, key: &str) -> DataSourceResult<Option<Record>> {
        Ok(self.live_entry(model, key).map(|entry| entry.value))
    }

    async fn set(&self, model: &str, key: &str, value: Record, ttl: Option<Duration>) -> DataSourceResult<()> {
        let mut entries = self.entries.write();
        let entries = entries.entry(model.to_string()).or_default();
        entries.retain(|_, entry| !entry.is_expired());
        entries.insert(
            key.to_string(),
            KeyValueEntry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, model: &str, key: &str) -> DataSourceResult<bool> {
        let mut entries = self.entries.write();
        Ok(entries
            .get_mut(model)
            .and_then(|entries| entries.remove(key))
            .map_or(false, |entry| !entry.is_expired()))
    }

    async fn delete_all(&self, model: &str) -> DataSourceResult<u64> {
        let mut entries = self.entries.write();
        Ok(entries
            .remove(model)
            .map(|entries| entries.values().filter(|entry| !entry.is_expired()).count() as u64)
            .unwrap_or(0))
    }

    async fn expire(&self, model: &str, key: &str, ttl: Duration) -> DataSourceResult<bool> {
        let mut entries = self.entries.write();
        match entries.get_mut(model).and_then(|entries| entries.get_mut(key)) {
            Some(entry) if !entry.is_expired() => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ttl(&self, model: &str, key: &str) -> DataSourceResult<KeyTtl> {
        Ok(match self.live_entry(model, key) {
            None => KeyTtl::Missing,
            Some(KeyValueEntry { expires_at: None, .. }) => KeyTtl::Persistent,
            Some(KeyValueEntry { expires_at: Some(exp), .. }) => {
                KeyTtl::Expires(exp.saturating_duration_since(Instant::now()))
            }
        })
    }

    async fn keys(&self, model: &str, pattern: Option<&str>) -> DataSourceResult<Vec<String>> {
        let matcher = pattern.map(WildMatch::new);
        let entries = self.entries.read();
        let mut keys: Vec<String> = entries
            .get(model)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, entry)| !entry.is_expired())
                    .filter(|(key, _)| matcher.as_ref().map_or(true, |m| m.matches(key)))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product() -> ModelDefinition {
        ModelDefinition::entity("Product")
            .generated_id("id", FieldType::Integer)
            .field("name", FieldType::String)
    }

    #[tokio::test]
    async fn test_generated_ids_continue_after_explicit_ones() {
        let ds = MemoryDataSource::default();
        let model = product();

        let explicit = ds.create(&model, Record::new().with("id", 5).with("name", "a")).await.unwrap();
        let generated = ds.create(&model, Record::new().with("name", "b")).await.unwrap();

        assert_eq!(explicit.get("id"), Some(&json!(5)));
        assert_eq!(generated.get("id"), Some(&json!(6)));
    }

    #[tokio::test]
    async fn test_string_ids_are_uuids() {
        let ds = MemoryDataSource::default();
        let model = ModelDefinition::entity("Session").generated_id("id", FieldType::String);
        let created = ds.create(&model, Record::new()).await.unwrap();
        let id = created.get("id").and_then(|id| id.as_str()).unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_ids() {
        let ds = MemoryDataSource::default();
        let model = product();
        ds.create(&model, Record::new().with("id", 1)).await.unwrap();

        let duplicate = ds.create(&model, Record::new().with("id", 1)).await;
        assert!(matches!(duplicate, Err(DataSourceError::DuplicateId { .. })));

        let manual = ModelDefinition::entity("Tag").id("id", FieldType::String);
        let missing = ds.create(&manual, Record::new()).await;
        assert!(matches!(missing, Err(DataSourceError::ConstraintViolation { .. })));
    }

    #[tokio::test]
    async fn test_ids_beyond_f64_precision_stay_distinct() {
        let ds = MemoryDataSource::default();
        let model = product();
        let low = json!(9_007_199_254_740_992_i64);
        let high = json!(9_007_199_254_740_993_i64);

        ds.create(&model, Record::new().with("id", low.clone()).with("name", "a")).await.unwrap();
        ds.create(&model, Record::new().with("id", high.clone()).with("name", "b")).await.unwrap();

        let found = ds.find_by_id(&model, &high).await.unwrap().unwrap();
        assert_eq!(found.get("id"), Some(&high));
        assert_eq!(found.get("name"), Some(&json!("b")));

        let duplicate = ds.create(&model, Record::new().with("id", high)).await;
        assert!(matches!(duplicate, Err(DataSourceError::DuplicateId { .. })));
    }

    #[tokio::test]
    async fn test_update_replace_delete_by_id() {
        let ds = MemoryDataSource::default();
        let model = product();
        let created = ds.create(&model, Record::new().with("name", "old").with("sku", "X")).await.unwrap();
        let id = created.get("id").cloned().unwrap();

        assert!(ds.update_by_id(&model, &id, &Record::new().with("name", "new")).await.unwrap());
        let found = ds.find_by_id(&model, &id).await.unwrap().unwrap();
        assert_eq!(found.get("name"), Some(&json!("new")));
        assert_eq!(found.get("sku"), Some(&json!("X")));

        assert!(ds.replace_by_id(&model, &id, &Record::new().with("name", "only")).await.unwrap());
        let found = ds.find_by_id(&model, &id).await.unwrap().unwrap();
        assert!(found.get("sku").is_none());
        assert_eq!(found.get("id"), Some(&id));

        let moved = ds.update_by_id(&model, &id, &Record::new().with("id", 99)).await;
        assert!(matches!(moved, Err(DataSourceError::ConstraintViolation { .. })));

        assert!(ds.delete_by_id(&model, &id).await.unwrap());
        assert!(!ds.delete_by_id(&model, &id).await.unwrap());
        assert!(ds.find_by_id(&model, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bulk_operations() {
        let ds = MemoryDataSource::default();
        let model = product();
        for name in ["a", "b", "c"] {
            ds.create(&model, Record::new().with("name", name)).await.unwrap();
        }

        let clause = Where::inq("name", ["a", "b"]);
        assert_eq!(ds.count(&model, Some(&clause)).await.unwrap(), 2);
        assert_eq!(
            ds.update_all(&model, &Record::new().with("flag", true), Some(&clause)).await.unwrap(),
            2
        );
        assert_eq!(ds.count(&model, Some(&Where::eq("flag", true))).await.unwrap(), 2);
        assert_eq!(DataSource::delete_all(&ds, &model, Some(&clause)).await.unwrap(), 2);
        assert_eq!(ds.count(&model, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_plain_models_have_no_id_operations() {
        let ds = MemoryDataSource::default();
        let address = ModelDefinition::model("Address").field("city", FieldType::String);
        ds.create(&address, Record::new().with("city", "Oslo")).await.unwrap();

        assert_eq!(ds.find(&address, &Filter::new()).await.unwrap().len(), 1);
        let result = ds.find_by_id(&address, &json!(1)).await;
        assert!(matches!(result, Err(DataSourceError::Unsupported { .. })));
    }

    #[tokio::test]
    async fn test_key_value_expiry() {
        let ds = MemoryDataSource::default();
        let value = Record::new().with("token", "abc");

        ds.set("Session", "user:1", value.clone(), None).await.unwrap();
        ds.set("Session", "user:2", value.clone(), Some(Duration::from_millis(20))).await.unwrap();
        ds.set("Session", "admin:1", value.clone(), None).await.unwrap();

        assert_eq!(ds.ttl("Session", "user:1").await.unwrap(), KeyTtl::Persistent);
        assert!(matches!(ds.ttl("Session", "user:2").await.unwrap(), KeyTtl::Expires(_)));
        assert_eq!(ds.keys("Session", Some("user:*")).await.unwrap(), vec!["user:1", "user:2"]);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(ds.get("Session", "user:2").await.unwrap().is_none());
        assert_eq!(ds.ttl("Session", "user:2").await.unwrap(), KeyTtl::Missing);
        assert_eq!(ds.keys("Session", None).await.unwrap(), vec!["admin:1", "user:1"]);

        assert!(ds.expire("Session", "user:1", Duration::from_secs(60)).await.unwrap());
        assert!(!ds.expire("Session", "user:9", Duration::from_secs(60)).await.unwrap());
        assert!(ds.delete("Session", "admin:1").await.unwrap());
        assert_eq!(KeyValueDataSource::delete_all(&ds, "Session").await.unwrap(), 1);
        assert_eq!(ds.get("Session", "user:1").await.unwrap(), None);
    }
}
