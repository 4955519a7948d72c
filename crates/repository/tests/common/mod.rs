//! Shared fixtures: the Customer / Order / Seller / Address model graph and
//! data source wrappers that count or fail calls.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use elif_repository::{
    DataSource, DataSourceError, DataSourceResult, FieldType, Filter, KeyConvention, MemoryDataSource,
    ModelDefinition, Record, RelationDefinition, RepositoryConfig, RepositoryFactory, Where,
};
use parking_lot::Mutex;
use serde_json::Value;

pub fn customer() -> ModelDefinition {
    ModelDefinition::entity("Customer")
        .generated_id("id", FieldType::Integer)
        .field("name", FieldType::String)
        .field("parentId", FieldType::Integer)
        .relation(RelationDefinition::has_many("orders", "Order"))
        .relation(RelationDefinition::has_many_through("sellers", "Seller", "Order"))
        .relation(RelationDefinition::has_one("address", "Address"))
        .relation(RelationDefinition::has_many("customers", "Customer").key_to("parentId"))
        .relation(RelationDefinition::belongs_to("Customer").key_from("parentId"))
}

pub fn order() -> ModelDefinition {
    ModelDefinition::entity("Order")
        .generated_id("id", FieldType::Integer)
        .field("description", FieldType::String)
        .field("customerId", FieldType::Integer)
        .field("sellerId", FieldType::Integer)
        .relation(RelationDefinition::belongs_to("Customer"))
        .relation(RelationDefinition::belongs_to("Seller"))
}

pub fn seller() -> ModelDefinition {
    ModelDefinition::entity("Seller")
        .generated_id("id", FieldType::Integer)
        .field("name", FieldType::String)
}

pub fn address() -> ModelDefinition {
    ModelDefinition::entity("Address")
        .generated_id("id", FieldType::Integer)
        .field("street", FieldType::String)
        .field("customerId", FieldType::Integer)
}

/// Factory with the whole graph registered under the camelCase key convention
pub fn factory_with(config: RepositoryConfig) -> RepositoryFactory {
    let factory = RepositoryFactory::with_config(config);
    for definition in [customer(), order(), seller(), address()] {
        factory
            .registry()
            .register(definition)
            .expect("fixture definitions are valid");
    }
    factory
}

pub fn camel_config() -> RepositoryConfig {
    RepositoryConfig::builder()
        .key_convention(KeyConvention::Camel)
        .build()
        .expect("camelCase config builds")
}

pub fn factory() -> RepositoryFactory {
    factory_with(camel_config())
}

pub fn id_of(record: &Record) -> Value {
    record.get("id").cloned().expect("record has an id")
}

/// Delegates to a memory data source, counting `find` calls per model and
/// optionally failing every call on one model
#[derive(Default)]
pub struct InstrumentedDataSource {
    inner: MemoryDataSource,
    finds: Mutex<HashMap<String, usize>>,
    failing_model: Mutex<Option<String>>,
}

impl InstrumentedDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finds(&self, model: &str) -> usize {
        self.finds.lock().get(model).copied().unwrap_or(0)
    }

    pub fn fail_on(&self, model: &str) {
        *self.failing_model.lock() = Some(model.to_string());
    }

    fn check(&self, model: &ModelDefinition) -> DataSourceResult<()> {
        match self.failing_model.lock().as_deref() {
            Some(failing) if failing == model.name => {
                Err(DataSourceError::Connection(format!("{} store is unreachable", failing)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DataSource for InstrumentedDataSource {
    fn name(&self) -> &str {
        "instrumented"
    }

    async fn create(&self, model: &ModelDefinition, data: Record) -> DataSourceResult<Record> {
        self.check(model)?;
        self.inner.create(model, data).await
    }

    async fn find_by_id(&self, model: &ModelDefinition, id: &Value) -> DataSourceResult<Option<Record>> {
        self.check(model)?;
        self.inner.find_by_id(model, id).await
    }

    async fn find(&self, model: &ModelDefinition, filter: &Filter) -> DataSourceResult<Vec<Record>> {
        *self.finds.lock().entry(model.name.clone()).or_default() += 1;
        self.check(model)?;
        self.inner.find(model, filter).await
    }

    async fn update_by_id(&self, model: &ModelDefinition, id: &Value, data: &Record) -> DataSourceResult<bool> {
        self.check(model)?;
        self.inner.update_by_id(model, id, data).await
    }

    async fn replace_by_id(&self, model: &ModelDefinition, id: &Value, data: &Record) -> DataSourceResult<bool> {
        self.check(model)?;
        self.inner.replace_by_id(model, id, data).await
    }

    async fn update_all(
        &self,
        model: &ModelDefinition,
        data: &Record,
        where_clause: Option<&Where>,
    ) -> DataSourceResult<u64> {
        self.check(model)?;
        self.inner.update_all(model, data, where_clause).await
    }

    async fn delete_by_id(&self, model: &ModelDefinition, id: &Value) -> DataSourceResult<bool> {
        self.check(model)?;
        self.inner.delete_by_id(model, id).await
    }

    async fn delete_all(&self, model: &ModelDefinition, where_clause: Option<&Where>) -> DataSourceResult<u64> {
        self.check(model)?;
        self.inner.delete_all(model, where_clause).await
    }

    async fn count(&self, model: &ModelDefinition, where_clause: Option<&Where>) -> DataSourceResult<u64> {
        self.check(model)?;
        self.inner.count(model, where_clause).await
    }
}

pub fn shared(data_source: InstrumentedDataSource) -> (Arc<InstrumentedDataSource>, Arc<dyn DataSource>) {
    let data_source = Arc::new(data_source);
    let dyn_source: Arc<dyn DataSource> = data_source.clone();
    (data_source, dyn_source)
}
