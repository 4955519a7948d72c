//! Relation Resolution Benchmarks
//!
//! Resolver cost on its own, and hasMany / hasMany-through fetches against the
//! in-memory data source at growing collection sizes

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use elif_repository::{
    CrudRepository, EntityRepository, FieldType, MemoryDataSource, ModelDefinition, ModelRegistry,
    Record, RelationDefinition, RelationResolver, RepositoryConfig, RepositoryFactory,
};
use tokio::runtime::Runtime;

fn register_graph(registry: &ModelRegistry) {
    registry
        .register(
            ModelDefinition::entity("Customer")
                .generated_id("id", FieldType::Integer)
                .relation(RelationDefinition::has_many("orders", "Order"))
                .relation(RelationDefinition::has_many_through("sellers", "Seller", "Order")),
        )
        .unwrap();
    registry
        .register(
            ModelDefinition::entity("Order")
                .generated_id("id", FieldType::Integer)
                .field("customer_id", FieldType::Integer)
                .field("seller_id", FieldType::Integer),
        )
        .unwrap();
    registry
        .register(ModelDefinition::entity("Seller").generated_id("id", FieldType::Integer))
        .unwrap();
}

/// Customer 1 with `orders` orders spread over `orders / 4 + 1` sellers
async fn seeded(orders: usize) -> EntityRepository {
    let factory = RepositoryFactory::with_config(RepositoryConfig::default());
    register_graph(factory.registry());
    let customers = factory
        .entity_repository_type("Customer", None)
        .unwrap()
        .construct(Arc::new(MemoryDataSource::default()));

    let customer = customers.create(Record::new()).await.unwrap();
    let sellers = customers
        .has_many_through("sellers")
        .unwrap()
        .for_owner(&customer)
        .unwrap();
    let mut seller_ids = Vec::new();
    for _ in 0..(orders / 4 + 1) {
        let seller = sellers.create(Record::new(), None).await.unwrap();
        seller_ids.push(seller.get("id").cloned().unwrap());
    }
    for i in seller_ids.len()..orders {
        sellers.link(&seller_ids[i % seller_ids.len()], None).await.unwrap();
    }
    customers
}

fn bench_resolver(c: &mut Criterion) {
    let mut group = c.benchmark_group("relation_resolver");
    let registry = Arc::new(ModelRegistry::default());
    register_graph(&registry);
    let resolver = RelationResolver::new(registry.clone());
    let customer = registry.lookup("Customer").unwrap();

    for name in ["orders", "sellers"] {
        group.bench_function(name, |b| {
            b.iter(|| black_box(resolver.resolve_named(&customer, black_box(name)).unwrap()))
        });
    }

    group.finish();
}

fn bench_fetch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("relation_fetch");

    for &orders in &[10usize, 100, 1000] {
        let customers = rt.block_on(seeded(orders));

        group.bench_with_input(BenchmarkId::new("has_many", orders), &orders, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let scoped = customers.has_many("orders").unwrap().for_id(1).unwrap();
                    black_box(scoped.find(None).await.unwrap())
                })
            })
        });

        group.bench_with_input(BenchmarkId::new("has_many_through", orders), &orders, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let scoped = customers.has_many_through("sellers").unwrap().for_id(1).unwrap();
                    black_box(scoped.find(None).await.unwrap())
                })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolver, bench_fetch);
criterion_main!(benches);
