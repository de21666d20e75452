use std::sync::Arc;

use common::{ProductId, ProductRecord, RecommendationRecord, ReviewRecord};
use composite::ProductCompositeService;
use criterion::{Criterion, criterion_group, criterion_main};
use integration::{
    FaultInjection, InMemoryProductService, InMemoryRecommendationService, InMemoryReviewService,
    ServiceError,
};
use messaging::{CommandDispatcher, EntityKind, InMemoryBroker};

type Composite = ProductCompositeService<
    InMemoryProductService,
    InMemoryRecommendationService,
    InMemoryReviewService,
>;

fn seeded(rt: &tokio::runtime::Runtime, satellites: i32) -> Composite {
    rt.block_on(async {
        let dispatcher = CommandDispatcher::new(Arc::new(InMemoryBroker::new()));
        let product = InMemoryProductService::new("product:8080", dispatcher.clone());
        let recommendations = InMemoryRecommendationService::new("rec:8080", dispatcher.clone());
        let reviews = InMemoryReviewService::new("review:8080", dispatcher);

        product.insert(ProductRecord::new(1, "name", 1)).await;
        for id in 1..=satellites {
            recommendations
                .insert(RecommendationRecord {
                    product_id: ProductId::new(1),
                    recommendation_id: id,
                    author: "author".to_string(),
                    rating: id % 5,
                    content: "content".to_string(),
                    service_address: None,
                })
                .await;
            reviews
                .insert(ReviewRecord {
                    product_id: ProductId::new(1),
                    review_id: id,
                    author: "author".to_string(),
                    subject: "subject".to_string(),
                    content: "content".to_string(),
                    service_address: None,
                })
                .await;
        }

        ProductCompositeService::new(product, recommendations, reviews, "composite:7000")
    })
}

fn bench_get_aggregate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let composite = seeded(&rt, 10);

    c.bench_function("composite/get_aggregate_10_satellites", |b| {
        b.iter(|| {
            rt.block_on(async {
                composite
                    .get_aggregate(1, FaultInjection::none())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_get_aggregate_degraded(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dispatcher = CommandDispatcher::new(Arc::new(InMemoryBroker::new()));
    let product = InMemoryProductService::new("product:8080", dispatcher.clone());
    let recommendations = InMemoryRecommendationService::new("rec:8080", dispatcher.clone());
    let reviews = InMemoryReviewService::new("review:8080", dispatcher);
    rt.block_on(async {
        product.insert(ProductRecord::new(1, "name", 1)).await;
        recommendations
            .fail_reads_with(Some(ServiceError::Transient("down".to_string())))
            .await;
        reviews
            .fail_reads_with(Some(ServiceError::Unexpected("boom".to_string())))
            .await;
    });
    let composite =
        ProductCompositeService::new(product, recommendations, reviews, "composite:7000");

    c.bench_function("composite/get_aggregate_degraded", |b| {
        b.iter(|| {
            rt.block_on(async {
                composite
                    .get_aggregate(1, FaultInjection::none())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_create_aggregate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let broker = InMemoryBroker::new();
    let mut receivers = rt.block_on(async {
        let mut receivers = Vec::new();
        for entity in EntityKind::ALL {
            receivers.push(broker.bind(entity.channel(), 1024).await);
        }
        receivers
    });
    let composite = seeded(&rt, 5);
    let body = rt.block_on(async {
        composite
            .get_aggregate(1, FaultInjection::none())
            .await
            .unwrap()
    });
    let dispatcher = CommandDispatcher::new(Arc::new(broker));
    let composite = ProductCompositeService::new(
        InMemoryProductService::new("product:8080", dispatcher.clone()),
        InMemoryRecommendationService::new("rec:8080", dispatcher.clone()),
        InMemoryReviewService::new("review:8080", dispatcher),
        "composite:7000",
    );

    c.bench_function("composite/create_aggregate_5_satellites", |b| {
        b.iter(|| {
            rt.block_on(async {
                composite.create_aggregate(body.clone()).await.unwrap();
            });
            for rx in receivers.iter_mut() {
                while rx.try_recv().is_ok() {}
            }
        });
    });
}

criterion_group!(
    benches,
    bench_get_aggregate,
    bench_get_aggregate_degraded,
    bench_create_aggregate
);
criterion_main!(benches);
