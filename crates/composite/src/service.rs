//! The aggregation orchestrator.

use std::future::Future;
use std::time::Instant;

use common::{ProductAggregate, ProductId};
use integration::{
    FaultInjection, ProductIntegration, RecommendationIntegration, ReviewIntegration,
    ServiceError,
};
use resilience::CircuitState;

use crate::error::CompositeError;

/// Breaker state of each dependency, `None` where a dependency has no breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitStates {
    pub product: Option<CircuitState>,
    pub recommendation: Option<CircuitState>,
    pub review: Option<CircuitState>,
}

/// Composes product aggregates from their three owning services.
///
/// Holds no per-request state; the only state shared between concurrent
/// requests lives in the dependencies' circuit breakers.
pub struct ProductCompositeService<P, R, V>
where
    P: ProductIntegration,
    R: RecommendationIntegration,
    V: ReviewIntegration,
{
    product: P,
    recommendations: R,
    reviews: V,
    service_address: String,
}

impl<P, R, V> ProductCompositeService<P, R, V>
where
    P: ProductIntegration,
    R: RecommendationIntegration,
    V: ReviewIntegration,
{
    /// `service_address` is this process's advertised address, reported as
    /// `compositeAddress` in every aggregate.
    pub fn new(product: P, recommendations: R, reviews: V, service_address: impl Into<String>) -> Self {
        Self {
            product,
            recommendations,
            reviews,
            service_address: service_address.into(),
        }
    }

    /// Reads an aggregate.
    ///
    /// The three reads run concurrently. A product failure aborts the read
    /// and drops the satellite reads still in flight; a satellite failure
    /// only empties that satellite's list.
    #[tracing::instrument(skip(self, faults))]
    pub async fn get_aggregate(
        &self,
        product_id: i32,
        faults: FaultInjection,
    ) -> Result<ProductAggregate, CompositeError> {
        let product_id = ProductId::validated(product_id)?;
        let started = Instant::now();

        let result = tokio::try_join!(
            self.product.get_product(product_id, faults),
            degrade_to_empty(
                "recommendation",
                product_id,
                self.recommendations.get_recommendations(product_id)
            ),
            degrade_to_empty("review", product_id, self.reviews.get_reviews(product_id)),
        );

        metrics::histogram!("aggregate_read_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let (product, recommendations, reviews) = result.inspect_err(|e| {
            tracing::info!(error = %e, kind = e.kind(), "product read failed");
        })?;

        tracing::debug!(
            recommendations = recommendations.len(),
            reviews = reviews.len(),
            "aggregate assembled"
        );
        Ok(ProductAggregate::assemble(
            product,
            recommendations,
            reviews,
            self.service_address.clone(),
        ))
    }

    /// Fans an aggregate out as one product, N recommendation and M review
    /// CREATE commands.
    ///
    /// Commands are only accepted for delivery when this returns; nothing is
    /// materialized yet. The first dispatch failure aborts the call, and
    /// commands already dispatched are not withdrawn.
    #[tracing::instrument(skip(self, body), fields(product_id = %body.product_id))]
    pub async fn create_aggregate(&self, body: ProductAggregate) -> Result<(), CompositeError> {
        self.product.create_product(body.product_record()).await?;

        for recommendation in body.recommendation_records() {
            self.recommendations
                .create_recommendation(recommendation)
                .await?;
        }

        for review in body.review_records() {
            self.reviews.create_review(review).await?;
        }

        tracing::info!(
            recommendations = body.recommendation_summaries.len(),
            reviews = body.review_summaries.len(),
            "aggregate create commands dispatched"
        );
        Ok(())
    }

    /// Dispatches DELETE commands for the product and everything keyed by it.
    ///
    /// Best effort: all three commands are attempted, and a command that
    /// cannot be dispatched is logged and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn delete_aggregate(&self, product_id: i32) {
        let product_id = ProductId::new(product_id);

        let outcomes = [
            ("product", self.product.delete_product(product_id).await),
            (
                "recommendation",
                self.recommendations.delete_recommendations(product_id).await,
            ),
            ("review", self.reviews.delete_reviews(product_id).await),
        ];

        for (entity, outcome) in outcomes {
            if let Err(e) = outcome {
                metrics::counter!("aggregate_delete_dispatch_failures_total", "entity" => entity)
                    .increment(1);
                tracing::warn!(entity, error = %e, "delete command not dispatched");
            }
        }
    }

    pub fn circuit_states(&self) -> CircuitStates {
        CircuitStates {
            product: self.product.circuit_state(),
            recommendation: self.recommendations.circuit_state(),
            review: self.reviews.circuit_state(),
        }
    }
}

/// Turns any satellite failure into an empty list.
async fn degrade_to_empty<T>(
    satellite: &'static str,
    product_id: ProductId,
    read: impl Future<Output = Result<Vec<T>, ServiceError>>,
) -> Result<Vec<T>, ServiceError> {
    match read.await {
        Ok(items) => Ok(items),
        Err(e) => {
            metrics::counter!("aggregate_degraded_total", "dependency" => satellite).increment(1);
            tracing::warn!(
                satellite,
                %product_id,
                error = %e,
                kind = e.kind(),
                "satellite read failed, returning empty list"
            );
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use common::{ProductRecord, RecommendationRecord, ReviewRecord};
    use integration::{
        InMemoryProductService, InMemoryRecommendationService, InMemoryReviewService,
    };
    use messaging::{CommandDispatcher, InMemoryBroker};

    type TestComposite = ProductCompositeService<
        InMemoryProductService,
        InMemoryRecommendationService,
        InMemoryReviewService,
    >;

    struct Fixture {
        composite: TestComposite,
        product: InMemoryProductService,
        recommendations: InMemoryRecommendationService,
        reviews: InMemoryReviewService,
    }

    async fn fixture() -> Fixture {
        let broker = InMemoryBroker::new();
        let dispatcher = CommandDispatcher::new(Arc::new(broker));
        let product = InMemoryProductService::new("product:8080", dispatcher.clone());
        let recommendations = InMemoryRecommendationService::new("rec:8080", dispatcher.clone());
        let reviews = InMemoryReviewService::new("review:8080", dispatcher);

        product.insert(ProductRecord::new(1, "name", 1)).await;
        recommendations
            .insert(RecommendationRecord {
                product_id: ProductId::new(1),
                recommendation_id: 1,
                author: "author".to_string(),
                rating: 1,
                content: "content".to_string(),
                service_address: None,
            })
            .await;
        reviews
            .insert(ReviewRecord {
                product_id: ProductId::new(1),
                review_id: 1,
                author: "author".to_string(),
                subject: "subject".to_string(),
                content: "content".to_string(),
                service_address: None,
            })
            .await;

        Fixture {
            composite: ProductCompositeService::new(
                product.clone(),
                recommendations.clone(),
                reviews.clone(),
                "composite:7000",
            ),
            product,
            recommendations,
            reviews,
        }
    }

    #[tokio::test]
    async fn test_get_aggregate_joins_all_three_reads() {
        let f = fixture().await;

        let aggregate = f
            .composite
            .get_aggregate(1, FaultInjection::none())
            .await
            .unwrap();

        assert_eq!(aggregate.name, "name");
        assert_eq!(aggregate.recommendation_summaries.len(), 1);
        assert_eq!(aggregate.review_summaries.len(), 1);
        assert_eq!(aggregate.service_addresses.composite_address, "composite:7000");
        assert_eq!(aggregate.service_addresses.product_address, "product:8080");
        assert_eq!(aggregate.service_addresses.recommendation_address, "rec:8080");
        assert_eq!(aggregate.service_addresses.review_address, "review:8080");
    }

    #[tokio::test]
    async fn test_invalid_product_id_fails_before_any_read() {
        let f = fixture().await;

        let result = f.composite.get_aggregate(0, FaultInjection::none()).await;

        match result {
            Err(CompositeError::InvalidInput(msg)) => assert_eq!(msg, "Invalid productId: 0"),
            other => panic!("expected invalid input, got {other:?}"),
        }
        assert_eq!(f.product.read_count().await, 0);
        assert_eq!(f.recommendations.read_count().await, 0);
        assert_eq!(f.reviews.read_count().await, 0);
    }

    #[tokio::test]
    async fn test_product_not_found_is_returned_verbatim() {
        let f = fixture().await;

        let result = f.composite.get_aggregate(13, FaultInjection::none()).await;

        match result {
            Err(CompositeError::NotFound(msg)) => {
                assert_eq!(msg, "No product found for productId: 13")
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_product_failure_does_not_wait_for_slow_satellites() {
        let f = fixture().await;
        f.product
            .fail_reads_with(Some(ServiceError::Unexpected("boom".into())))
            .await;
        f.reviews.set_latency(Some(Duration::from_secs(30))).await;

        let started = Instant::now();
        let result = f.composite.get_aggregate(1, FaultInjection::none()).await;

        assert!(matches!(result, Err(CompositeError::Unexpected(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_satellite_failure_degrades_to_empty_list() {
        let f = fixture().await;
        f.recommendations
            .fail_reads_with(Some(ServiceError::Transient("Timed out after 2000ms".into())))
            .await;

        let aggregate = f
            .composite
            .get_aggregate(1, FaultInjection::none())
            .await
            .unwrap();

        assert!(aggregate.recommendation_summaries.is_empty());
        assert_eq!(aggregate.service_addresses.recommendation_address, "");
        assert_eq!(aggregate.review_summaries.len(), 1);
    }

    #[tokio::test]
    async fn test_both_satellites_failing_still_succeeds() {
        let f = fixture().await;
        f.recommendations
            .fail_reads_with(Some(ServiceError::Unexpected("boom".into())))
            .await;
        f.reviews
            .fail_reads_with(Some(ServiceError::NotFound("gone".into())))
            .await;

        let aggregate = f
            .composite
            .get_aggregate(1, FaultInjection::none())
            .await
            .unwrap();

        assert!(aggregate.recommendation_summaries.is_empty());
        assert!(aggregate.review_summaries.is_empty());
        assert_eq!(aggregate.service_addresses.product_address, "product:8080");
    }

    #[tokio::test]
    async fn test_fault_injection_reaches_product_read() {
        let f = fixture().await;
        let faults = FaultInjection {
            delay: 0,
            fault_percent: 100,
        };

        let result = f.composite.get_aggregate(1, faults).await;

        assert!(matches!(result, Err(CompositeError::Unavailable(_))));
        assert_eq!(f.product.last_faults().await, Some(faults));
    }

    #[tokio::test]
    async fn test_unbound_channel_fails_create() {
        let f = fixture().await;
        let body = ProductAggregate {
            product_id: ProductId::new(2),
            name: "n".to_string(),
            weight: 1,
            recommendation_summaries: vec![],
            review_summaries: vec![],
            service_addresses: Default::default(),
        };

        let result = f.composite.create_aggregate(body).await;

        assert!(matches!(result, Err(CompositeError::Dispatch(_))));
    }

    #[tokio::test]
    async fn test_circuit_states_of_in_memory_services_are_unknown() {
        let f = fixture().await;

        let states = f.composite.circuit_states();

        assert_eq!(states.product, None);
        assert_eq!(states.recommendation, None);
        assert_eq!(states.review, None);
    }
}
