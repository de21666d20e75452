//! Satellite reads going through the real HTTP clients: timeouts and open
//! breakers still degrade to empty lists.

use std::sync::Arc;
use std::time::Duration;

use common::ProductRecord;
use composite::ProductCompositeService;
use httpmock::prelude::*;
use integration::{
    FaultInjection, HttpTransport, InMemoryProductService, RecommendationClient, ReviewClient,
};
use messaging::{CommandDispatcher, InMemoryBroker};
use resilience::{CircuitBreakerConfig, CircuitState, ResiliencePolicy, RetryConfig};
use serde_json::json;

/// One attempt per call; the breaker opens on the first failure.
fn policy(timeout: Duration) -> ResiliencePolicy {
    ResiliencePolicy {
        circuit_breaker: CircuitBreakerConfig {
            sliding_window_size: 1,
            minimum_number_of_calls: 1,
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state: Duration::from_secs(60),
            permitted_calls_in_half_open_state: 1,
        },
        retry: RetryConfig::none(),
        timeout,
    }
}

#[tokio::test]
async fn test_timed_out_and_short_circuited_satellites_degrade() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/recommendation");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!([]));
        })
        .await;
    let reviews_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/review");
            then.status(503).body("down");
        })
        .await;

    let transport = HttpTransport::new(Duration::from_secs(1)).unwrap();
    let dispatcher = CommandDispatcher::new(Arc::new(InMemoryBroker::new()));
    let product = InMemoryProductService::new("product:8080", dispatcher.clone());
    product.insert(ProductRecord::new(1, "name", 1)).await;
    let recommendations = RecommendationClient::new(
        server.base_url(),
        transport.clone(),
        policy(Duration::from_millis(100)),
        dispatcher.clone(),
    );
    let reviews = ReviewClient::new(
        server.base_url(),
        transport,
        policy(Duration::from_secs(2)),
        dispatcher,
    );
    let composite = ProductCompositeService::new(product, recommendations, reviews, "composite:7000");

    for _ in 0..2 {
        let aggregate = composite
            .get_aggregate(1, FaultInjection::none())
            .await
            .unwrap();

        assert_eq!(aggregate.name, "name");
        assert!(aggregate.recommendation_summaries.is_empty());
        assert!(aggregate.review_summaries.is_empty());
        assert_eq!(aggregate.service_addresses.recommendation_address, "");
        assert_eq!(aggregate.service_addresses.review_address, "");
        assert_eq!(aggregate.service_addresses.product_address, "product:8080");
    }

    let states = composite.circuit_states();
    assert_eq!(states.recommendation, Some(CircuitState::Open));
    assert_eq!(states.review, Some(CircuitState::Open));
    // The second read was short-circuited without reaching the review service.
    reviews_mock.assert_hits_async(1).await;
}
