//! HTTP API server for the product aggregate.
//!
//! Exposes aggregate reads and writes backed by [`ProductCompositeService`],
//! with structured logging (tracing), a breaker-aware health check and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use composite::ProductCompositeService;
use integration::{
    HttpCommandRelay, HttpTransport, InMemoryProductService, InMemoryRecommendationService,
    InMemoryReviewService, ProductClient, ProductIntegration, RecommendationClient,
    RecommendationIntegration, ReviewClient, ReviewIntegration, ServiceError,
};
use messaging::{CommandDispatcher, CommandProcessor, EntityKind, InMemoryBroker, run_consumer};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

pub trait ProductDependency: ProductIntegration + 'static {}
impl<T: ProductIntegration + 'static> ProductDependency for T {}

pub trait RecommendationDependency: RecommendationIntegration + 'static {}
impl<T: RecommendationIntegration + 'static> RecommendationDependency for T {}

pub trait ReviewDependency: ReviewIntegration + 'static {}
impl<T: ReviewIntegration + 'static> ReviewDependency for T {}

/// Shared application state accessible from all handlers.
pub struct AppState<P, R, V>
where
    P: ProductIntegration,
    R: RecommendationIntegration,
    V: ReviewIntegration,
{
    pub composite: ProductCompositeService<P, R, V>,
}

/// State wired to the owning services over HTTP.
pub type HttpAppState = AppState<ProductClient, RecommendationClient, ReviewClient>;

/// State wired to in-process owning services.
pub type InMemoryAppState =
    AppState<InMemoryProductService, InMemoryRecommendationService, InMemoryReviewService>;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<P, R, V>(state: Arc<AppState<P, R, V>>, metrics_handle: PrometheusHandle) -> Router
where
    P: ProductDependency,
    R: RecommendationDependency,
    V: ReviewDependency,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<P, R, V>))
        .route("/aggregate", post(routes::aggregate::create::<P, R, V>))
        .route(
            "/aggregate/{product_id}",
            get(routes::aggregate::get::<P, R, V>).delete(routes::aggregate::delete::<P, R, V>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Binds `entity`'s channel and drains it into `processor` in the background.
async fn spawn_consumer<C>(broker: &InMemoryBroker, entity: EntityKind, capacity: usize, processor: C)
where
    C: CommandProcessor + 'static,
{
    let receiver = broker.bind(entity.channel(), capacity).await;
    tokio::spawn(run_consumer(entity.channel(), receiver, Arc::new(processor)));
}

/// Builds state that reads from the owning services over HTTP and relays
/// commands to them from in-process channels.
pub async fn create_http_state(config: &Config) -> Result<Arc<HttpAppState>, ServiceError> {
    let transport = HttpTransport::new(Duration::from_secs(2))?;
    let broker = InMemoryBroker::new();
    let capacity = config.command_channel_capacity;

    let relays = [
        (EntityKind::Product, &config.product_url, &config.product_policy),
        (
            EntityKind::Recommendation,
            &config.recommendation_url,
            &config.recommendation_policy,
        ),
        (EntityKind::Review, &config.review_url, &config.review_policy),
    ];
    for (entity, url, policy) in relays {
        let relay = HttpCommandRelay::new(
            entity,
            url.as_str(),
            transport.clone(),
            policy.retry.clone(),
            policy.timeout,
        );
        spawn_consumer(&broker, entity, capacity, relay).await;
    }

    let dispatcher = CommandDispatcher::new(Arc::new(broker));
    let composite = ProductCompositeService::new(
        ProductClient::new(
            config.product_url.as_str(),
            transport.clone(),
            config.product_policy.clone(),
            dispatcher.clone(),
        ),
        RecommendationClient::new(
            config.recommendation_url.as_str(),
            transport.clone(),
            config.recommendation_policy.clone(),
            dispatcher.clone(),
        ),
        ReviewClient::new(
            config.review_url.as_str(),
            transport,
            config.review_policy.clone(),
            dispatcher,
        ),
        config.service_address.clone(),
    );

    Ok(Arc::new(AppState { composite }))
}

/// Builds state backed by in-process owning services that consume their own
/// command channels. Returns the services alongside so callers can seed or
/// inspect them.
pub async fn create_in_memory_state(
    config: &Config,
) -> (
    Arc<InMemoryAppState>,
    (
        InMemoryProductService,
        InMemoryRecommendationService,
        InMemoryReviewService,
    ),
) {
    let broker = InMemoryBroker::new();
    let dispatcher = CommandDispatcher::new(Arc::new(broker.clone()));
    let capacity = config.command_channel_capacity;

    let product = InMemoryProductService::new("product", dispatcher.clone());
    let recommendations = InMemoryRecommendationService::new("recommendation", dispatcher.clone());
    let reviews = InMemoryReviewService::new("review", dispatcher);

    spawn_consumer(&broker, EntityKind::Product, capacity, product.clone()).await;
    spawn_consumer(&broker, EntityKind::Recommendation, capacity, recommendations.clone()).await;
    spawn_consumer(&broker, EntityKind::Review, capacity, reviews.clone()).await;

    let composite = ProductCompositeService::new(
        product.clone(),
        recommendations.clone(),
        reviews.clone(),
        config.service_address.clone(),
    );

    (
        Arc::new(AppState { composite }),
        (product, recommendations, reviews),
    )
}
