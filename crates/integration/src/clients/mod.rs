//! One client per downstream dependency.
//!
//! Each dependency is described by a small read+write trait so the
//! orchestrator can be composed from HTTP clients in production and
//! in-memory services in tests.

mod product;
mod recommendation;
mod review;

pub use product::ProductClient;
pub use recommendation::RecommendationClient;
pub use review::ReviewClient;

use async_trait::async_trait;
use common::{ProductId, ProductRecord, RecommendationRecord, ReviewRecord};
use messaging::{CommandDispatcher, CommandEnvelope, DispatchError, EntityKind};
use resilience::{CircuitState, ResiliencePolicy, ResilientCaller};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::transport::HttpTransport;

/// Simulated latency and failure rate forwarded to the product service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaultInjection {
    /// Seconds the product service should wait before answering.
    pub delay: u32,
    /// Percentage of product reads that should fail.
    pub fault_percent: u32,
}

impl FaultInjection {
    pub fn none() -> Self {
        Self::default()
    }

    fn query(&self) -> [(&'static str, String); 2] {
        [
            ("delay", self.delay.to_string()),
            ("faultPercent", self.fault_percent.to_string()),
        ]
    }
}

#[async_trait]
pub trait ProductIntegration: Send + Sync {
    async fn get_product(
        &self,
        product_id: ProductId,
        faults: FaultInjection,
    ) -> Result<ProductRecord, ServiceError>;

    async fn create_product(&self, body: ProductRecord) -> Result<(), DispatchError>;

    async fn delete_product(&self, product_id: ProductId) -> Result<(), DispatchError>;

    /// State of the breaker guarding reads, if there is one.
    fn circuit_state(&self) -> Option<CircuitState> {
        None
    }
}

#[async_trait]
pub trait RecommendationIntegration: Send + Sync {
    /// Recommendations in the owning service's order; possibly empty.
    async fn get_recommendations(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<RecommendationRecord>, ServiceError>;

    async fn create_recommendation(&self, body: RecommendationRecord)
    -> Result<(), DispatchError>;

    async fn delete_recommendations(&self, product_id: ProductId) -> Result<(), DispatchError>;

    fn circuit_state(&self) -> Option<CircuitState> {
        None
    }
}

#[async_trait]
pub trait ReviewIntegration: Send + Sync {
    /// Reviews in the owning service's order; possibly empty.
    async fn get_reviews(&self, product_id: ProductId) -> Result<Vec<ReviewRecord>, ServiceError>;

    async fn create_review(&self, body: ReviewRecord) -> Result<(), DispatchError>;

    async fn delete_reviews(&self, product_id: ProductId) -> Result<(), DispatchError>;

    fn circuit_state(&self) -> Option<CircuitState> {
        None
    }
}

/// Plumbing shared by the three HTTP clients: a resilient read path and a
/// command write path for one entity kind.
#[derive(Clone)]
struct Downstream {
    entity: EntityKind,
    base_url: String,
    transport: HttpTransport,
    caller: ResilientCaller,
    dispatcher: CommandDispatcher,
}

impl Downstream {
    fn new(
        entity: EntityKind,
        base_url: impl Into<String>,
        transport: HttpTransport,
        policy: ResiliencePolicy,
        dispatcher: CommandDispatcher,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            entity,
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            caller: ResilientCaller::new(entity.as_str(), policy),
            dispatcher,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let result = self
            .caller
            .call(|attempt| {
                tracing::debug!(dependency = self.entity.as_str(), url, attempt, "calling downstream");
                self.transport.get_json::<T>(url, query)
            })
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::counter!(
            "downstream_calls_total",
            "dependency" => self.entity.as_str(),
            "outcome" => outcome
        )
        .increment(1);

        result
    }

    async fn send<T: Serialize + Sync>(
        &self,
        envelope: CommandEnvelope<ProductId, T>,
    ) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(self.entity, &envelope).await
    }

    fn circuit_state(&self) -> CircuitState {
        self.caller.circuit_state()
    }
}
