use async_trait::async_trait;
use common::{ProductId, RecommendationRecord};
use messaging::{CommandDispatcher, CommandEnvelope, DispatchError, EntityKind};
use resilience::{CircuitState, ResiliencePolicy};

use super::{Downstream, RecommendationIntegration};
use crate::error::ServiceError;
use crate::transport::HttpTransport;

#[derive(Clone)]
pub struct RecommendationClient {
    inner: Downstream,
}

impl RecommendationClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: HttpTransport,
        policy: ResiliencePolicy,
        dispatcher: CommandDispatcher,
    ) -> Self {
        Self {
            inner: Downstream::new(
                EntityKind::Recommendation,
                base_url,
                transport,
                policy,
                dispatcher,
            ),
        }
    }
}

#[async_trait]
impl RecommendationIntegration for RecommendationClient {
    async fn get_recommendations(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<RecommendationRecord>, ServiceError> {
        let url = self.inner.url("/recommendation");
        self.inner
            .read(&url, &[("productId", product_id.to_string())])
            .await
    }

    async fn create_recommendation(
        &self,
        body: RecommendationRecord,
    ) -> Result<(), DispatchError> {
        self.inner
            .send(CommandEnvelope::create(body.product_id, body))
            .await
    }

    async fn delete_recommendations(&self, product_id: ProductId) -> Result<(), DispatchError> {
        self.inner
            .send(CommandEnvelope::<ProductId, RecommendationRecord>::delete(product_id))
            .await
    }

    fn circuit_state(&self) -> Option<CircuitState> {
        Some(self.inner.circuit_state())
    }
}
