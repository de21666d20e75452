use async_trait::async_trait;
use common::{ProductId, ReviewRecord};
use messaging::{CommandDispatcher, CommandEnvelope, DispatchError, EntityKind};
use resilience::{CircuitState, ResiliencePolicy};

use super::{Downstream, ReviewIntegration};
use crate::error::ServiceError;
use crate::transport::HttpTransport;

#[derive(Clone)]
pub struct ReviewClient {
    inner: Downstream,
}

impl ReviewClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: HttpTransport,
        policy: ResiliencePolicy,
        dispatcher: CommandDispatcher,
    ) -> Self {
        Self {
            inner: Downstream::new(EntityKind::Review, base_url, transport, policy, dispatcher),
        }
    }
}

#[async_trait]
impl ReviewIntegration for ReviewClient {
    async fn get_reviews(&self, product_id: ProductId) -> Result<Vec<ReviewRecord>, ServiceError> {
        let url = self.inner.url("/review");
        self.inner
            .read(&url, &[("productId", product_id.to_string())])
            .await
    }

    async fn create_review(&self, body: ReviewRecord) -> Result<(), DispatchError> {
        self.inner
            .send(CommandEnvelope::create(body.product_id, body))
            .await
    }

    async fn delete_reviews(&self, product_id: ProductId) -> Result<(), DispatchError> {
        self.inner
            .send(CommandEnvelope::<ProductId, ReviewRecord>::delete(product_id))
            .await
    }

    fn circuit_state(&self) -> Option<CircuitState> {
        Some(self.inner.circuit_state())
    }
}
