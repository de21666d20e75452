use async_trait::async_trait;
use common::{ProductId, ProductRecord};
use messaging::{CommandDispatcher, CommandEnvelope, DispatchError, EntityKind};
use resilience::{CircuitState, ResiliencePolicy};

use super::{Downstream, FaultInjection, ProductIntegration};
use crate::error::ServiceError;
use crate::transport::HttpTransport;

/// Client for the product service, the critical dependency of an aggregate.
#[derive(Clone)]
pub struct ProductClient {
    inner: Downstream,
}

impl ProductClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: HttpTransport,
        policy: ResiliencePolicy,
        dispatcher: CommandDispatcher,
    ) -> Self {
        Self {
            inner: Downstream::new(EntityKind::Product, base_url, transport, policy, dispatcher),
        }
    }
}

#[async_trait]
impl ProductIntegration for ProductClient {
    async fn get_product(
        &self,
        product_id: ProductId,
        faults: FaultInjection,
    ) -> Result<ProductRecord, ServiceError> {
        let url = self.inner.url(&format!("/product/{product_id}"));
        self.inner.read(&url, &faults.query()).await
    }

    async fn create_product(&self, body: ProductRecord) -> Result<(), DispatchError> {
        self.inner
            .send(CommandEnvelope::create(body.product_id, body))
            .await
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<(), DispatchError> {
        self.inner
            .send(CommandEnvelope::<ProductId, ProductRecord>::delete(product_id))
            .await
    }

    fn circuit_state(&self) -> Option<CircuitState> {
        Some(self.inner.circuit_state())
    }
}
