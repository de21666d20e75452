//! In-memory stand-ins for the three owning services.
//!
//! Each one serves reads from local state (with scriptable failures, latency
//! and a read counter), publishes writes through a [`CommandDispatcher`] like
//! the HTTP clients do, and consumes its command channel as the owning
//! service would: CREATE rejects duplicate identities, DELETE removes every
//! record for a product and succeeds when there is none.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{ProductId, ProductRecord, RecommendationRecord, ReviewRecord};
use messaging::{
    CommandDispatcher, CommandEnvelope, CommandKind, CommandProcessor, DispatchError, EntityKind,
    Message, ProcessingError, decode,
};
use tokio::sync::RwLock;

use crate::clients::{
    FaultInjection, ProductIntegration, RecommendationIntegration, ReviewIntegration,
};
use crate::error::ServiceError;

#[derive(Debug, Default)]
struct ReadControl {
    fail_with: Option<ServiceError>,
    latency: Option<Duration>,
    reads: usize,
    last_faults: Option<FaultInjection>,
}

/// Read-side behaviour shared by the in-memory services.
#[derive(Debug, Clone, Default)]
struct Reads {
    control: Arc<RwLock<ReadControl>>,
}

impl Reads {
    /// Counts the read, applies scripted latency, then fails if scripted to.
    async fn begin(&self) -> Result<usize, ServiceError> {
        let (reads, latency, fail_with) = {
            let mut control = self.control.write().await;
            control.reads += 1;
            (control.reads, control.latency, control.fail_with.clone())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match fail_with {
            Some(err) => Err(err),
            None => Ok(reads),
        }
    }

    async fn fail_with(&self, error: Option<ServiceError>) {
        self.control.write().await.fail_with = error;
    }

    async fn set_latency(&self, latency: Option<Duration>) {
        self.control.write().await.latency = latency;
    }

    async fn count(&self) -> usize {
        self.control.read().await.reads
    }
}

fn missing_payload(key: ProductId) -> ProcessingError {
    ProcessingError::MissingPayload(key.to_string())
}

// -- Product --

/// In-memory product service.
#[derive(Clone)]
pub struct InMemoryProductService {
    products: Arc<RwLock<BTreeMap<ProductId, ProductRecord>>>,
    reads: Reads,
    address: String,
    dispatcher: CommandDispatcher,
}

impl InMemoryProductService {
    pub fn new(address: impl Into<String>, dispatcher: CommandDispatcher) -> Self {
        Self {
            products: Arc::default(),
            reads: Reads::default(),
            address: address.into(),
            dispatcher,
        }
    }

    /// Stores a product directly, bypassing the command channel.
    pub async fn insert(&self, product: ProductRecord) {
        self.products
            .write()
            .await
            .insert(product.product_id, product);
    }

    /// Makes every subsequent read fail with `error` (or succeed again with `None`).
    pub async fn fail_reads_with(&self, error: Option<ServiceError>) {
        self.reads.fail_with(error).await;
    }

    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.reads.set_latency(latency).await;
    }

    pub async fn read_count(&self) -> usize {
        self.reads.count().await
    }

    /// Fault injection parameters received by the most recent read.
    pub async fn last_faults(&self) -> Option<FaultInjection> {
        self.reads.control.read().await.last_faults
    }

    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }
}

#[async_trait]
impl ProductIntegration for InMemoryProductService {
    async fn get_product(
        &self,
        product_id: ProductId,
        faults: FaultInjection,
    ) -> Result<ProductRecord, ServiceError> {
        self.reads.control.write().await.last_faults = Some(faults);
        let reads = self.reads.begin().await?;

        if faults.delay > 0 {
            tokio::time::sleep(Duration::from_secs(u64::from(faults.delay))).await;
        }
        // Fails an evenly spread `fault_percent` share of reads.
        let pct = faults.fault_percent.min(100) as usize;
        if pct > 0 && (reads * pct) / 100 != ((reads - 1) * pct) / 100 {
            return Err(ServiceError::Transient(format!(
                "Something went wrong while reading productId: {product_id}"
            )));
        }

        if product_id.as_i32() < 1 {
            return Err(ServiceError::InvalidInput(format!("Invalid productId: {product_id}")));
        }

        self.products
            .read()
            .await
            .get(&product_id)
            .cloned()
            .map(|p| p.with_service_address(self.address.clone()))
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No product found for productId: {product_id}"))
            })
    }

    async fn create_product(&self, body: ProductRecord) -> Result<(), DispatchError> {
        let envelope = CommandEnvelope::create(body.product_id, body);
        self.dispatcher.dispatch(EntityKind::Product, &envelope).await
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<(), DispatchError> {
        let envelope = CommandEnvelope::<ProductId, ProductRecord>::delete(product_id);
        self.dispatcher.dispatch(EntityKind::Product, &envelope).await
    }
}

#[async_trait]
impl CommandProcessor for InMemoryProductService {
    async fn process(&self, message: &Message) -> Result<(), ProcessingError> {
        let envelope: CommandEnvelope<ProductId, ProductRecord> = decode(&message.body)?;

        match (envelope.kind, envelope.payload) {
            (CommandKind::Create, Some(mut product)) => {
                let mut products = self.products.write().await;
                if products.contains_key(&product.product_id) {
                    return Err(ProcessingError::Rejected(format!(
                        "Duplicate key, Product Id: {}",
                        product.product_id
                    )));
                }
                product.service_address = None;
                products.insert(product.product_id, product);
                Ok(())
            }
            (CommandKind::Delete, _) => {
                self.products.write().await.remove(&envelope.key);
                Ok(())
            }
            (CommandKind::Create, None) => Err(missing_payload(envelope.key)),
        }
    }
}

// -- Recommendation --

/// In-memory recommendation service. Records are kept in insertion order.
#[derive(Clone)]
pub struct InMemoryRecommendationService {
    recommendations: Arc<RwLock<Vec<RecommendationRecord>>>,
    reads: Reads,
    address: String,
    dispatcher: CommandDispatcher,
}

impl InMemoryRecommendationService {
    pub fn new(address: impl Into<String>, dispatcher: CommandDispatcher) -> Self {
        Self {
            recommendations: Arc::default(),
            reads: Reads::default(),
            address: address.into(),
            dispatcher,
        }
    }

    pub async fn insert(&self, recommendation: RecommendationRecord) {
        self.recommendations.write().await.push(recommendation);
    }

    pub async fn fail_reads_with(&self, error: Option<ServiceError>) {
        self.reads.fail_with(error).await;
    }

    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.reads.set_latency(latency).await;
    }

    pub async fn read_count(&self) -> usize {
        self.reads.count().await
    }

    pub async fn recommendation_count(&self) -> usize {
        self.recommendations.read().await.len()
    }
}

#[async_trait]
impl RecommendationIntegration for InMemoryRecommendationService {
    async fn get_recommendations(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<RecommendationRecord>, ServiceError> {
        self.reads.begin().await?;

        Ok(self
            .recommendations
            .read()
            .await
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .map(|mut r| {
                r.service_address = Some(self.address.clone());
                r
            })
            .collect())
    }

    async fn create_recommendation(
        &self,
        body: RecommendationRecord,
    ) -> Result<(), DispatchError> {
        let envelope = CommandEnvelope::create(body.product_id, body);
        self.dispatcher
            .dispatch(EntityKind::Recommendation, &envelope)
            .await
    }

    async fn delete_recommendations(&self, product_id: ProductId) -> Result<(), DispatchError> {
        let envelope = CommandEnvelope::<ProductId, RecommendationRecord>::delete(product_id);
        self.dispatcher
            .dispatch(EntityKind::Recommendation, &envelope)
            .await
    }
}

#[async_trait]
impl CommandProcessor for InMemoryRecommendationService {
    async fn process(&self, message: &Message) -> Result<(), ProcessingError> {
        let envelope: CommandEnvelope<ProductId, RecommendationRecord> = decode(&message.body)?;

        match (envelope.kind, envelope.payload) {
            (CommandKind::Create, Some(mut recommendation)) => {
                let mut recommendations = self.recommendations.write().await;
                if recommendations
                    .iter()
                    .any(|r| r.identity() == recommendation.identity())
                {
                    return Err(ProcessingError::Rejected(format!(
                        "Duplicate key, Product Id: {}, Recommendation Id: {}",
                        recommendation.product_id, recommendation.recommendation_id
                    )));
                }
                recommendation.service_address = None;
                recommendations.push(recommendation);
                Ok(())
            }
            (CommandKind::Delete, _) => {
                self.recommendations
                    .write()
                    .await
                    .retain(|r| r.product_id != envelope.key);
                Ok(())
            }
            (CommandKind::Create, None) => Err(missing_payload(envelope.key)),
        }
    }
}

// -- Review --

/// In-memory review service. Records are kept in insertion order.
#[derive(Clone)]
pub struct InMemoryReviewService {
    reviews: Arc<RwLock<Vec<ReviewRecord>>>,
    reads: Reads,
    address: String,
    dispatcher: CommandDispatcher,
}

impl InMemoryReviewService {
    pub fn new(address: impl Into<String>, dispatcher: CommandDispatcher) -> Self {
        Self {
            reviews: Arc::default(),
            reads: Reads::default(),
            address: address.into(),
            dispatcher,
        }
    }

    pub async fn insert(&self, review: ReviewRecord) {
        self.reviews.write().await.push(review);
    }

    pub async fn fail_reads_with(&self, error: Option<ServiceError>) {
        self.reads.fail_with(error).await;
    }

    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.reads.set_latency(latency).await;
    }

    pub async fn read_count(&self) -> usize {
        self.reads.count().await
    }

    pub async fn review_count(&self) -> usize {
        self.reviews.read().await.len()
    }
}

#[async_trait]
impl ReviewIntegration for InMemoryReviewService {
    async fn get_reviews(&self, product_id: ProductId) -> Result<Vec<ReviewRecord>, ServiceError> {
        self.reads.begin().await?;

        Ok(self
            .reviews
            .read()
            .await
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .map(|mut r| {
                r.service_address = Some(self.address.clone());
                r
            })
            .collect())
    }

    async fn create_review(&self, body: ReviewRecord) -> Result<(), DispatchError> {
        let envelope = CommandEnvelope::create(body.product_id, body);
        self.dispatcher.dispatch(EntityKind::Review, &envelope).await
    }

    async fn delete_reviews(&self, product_id: ProductId) -> Result<(), DispatchError> {
        let envelope = CommandEnvelope::<ProductId, ReviewRecord>::delete(product_id);
        self.dispatcher.dispatch(EntityKind::Review, &envelope).await
    }
}

#[async_trait]
impl CommandProcessor for InMemoryReviewService {
    async fn process(&self, message: &Message) -> Result<(), ProcessingError> {
        let envelope: CommandEnvelope<ProductId, ReviewRecord> = decode(&message.body)?;

        match (envelope.kind, envelope.payload) {
            (CommandKind::Create, Some(mut review)) => {
                let mut reviews = self.reviews.write().await;
                if reviews.iter().any(|r| r.identity() == review.identity()) {
                    return Err(ProcessingError::Rejected(format!(
                        "Duplicate key, Product Id: {}, Review Id: {}",
                        review.product_id, review.review_id
                    )));
                }
                review.service_address = None;
                reviews.push(review);
                Ok(())
            }
            (CommandKind::Delete, _) => {
                self.reviews
                    .write()
                    .await
                    .retain(|r| r.product_id != envelope.key);
                Ok(())
            }
            (CommandKind::Create, None) => Err(missing_payload(envelope.key)),
        }
    }
}
