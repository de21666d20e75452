//! The composed read model returned by `GET /aggregate/{productId}`.
//!
//! The same shape is accepted by `POST /aggregate`, where both summary lists
//! and `serviceAddresses` may be omitted.

use serde::{Deserialize, Serialize};

use crate::{ProductId, ProductRecord, RecommendationRecord, ReviewRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAggregate {
    pub product_id: ProductId,
    pub name: String,
    pub weight: i32,
    #[serde(default)]
    pub recommendation_summaries: Vec<RecommendationSummary>,
    #[serde(default)]
    pub review_summaries: Vec<ReviewSummary>,
    #[serde(default)]
    pub service_addresses: ServiceAddresses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSummary {
    pub recommendation_id: i32,
    pub author: String,
    #[serde(alias = "rate")]
    pub rating: i32,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub review_id: i32,
    pub author: String,
    pub subject: String,
    pub content: String,
}

/// Addresses of the instances that served each part of an aggregate.
///
/// Every field is always a string. A satellite address is empty when its
/// list is empty, whether because no records exist or because the read
/// degraded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceAddresses {
    pub composite_address: String,
    pub product_address: String,
    pub recommendation_address: String,
    pub review_address: String,
}

impl ProductAggregate {
    /// Projects a product and its satellites into an aggregate.
    ///
    /// Satellite order is preserved as delivered by the owning services.
    pub fn assemble(
        product: ProductRecord,
        recommendations: Vec<RecommendationRecord>,
        reviews: Vec<ReviewRecord>,
        composite_address: impl Into<String>,
    ) -> Self {
        let service_addresses = ServiceAddresses {
            composite_address: composite_address.into(),
            product_address: product.service_address.clone().unwrap_or_default(),
            recommendation_address: recommendations
                .first()
                .and_then(|r| r.service_address.clone())
                .unwrap_or_default(),
            review_address: reviews
                .first()
                .and_then(|r| r.service_address.clone())
                .unwrap_or_default(),
        };

        Self {
            product_id: product.product_id,
            name: product.name,
            weight: product.weight,
            recommendation_summaries: recommendations
                .into_iter()
                .map(RecommendationSummary::from)
                .collect(),
            review_summaries: reviews.into_iter().map(ReviewSummary::from).collect(),
            service_addresses,
        }
    }

    /// The product record submitted by a create command.
    pub fn product_record(&self) -> ProductRecord {
        ProductRecord::new(self.product_id, self.name.clone(), self.weight)
    }

    /// One recommendation record per summary, keyed by this aggregate's product.
    pub fn recommendation_records(&self) -> Vec<RecommendationRecord> {
        self.recommendation_summaries
            .iter()
            .map(|r| RecommendationRecord {
                product_id: self.product_id,
                recommendation_id: r.recommendation_id,
                author: r.author.clone(),
                rating: r.rating,
                content: r.content.clone(),
                service_address: None,
            })
            .collect()
    }

    /// One review record per summary, keyed by this aggregate's product.
    pub fn review_records(&self) -> Vec<ReviewRecord> {
        self.review_summaries
            .iter()
            .map(|r| ReviewRecord {
                product_id: self.product_id,
                review_id: r.review_id,
                author: r.author.clone(),
                subject: r.subject.clone(),
                content: r.content.clone(),
                service_address: None,
            })
            .collect()
    }
}

impl From<RecommendationRecord> for RecommendationSummary {
    fn from(r: RecommendationRecord) -> Self {
        Self {
            recommendation_id: r.recommendation_id,
            author: r.author,
            rating: r.rating,
            content: r.content,
        }
    }
}

impl From<ReviewRecord> for ReviewSummary {
    fn from(r: ReviewRecord) -> Self {
        Self {
            review_id: r.review_id,
            author: r.author,
            subject: r.subject,
            content: r.content,
        }
    }
}
