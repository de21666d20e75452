//! Records owned by the downstream product, recommendation and review services.
//!
//! `service_address` is filled in by the owning service on reads and left
//! empty on records submitted through a create command.

use serde::{Deserialize, Serialize};

use crate::ProductId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub name: String,
    pub weight: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_address: Option<String>,
}

/// Identity is `(product_id, recommendation_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRecord {
    pub product_id: ProductId,
    pub recommendation_id: i32,
    pub author: String,
    #[serde(alias = "rate")]
    pub rating: i32,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_address: Option<String>,
}

/// Identity is `(product_id, review_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub product_id: ProductId,
    pub review_id: i32,
    pub author: String,
    pub subject: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_address: Option<String>,
}

impl ProductRecord {
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>, weight: i32) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            weight,
            service_address: None,
        }
    }

    /// Sets the address of the service instance that produced this record.
    pub fn with_service_address(mut self, address: impl Into<String>) -> Self {
        self.service_address = Some(address.into());
        self
    }
}

impl RecommendationRecord {
    pub fn identity(&self) -> (ProductId, i32) {
        (self.product_id, self.recommendation_id)
    }
}

impl ReviewRecord {
    pub fn identity(&self) -> (ProductId, i32) {
        (self.product_id, self.review_id)
    }
}
