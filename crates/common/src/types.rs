use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a product, shared by every record in an aggregate.
///
/// The raw value is kept as-is so that write commands can carry whatever the
/// caller submitted; reads go through [`ProductId::validated`], which rejects
/// non-positive values before any downstream call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i32);

/// Returned when a product id is zero or negative.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid productId: {0}")]
pub struct InvalidProductId(pub i32);

impl ProductId {
    /// Wraps a raw id without validation.
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Wraps a raw id, rejecting values that are not strictly positive.
    pub fn validated(value: i32) -> Result<Self, InvalidProductId> {
        if value < 1 {
            return Err(InvalidProductId(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw id.
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ProductId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<ProductId> for i32 {
    fn from(id: ProductId) -> Self {
        id.0
    }
}
