//! Wire types shared by the composite service and its downstream clients.

pub mod aggregate;
pub mod http_error;
pub mod records;
pub mod types;

pub use aggregate::{ProductAggregate, RecommendationSummary, ReviewSummary, ServiceAddresses};
pub use http_error::HttpErrorInfo;
pub use records::{ProductRecord, RecommendationRecord, ReviewRecord};
pub use types::{InvalidProductId, ProductId};
