//! Clients for the three services that own the parts of a product aggregate.
//!
//! Reads go over HTTP through a per-dependency [`resilience::ResilientCaller`];
//! writes are published as commands through a [`messaging::CommandDispatcher`].
//! Transport failures are translated into [`ServiceError`] kinds.

pub mod clients;
pub mod error;
pub mod memory;
pub mod relay;
pub mod transport;

pub use clients::{
    FaultInjection, ProductClient, ProductIntegration, RecommendationClient,
    RecommendationIntegration, ReviewClient, ReviewIntegration,
};
pub use error::ServiceError;
pub use memory::{InMemoryProductService, InMemoryRecommendationService, InMemoryReviewService};
pub use relay::HttpCommandRelay;
pub use transport::HttpTransport;
