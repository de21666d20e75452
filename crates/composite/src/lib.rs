//! Product aggregate orchestration.
//!
//! [`ProductCompositeService`] assembles an aggregate from one critical read
//! (the product) and two advisory reads (recommendations and reviews), and
//! fans aggregate writes out as commands to the three owning services.

pub mod error;
pub mod service;

pub use error::CompositeError;
pub use service::{CircuitStates, ProductCompositeService};
