//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use resilience::CircuitState;
use serde::Serialize;

use crate::AppState;
use crate::{ProductDependency, RecommendationDependency, ReviewDependency};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub circuit_breakers: CircuitBreakers,
}

#[derive(Serialize)]
pub struct CircuitBreakers {
    pub product: &'static str,
    pub recommendation: &'static str,
    pub review: &'static str,
}

fn label(state: Option<CircuitState>) -> &'static str {
    state.map_or("UNKNOWN", |s| s.as_str())
}

/// GET /health — reports each dependency's breaker; `degraded` while the
/// product breaker is not closed.
pub async fn check<P, R, V>(State(state): State<Arc<AppState<P, R, V>>>) -> Json<HealthResponse>
where
    P: ProductDependency,
    R: RecommendationDependency,
    V: ReviewDependency,
{
    let states = state.composite.circuit_states();
    let status = match states.product {
        Some(CircuitState::Open) | Some(CircuitState::HalfOpen) => "degraded",
        _ => "ok",
    };

    Json(HealthResponse {
        status,
        circuit_breakers: CircuitBreakers {
            product: label(states.product),
            recommendation: label(states.recommendation),
            review: label(states.review),
        },
    })
}
