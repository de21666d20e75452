//! Product aggregate endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use common::ProductAggregate;
use integration::FaultInjection;

use crate::AppState;
use crate::error::ApiError;
use crate::{ProductDependency, RecommendationDependency, ReviewDependency};

/// Extractor failures still answer with an `HttpErrorInfo` body.
fn rejected(status: StatusCode, uri: &OriginalUri, message: String) -> ApiError {
    ApiError::new(status, uri.path(), message)
}

/// GET /aggregate/{product_id}?delay=&faultPercent= — reads an aggregate.
#[tracing::instrument(skip_all, fields(path = %uri.path()))]
pub async fn get<P, R, V>(
    State(state): State<Arc<AppState<P, R, V>>>,
    uri: OriginalUri,
    product_id: Result<Path<i32>, PathRejection>,
    faults: Result<Query<FaultInjection>, QueryRejection>,
) -> Result<Json<ProductAggregate>, ApiError>
where
    P: ProductDependency,
    R: RecommendationDependency,
    V: ReviewDependency,
{
    let Path(product_id) =
        product_id.map_err(|e| rejected(StatusCode::BAD_REQUEST, &uri, e.body_text()))?;
    let Query(faults) =
        faults.map_err(|e| rejected(StatusCode::BAD_REQUEST, &uri, e.body_text()))?;

    let aggregate = state
        .composite
        .get_aggregate(product_id, faults)
        .await
        .map_err(|e| ApiError::from_composite(e, uri.path()))?;

    Ok(Json(aggregate))
}

/// POST /aggregate — accepts an aggregate and dispatches its create commands.
#[tracing::instrument(skip_all, fields(path = %uri.path()))]
pub async fn create<P, R, V>(
    State(state): State<Arc<AppState<P, R, V>>>,
    uri: OriginalUri,
    body: Result<Json<ProductAggregate>, JsonRejection>,
) -> Result<StatusCode, ApiError>
where
    P: ProductDependency,
    R: RecommendationDependency,
    V: ReviewDependency,
{
    let Json(body) = body.map_err(|e| rejected(e.status(), &uri, e.body_text()))?;

    state
        .composite
        .create_aggregate(body)
        .await
        .map_err(|e| ApiError::from_composite(e, uri.path()))?;

    Ok(StatusCode::OK)
}

/// DELETE /aggregate/{product_id} — dispatches delete commands, best effort.
#[tracing::instrument(skip_all, fields(path = %uri.path()))]
pub async fn delete<P, R, V>(
    State(state): State<Arc<AppState<P, R, V>>>,
    uri: OriginalUri,
    product_id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError>
where
    P: ProductDependency,
    R: RecommendationDependency,
    V: ReviewDependency,
{
    let Path(product_id) =
        product_id.map_err(|e| rejected(StatusCode::BAD_REQUEST, &uri, e.body_text()))?;

    state.composite.delete_aggregate(product_id).await;
    Ok(StatusCode::OK)
}
