use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::{Caller, RequestId},
    models::DistillResponse,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct DistillQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Recommends one spot around the caller's current position
pub async fn distill(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Caller(user_id): Caller,
    Query(query): Query<DistillQuery>,
) -> AppResult<Json<DistillResponse>> {
    let (Some(latitude), Some(longitude)) = (query.latitude, query.longitude) else {
        return Err(AppError::InvalidInput(
            "latitude and longitude are required".to_string(),
        ));
    };

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        latitude,
        longitude,
        "Processing distill request"
    );

    let result = state
        .distiller
        .distill_within(user_id, latitude, longitude, state.deadline())
        .await;

    match result {
        Ok(distillation) => {
            tracing::info!(
                request_id = %request_id,
                spot_id = %distillation.spot.id,
                "Distill request completed"
            );
            Ok(Json(DistillResponse::from(distillation)))
        }
        Err(e) => {
            tracing::info!(request_id = %request_id, error = %e, "Distill request failed");
            Err(e)
        }
    }
}
