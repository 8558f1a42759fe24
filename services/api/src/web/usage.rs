//! services/api/src/web/usage.rs
//!
//! The current-usage endpoint backing the frontend's quota display.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use interview_prep_core::usage::ResourceUsage;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct ResourceUsageResponse {
    pub used: u32,
    /// `-1` means unlimited.
    pub remaining: i64,
    /// `-1` means unlimited.
    pub limit: i64,
}

impl From<ResourceUsage> for ResourceUsageResponse {
    fn from(u: ResourceUsage) -> Self {
        Self {
            used: u.used,
            remaining: u.remaining.as_wire(),
            limit: u.limit.as_wire(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UsageResponse {
    pub tier: String,
    pub sessions: ResourceUsageResponse,
    pub explanations: ResourceUsageResponse,
    pub subscription_status: Option<String>,
    pub is_subscription_active: bool,
    pub last_updated: DateTime<Utc>,
}

/// Current daily usage and limits for the authenticated user.
#[utoipa::path(
    get,
    path = "/usage",
    responses(
        (status = 200, description = "Usage snapshot", body = UsageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_usage_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let summary = state.ledger.summary(user_id).await.map_err(|e| {
        error!("Failed to fetch usage data: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch usage data".to_string(),
        )
    })?;

    Ok(Json(UsageResponse {
        tier: summary.tier.as_str().to_string(),
        sessions: summary.sessions.into(),
        explanations: summary.explanations.into(),
        subscription_status: summary
            .subscription_status
            .map(|s| s.as_str().to_string()),
        is_subscription_active: summary.is_subscription_active,
        last_updated: Utc::now(),
    }))
}
