//! services/api/src/web/quota.rs
//!
//! Maps a denied usage check onto the 429 payload the frontend consumes.

use axum::{http::StatusCode, response::IntoResponse, Json};
use interview_prep_core::domain::{ResourceKind, Tier};
use interview_prep_core::usage::UsageDecision;
use serde::Serialize;
use utoipa::ToSchema;

/// The body of a daily-limit rejection.
#[derive(Serialize, ToSchema)]
pub struct LimitExceededResponse {
    pub error: String,
    pub code: String,
    pub limit_type: String,
    pub tier: String,
    pub daily_limit: i64,
    pub remaining: i64,
    pub upgrade_required: bool,
}

/// Renders a denied [`UsageDecision`] as a 429 response.
pub fn limit_exceeded(kind: ResourceKind, decision: &UsageDecision) -> axum::response::Response {
    let body = LimitExceededResponse {
        error: format!(
            "Daily limit exceeded. You can only create {} {} per day with your {} plan.",
            decision.limit.as_wire(),
            kind.as_str(),
            decision.tier.as_str()
        ),
        code: "DAILY_LIMIT_EXCEEDED".to_string(),
        limit_type: kind.as_str().to_string(),
        tier: decision.tier.as_str().to_string(),
        daily_limit: decision.limit.as_wire(),
        remaining: decision.remaining.as_wire(),
        upgrade_required: decision.tier == Tier::Free,
    };
    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use interview_prep_core::usage::Limit;

    #[test]
    fn rejection_names_the_plan_and_resource() {
        let decision = UsageDecision {
            allowed: false,
            tier: Tier::Free,
            limit: Limit::Capped(3),
            remaining: Limit::Capped(0),
        };
        let response = limit_exceeded(ResourceKind::Explanations, &decision);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
