//! services/api/src/web/billing.rs
//!
//! Billing endpoints. Talks to the payment provider only through the
//! `PaymentService` port and consumes the minimal field set: checkout
//! payment status and subscription status/period data.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, Months, Utc};
use interview_prep_core::domain::{SubscriptionStatus, Tier};
use interview_prep_core::ports::{PaymentService, ProviderSubscription};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct SubscriptionInfoResponse {
    pub tier: String,
    pub subscription_status: Option<String>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub session_id: String,
    pub tier: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub message: String,
    pub tier: String,
    pub subscription_status: Option<String>,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckSubscriptionResponse {
    pub is_active: bool,
    pub tier: Option<String>,
    pub status: Option<String>,
}

fn payments_or_unavailable(
    state: &AppState,
) -> Result<&Arc<dyn PaymentService>, (StatusCode, String)> {
    state.payments.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "Payments are not configured".to_string(),
    ))
}

fn storage_error(e: impl std::fmt::Debug) -> (StatusCode, String) {
    error!("Usage record access failed: {:?}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// End date derived from a subscription's start date and plan interval,
/// falling back to the provider's `current_period_end`.
fn subscription_end_date(sub: &ProviderSubscription) -> Option<DateTime<Utc>> {
    let derived = match (sub.start_date, sub.plan_interval.as_deref()) {
        (Some(start), Some(interval)) => {
            let count = sub.plan_interval_count.unwrap_or(1);
            match interval {
                "month" => start.checked_add_months(Months::new(count)),
                "year" => start.checked_add_months(Months::new(count.saturating_mul(12))),
                "week" => Some(start + Duration::weeks(count as i64)),
                "day" => Some(start + Duration::days(count as i64)),
                _ => None,
            }
        }
        _ => None,
    };
    derived.or(sub.current_period_end)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Current subscription details for the authenticated user.
#[utoipa::path(
    get,
    path = "/billing/subscription-info",
    responses(
        (status = 200, description = "Subscription details", body = SubscriptionInfoResponse),
        (status = 404, description = "No usage record for this user"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn subscription_info_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let record = state
        .usage_store
        .load_usage_record(user_id)
        .await
        .map_err(storage_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            "Usage record not found".to_string(),
        ))?;

    Ok(Json(SubscriptionInfoResponse {
        tier: record.tier.as_str().to_string(),
        subscription_status: record.subscription_status.map(|s| s.as_str().to_string()),
        subscription_end_date: record.subscription_end_date,
        is_active: record.is_subscription_active(Utc::now()),
    }))
}

/// Reset the authenticated user to the free tier.
#[utoipa::path(
    post,
    path = "/billing/free-tier",
    responses(
        (status = 200, description = "Now on the free tier", body = SubscriptionInfoResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn free_tier_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut record = state
        .ledger
        .load_or_create(user_id)
        .await
        .map_err(storage_error)?;

    record.tier = Tier::Free;
    record.subscription_status = Some(SubscriptionStatus::Active);
    record.stripe_customer_id = None;
    record.stripe_subscription_id = None;
    record.subscription_end_date = None;

    state
        .usage_store
        .save_usage_record(&record)
        .await
        .map_err(storage_error)?;

    Ok(Json(SubscriptionInfoResponse {
        tier: record.tier.as_str().to_string(),
        subscription_status: record.subscription_status.map(|s| s.as_str().to_string()),
        subscription_end_date: record.subscription_end_date,
        is_active: record.is_subscription_active(Utc::now()),
    }))
}

/// Verify a completed checkout and upgrade the user's tier.
#[utoipa::path(
    post,
    path = "/billing/verify-payment",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Tier upgraded", body = VerifyPaymentResponse),
        (status = 400, description = "Payment not completed or invalid tier"),
        (status = 503, description = "Payments not configured"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn verify_payment_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let payments = payments_or_unavailable(&state)?;

    if req.session_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Session ID and tier are required".to_string(),
        ));
    }
    let tier = match req.tier.as_str() {
        "premium" => Tier::Premium,
        "luxury" => Tier::Luxury,
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("'{}' is not a purchasable tier", req.tier),
            ))
        }
    };

    let checkout = payments
        .retrieve_checkout_session(&req.session_id)
        .await
        .map_err(|e| {
            error!("Payment verification error: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to verify payment".to_string(),
            )
        })?;

    if checkout.payment_status != "paid" {
        return Err((
            StatusCode::BAD_REQUEST,
            "Payment not completed".to_string(),
        ));
    }

    // Recurring purchases carry a subscription whose plan determines the end
    // date; one-off payments get a fixed 30-day entitlement.
    let (status, end_date) = match checkout.subscription_id.as_deref() {
        Some(subscription_id) => {
            let sub = payments
                .retrieve_subscription(subscription_id)
                .await
                .map_err(|e| {
                    error!("Payment verification error: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to verify payment".to_string(),
                    )
                })?;
            let end = subscription_end_date(&sub);
            (SubscriptionStatus::parse(&sub.status), end)
        }
        None => (
            Some(SubscriptionStatus::Active),
            Some(Utc::now() + Duration::days(30)),
        ),
    };

    let mut record = state
        .ledger
        .load_or_create(user_id)
        .await
        .map_err(storage_error)?;
    record.tier = tier;
    record.subscription_status = status;
    record.stripe_customer_id = checkout.customer_id;
    record.stripe_subscription_id = checkout.subscription_id;
    record.subscription_end_date = end_date;

    state
        .usage_store
        .save_usage_record(&record)
        .await
        .map_err(storage_error)?;

    Ok(Json(VerifyPaymentResponse {
        message: format!("Successfully upgraded to {} tier", record.tier.as_str()),
        tier: record.tier.as_str().to_string(),
        subscription_status: record.subscription_status.map(|s| s.as_str().to_string()),
        subscription_end_date: record.subscription_end_date,
    }))
}

/// Re-sync the subscription status from the payment provider.
#[utoipa::path(
    get,
    path = "/billing/check-subscription",
    responses(
        (status = 200, description = "Subscription state", body = CheckSubscriptionResponse),
        (status = 503, description = "Payments not configured"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn check_subscription_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let payments = payments_or_unavailable(&state)?;

    let record = state
        .usage_store
        .load_usage_record(user_id)
        .await
        .map_err(storage_error)?;

    let mut record = match record {
        Some(r) if r.stripe_subscription_id.is_some() => r,
        _ => {
            return Ok(Json(CheckSubscriptionResponse {
                is_active: false,
                tier: None,
                status: None,
            }))
        }
    };

    let subscription_id = record
        .stripe_subscription_id
        .clone()
        .unwrap_or_default();
    let sub = payments
        .retrieve_subscription(&subscription_id)
        .await
        .map_err(|e| {
            error!("Subscription check error: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to check subscription".to_string(),
            )
        })?;

    let provider_status = SubscriptionStatus::parse(&sub.status);
    if provider_status != record.subscription_status {
        record.subscription_status = provider_status;
        record.subscription_end_date = sub.current_period_end;
        if !matches!(sub.status.as_str(), "active" | "trialing") {
            record.tier = Tier::Free;
        }
        state
            .usage_store
            .save_usage_record(&record)
            .await
            .map_err(storage_error)?;
    }

    Ok(Json(CheckSubscriptionResponse {
        is_active: record.is_subscription_active(Utc::now()),
        tier: Some(record.tier.as_str().to_string()),
        status: record.subscription_status.map(|s| s.as_str().to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sub(
        start: Option<DateTime<Utc>>,
        interval: Option<&str>,
        count: Option<u32>,
        period_end: Option<DateTime<Utc>>,
    ) -> ProviderSubscription {
        ProviderSubscription {
            status: "active".to_string(),
            start_date: start,
            plan_interval: interval.map(str::to_string),
            plan_interval_count: count,
            current_period_end: period_end,
        }
    }

    #[test]
    fn monthly_plan_adds_months_to_start() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let end = subscription_end_date(&sub(Some(start), Some("month"), Some(1), None)).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 2, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn yearly_plan_defaults_interval_count_to_one() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = subscription_end_date(&sub(Some(start), Some("year"), None, None)).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn weekly_plan_uses_fixed_length_weeks() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let end = subscription_end_date(&sub(Some(start), Some("week"), Some(2), None)).unwrap();
        assert_eq!(end, start + Duration::weeks(2));
    }

    #[test]
    fn unknown_interval_falls_back_to_period_end() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let period_end = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let end = subscription_end_date(&sub(Some(start), Some("fortnight"), None, Some(period_end)))
            .unwrap();
        assert_eq!(end, period_end);
    }

    #[test]
    fn no_plan_data_and_no_period_end_yields_none() {
        assert!(subscription_end_date(&sub(None, None, None, None)).is_none());
    }
}
