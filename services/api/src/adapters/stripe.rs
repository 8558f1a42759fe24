//! services/api/src/adapters/stripe.rs
//!
//! This module contains the adapter for the Stripe payment provider.
//! It implements the `PaymentService` port from the `core` crate against
//! Stripe's REST API, deserializing only the fields the service consumes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interview_prep_core::ports::{
    CheckoutSession, PaymentService, PortError, PortResult, ProviderSubscription,
};
use serde::Deserialize;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `PaymentService` port using the Stripe REST API.
#[derive(Clone)]
pub struct StripeAdapter {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeAdapter {
    /// Creates a new `StripeAdapter`.
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            base_url: STRIPE_API_BASE.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> PortResult<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Stripe request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PortError::NotFound(format!(
                "Stripe object at {} not found",
                path
            )));
        }
        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Stripe returned status {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid Stripe response: {}", e)))
    }
}

//=========================================================================================
// Wire Structs (the fields consumed, nothing more)
//=========================================================================================

#[derive(Deserialize)]
struct CheckoutSessionWire {
    payment_status: String,
    customer: Option<String>,
    subscription: Option<String>,
}

#[derive(Deserialize)]
struct PlanWire {
    interval: Option<String>,
    interval_count: Option<u32>,
}

#[derive(Deserialize)]
struct SubscriptionWire {
    status: String,
    start_date: Option<i64>,
    plan: Option<PlanWire>,
    current_period_end: Option<i64>,
}

fn from_epoch(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
}

//=========================================================================================
// `PaymentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PaymentService for StripeAdapter {
    async fn retrieve_checkout_session(&self, session_id: &str) -> PortResult<CheckoutSession> {
        let wire: CheckoutSessionWire = self
            .get_json(&format!("/checkout/sessions/{}", session_id))
            .await?;
        Ok(CheckoutSession {
            payment_status: wire.payment_status,
            customer_id: wire.customer,
            subscription_id: wire.subscription,
        })
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> PortResult<ProviderSubscription> {
        let wire: SubscriptionWire = self
            .get_json(&format!("/subscriptions/{}", subscription_id))
            .await?;
        Ok(ProviderSubscription {
            status: wire.status,
            start_date: from_epoch(wire.start_date),
            plan_interval: wire.plan.as_ref().and_then(|p| p.interval.clone()),
            plan_interval_count: wire.plan.as_ref().and_then(|p| p.interval_count),
            current_period_end: from_epoch(wire.current_period_end),
        })
    }
}
