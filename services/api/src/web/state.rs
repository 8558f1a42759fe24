//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use interview_prep_core::ports::{
    DatabaseService, ExplanationGenerationService, PaymentService, QuestionGenerationService,
    UsageStore,
};
use interview_prep_core::usage::UsageLedger;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub question_adapter: Arc<dyn QuestionGenerationService>,
    pub explain_adapter: Arc<dyn ExplanationGenerationService>,
    /// Absent when no payment provider key is configured; billing routes
    /// answer 503 in that case.
    pub payments: Option<Arc<dyn PaymentService>>,
    /// Quota decisions and charging, backed by `usage_store`.
    pub ledger: UsageLedger,
    /// Direct record access for the billing routes (tier upgrades).
    pub usage_store: Arc<dyn UsageStore>,
}
