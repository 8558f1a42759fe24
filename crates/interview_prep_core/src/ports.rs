//! crates/interview_prep_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AuthSession, InterviewSession, Question, QuestionAnswer, User, UserCredentials, UsageRecord,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Methods ---
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
        profile_image_url: Option<&str>,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Interview Session Management ---
    async fn create_interview_session(
        &self,
        user_id: Uuid,
        role: &str,
        experience: &str,
        topics_to_focus: &str,
        description: Option<&str>,
    ) -> PortResult<InterviewSession>;

    async fn get_interview_session(&self, session_id: Uuid) -> PortResult<InterviewSession>;

    /// Sessions owned by the user, newest first.
    async fn get_sessions_by_user(&self, user_id: Uuid) -> PortResult<Vec<InterviewSession>>;

    /// Deletes a session along with all of its questions.
    async fn delete_interview_session(&self, session_id: Uuid) -> PortResult<()>;

    // --- Question Management ---
    /// Appends a batch of generated question/answer pairs to a session.
    async fn add_questions_to_session(
        &self,
        session_id: Uuid,
        questions: &[QuestionAnswer],
    ) -> PortResult<Vec<Question>>;

    /// Questions for a session, pinned first, then newest first.
    async fn get_questions_for_session(&self, session_id: Uuid) -> PortResult<Vec<Question>>;

    async fn get_question_by_id(&self, question_id: Uuid) -> PortResult<Question>;

    async fn set_question_pinned(&self, question_id: Uuid, pinned: bool) -> PortResult<Question>;

    async fn set_question_note(&self, question_id: Uuid, note: &str) -> PortResult<Question>;
}

/// Persistence for per-user [`UsageRecord`]s. Kept separate from
/// [`DatabaseService`] so the usage ledger can be exercised against an
/// in-memory store.
///
/// Load-then-save is not assumed atomic across concurrent requests; two
/// simultaneous increments for the same user can under-enforce a limit by
/// one unit.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn load_usage_record(&self, user_id: Uuid) -> PortResult<Option<UsageRecord>>;

    async fn save_usage_record(&self, record: &UsageRecord) -> PortResult<()>;
}

#[async_trait]
pub trait QuestionGenerationService: Send + Sync {
    /// Asks the model for a question/answer set and returns its raw text
    /// output. The caller recovers structure from it via
    /// [`crate::extract::extract_question_answers`].
    async fn generate_questions(
        &self,
        role: &str,
        experience: &str,
        topics_to_focus: &str,
        number_of_questions: u32,
    ) -> PortResult<String>;
}

#[async_trait]
pub trait ExplanationGenerationService: Send + Sync {
    /// Asks the model to explain a concept and returns its raw text output.
    async fn generate_explanation(&self, question: &str) -> PortResult<String>;
}

//=========================================================================================
// Payment Provider Port
//=========================================================================================

/// The fields consumed from a payment provider checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub payment_status: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
}

/// The fields consumed from a payment provider subscription object.
#[derive(Debug, Clone)]
pub struct ProviderSubscription {
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub plan_interval: Option<String>,
    pub plan_interval_count: Option<u32>,
    pub current_period_end: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn retrieve_checkout_session(&self, session_id: &str) -> PortResult<CheckoutSession>;

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> PortResult<ProviderSubscription>;
}
