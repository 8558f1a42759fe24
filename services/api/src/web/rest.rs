//! services/api/src/web/rest.rs
//!
//! Shared REST payload structs and the master definition for the OpenAPI
//! specification.

use chrono::{DateTime, Utc};
use interview_prep_core::domain::{InterviewSession, Question, QuestionAnswer};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::profile_handler,
        crate::web::auth::upload_image_handler,
        crate::web::sessions::create_session_handler,
        crate::web::sessions::list_sessions_handler,
        crate::web::sessions::get_session_handler,
        crate::web::sessions::delete_session_handler,
        crate::web::sessions::append_questions_handler,
        crate::web::questions::add_questions_handler,
        crate::web::questions::toggle_pin_handler,
        crate::web::questions::update_note_handler,
        crate::web::generate::generate_questions_handler,
        crate::web::generate::generate_explanation_handler,
        crate::web::usage::get_usage_handler,
        crate::web::billing::subscription_info_handler,
        crate::web::billing::free_tier_handler,
        crate::web::billing::verify_payment_handler,
        crate::web::billing::check_subscription_handler,
    ),
    components(schemas(
        crate::web::auth::SignupRequest,
        crate::web::auth::LoginRequest,
        crate::web::auth::AuthResponse,
        crate::web::auth::ProfileResponse,
        crate::web::auth::UploadImageResponse,
        crate::web::quota::LimitExceededResponse,
        crate::web::sessions::CreateSessionRequest,
        crate::web::sessions::AppendQuestionsRequest,
        crate::web::questions::AddQuestionsRequest,
        crate::web::questions::UpdateNoteRequest,
        crate::web::generate::GenerateQuestionsRequest,
        crate::web::generate::GenerateExplanationRequest,
        crate::web::generate::ExplanationResponse,
        crate::web::usage::ResourceUsageResponse,
        crate::web::usage::UsageResponse,
        crate::web::billing::SubscriptionInfoResponse,
        crate::web::billing::VerifyPaymentRequest,
        crate::web::billing::VerifyPaymentResponse,
        crate::web::billing::CheckSubscriptionResponse,
        QuestionAnswerPayload,
        QuestionResponse,
        SessionResponse,
        SessionWithQuestionsResponse,
        MessageResponse,
    )),
    tags(
        (name = "Interview Prep API", description = "API endpoints for interview question generation, review and metering.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared API Payload Structs
//=========================================================================================

/// One question/answer pair as it travels over the wire.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
pub struct QuestionAnswerPayload {
    pub question: String,
    pub answer: String,
}

impl From<QuestionAnswer> for QuestionAnswerPayload {
    fn from(qa: QuestionAnswer) -> Self {
        Self {
            question: qa.question,
            answer: qa.answer,
        }
    }
}

impl From<QuestionAnswerPayload> for QuestionAnswer {
    fn from(payload: QuestionAnswerPayload) -> Self {
        Self {
            question: payload.question,
            answer: payload.answer,
        }
    }
}

/// A stored question, including annotation state.
#[derive(Serialize, ToSchema)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub question: String,
    pub answer: String,
    pub note: Option<String>,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Question> for QuestionResponse {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            session_id: q.session_id,
            question: q.question,
            answer: q.answer,
            note: q.note,
            is_pinned: q.is_pinned,
            created_at: q.created_at,
        }
    }
}

/// A session without its questions.
#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub experience: String,
    pub topics_to_focus: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InterviewSession> for SessionResponse {
    fn from(s: InterviewSession) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            role: s.role,
            experience: s.experience,
            topics_to_focus: s.topics_to_focus,
            description: s.description,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// A session with its questions attached.
#[derive(Serialize, ToSchema)]
pub struct SessionWithQuestionsResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub questions: Vec<QuestionResponse>,
}

/// A plain confirmation message.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
