//! services/api/src/web/generate.rs
//!
//! The AI generation endpoints. The handler asks the ledger for permission
//! first, calls the model, then runs the raw output through the extraction
//! layer; usage is charged only after the model call succeeded.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use interview_prep_core::domain::{ConceptExplanation, ResourceKind};
use interview_prep_core::extract::{extract_concept_explanation, extract_question_answers};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::quota::limit_exceeded;
use crate::web::rest::QuestionAnswerPayload;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct GenerateQuestionsRequest {
    pub role: String,
    pub experience: String,
    pub topics_to_focus: String,
    pub number_of_questions: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateExplanationRequest {
    pub question: String,
}

#[derive(Serialize, ToSchema)]
pub struct ExplanationResponse {
    pub title: String,
    pub explanation: String,
}

impl From<ConceptExplanation> for ExplanationResponse {
    fn from(e: ConceptExplanation) -> Self {
        Self {
            title: e.title,
            explanation: e.explanation,
        }
    }
}

/// Generate a question/answer set for a role.
#[utoipa::path(
    post,
    path = "/ai/generate-questions",
    request_body = GenerateQuestionsRequest,
    responses(
        (status = 200, description = "Generated question/answer pairs", body = [QuestionAnswerPayload]),
        (status = 400, description = "Missing required fields"),
        (status = 500, description = "Generation or extraction failed")
    )
)]
pub async fn generate_questions_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateQuestionsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.role.trim().is_empty()
        || req.experience.trim().is_empty()
        || req.topics_to_focus.trim().is_empty()
        || req.number_of_questions == 0
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please provide all the required fields".to_string(),
        ));
    }

    let raw = state
        .question_adapter
        .generate_questions(
            &req.role,
            &req.experience,
            &req.topics_to_focus,
            req.number_of_questions,
        )
        .await
        .map_err(|e| {
            error!("Question generation failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error generating interview questions".to_string(),
            )
        })?;

    let pairs = extract_question_answers(&raw).map_err(|e| {
        error!("Failed to extract questions from model output: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error generating interview questions".to_string(),
        )
    })?;

    let out: Vec<QuestionAnswerPayload> = pairs.into_iter().map(Into::into).collect();
    Ok(Json(out))
}

/// Generate a concept explanation for a question.
///
/// Metered against the explanations quota: checked before the model call,
/// charged only once it succeeded. Extraction is best-effort and never
/// fails; unparseable model output degrades to placeholder text.
#[utoipa::path(
    post,
    path = "/ai/generate-explanation",
    request_body = GenerateExplanationRequest,
    responses(
        (status = 200, description = "Generated explanation", body = ExplanationResponse),
        (status = 400, description = "Missing question"),
        (status = 429, description = "Daily explanation limit exceeded", body = crate::web::quota::LimitExceededResponse),
        (status = 500, description = "Generation failed")
    )
)]
pub async fn generate_explanation_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<GenerateExplanationRequest>,
) -> Result<Response, (StatusCode, String)> {
    if req.question.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please provide the question".to_string(),
        ));
    }

    let decision = state
        .ledger
        .check(user_id, ResourceKind::Explanations)
        .await
        .map_err(|e| {
            error!("Failed to check usage limit: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        })?;
    if !decision.allowed {
        return Ok(limit_exceeded(ResourceKind::Explanations, &decision));
    }

    let raw = state
        .explain_adapter
        .generate_explanation(&req.question)
        .await
        .map_err(|e| {
            error!("Explanation generation failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error generating interview explanation".to_string(),
            )
        })?;

    let explanation = extract_concept_explanation(&raw);

    if let Err(e) = state
        .ledger
        .increment(user_id, ResourceKind::Explanations)
        .await
    {
        error!("Failed to increment explanation usage: {:?}", e);
    }

    Ok(Json(ExplanationResponse::from(explanation)).into_response())
}
