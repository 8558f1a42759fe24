//! services/api/src/web/questions.rs
//!
//! Axum handlers for question-level operations: bulk add, pin toggling and
//! user notes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use interview_prep_core::domain::QuestionAnswer;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{QuestionAnswerPayload, QuestionResponse};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct AddQuestionsRequest {
    pub session_id: Uuid,
    pub questions: Vec<QuestionAnswerPayload>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateNoteRequest {
    pub note: Option<String>,
}

/// Add a batch of questions to a session.
#[utoipa::path(
    post,
    path = "/questions/add-to-session",
    request_body = AddQuestionsRequest,
    responses(
        (status = 200, description = "Questions added", body = [QuestionResponse]),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn add_questions_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddQuestionsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.questions.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please provide all the required fields".to_string(),
        ));
    }

    state
        .db
        .get_interview_session(req.session_id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "Session not found".to_string()))?;

    let pairs: Vec<QuestionAnswer> = req.questions.into_iter().map(Into::into).collect();
    let created = state
        .db
        .add_questions_to_session(req.session_id, &pairs)
        .await
        .map_err(|e| {
            error!("Failed to add questions: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to add questions".to_string(),
            )
        })?;

    let out: Vec<QuestionResponse> = created.into_iter().map(Into::into).collect();
    Ok(Json(out))
}

/// Toggle a question's pinned flag.
#[utoipa::path(
    put,
    path = "/questions/{id}/pin",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Pin state toggled", body = QuestionResponse),
        (status = 404, description = "Question not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn toggle_pin_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let question = state
        .db
        .get_question_by_id(id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "Question not found".to_string()))?;

    let updated = state
        .db
        .set_question_pinned(id, !question.is_pinned)
        .await
        .map_err(|e| {
            error!("Failed to toggle pin: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update question".to_string(),
            )
        })?;

    Ok(Json(QuestionResponse::from(updated)))
}

/// Set or clear the user's note on a question.
#[utoipa::path(
    put,
    path = "/questions/{id}/note",
    params(("id" = Uuid, Path, description = "Question id")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated", body = QuestionResponse),
        (status = 404, description = "Question not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_note_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .get_question_by_id(id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "Question not found".to_string()))?;

    let updated = state
        .db
        .set_question_note(id, req.note.as_deref().unwrap_or(""))
        .await
        .map_err(|e| {
            error!("Failed to update note: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update question".to_string(),
            )
        })?;

    Ok(Json(QuestionResponse::from(updated)))
}
