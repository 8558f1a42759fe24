//! services/api/src/web/sessions.rs
//!
//! Axum handlers for interview-session CRUD. Session creation is metered:
//! the daily quota is checked before any work happens and charged only once
//! the session exists.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use interview_prep_core::domain::{QuestionAnswer, ResourceKind};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::quota::limit_exceeded;
use crate::web::rest::{
    MessageResponse, QuestionAnswerPayload, QuestionResponse, SessionResponse,
    SessionWithQuestionsResponse,
};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub role: String,
    pub experience: String,
    pub topics_to_focus: String,
    pub description: Option<String>,
    pub questions: Vec<QuestionAnswerPayload>,
}

#[derive(Deserialize, ToSchema)]
pub struct AppendQuestionsRequest {
    pub questions: Vec<QuestionAnswerPayload>,
}

fn internal(e: impl std::fmt::Debug, what: &str) -> (StatusCode, String) {
    error!("{}: {:?}", what, e);
    (StatusCode::INTERNAL_SERVER_ERROR, what.to_string())
}

/// Create a new interview session together with its initial question set.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created successfully", body = SessionWithQuestionsResponse),
        (status = 400, description = "Bad request"),
        (status = 429, description = "Daily session limit exceeded", body = crate::web::quota::LimitExceededResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Response, (StatusCode, String)> {
    if req.role.trim().is_empty() || req.experience.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please provide all the required fields".to_string(),
        ));
    }

    let decision = state
        .ledger
        .check(user_id, ResourceKind::Sessions)
        .await
        .map_err(|e| internal(e, "Failed to check usage limit"))?;
    if !decision.allowed {
        return Ok(limit_exceeded(ResourceKind::Sessions, &decision));
    }

    let session = state
        .db
        .create_interview_session(
            user_id,
            &req.role,
            &req.experience,
            &req.topics_to_focus,
            req.description.as_deref(),
        )
        .await
        .map_err(|e| internal(e, "Failed to create session"))?;

    let pairs: Vec<QuestionAnswer> = req.questions.into_iter().map(Into::into).collect();
    let questions = state
        .db
        .add_questions_to_session(session.id, &pairs)
        .await
        .map_err(|e| internal(e, "Failed to store questions"))?;

    // Charge usage only now that the session exists.
    if let Err(e) = state.ledger.increment(user_id, ResourceKind::Sessions).await {
        error!("Failed to increment session usage: {:?}", e);
    }

    let response = SessionWithQuestionsResponse {
        session: session.into(),
        questions: questions.into_iter().map(Into::into).collect(),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// List the authenticated user's sessions, newest first.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "The user's sessions", body = [SessionWithQuestionsResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sessions = state
        .db
        .get_sessions_by_user(user_id)
        .await
        .map_err(|e| internal(e, "Failed to list sessions"))?;

    let mut out = Vec::with_capacity(sessions.len());
    for session in sessions {
        let questions = state
            .db
            .get_questions_for_session(session.id)
            .await
            .map_err(|e| internal(e, "Failed to load questions"))?;
        out.push(SessionWithQuestionsResponse {
            session: session.into(),
            questions: questions.into_iter().map(Into::into).collect(),
        });
    }
    Ok(Json(out))
}

/// Fetch one session with its questions, pinned first.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "The session", body = SessionWithQuestionsResponse),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .db
        .get_interview_session(id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "Session not found".to_string()))?;
    let questions = state
        .db
        .get_questions_for_session(id)
        .await
        .map_err(|e| internal(e, "Failed to load questions"))?;

    Ok(Json(SessionWithQuestionsResponse {
        session: session.into(),
        questions: questions.into_iter().map(Into::into).collect(),
    }))
}

/// Delete a session the user owns, cascading its questions.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted", body = MessageResponse),
        (status = 401, description = "Not the session owner"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .db
        .get_interview_session(id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "Session not found".to_string()))?;
    if session.user_id != user_id {
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()));
    }

    state
        .db
        .delete_interview_session(id)
        .await
        .map_err(|e| internal(e, "Failed to delete session"))?;

    Ok(Json(MessageResponse {
        message: "Session deleted successfully".to_string(),
    }))
}

/// Append freshly generated questions to an existing session.
#[utoipa::path(
    put,
    path = "/sessions/{id}/questions",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = AppendQuestionsRequest,
    responses(
        (status = 200, description = "Questions added", body = [QuestionResponse]),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn append_questions_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AppendQuestionsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .get_interview_session(id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "Session not found".to_string()))?;

    let pairs: Vec<QuestionAnswer> = req.questions.into_iter().map(Into::into).collect();
    let created = state
        .db
        .add_questions_to_session(id, &pairs)
        .await
        .map_err(|e| internal(e, "Failed to store questions"))?;

    let out: Vec<QuestionResponse> = created.into_iter().map(Into::into).collect();
    Ok(Json(out))
}
