use crate::api::AppState;
use crate::api::schemas::messages::{ListMessagesQuery, MessageResponse, SendMessageRequest};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Accepts a message for delivery. Resolution happens in the background.
///
/// # Errors
/// Returns `AppError::Validation` if any field is missing or malformed.
/// Returns `AppError::BadRequest` if the body is not valid JSON.
pub async fn send_message(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let new = request.validate().map_err(AppError::Validation)?;

    let message = state.message_service.send_message(new).await?;

    Ok((StatusCode::ACCEPTED, Json(MessageResponse::from(message))))
}

/// Fetches a single message.
///
/// # Errors
/// Returns `AppError::NotFound` if no message has this id.
pub async fn get_message(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<MessageResponse>> {
    let message = state.message_service.get_message(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(message.into()))
}

/// Lists messages, filtered by at most one of status, source or destination.
///
/// # Errors
/// Returns `AppError::Database` if the store query fails.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Vec<MessageResponse>>> {
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(e) => {
            tracing::debug!(error = %e, "Status filter matches no message");
            return Ok(Json(Vec::new()));
        }
    };

    let messages = state.message_service.list_messages(filter).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// Resolves a message's delivery immediately and returns the result.
///
/// # Errors
/// Returns `AppError::MessageNotFound` if no message has this id.
pub async fn simulate_message(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<MessageResponse>> {
    let message = state.message_service.simulate_delivery(id).await?.ok_or(AppError::MessageNotFound)?;
    Ok(Json(message.into()))
}
