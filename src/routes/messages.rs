use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    messaging,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub before: Option<String>,
}

fn parse_before(raw: &str) -> Result<NaiveDateTime, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.naive_utc())
        .or_else(|_| raw.parse::<NaiveDateTime>())
        .map_err(|_| AppError::bad_request("before must be an RFC 3339 timestamp"))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(other_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Value>> {
    let before = query
        .before
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_before(raw.trim()))
        .transpose()?;
    let messages =
        messaging::list(state.store.as_ref(), &user, other_id, query.limit, before).await?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub content: String,
}

pub async fn send(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(other_id): Path<Uuid>,
    Json(payload): Json<SendRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let message = messaging::send(
        state.store.as_ref(),
        &state.hub,
        &user,
        other_id,
        &payload.content,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": message })),
    ))
}
