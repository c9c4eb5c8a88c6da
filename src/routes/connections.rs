use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    connections::{self, Action, RequestOutcome},
    error::AppResult,
    state::AppState,
};

pub async fn request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(recipient_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let outcome = connections::request(state.store.as_ref(), &state.hub, &user, recipient_id).await?;
    let status = match outcome {
        RequestOutcome::Created(_) => StatusCode::CREATED,
        RequestOutcome::Revived(_) | RequestOutcome::Existing(_) => StatusCode::OK,
    };
    Ok((
        status,
        Json(json!({
            "success": true,
            "message": outcome.message(),
            "connection": outcome.connection(),
        })),
    ))
}

pub async fn incoming(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let requests = connections::list_incoming(state.store.as_ref(), &user).await?;
    Ok(Json(json!({ "success": true, "requests": requests })))
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub action: Action,
}

pub async fn respond(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(connection_id): Path<Uuid>,
    Json(payload): Json<RespondRequest>,
) -> AppResult<Json<Value>> {
    let connection = connections::respond(
        state.store.as_ref(),
        &state.hub,
        &user,
        connection_id,
        payload.action,
    )
    .await?;
    Ok(Json(json!({ "success": true, "connection": connection })))
}

pub async fn status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(other_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let connection = connections::status_between(state.store.as_ref(), &user, other_id).await?;
    let status = connection
        .as_ref()
        .map_or("none", |connection| connection.status.as_str());
    Ok(Json(json!({
        "success": true,
        "status": status,
        "connection": connection,
    })))
}

pub async fn mine(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let accepted = connections::list_accepted(state.store.as_ref(), &user).await?;
    Ok(Json(json!({ "success": true, "connections": accepted })))
}
