use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    directory,
    error::{AppError, AppResult},
    ledger::{self, ApplicationInput},
    models::ApplicationStatus,
    routes::form::read_form,
    state::AppState,
};

pub async fn submit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Value>)> {
    let form = read_form(multipart, "resume").await?;
    let job_id = match form.text("jobId").filter(|value| !value.trim().is_empty()) {
        Some(raw) => Some(
            Uuid::parse_str(raw.trim())
                .map_err(|_| AppError::bad_request("jobId must be a valid UUID"))?,
        ),
        None => None,
    };
    let input = ApplicationInput {
        job_id,
        name: form.text("name"),
        email: form.text("email"),
        phone: form.text("phone"),
        address: form.text("address"),
        cover_letter: form.text("coverLetter"),
    };

    let application = ledger::submit(
        state.store.as_ref(),
        state.storage.as_ref(),
        &state.hub,
        &user,
        input,
        form.file,
        directory::now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Application Submitted!",
            "application": application,
        })),
    ))
}

pub async fn list_for_employer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let applications = ledger::list_for_employer(state.store.as_ref(), &user).await?;
    Ok(Json(json!({ "success": true, "applications": applications })))
}

pub async fn list_for_applicant(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let applications = ledger::list_for_applicant(state.store.as_ref(), &user).await?;
    Ok(Json(json!({ "success": true, "applications": applications })))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> AppResult<Json<Value>> {
    let status = payload
        .status
        .trim()
        .to_lowercase()
        .parse::<ApplicationStatus>()
        .map_err(AppError::bad_request)?;
    let application = ledger::update_status(
        state.store.as_ref(),
        &state.hub,
        &user,
        application_id,
        status,
    )
    .await?;
    Ok(Json(json!({ "success": true, "application": application })))
}

pub async fn resume(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(application_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let (url, name) = ledger::resume_link(
        state.store.as_ref(),
        state.storage.as_ref(),
        &user,
        application_id,
        state.presign_ttl(),
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "url": url,
        "originalName": name,
        "expiresIn": state.config.presigned_url_expiry_seconds,
    })))
}

pub async fn withdraw(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(application_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let outcome = ledger::withdraw(state.store.as_ref(), &state.hub, &user, application_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Application Deleted!",
        "outcome": outcome,
    })))
}
