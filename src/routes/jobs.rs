use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    directory::{self, JobInput, JobView},
    error::AppResult,
    matching,
    models::Role,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct SkillsQuery {
    pub skills: Option<String>,
}

pub async fn list_active(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Query(query): Query<SkillsQuery>,
) -> AppResult<Json<Value>> {
    let store = state.store.as_ref();
    let mut skills = query
        .skills
        .as_deref()
        .map(matching::split_skills)
        .unwrap_or_default();

    if skills.is_empty() {
        if let Some(user) = &user {
            if let Some(account) = store.find_user(user.user_id).await? {
                skills = account.skills;
            }
        }
    }

    let exclude = user
        .as_ref()
        .filter(|user| user.role == Role::JobSeeker)
        .map(|user| user.user_id);
    let now = directory::now();
    let jobs: Vec<JobView> = directory::list_active_by_skills(store, &skills, exclude, now)
        .await?
        .into_iter()
        .map(|job| JobView::at(job, now))
        .collect();

    tracing::debug!(requested = skills.len(), matched = jobs.len(), "listed active jobs");
    Ok(Json(json!({ "success": true, "jobs": jobs })))
}

pub async fn post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<JobInput>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let now = directory::now();
    let job = directory::post_job(
        state.store.as_ref(),
        &user,
        payload,
        now,
        state.config.default_job_duration_days,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Job Posted Successfully!",
            "job": JobView::at(job, now),
        })),
    ))
}

pub async fn list_mine(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let now = directory::now();
    let jobs: Vec<JobView> = directory::list_by_owner(state.store.as_ref(), &user)
        .await?
        .into_iter()
        .map(|job| JobView::at(job, now))
        .collect();
    Ok(Json(json!({ "success": true, "myJobs": jobs })))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let job = directory::get_by_id(state.store.as_ref(), job_id).await?;
    Ok(Json(json!({
        "success": true,
        "job": JobView::at(job, directory::now()),
    })))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(job_id): Path<Uuid>,
    Json(payload): Json<JobInput>,
) -> AppResult<Json<Value>> {
    let now = directory::now();
    let job = directory::update(state.store.as_ref(), &user, job_id, payload, now).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Job Updated!",
        "job": JobView::at(job, now),
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    directory::delete(state.store.as_ref(), &user, job_id).await?;
    Ok(Json(json!({ "success": true, "message": "Job Deleted!" })))
}
