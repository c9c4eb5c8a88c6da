use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::AuthenticatedUser, directory, error::AppResult, quiz, state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    #[serde(default)]
    pub answers: Value,
    #[serde(default)]
    pub skills_selected: Value,
}

pub async fn submit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<QuizRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let outcome = quiz::submit(
        state.store.as_ref(),
        state.storage.as_ref(),
        &user,
        &payload.answers,
        &payload.skills_selected,
        directory::now(),
        state.presign_ttl(),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "quizId": outcome.result.id,
            "matchCount": outcome.result.match_count,
            "matchedJobIds": outcome.result.matched_job_ids,
            "jobs": outcome.jobs,
            "reportUrl": outcome.report_url,
        })),
    ))
}

pub async fn report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    match quiz::latest_report(state.store.as_ref(), &user, directory::now()).await? {
        Some(report) => Ok(Json(json!({ "success": true, "report": report }))),
        None => Ok(Json(json!({
            "success": true,
            "report": null,
            "message": "No quiz taken yet.",
        }))),
    }
}
