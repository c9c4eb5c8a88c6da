use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    routes::form::read_form,
    state::AppState,
    users::{self, ProfileInput},
};

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let profile = users::profile(state.store.as_ref(), &user).await?;
    Ok(Json(json!({ "success": true, "user": profile })))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ProfileInput>,
) -> AppResult<Json<Value>> {
    let profile = users::update_profile(state.store.as_ref(), &user, payload).await?;
    Ok(Json(json!({ "success": true, "user": profile })))
}

pub async fn upload_resume(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Json<Value>> {
    let form = read_form(multipart, "resume").await?;
    let profile =
        users::upload_resume(state.store.as_ref(), state.storage.as_ref(), &user, form.file)
            .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Resume uploaded.",
        "user": profile,
    })))
}

pub async fn upload_photo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Json<Value>> {
    let form = read_form(multipart, "photo").await?;
    let profile =
        users::upload_photo(state.store.as_ref(), state.storage.as_ref(), &user, form.file)
            .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Profile photo uploaded.",
        "user": profile,
    })))
}

pub async fn people(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let people = users::list_people(state.store.as_ref()).await?;
    Ok(Json(json!({ "success": true, "users": people })))
}
