use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::User,
    state::AppState,
    users::{self, LoginInput, ProfileView, RegisterInput},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: ProfileView,
}

fn issue(state: &AppState, user: User, message: &'static str) -> AppResult<TokenResponse> {
    let token = state
        .jwt
        .generate_token(user.id, &user.name, user.role)
        .map_err(AppError::from)?;
    Ok(TokenResponse {
        success: true,
        message,
        token,
        token_type: "Bearer",
        expires_in: state.config.jwt_expiry_minutes * 60,
        user: user.into(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let user = users::register(state.store.as_ref(), payload).await?;
    let response = issue(&state, user, "User Registered Successfully!")?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginInput>,
) -> AppResult<Json<TokenResponse>> {
    let user = users::login(state.store.as_ref(), payload).await?;
    Ok(Json(issue(&state, user, "User Logged In Successfully!")?))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}
