pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, models::Role, state::AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_employer(&self) -> bool {
        self.role == Role::Employer
    }

    pub fn is_job_seeker(&self) -> bool {
        self.role == Role::JobSeeker
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        authenticate_token(state, bearer.token())
    }
}

/// Resolves a bearer token outside of the header path (WebSocket query).
pub fn authenticate_token(state: &AppState, token: &str) -> Result<AuthenticatedUser, AppError> {
    let claims = state
        .jwt
        .verify_token(token)
        .map_err(|_| AppError::unauthorized())?;

    Ok(AuthenticatedUser {
        user_id: claims.sub,
        name: claims.name,
        role: claims.role,
    })
}
