use axum::{
    extract::{Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};
use tracing::warn;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    storage::inline_content_disposition,
};

/// Serves an object named by a signed file token; the token is the presigned link.
pub async fn download_with_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<impl IntoResponse> {
    let claims = state
        .jwt
        .verify_file_token(&token)
        .map_err(|_| AppError::unauthorized())?;

    let bytes = state.storage.get_object(&claims.key).await.map_err(|err| {
        warn!(key = %claims.key, error = %err, "signed download target missing");
        AppError::not_found()
    })?;

    let file_name = claims.key.rsplit('/').next().unwrap_or(&claims.key).to_string();
    let content_type = mime_guess::from_path(&file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let mut headers = vec![(CONTENT_TYPE, content_type)];
    if let Some(disposition) = inline_content_disposition(&file_name) {
        headers.push((CONTENT_DISPOSITION, disposition));
    }

    let mut response = bytes.into_response();
    for (name, value) in headers {
        let value = value.parse().map_err(AppError::internal)?;
        response.headers_mut().insert(name, value);
    }
    Ok(response)
}
