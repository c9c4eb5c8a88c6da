mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use common::body_to_vec;
use jobboard::auth::jwt::JwtService;
use jobboard::config::AppConfig;
use jobboard::routes::{self, FILE_DOWNLOAD_PATH};
use jobboard::state::AppState;
use jobboard::storage::{FsStorage, ObjectStorage};
use jobboard::store::MemoryStore;
use tower::util::ServiceExt;

#[tokio::test]
async fn signed_links_from_the_local_store_download_through_the_api() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = AppConfig::for_tests("files-secret");
    let jwt = JwtService::from_config(&config)?;
    let storage = Arc::new(FsStorage::new(dir.path(), jwt.clone(), FILE_DOWNLOAD_PATH));
    storage
        .put_object(
            "resumes/owner-abc-cv.pdf",
            b"%PDF-1.4 body".to_vec(),
            Some("application/pdf".into()),
            None,
        )
        .await?;
    let link = storage
        .presign_get_object("resumes/owner-abc-cv.pdf", Duration::from_secs(60))
        .await?;
    assert!(link.starts_with(FILE_DOWNLOAD_PATH));

    let state = AppState::new(Arc::new(MemoryStore::new()), config, storage, jwt);
    let router = routes::create_router(state);

    let response = router
        .clone()
        .oneshot(Request::builder().uri(&link).body(Body::empty())?)
        .await
        .expect("infallible response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/pdf")
    );
    assert_eq!(body_to_vec(response.into_body()).await?, b"%PDF-1.4 body");

    let tampered = format!("{FILE_DOWNLOAD_PATH}/not-a-token");
    let response = router
        .oneshot(Request::builder().uri(&tampered).body(Body::empty())?)
        .await
        .expect("infallible response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
