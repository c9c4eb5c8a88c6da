use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{state::AppState, storage::MAX_UPLOAD_BYTES};

pub mod applications;
pub mod connections;
pub mod files;
pub mod form;
pub mod health;
pub mod jobs;
pub mod messages;
pub mod profile;
pub mod quiz;
pub mod user;
pub mod ws;

/// Path the local file store points its signed links at.
pub const FILE_DOWNLOAD_PATH: &str = "/api/v1/files/download";

fn cors_layer(allowed: Option<&String>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(err) => {
                        warn!(origin = value, error = %err, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_ref());

    let user_routes = Router::new()
        .route("/register", post(user::register))
        .route("/login", post(user::login))
        .route("/me", get(user::me));

    let profile_routes = Router::new()
        .route("/", put(profile::update))
        .route("/me", get(profile::me))
        .route("/resume", post(profile::upload_resume))
        .route("/photo", post(profile::upload_photo));

    let job_routes = Router::new()
        .route("/getall", get(jobs::list_active))
        .route("/post", post(jobs::post))
        .route("/getmyjobs", get(jobs::list_mine))
        .route("/update/:id", put(jobs::update))
        .route("/delete/:id", delete(jobs::delete))
        .route("/:id", get(jobs::get_one));

    let application_routes = Router::new()
        .route("/post", post(applications::submit))
        .route("/employer/getall", get(applications::list_for_employer))
        .route("/jobseeker/getall", get(applications::list_for_applicant))
        .route("/status/:id", put(applications::update_status))
        .route("/delete/:id", delete(applications::withdraw))
        .route("/:id/resume", get(applications::resume));

    let connection_routes = Router::new()
        .route("/request/:id", post(connections::request))
        .route("/requests", get(connections::incoming))
        .route("/respond/:id", put(connections::respond))
        .route("/status/:id", get(connections::status))
        .route("/me", get(connections::mine));

    let message_routes =
        Router::new().route("/:id", get(messages::list).post(messages::send));

    let quiz_routes = Router::new()
        .route("/", post(quiz::submit))
        .route("/report", get(quiz::report));

    let api = Router::new()
        .nest("/user", user_routes)
        .nest("/profile", profile_routes)
        .route("/people", get(profile::people))
        .nest("/job", job_routes)
        .nest("/application", application_routes)
        .nest("/connections", connection_routes)
        .nest("/messages", message_routes)
        .nest("/quiz", quiz_routes)
        .route("/files/download/:token", get(files::download_with_token))
        .route("/ws", get(ws::upgrade))
        .route("/health", get(health::health_check));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024))
}
