use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod alerts;
pub mod applications;
pub mod auth;
pub mod health;
pub mod job_providers;
pub mod job_seekers;
pub mod jobs;
pub mod notifications;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/sendsms", post(auth::send_sms))
        .route("/checksms", post(auth::check_sms))
        .route("/forgotpassword", post(auth::forgot_password))
        .route("/updatedetails", put(auth::update_details))
        .route("/updatepassword", put(auth::update_password))
        .route("/resetpassword/:token", put(auth::reset_password))
        .route("/logout", get(auth::logout))
        .route("/me", get(auth::me))
        .route("/admins", get(auth::list_admins));

    let job_seeker_routes = Router::new()
        .route(
            "/",
            get(job_seekers::list_job_seekers).post(job_seekers::create_job_seeker),
        )
        .route(
            "/:id",
            get(job_seekers::get_job_seeker)
                .put(job_seekers::update_job_seeker)
                .delete(job_seekers::delete_job_seeker),
        )
        .route("/:id/photo", put(job_seekers::upload_photo))
        .route("/:id/cv", put(job_seekers::upload_cv))
        .route("/:id/cv/:cv", delete(job_seekers::delete_cv))
        .route(
            "/:id/applications",
            get(applications::list_job_seeker_applications),
        )
        .route("/:id/alerts", get(alerts::list_job_seeker_alerts))
        .route(
            "/:id/notifications",
            get(notifications::list_job_seeker_notifications),
        );

    let job_provider_routes = Router::new()
        .route(
            "/",
            get(job_providers::list_job_providers).post(job_providers::create_job_provider),
        )
        .route(
            "/:id",
            get(job_providers::get_job_provider)
                .put(job_providers::update_job_provider)
                .delete(job_providers::delete_job_provider),
        )
        .route("/:id/photo", put(job_providers::upload_photo))
        .route("/:id/approve", put(job_providers::approve_job_provider))
        .route(
            "/:id/jobs",
            get(jobs::list_job_provider_jobs).post(jobs::create_provider_job),
        );

    let jobs_routes = Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::create_job))
        .route(
            "/:id",
            get(jobs::get_job).put(jobs::update_job).delete(jobs::delete_job),
        )
        .route(
            "/:id/applications",
            get(applications::list_job_applications).post(applications::create_job_application),
        );

    let applications_routes = Router::new()
        .route(
            "/",
            get(applications::list_applications).post(applications::create_application),
        )
        .route(
            "/:id",
            get(applications::get_application)
                .put(applications::update_application)
                .delete(applications::delete_application),
        );

    let alerts_routes = Router::new()
        .route("/", get(alerts::list_alerts).post(alerts::create_alert))
        .route("/:id", delete(alerts::delete_alert));

    let notifications_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/:id", delete(notifications::delete_notification));

    Router::new()
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/jobseekers", job_seeker_routes)
        .nest("/api/v1/jobproviders", job_provider_routes)
        .nest("/api/v1/jobs", jobs_routes)
        .nest("/api/v1/applications", applications_routes)
        .nest("/api/v1/alerts", alerts_routes)
        .nest("/api/v1/notifications", notifications_routes)
        .route("/api/v1/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024 * 32))
}
