use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, security_headers_middleware, trace_id};
use crate::routes::{forms, health, submissions};
use crate::services::LocalFileStorage;
use domain::services::{FormSchemaService, SubmissionService};
use domain::store::{FileStorage, FormSchemaStore, SubmissionStore};
use persistence::repositories::{FormSchemaRepository, FormSubmissionRepository};
use shared::jwt::{JwtConfig, JwtError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub forms: FormSchemaService,
    pub submissions: SubmissionService,
    /// Used by the health checks.
    pub schema_store: Arc<dyn FormSchemaStore>,
    pub jwt: Arc<JwtConfig>,
    /// Present when backed by PostgreSQL; feeds the pool gauges.
    pub pool: Option<PgPool>,
}

/// Storage backends behind the form services.
#[derive(Clone)]
pub struct Stores {
    pub schemas: Arc<dyn FormSchemaStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub files: Arc<dyn FileStorage>,
}

/// Builds the application backed by PostgreSQL and local file storage.
pub fn create_app(config: Config, pool: PgPool) -> Result<Router, JwtError> {
    let stores = Stores {
        schemas: Arc::new(FormSchemaRepository::new(pool.clone())),
        submissions: Arc::new(FormSubmissionRepository::new(pool.clone())),
        files: Arc::new(LocalFileStorage::new(config.storage.root_dir.clone())),
    };
    create_app_with_stores(config, stores, Some(pool))
}

/// Builds the application on arbitrary stores.
pub fn create_app_with_stores(
    config: Config,
    stores: Stores,
    pool: Option<PgPool>,
) -> Result<Router, JwtError> {
    let config = Arc::new(config);
    let jwt = Arc::new(JwtConfig::verifier(
        &config.jwt.public_key,
        config.jwt.leeway_secs,
    )?);

    let forms_service = FormSchemaService::new(
        stores.schemas.clone(),
        stores.submissions.clone(),
        (&config.forms).into(),
    );
    let submission_service =
        SubmissionService::new(forms_service.clone(), stores.submissions, stores.files);

    let state = AppState {
        config: config.clone(),
        forms: forms_service,
        submissions: submission_service,
        schema_store: stores.schemas,
        jwt,
        pool,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Handlers needing a caller take the `UserAuth` extractor; submit takes
    // `OptionalUserAuth`.
    let form_routes = Router::new()
        .route(
            "/api/v1/forms",
            get(forms::list_forms).post(forms::create_form),
        )
        .route(
            "/api/v1/forms/:slug",
            get(forms::get_form)
                .patch(forms::update_form)
                .delete(forms::delete_form),
        )
        .route("/api/v1/forms/:slug/public", get(forms::get_public_form))
        .route(
            "/api/v1/forms/:slug/submissions",
            get(forms::list_form_submissions),
        )
        .route("/api/v1/forms/:slug/related-data", get(forms::related_data));

    let submission_routes = Router::new()
        .route(
            "/api/v1/submissions",
            get(submissions::list_my_submissions).post(submissions::submit),
        )
        .route(
            "/api/v1/submissions/upload",
            post(submissions::submit_with_files),
        )
        .route("/api/v1/submissions/:id", get(submissions::get_submission));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let router = Router::new()
        .merge(public_routes)
        .merge(form_routes)
        .merge(submission_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state);

    Ok(router)
}
