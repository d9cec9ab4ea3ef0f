//! API Route Configuration

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers::{self, AppState};
use super::middleware::{login_rate_limit, logging_middleware, session_gate};
use crate::utils::constants::UPLOAD_BODY_LIMIT;

/// Create the API router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Auth
    let auth = Router::new()
        .route(
            "/login",
            post(handlers::login).layer(middleware::from_fn_with_state(
                state.clone(),
                login_rate_limit,
            )),
        )
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me));

    // Superadmin
    let admin = Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/:id",
            put(handlers::update_user).delete(handlers::delete_user),
        )
        .route("/users/:id/toggle", post(handlers::toggle_user_status))
        .route(
            "/sub-roles",
            get(handlers::admin_list_sub_roles).post(handlers::create_sub_role),
        )
        .route(
            "/sub-roles/:id",
            put(handlers::update_sub_role).delete(handlers::delete_sub_role),
        );

    // Form builder (admin / superadmin)
    let forms = Router::new()
        .route("/", get(handlers::list_forms).post(handlers::create_form))
        .route(
            "/:id",
            get(handlers::get_form)
                .put(handlers::update_form)
                .delete(handlers::delete_form),
        )
        .route("/:id/toggle", post(handlers::toggle_form_status))
        .route("/:id/responses", get(handlers::form_responses))
        .route(
            "/:id/responses/:response_id",
            get(handlers::get_form_response),
        )
        .route("/:id/analytics", get(handlers::form_statistics));

    // Technician
    let my_forms = Router::new()
        .route("/", get(handlers::my_forms))
        .route("/:id", get(handlers::get_my_form))
        .route("/:id/responses", post(handlers::submit_response));

    let my_responses = Router::new()
        .route("/", get(handlers::my_responses))
        .route("/:id", get(handlers::get_my_response));

    // Build full router
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/dashboard", get(handlers::dashboard))
        .route("/sub-roles", get(handlers::list_sub_roles))
        .route(
            "/api/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .nest("/auth", auth)
        .nest("/admin", admin)
        .nest("/forms", forms)
        .nest("/my-forms", my_forms)
        .nest("/my-responses", my_responses)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .with_state(state.clone())
        // Middleware (order matters - bottom runs first)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn_with_state(state, session_gate))
        .layer(middleware::from_fn(logging_middleware))
}
