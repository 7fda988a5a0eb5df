// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{health, test_track},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Test track routes are protected by JWT authentication.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (record store and config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        axum::http::HeaderValue::from_static("http://localhost:3000"),
        axum::http::HeaderValue::from_static("http://127.0.0.1:3000"),
        axum::http::HeaderValue::from_static("http://localhost:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let test_track_routes = Router::new()
        .route(
            "/",
            get(test_track::list_test_tracks).post(test_track::create_test_track),
        )
        .route("/linked", get(test_track::get_linked_test_tracks))
        .route("/link-report", get(test_track::get_link_report))
        .route(
            "/{id}",
            get(test_track::get_test_track)
                .put(test_track::update_test_track)
                .delete(test_track::delete_test_track),
        )
        .route(
            "/{id}/link",
            put(test_track::link_test_track).delete(test_track::unlink_test_track),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/health", get(health::health_check))
        .nest("/api/testtrack", test_track_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
