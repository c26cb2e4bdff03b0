pub mod auth;
pub mod flash;
pub mod forms;
pub mod library;
pub mod middleware;
pub mod social;
pub mod state;
pub mod timeline;
pub mod views;

pub use state::AppState;

use axum::{
    Router,
    routing::get,
    middleware as axum_middleware,
};
use tower_cookies::CookieManagerLayer;
use tower_http::{
    trace::TraceLayer,
    timeout::TimeoutLayer,
};
use std::time::Duration;
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        // Health check
        .route("/health", get(health))

        // Timeline
        .route("/", get(timeline::index).post(timeline::create_post))
        .route("/index", get(timeline::index).post(timeline::create_post))
        .route("/explore", get(timeline::explore))
        .route("/user/{username}", get(timeline::user))

        // Follow graph
        .route("/follow/{username}", get(social::follow))
        .route("/unfollow/{username}", get(social::unfollow))

        // Library
        .route("/owner/{ownername}", get(library::owner))
        .route("/author", get(library::author))
        .route("/delete/{slug}", get(library::delete))
        .route("/bookdel/{pair}", get(library::bookdel))
        .route("/library", get(library::library).post(library::create_entry))
        .route("/library/", get(library::library).post(library::create_entry))
        .route("/add_book/{ownername}", get(library::add_book))
        .route("/lib", get(library::lib_page).post(library::lib))

        // Authentication
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/edit_profile", get(auth::edit_profile_page).post(auth::edit_profile))

        // Author detail by slug; static routes above take precedence
        .route("/{slug}", get(library::author_detail))

        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::load_session))
        .layer(CookieManagerLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
