//! HTTP front end for the todo backend.
//!
//! # Overview
//! An axum router over `todo_core`'s dispatcher. Each route builds one
//! command or query, so every request runs in exactly one unit of work.
//!
//! # Design
//! - `build` turns a `Config` into a ready `Router`: it opens the store,
//!   registers every handler (failing fast on a bad registry) and applies
//!   the CORS and tracing layers.
//! - `router` is the bare route table over an `AppState`, for callers that
//!   want their own layers.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::{future::Future, sync::Arc};

use axum::{http::header, routing::get, Router};
use tokio::net::TcpListener;
use todo_core::{Dispatcher, TodoLinks};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::{Config, CorsOrigins, DataStore};
pub use error::{ApiError, ErrorBody, ServerError};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/todos",
            get(routes::list_todos)
                .post(routes::create_todo)
                .delete(routes::delete_all_todos),
        )
        .route(
            "/todos/{id}",
            get(routes::get_todo)
                .patch(routes::update_todo)
                .put(routes::update_todo)
                .delete(routes::delete_todo),
        )
        .with_state(state)
}

pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::LOCATION]);
    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(origins) => layer.allow_origin(AllowOrigin::list(origins.clone())),
    }
}

/// Open the configured store and assemble the full application.
pub async fn build(config: &Config) -> Result<Router, ServerError> {
    let store = todo_core::repository::open(&config.store).await?;
    let dispatcher = todo_core::dispatcher(store, TodoLinks::new(&config.public_url))?;
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
    };
    Ok(router(state)
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http()))
}

pub async fn run(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
