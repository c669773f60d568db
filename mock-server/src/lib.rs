//! In-memory implementation of the tasks REST API.
//!
//! Serves the same surface the client core talks to: cookie sessions under
//! `/auth`, owner-scoped task CRUD under `/users/{user_id}/tasks`, and the
//! `{"error": {code, message, details}}` envelope on every failure. Sign-up
//! and sign-in are throttled per client address.

pub mod auth;
pub mod error;
pub mod rate_limit;
pub mod state;
pub mod tasks;

use std::net::SocketAddr;

use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub use auth::{AuthResponse, SESSION_COOKIE};
pub use error::AppError;
pub use state::{new_db, Db, Task, User};
pub use tasks::TaskList;

pub fn app() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/signout", post(auth::sign_out))
        .route(
            "/users/{user_id}/tasks",
            get(tasks::list_tasks).post(tasks::create_task),
        )
        .route(
            "/users/{user_id}/tasks/{task_id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/users/{user_id}/tasks/{task_id}/complete",
            patch(tasks::toggle_complete),
        )
        .with_state(new_db())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock tasks API listening");
    }
    axum::serve(
        listener,
        app().into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
