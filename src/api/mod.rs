/// API routes and handlers
pub mod admin;
pub mod auth;
pub mod extract;
pub mod health;
pub mod middleware;
pub mod password;
pub mod response;
pub mod schemas;
pub mod tasks;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Routes mounted under `/api/v1`
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(admin::routes())
        .merge(users::routes())
        .merge(tasks::routes())
        .merge(password::routes())
}
