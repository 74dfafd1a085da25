/// Liveness endpoint
use crate::context::AppContext;
use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    /// Seconds since the process started serving
    pub uptime: f64,
    pub message: &'static str,
}

pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health))
}

pub async fn health(State(ctx): State<AppContext>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "OK",
        uptime: ctx.started_at.elapsed().as_secs_f64(),
        message: "Server is running",
    })
}
