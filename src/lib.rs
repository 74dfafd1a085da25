/// TMS server - task management REST API
///
/// Dual-role (user/admin) JWT sessions with rotating refresh tokens, an
/// in-process cache-aside layer and per-user task storage on SQLite.

pub mod account;
pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod jobs;
pub mod mailer;
pub mod pagination;
pub mod server;
pub mod tasks;

pub use context::AppContext;
pub use error::{AppError, AppResult};
