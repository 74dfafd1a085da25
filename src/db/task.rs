/// Task database records
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Task row
#[derive(Debug, Clone, FromRow)]
pub struct TaskRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub objective: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub due_date: DateTime<Utc>,
    pub priority: String,
    pub img_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list matching `TaskRecord`
pub const TASK_COLUMNS: &str = "id, user_id, title, description, completed, objective, notes, status, due_date, priority, img_url, created_at, updated_at";
