/// Personal task management
///
/// Every task belongs to one owner. Reads go through the cache; every write
/// invalidates the owner's listings and the task's own entry.

mod repository;
mod service;

pub use repository::{SqliteTaskRepository, TaskFilter, TaskRepository};
pub use service::TaskService;

use crate::db::task::TaskRecord;
use crate::error::AppError;
use crate::pagination::PageMeta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Progress state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "not started")]
    NotStarted,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not started",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not started" => Ok(TaskStatus::NotStarted),
            "in progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(AppError::Internal(format!("Unknown task status: {}", other))),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Moderate,
    Extreme,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Moderate => "moderate",
            Priority::Extreme => "extreme",
        }
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "moderate" => Ok(Priority::Moderate),
            "extreme" => Ok(Priority::Extreme),
            other => Err(AppError::Internal(format!("Unknown task priority: {}", other))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub objective: Option<String>,
    pub notes: Option<String>,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub img_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = AppError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        Ok(Task {
            status: record.status.parse()?,
            priority: record.priority.parse()?,
            id: record.id,
            user_id: record.user_id,
            title: record.title,
            description: record.description,
            completed: record.completed,
            objective: record.objective,
            notes: record.notes,
            due_date: record.due_date,
            img_url: record.img_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Input for creating a task; the owner is supplied separately
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub objective: Option<String>,
    pub notes: Option<String>,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub img_url: Option<String>,
}

/// Partial task update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub objective: Option<String>,
    pub notes: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub img_url: Option<String>,
}

/// Sortable task columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortBy {
    #[serde(rename = "title")]
    Title,
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
}

impl SortBy {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            SortBy::Title => "title",
            SortBy::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One page of tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub meta: PageMeta,
}
