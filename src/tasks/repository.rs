/// Task persistence
use super::{NewTask, Priority, SortBy, SortOrder, Task, TaskChanges, TaskStatus};
use crate::db::task::{TaskRecord, TASK_COLUMNS};
use crate::error::AppResult;
use crate::pagination::Pagination;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

/// Listing filter for one owner's tasks.
///
/// Serializes (without the owner) into the listing's cache key parameters.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    #[serde(skip)]
    pub user_id: String,
    /// Case-insensitive substring of title, description or notes
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    /// Whole-day match on the due date (UTC)
    pub due_date: Option<NaiveDate>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, user_id: &str, task: NewTask) -> AppResult<Task>;
    /// Owner-scoped lookup
    async fn find(&self, task_id: &str, user_id: &str) -> AppResult<Option<Task>>;
    async fn update(
        &self,
        task_id: &str,
        user_id: &str,
        changes: &TaskChanges,
    ) -> AppResult<Option<Task>>;
    async fn delete(&self, task_id: &str, user_id: &str) -> AppResult<Option<Task>>;
    /// Filtered page plus total match count
    async fn list(&self, filter: &TaskFilter) -> AppResult<(Vec<Task>, i64)>;
    async fn delete_all_for_user(&self, user_id: &str) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct SqliteTaskRepository {
    db: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Escape LIKE wildcards so search text matches literally
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &TaskFilter) {
    query.push(" WHERE user_id = ");
    query.push_bind(filter.user_id.clone());

    if let Some(status) = filter.status {
        query.push(" AND status = ");
        query.push_bind(status.as_str());
    }
    if let Some(completed) = filter.completed {
        query.push(" AND completed = ");
        query.push_bind(completed);
    }
    if let Some(priority) = filter.priority {
        query.push(" AND priority = ");
        query.push_bind(priority.as_str());
    }
    if let Some(day) = filter.due_date {
        let (start, end) = day_bounds(day);
        query.push(" AND due_date >= ");
        query.push_bind(start);
        query.push(" AND due_date < ");
        query.push_bind(end);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        query.push(" AND (title LIKE ");
        query.push_bind(pattern.clone());
        query.push(" ESCAPE '\\' OR description LIKE ");
        query.push_bind(pattern.clone());
        query.push(" ESCAPE '\\' OR notes LIKE ");
        query.push_bind(pattern);
        query.push(" ESCAPE '\\')");
    }
}

fn into_tasks(records: Vec<TaskRecord>) -> AppResult<Vec<Task>> {
    records.into_iter().map(Task::try_from).collect()
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, user_id: &str, task: NewTask) -> AppResult<Task> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let sql = format!(
            "INSERT INTO tasks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            TASK_COLUMNS
        );
        sqlx::query(&sql)
            .bind(&id)
            .bind(user_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.completed)
            .bind(&task.objective)
            .bind(&task.notes)
            .bind(task.status.as_str())
            .bind(task.due_date)
            .bind(task.priority.as_str())
            .bind(&task.img_url)
            .bind(now)
            .bind(now)
            .execute(&self.db)
            .await?;

        Ok(Task {
            id,
            user_id: user_id.to_string(),
            title: task.title,
            description: task.description,
            completed: task.completed,
            objective: task.objective,
            notes: task.notes,
            status: task.status,
            due_date: task.due_date,
            priority: task.priority,
            img_url: task.img_url,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find(&self, task_id: &str, user_id: &str) -> AppResult<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = ?1 AND user_id = ?2",
            TASK_COLUMNS
        );
        let record: Option<TaskRecord> = sqlx::query_as(&sql)
            .bind(task_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        record.map(Task::try_from).transpose()
    }

    async fn update(
        &self,
        task_id: &str,
        user_id: &str,
        changes: &TaskChanges,
    ) -> AppResult<Option<Task>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET updated_at = ");
        query.push_bind(Utc::now());

        let text_fields = [
            ("title", &changes.title),
            ("description", &changes.description),
            ("objective", &changes.objective),
            ("notes", &changes.notes),
            ("img_url", &changes.img_url),
        ];
        for (column, value) in text_fields {
            if let Some(value) = value {
                query.push(format!(", {} = ", column));
                query.push_bind(value.clone());
            }
        }
        if let Some(completed) = changes.completed {
            query.push(", completed = ");
            query.push_bind(completed);
        }
        if let Some(status) = changes.status {
            query.push(", status = ");
            query.push_bind(status.as_str());
        }
        if let Some(due_date) = changes.due_date {
            query.push(", due_date = ");
            query.push_bind(due_date);
        }
        if let Some(priority) = changes.priority {
            query.push(", priority = ");
            query.push_bind(priority.as_str());
        }

        query.push(" WHERE id = ");
        query.push_bind(task_id.to_string());
        query.push(" AND user_id = ");
        query.push_bind(user_id.to_string());

        let result = query.build().execute(&self.db).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find(task_id, user_id).await
    }

    async fn delete(&self, task_id: &str, user_id: &str) -> AppResult<Option<Task>> {
        let sql = format!(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2 RETURNING {}",
            TASK_COLUMNS
        );
        let record: Option<TaskRecord> = sqlx::query_as(&sql)
            .bind(task_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        record.map(Task::try_from).transpose()
    }

    async fn list(&self, filter: &TaskFilter) -> AppResult<(Vec<Task>, i64)> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM tasks", TASK_COLUMNS));
        push_filters(&mut query, filter);
        query.push(format!(
            " ORDER BY {} {}, id ASC LIMIT ",
            filter.sort_by.column(),
            filter.sort_order.keyword()
        ));
        query.push_bind(i64::from(filter.pagination.limit));
        query.push(" OFFSET ");
        query.push_bind(filter.pagination.offset());

        let records: Vec<TaskRecord> = query.build_query_as().fetch_all(&self.db).await?;

        let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM tasks");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        Ok((into_tasks(records)?, total))
    }

    async fn delete_all_for_user(&self, user_id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
