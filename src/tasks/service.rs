/// Cache-aside task operations
use super::{NewTask, Task, TaskChanges, TaskFilter, TaskPage, TaskRepository};
use crate::cache::{cache_key, prefixes, CacheStore};
use crate::error::{AppError, AppResult};
use crate::pagination::PageMeta;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
    cache: Arc<CacheStore>,
}

fn task_key(task_id: &str, user_id: &str) -> String {
    cache_key(prefixes::TASK, &json!({ "taskId": task_id, "userId": user_id }))
}

fn not_found() -> AppError {
    AppError::NotFound("Task not found".to_string())
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>, cache: Arc<CacheStore>) -> Self {
        Self { repo, cache }
    }

    fn invalidate(&self, task_id: &str, user_id: &str) {
        self.cache.invalidate_prefix(&prefixes::tasks(user_id));
        self.cache.delete(&task_key(task_id, user_id));
        debug!(user_id = %user_id, task_id = %task_id, "Task cache invalidated");
    }

    pub async fn create(&self, user_id: &str, task: NewTask) -> AppResult<Task> {
        let task = self.repo.create(user_id, task).await?;
        self.cache.invalidate_prefix(&prefixes::tasks(user_id));
        Ok(task)
    }

    pub async fn get(&self, task_id: &str, user_id: &str) -> AppResult<Task> {
        let key = task_key(task_id, user_id);
        let task: Option<Task> = self
            .cache
            .get_or_fetch(&key, || self.repo.find(task_id, user_id))
            .await?;
        task.ok_or_else(not_found)
    }

    pub async fn list(&self, filter: &TaskFilter) -> AppResult<TaskPage> {
        let key = cache_key(&prefixes::tasks(&filter.user_id), filter);
        self.cache
            .get_or_fetch(&key, || async {
                let (tasks, total) = self.repo.list(filter).await?;
                Ok(TaskPage {
                    tasks,
                    meta: PageMeta::new(total, filter.pagination),
                })
            })
            .await
    }

    pub async fn update(
        &self,
        task_id: &str,
        user_id: &str,
        changes: &TaskChanges,
    ) -> AppResult<Task> {
        let task = self
            .repo
            .update(task_id, user_id, changes)
            .await?
            .ok_or_else(not_found)?;
        self.invalidate(task_id, user_id);
        Ok(task)
    }

    pub async fn delete(&self, task_id: &str, user_id: &str) -> AppResult<Task> {
        let task = self
            .repo
            .delete(task_id, user_id)
            .await?
            .ok_or_else(not_found)?;
        self.invalidate(task_id, user_id);
        Ok(task)
    }

    /// Remove every task of a deleted account
    pub async fn purge_for_owner(&self, user_id: &str) -> AppResult<u64> {
        let removed = self.repo.delete_all_for_user(user_id).await?;
        self.cache.invalidate_prefix(&prefixes::tasks(user_id));
        // Single-task keys are not grouped by owner
        self.cache.invalidate_prefix(&format!("{}:", prefixes::TASK));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::tasks::{Priority, SqliteTaskRepository, TaskStatus};
    use chrono::Utc;

    async fn service() -> (TaskService, Arc<CacheStore>) {
        let pool = crate::db::in_memory().await.unwrap();
        let cache = Arc::new(CacheStore::new(&CacheConfig::default()));
        let service = TaskService::new(Arc::new(SqliteTaskRepository::new(pool)), cache.clone());
        (service, cache)
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: Some("details".to_string()),
            completed: false,
            objective: None,
            notes: None,
            status: TaskStatus::NotStarted,
            due_date: Utc::now(),
            priority: Priority::Moderate,
            img_url: None,
        }
    }

    fn filter(user_id: &str) -> TaskFilter {
        TaskFilter {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_listing_is_cached_and_invalidated_on_create() {
        let (service, cache) = service().await;
        service.create("alice", new_task("first")).await.unwrap();

        let page = service.list(&filter("alice")).await.unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(cache.len(), 1);

        service.create("alice", new_task("second")).await.unwrap();
        assert!(cache.is_empty());

        let page = service.list(&filter("alice")).await.unwrap();
        assert_eq!(page.meta.total, 2);
    }

    #[tokio::test]
    async fn test_other_owners_listings_survive_writes() {
        let (service, cache) = service().await;
        service.create("bob", new_task("bob's")).await.unwrap();
        service.list(&filter("bob")).await.unwrap();

        service.create("alice", new_task("alice's")).await.unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_update_refreshes_cached_task() {
        let (service, _cache) = service().await;
        let task = service.create("alice", new_task("draft")).await.unwrap();
        assert_eq!(service.get(&task.id, "alice").await.unwrap().title, "draft");

        let changes = TaskChanges {
            title: Some("final".to_string()),
            ..Default::default()
        };
        service.update(&task.id, "alice", &changes).await.unwrap();
        assert_eq!(service.get(&task.id, "alice").await.unwrap().title, "final");
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let (service, cache) = service().await;
        let err = service.get("missing", "alice").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(cache.is_empty());

        let task = service.create("alice", new_task("mine")).await.unwrap();
        assert!(matches!(
            service.delete(&task.id, "bob").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_purge_for_owner() {
        let (service, cache) = service().await;
        let task = service.create("alice", new_task("one")).await.unwrap();
        service.get(&task.id, "alice").await.unwrap();
        service.list(&filter("alice")).await.unwrap();

        assert_eq!(service.purge_for_owner("alice").await.unwrap(), 1);
        assert!(cache.is_empty());
        assert!(service.get(&task.id, "alice").await.is_err());
    }
}
