/// Cache-aside account operations for one role collection
use super::{hash_password, AccountPage, AccountRepository, AccountUpdate, PublicProfile, Role};
use crate::cache::{cache_key, prefixes, CacheStore};
use crate::error::{AppError, AppResult};
use crate::pagination::{PageMeta, Pagination};
use crate::tasks::TaskService;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    cache: Arc<CacheStore>,
    tasks: Arc<TaskService>,
}

impl AccountService {
    pub fn new(
        repo: Arc<dyn AccountRepository>,
        cache: Arc<CacheStore>,
        tasks: Arc<TaskService>,
    ) -> Self {
        Self { repo, cache, tasks }
    }

    pub fn role(&self) -> Role {
        self.repo.role()
    }

    fn single_prefix(&self) -> &'static str {
        match self.role() {
            Role::User => prefixes::USER,
            Role::Admin => prefixes::ADMIN,
        }
    }

    /// Prefix of this collection's paginated listings
    pub fn list_prefix(&self) -> &'static str {
        match self.role() {
            Role::User => prefixes::USERS,
            Role::Admin => prefixes::ADMINS,
        }
    }

    fn account_key(&self, id: &str) -> String {
        cache_key(self.single_prefix(), &json!({ "id": id }))
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} not found", self.role().display_name()))
    }

    fn invalidate(&self, id: &str) {
        self.cache.delete(&self.account_key(id));
        self.cache.invalidate_prefix(self.list_prefix());
    }

    pub async fn get(&self, id: &str) -> AppResult<PublicProfile> {
        let key = self.account_key(id);
        let profile: Option<PublicProfile> = self
            .cache
            .get_or_fetch(&key, || async {
                Ok(self.repo.find_by_id(id).await?.map(|a| a.profile()))
            })
            .await?;
        profile.ok_or_else(|| self.not_found())
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<AccountPage> {
        let key = cache_key(self.list_prefix(), &pagination);
        self.cache
            .get_or_fetch(&key, || async {
                let (accounts, total) = self.repo.list(pagination).await?;
                Ok(AccountPage {
                    accounts: accounts.iter().map(|a| a.profile()).collect(),
                    meta: PageMeta::new(total, pagination),
                })
            })
            .await
    }

    pub async fn update(&self, id: &str, update: &AccountUpdate) -> AppResult<PublicProfile> {
        if update.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }

        let account = self
            .repo
            .update(id, update)
            .await?
            .ok_or_else(|| self.not_found())?;
        self.invalidate(id);
        Ok(account.profile())
    }

    /// Delete an account along with its tasks. Refresh tokens cascade.
    pub async fn delete(&self, id: &str) -> AppResult<PublicProfile> {
        let account = self
            .repo
            .delete_by_id(id)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "{} not found or already deleted",
                    self.role().display_name()
                ))
            })?;

        let purged = self.tasks.purge_for_owner(id).await?;
        self.invalidate(id);

        info!(role = %account.role, account_id = %id, purged_tasks = purged, "Account deleted");
        Ok(account.profile())
    }

    /// Change the password after checking the old one, then revoke every session
    pub async fn change_password(
        &self,
        id: &str,
        old_password: &str,
        new_password: &str,
    ) -> AppResult<PublicProfile> {
        let account = self.repo.find_by_id(id).await?.ok_or_else(|| self.not_found())?;

        if !account.compare_password(old_password).await? {
            return Err(AppError::BadRequest("Incorrect credentials".to_string()));
        }

        let hash = hash_password(new_password).await?;
        if !self.repo.update_password(id, &hash).await? {
            return Err(self.not_found());
        }

        let revoked = self.repo.clear_refresh_tokens(id).await?;
        self.invalidate(id);

        info!(account_id = %id, revoked_sessions = revoked, "Password changed");
        Ok(account.profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{NewAccount, SqliteAccountRepository};
    use crate::config::CacheConfig;
    use crate::tasks::{NewTask, Priority, SqliteTaskRepository, TaskFilter, TaskStatus};
    use chrono::Utc;

    struct Fixture {
        users: AccountService,
        tasks: Arc<TaskService>,
        cache: Arc<CacheStore>,
        repo: Arc<SqliteAccountRepository>,
    }

    async fn fixture() -> Fixture {
        let pool = crate::db::in_memory().await.unwrap();
        let cache = Arc::new(CacheStore::new(&CacheConfig::default()));
        let tasks = Arc::new(TaskService::new(
            Arc::new(SqliteTaskRepository::new(pool.clone())),
            cache.clone(),
        ));
        let repo = Arc::new(SqliteAccountRepository::new(pool, Role::User));
        let users = AccountService::new(repo.clone(), cache.clone(), tasks.clone());
        Fixture {
            users,
            tasks,
            cache,
            repo,
        }
    }

    async fn create_user(repo: &SqliteAccountRepository, password: &str) -> String {
        repo.create(NewAccount {
            email: "jane@example.com".to_string(),
            password_hash: hash_password(password).await.unwrap(),
            firstname: "Jane".to_string(),
            lastname: "Doe".to_string(),
            username: "jane".to_string(),
            profile_img: None,
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_get_is_cached_and_update_invalidates() {
        let f = fixture().await;
        let id = create_user(&f.repo, "Secr3t!pass").await;

        assert_eq!(f.users.get(&id).await.unwrap().firstname, "Jane");
        assert_eq!(f.cache.len(), 1);

        let update = AccountUpdate {
            firstname: Some("Janet".to_string()),
            ..Default::default()
        };
        f.users.update(&id, &update).await.unwrap();
        assert!(f.cache.is_empty());
        assert_eq!(f.users.get(&id).await.unwrap().firstname, "Janet");
    }

    #[tokio::test]
    async fn test_missing_account_is_not_found() {
        let f = fixture().await;
        let err = f.users.get("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "User not found");
    }

    #[tokio::test]
    async fn test_list_uses_list_prefix() {
        let f = fixture().await;
        create_user(&f.repo, "Secr3t!pass").await;

        let page = f.users.list(Pagination::default()).await.unwrap();
        assert_eq!(page.accounts.len(), 1);
        assert_eq!(f.cache.invalidate_prefix(prefixes::USERS), 1);
    }

    #[tokio::test]
    async fn test_delete_purges_tasks() {
        let f = fixture().await;
        let id = create_user(&f.repo, "Secr3t!pass").await;
        f.tasks
            .create(
                &id,
                NewTask {
                    title: "orphan".to_string(),
                    description: None,
                    completed: false,
                    objective: None,
                    notes: None,
                    status: TaskStatus::NotStarted,
                    due_date: Utc::now(),
                    priority: Priority::Low,
                    img_url: None,
                },
            )
            .await
            .unwrap();

        f.users.delete(&id).await.unwrap();

        let filter = TaskFilter {
            user_id: id.clone(),
            ..Default::default()
        };
        assert_eq!(f.tasks.list(&filter).await.unwrap().meta.total, 0);
        assert!(matches!(
            f.users.delete(&id).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_change_password_revokes_sessions() {
        let f = fixture().await;
        let id = create_user(&f.repo, "Old!pass1").await;
        f.repo.add_refresh_token(&id, "token-a").await.unwrap();

        let err = f
            .users
            .change_password(&id, "Wrong!pass1", "New!pass1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Incorrect credentials");

        f.users
            .change_password(&id, "Old!pass1", "New!pass1")
            .await
            .unwrap();
        assert!(f.repo.refresh_tokens(&id).await.unwrap().is_empty());

        let account = f.repo.find_by_id(&id).await.unwrap().unwrap();
        assert!(account.compare_password("New!pass1").await.unwrap());
    }
}
