/// Application context and dependency injection
use crate::{
    account::{AccountRepository, AccountService, Role, SqliteAccountRepository},
    auth::{cookie::CookiePolicy, AuthWorkflow, RoleResolver, TokenService},
    cache::CacheStore,
    config::ServerConfig,
    db,
    error::{AppError, AppResult},
    mailer::{MailQueue, Mailer},
    tasks::{SqliteTaskRepository, TaskService},
};
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub cache: Arc<CacheStore>,
    // Auth
    pub tokens: Arc<TokenService>,
    pub roles: Arc<RoleResolver>,
    pub auth: Arc<AuthWorkflow>,
    // Domain services
    pub users: Arc<AccountService>,
    pub admins: Arc<AccountService>,
    pub tasks: Arc<TaskService>,
    // Email
    pub mailer: Arc<Mailer>,
    pub mail_queue: MailQueue,
    // Cookies
    pub cookie_key: Key,
    pub cookie_policy: CookiePolicy,
    pub started_at: Instant,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        // Validate configuration
        config.validate()?;

        let db = db::create_pool(&config.storage.database_url, db::DatabaseOptions::default())
            .await?;

        // Run migrations
        db::run_migrations(&db).await?;

        // Test connection
        db::test_connection(&db).await?;

        Self::with_pool(config, db)
    }

    /// Wire services over an existing, migrated pool.
    /// Spawns the mail worker, so it must run inside a tokio runtime.
    pub fn with_pool(config: ServerConfig, db: SqlitePool) -> AppResult<Self> {
        let mailer = Arc::new(Mailer::new(config.email.as_ref())?);
        if !mailer.is_configured() {
            tracing::warn!("SMTP_URL not set, outgoing mail will be skipped");
        }
        let mail_queue = MailQueue::start(mailer.clone());
        Self::assemble(config, db, mailer, mail_queue)
    }

    /// Wire services around a caller-provided mail queue, e.g. `MailQueue::detached()`
    pub fn with_mail_queue(
        config: ServerConfig,
        db: SqlitePool,
        mail_queue: MailQueue,
    ) -> AppResult<Self> {
        let mailer = Arc::new(Mailer::new(config.email.as_ref())?);
        Self::assemble(config, db, mailer, mail_queue)
    }

    fn assemble(
        config: ServerConfig,
        db: SqlitePool,
        mailer: Arc<Mailer>,
        mail_queue: MailQueue,
    ) -> AppResult<Self> {
        let cookie_key = Key::try_from(config.authentication.cookie_secret.as_bytes())
            .map_err(|e| AppError::Config(format!("Invalid COOKIE_SECRET: {}", e)))?;
        let cookie_policy = CookiePolicy::for_environment(config.service.environment);

        let cache = Arc::new(CacheStore::new(&config.cache));
        let tokens = Arc::new(TokenService::from_config(&config.authentication));

        let user_repo: Arc<dyn AccountRepository> =
            Arc::new(SqliteAccountRepository::new(db.clone(), Role::User));
        let admin_repo: Arc<dyn AccountRepository> =
            Arc::new(SqliteAccountRepository::new(db.clone(), Role::Admin));
        let roles = Arc::new(RoleResolver::new(user_repo.clone(), admin_repo.clone()));

        let tasks = Arc::new(TaskService::new(
            Arc::new(SqliteTaskRepository::new(db.clone())),
            cache.clone(),
        ));
        let users = Arc::new(AccountService::new(user_repo, cache.clone(), tasks.clone()));
        let admins = Arc::new(AccountService::new(admin_repo, cache.clone(), tasks.clone()));

        let auth = Arc::new(AuthWorkflow::new(
            tokens.clone(),
            roles.clone(),
            cache.clone(),
            mail_queue.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            cache,
            tokens,
            roles,
            auth,
            users,
            admins,
            tasks,
            mailer,
            mail_queue,
            cookie_key,
            cookie_policy,
            started_at: Instant::now(),
        })
    }

    /// Account service for a role
    pub fn accounts(&self, role: Role) -> &Arc<AccountService> {
        match role {
            Role::User => &self.users,
            Role::Admin => &self.admins,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}

impl FromRef<AppContext> for Key {
    fn from_ref(ctx: &AppContext) -> Self {
        ctx.cookie_key.clone()
    }
}
