/// Account persistence
///
/// One `SqliteAccountRepository` per role. The role picks the account table and
/// its refresh-token set table; the SQL is otherwise shared.
use super::{Account, AccountUpdate, NewAccount, Role};
use crate::db::account::{AccountRecord, ACCOUNT_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::pagination::Pagination;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

/// Storage operations for one account collection
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Role of the accounts held by this collection
    fn role(&self) -> Role;

    async fn exists(&self, email: &str) -> AppResult<bool>;
    async fn exists_by_id(&self, id: &str) -> AppResult<bool>;
    async fn username_exists(&self, username: &str) -> AppResult<bool>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Account>>;

    async fn create(&self, account: NewAccount) -> AppResult<Account>;
    /// Apply a partial update. Returns `None` if the account does not exist.
    async fn update(&self, id: &str, update: &AccountUpdate) -> AppResult<Option<Account>>;
    async fn update_password(&self, id: &str, password_hash: &str) -> AppResult<bool>;
    /// Delete and return the removed account
    async fn delete_by_id(&self, id: &str) -> AppResult<Option<Account>>;
    /// Newest first, with the total count
    async fn list(&self, pagination: Pagination) -> AppResult<(Vec<Account>, i64)>;

    /// Set-add. Returns false when the account does not exist.
    async fn add_refresh_token(&self, id: &str, token: &str) -> AppResult<bool>;
    async fn find_by_id_and_token(&self, id: &str, token: &str) -> AppResult<Option<Account>>;
    /// Returns true iff the token was present and is now removed
    async fn remove_refresh_token(&self, id: &str, token: &str) -> AppResult<bool>;
    async fn clear_refresh_tokens(&self, id: &str) -> AppResult<u64>;
    async fn refresh_tokens(&self, id: &str) -> AppResult<Vec<String>>;
}

/// SQLite-backed account collection
#[derive(Clone)]
pub struct SqliteAccountRepository {
    db: SqlitePool,
    role: Role,
}

impl SqliteAccountRepository {
    pub fn new(db: SqlitePool, role: Role) -> Self {
        Self { db, role }
    }

    fn accounts(&self) -> &'static str {
        self.role.accounts_table()
    }

    fn tokens(&self) -> &'static str {
        self.role.refresh_tokens_table()
    }

    /// Map unique-constraint failures onto a client-facing conflict
    fn map_write_error(&self, err: sqlx::Error) -> AppError {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict(
                format!(
                    "{} with this email or username already exists",
                    self.role.display_name()
                ),
            ),
            _ => AppError::Database(err),
        }
    }

    async fn count_where(&self, column: &str, value: &str) -> AppResult<bool> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", self.accounts(), column);
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(value)
            .fetch_one(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn find_where(&self, column: &str, value: &str) -> AppResult<Option<Account>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            ACCOUNT_COLUMNS,
            self.accounts(),
            column
        );
        let record: Option<AccountRecord> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(record.map(|r| r.into_account(self.role)))
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    fn role(&self) -> Role {
        self.role
    }

    async fn exists(&self, email: &str) -> AppResult<bool> {
        self.count_where("email", email).await
    }

    async fn exists_by_id(&self, id: &str) -> AppResult<bool> {
        self.count_where("id", id).await
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        self.count_where("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        self.find_where("email", email).await
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Account>> {
        self.find_where("id", id).await
    }

    async fn create(&self, account: NewAccount) -> AppResult<Account> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            self.accounts(),
            ACCOUNT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(&id)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.firstname)
            .bind(&account.lastname)
            .bind(&account.username)
            .bind(&account.profile_img)
            .bind(now)
            .bind(now)
            .execute(&self.db)
            .await
            .map_err(|e| self.map_write_error(e))?;

        tracing::info!(role = %self.role, account_id = %id, "Account created");

        Ok(Account {
            id,
            role: self.role,
            email: account.email,
            password_hash: account.password_hash,
            firstname: account.firstname,
            lastname: account.lastname,
            username: account.username,
            profile_img: account.profile_img,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(&self, id: &str, update: &AccountUpdate) -> AppResult<Option<Account>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("UPDATE {} SET updated_at = ", self.accounts()));
        query.push_bind(Utc::now());

        let fields = [
            ("firstname", &update.firstname),
            ("lastname", &update.lastname),
            ("username", &update.username),
            ("email", &update.email),
            ("profile_img", &update.profile_img),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                query.push(format!(", {} = ", column));
                query.push_bind(value.clone());
            }
        }

        query.push(" WHERE id = ");
        query.push_bind(id.to_string());

        let result = query
            .build()
            .execute(&self.db)
            .await
            .map_err(|e| self.map_write_error(e))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> AppResult<bool> {
        let sql = format!(
            "UPDATE {} SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            self.accounts()
        );
        let result = sqlx::query(&sql)
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<Option<Account>> {
        let sql = format!(
            "DELETE FROM {} WHERE id = ?1 RETURNING {}",
            self.accounts(),
            ACCOUNT_COLUMNS
        );
        let record: Option<AccountRecord> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(record.map(|r| r.into_account(self.role)))
    }

    async fn list(&self, pagination: Pagination) -> AppResult<(Vec<Account>, i64)> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, id ASC LIMIT ?1 OFFSET ?2",
            ACCOUNT_COLUMNS,
            self.accounts()
        );
        let records: Vec<AccountRecord> = sqlx::query_as(&sql)
            .bind(i64::from(pagination.limit))
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM {}", self.accounts());
        let total: i64 = sqlx::query_scalar(&count_sql).fetch_one(&self.db).await?;

        let accounts = records
            .into_iter()
            .map(|r| r.into_account(self.role))
            .collect();
        Ok((accounts, total))
    }

    async fn add_refresh_token(&self, id: &str, token: &str) -> AppResult<bool> {
        if !self.exists_by_id(id).await? {
            return Ok(false);
        }

        let sql = format!(
            "INSERT OR IGNORE INTO {} (account_id, token, created_at) VALUES (?1, ?2, ?3)",
            self.tokens()
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(token)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;
        Ok(true)
    }

    async fn find_by_id_and_token(&self, id: &str, token: &str) -> AppResult<Option<Account>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1
             AND EXISTS (SELECT 1 FROM {} WHERE account_id = ?1 AND token = ?2)",
            ACCOUNT_COLUMNS,
            self.accounts(),
            self.tokens()
        );
        let record: Option<AccountRecord> = sqlx::query_as(&sql)
            .bind(id)
            .bind(token)
            .fetch_optional(&self.db)
            .await?;
        Ok(record.map(|r| r.into_account(self.role)))
    }

    async fn remove_refresh_token(&self, id: &str, token: &str) -> AppResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE account_id = ?1 AND token = ?2",
            self.tokens()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_refresh_tokens(&self, id: &str) -> AppResult<u64> {
        let sql = format!("DELETE FROM {} WHERE account_id = ?1", self.tokens());
        let result = sqlx::query(&sql).bind(id).execute(&self.db).await?;
        Ok(result.rows_affected())
    }

    async fn refresh_tokens(&self, id: &str) -> AppResult<Vec<String>> {
        let sql = format!(
            "SELECT token FROM {} WHERE account_id = ?1 ORDER BY created_at",
            self.tokens()
        );
        let tokens: Vec<String> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_all(&self.db)
            .await?;
        Ok(tokens)
    }
}

/// Derive a free username from an email's local part: `jane`, `jane1`, `jane2`, ...
pub async fn derive_username(repo: &dyn AccountRepository, email: &str) -> AppResult<String> {
    let base = email.split('@').next().unwrap_or(email);
    let base = if base.is_empty() { "account" } else { base };

    let mut candidate = base.to_string();
    let mut counter = 1u32;
    while repo.username_exists(&candidate).await? {
        candidate = format!("{}{}", base, counter);
        counter += 1;
    }
    Ok(candidate)
}
