/// Server-side refresh token sets
///
/// A refresh token is only usable while it is a member of its account's set.
/// Signature proves authenticity, membership proves it has not been revoked
/// or rotated away.
use crate::account::{Account, AccountRepository};
use crate::error::{AppResult, AuthError};
use std::sync::Arc;

#[derive(Clone)]
pub struct RefreshStore {
    accounts: Arc<dyn AccountRepository>,
}

impl RefreshStore {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    /// Idempotent set-add
    pub async fn add_token(&self, account_id: &str, token: &str) -> AppResult<()> {
        match self.accounts.add_refresh_token(account_id, token).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AuthError::FailedRefreshPersist.into()),
            Err(e) => {
                tracing::error!(account_id = %account_id, "Refresh token persist failed: {}", e);
                Err(AuthError::FailedRefreshPersist.into())
            }
        }
    }

    pub async fn find_by_id_and_token(
        &self,
        account_id: &str,
        token: &str,
    ) -> AppResult<Option<Account>> {
        self.accounts.find_by_id_and_token(account_id, token).await
    }

    /// Remove exactly this token. Returns whether it was present.
    pub async fn revoke_token(&self, account_id: &str, token: &str) -> AppResult<bool> {
        self.accounts.remove_refresh_token(account_id, token).await
    }

    /// Revoke every session of an account
    pub async fn clear_tokens(&self, account_id: &str) -> AppResult<u64> {
        self.accounts.clear_refresh_tokens(account_id).await
    }

    pub async fn tokens(&self, account_id: &str) -> AppResult<Vec<String>> {
        self.accounts.refresh_tokens(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{NewAccount, Role, SqliteAccountRepository};
    use crate::error::AppError;

    async fn store_with_account() -> (RefreshStore, String) {
        let pool = crate::db::in_memory().await.unwrap();
        let repo = Arc::new(SqliteAccountRepository::new(pool, Role::User));
        let account = repo
            .create(NewAccount {
                email: "jane@example.com".to_string(),
                password_hash: "hash".to_string(),
                firstname: "Jane".to_string(),
                lastname: "Doe".to_string(),
                username: "jane".to_string(),
                profile_img: None,
            })
            .await
            .unwrap();
        (RefreshStore::new(repo), account.id)
    }

    #[tokio::test]
    async fn test_add_find_revoke() {
        let (store, id) = store_with_account().await;

        store.add_token(&id, "r1").await.unwrap();
        store.add_token(&id, "r1").await.unwrap();
        store.add_token(&id, "r2").await.unwrap();
        assert_eq!(store.tokens(&id).await.unwrap().len(), 2);

        assert!(store.find_by_id_and_token(&id, "r1").await.unwrap().is_some());
        assert!(store.revoke_token(&id, "r1").await.unwrap());
        assert!(store.find_by_id_and_token(&id, "r1").await.unwrap().is_none());
        // Revoking touches only the named token
        assert!(store.find_by_id_and_token(&id, "r2").await.unwrap().is_some());

        assert_eq!(store.clear_tokens(&id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_for_unknown_account_fails() {
        let (store, _) = store_with_account().await;
        let err = store.add_token("missing", "r1").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Auth(AuthError::FailedRefreshPersist)
        ));
    }
}
