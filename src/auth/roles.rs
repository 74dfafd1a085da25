/// Role to account collection dispatch
use crate::account::{AccountRepository, Role};
use crate::auth::RefreshStore;
use crate::error::AuthError;
use std::sync::Arc;

/// Everything the auth workflow needs for one role
#[derive(Clone)]
pub struct AccountCollection {
    pub accounts: Arc<dyn AccountRepository>,
    pub refresh: RefreshStore,
}

impl AccountCollection {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self {
            refresh: RefreshStore::new(accounts.clone()),
            accounts,
        }
    }

    pub fn role(&self) -> Role {
        self.accounts.role()
    }
}

/// Built once at startup
#[derive(Clone)]
pub struct RoleResolver {
    user: AccountCollection,
    admin: AccountCollection,
}

impl RoleResolver {
    pub fn new(users: Arc<dyn AccountRepository>, admins: Arc<dyn AccountRepository>) -> Self {
        Self {
            user: AccountCollection::new(users),
            admin: AccountCollection::new(admins),
        }
    }

    pub fn resolve(&self, role: Role) -> &AccountCollection {
        match role {
            Role::User => &self.user,
            Role::Admin => &self.admin,
        }
    }

    /// Resolve a raw role tag taken from a token
    pub fn resolve_tag(&self, tag: &str) -> Result<&AccountCollection, AuthError> {
        Ok(self.resolve(tag.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::SqliteAccountRepository;

    async fn resolver() -> RoleResolver {
        let pool = crate::db::in_memory().await.unwrap();
        RoleResolver::new(
            Arc::new(SqliteAccountRepository::new(pool.clone(), Role::User)),
            Arc::new(SqliteAccountRepository::new(pool, Role::Admin)),
        )
    }

    #[tokio::test]
    async fn test_resolve_each_role() {
        let roles = resolver().await;
        assert_eq!(roles.resolve(Role::User).role(), Role::User);
        assert_eq!(roles.resolve(Role::Admin).role(), Role::Admin);
        assert_eq!(roles.resolve_tag("ADMIN").unwrap().role(), Role::Admin);
    }

    #[tokio::test]
    async fn test_unknown_tag() {
        let roles = resolver().await;
        assert!(matches!(
            roles.resolve_tag("GUEST"),
            Err(AuthError::UnknownRole(tag)) if tag == "GUEST"
        ));
    }
}
