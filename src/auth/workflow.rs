/// Register, login, refresh and logout
///
/// The workflow is transport-agnostic: it receives the refresh token read from
/// the session cookie (if any) and returns the tokens the caller should hand
/// back. Cookie handling lives in the HTTP layer.
use super::{RoleResolver, TokenPair, TokenService};
use crate::account::{
    derive_username, hash_password, verify_dummy_password, NewAccount, PublicProfile, Role,
};
use crate::cache::{prefixes, CacheStore};
use crate::error::{AppError, AppResult, AuthError};
use crate::mailer::{MailJob, MailQueue};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registration input, already validated at the edge
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
    /// Derived from the email when absent
    pub username: Option<String>,
    pub profile_img: Option<String>,
}

/// A freshly authenticated account and its tokens
#[derive(Debug, Clone)]
pub struct Session {
    pub account: PublicProfile,
    pub tokens: TokenPair,
}

pub struct AuthWorkflow {
    tokens: Arc<TokenService>,
    roles: Arc<RoleResolver>,
    cache: Arc<CacheStore>,
    mail: MailQueue,
}

impl AuthWorkflow {
    pub fn new(
        tokens: Arc<TokenService>,
        roles: Arc<RoleResolver>,
        cache: Arc<CacheStore>,
        mail: MailQueue,
    ) -> Self {
        Self {
            tokens,
            roles,
            cache,
            mail,
        }
    }

    pub async fn register(&self, role: Role, registration: Registration) -> AppResult<Session> {
        let collection = self.roles.resolve(role);
        let accounts = &collection.accounts;

        if accounts.exists(&registration.email).await? {
            return Err(AppError::Conflict(format!(
                "{} already exists",
                role.display_name()
            )));
        }

        let username = match registration.username {
            Some(username) => {
                if accounts.username_exists(&username).await? {
                    return Err(AppError::Conflict("Username already taken".to_string()));
                }
                username
            }
            None => derive_username(accounts.as_ref(), &registration.email).await?,
        };

        let password_hash = hash_password(&registration.password).await?;
        let account = accounts
            .create(NewAccount {
                email: registration.email,
                password_hash,
                firstname: registration.firstname,
                lastname: registration.lastname,
                username,
                profile_img: registration.profile_img,
            })
            .await?;

        let tokens = self.tokens.issue_token_pair(&account.id, role)?;
        collection.refresh.add_token(&account.id, &tokens.refresh_token).await?;

        let list_prefix = match role {
            Role::User => prefixes::USERS,
            Role::Admin => prefixes::ADMINS,
        };
        self.cache.invalidate_prefix(list_prefix);

        self.mail.enqueue(MailJob::Welcome {
            email: account.email.clone(),
            username: account.username.clone(),
        });

        info!(role = %role, account_id = %account.id, "{} has been registered", account.full_name());

        Ok(Session {
            account: account.profile(),
            tokens,
        })
    }

    /// True when the presented refresh token is authentic and unexpired
    pub fn has_live_session(&self, refresh_token: Option<&str>) -> bool {
        refresh_token.is_some_and(|token| self.tokens.verify_refresh(token).is_ok())
    }

    pub async fn login(
        &self,
        role: Role,
        email: &str,
        password: &str,
        current_refresh_token: Option<&str>,
    ) -> AppResult<Session> {
        if self.has_live_session(current_refresh_token) {
            return Err(AuthError::AlreadyLoggedIn.into());
        }

        let collection = self.roles.resolve(role);

        // Unknown email and wrong password fail identically, in message and in cost
        let Some(account) = collection.accounts.find_by_email(email).await? else {
            verify_dummy_password(password).await?;
            return Err(AuthError::IncorrectCredentials.into());
        };

        if !account.compare_password(password).await? {
            return Err(AuthError::IncorrectCredentials.into());
        }

        let tokens = self.tokens.issue_token_pair(&account.id, role)?;
        collection.refresh.add_token(&account.id, &tokens.refresh_token).await?;

        info!(role = %role, account_id = %account.id, "{} has been logged in", account.full_name());

        Ok(Session {
            account: account.profile(),
            tokens,
        })
    }

    /// Rotate a refresh token. The presented token is consumed; replaying it
    /// afterwards fails with `InvalidRefreshToken`.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> AppResult<TokenPair> {
        let old_token = refresh_token.ok_or(AuthError::NoTokenProvided)?;
        let claims = self.tokens.verify_refresh(old_token)?;
        let collection = self.roles.resolve_tag(&claims.role)?;

        let account = collection
            .refresh
            .find_by_id_and_token(&claims.id, old_token)
            .await?;

        let Some(account) = account else {
            // Authentic but not a member: make sure it stays unusable
            if let Err(e) = collection.refresh.revoke_token(&claims.id, old_token).await {
                warn!(account_id = %claims.id, "Failed to clear stale refresh token: {}", e);
            }
            return Err(AuthError::InvalidRefreshToken.into());
        };

        let role = collection.role();
        let tokens = self.tokens.issue_token_pair(&account.id, role)?;

        // Only one concurrent refresh can consume the old token
        if !collection.refresh.revoke_token(&account.id, old_token).await? {
            debug!(account_id = %account.id, "Refresh token consumed concurrently");
            return Err(AuthError::InvalidRefreshToken.into());
        }
        collection.refresh.add_token(&account.id, &tokens.refresh_token).await?;

        debug!(role = %role, account_id = %account.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Best-effort revocation of the presented refresh token. Never fails.
    pub async fn logout(&self, refresh_token: Option<&str>) {
        let Some(token) = refresh_token else {
            debug!("Logout without a session cookie");
            return;
        };

        let Some(claims) = self.tokens.decode_unverified(token) else {
            debug!("Logout with an undecodable session cookie");
            return;
        };

        match self.roles.resolve_tag(&claims.role) {
            Ok(collection) => match collection.refresh.revoke_token(&claims.id, token).await {
                Ok(true) => info!(account_id = %claims.id, "Account logged out"),
                Ok(false) => debug!(account_id = %claims.id, "Logout token was not active"),
                Err(e) => warn!(account_id = %claims.id, "Failed to revoke refresh token: {}", e),
            },
            Err(e) => debug!("Logout with unresolvable role: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::SqliteAccountRepository;
    use crate::config::CacheConfig;
    use chrono::Duration;
    use std::time::Instant;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_test::{assert_err, assert_ok};

    const ACCESS: &str = "access-secret-for-tests-only-0123456789";
    const REFRESH: &str = "refresh-secret-for-tests-only-0123456789";

    struct Fixture {
        auth: AuthWorkflow,
        roles: Arc<RoleResolver>,
        mail: UnboundedReceiver<MailJob>,
    }

    async fn fixture_with(tokens: TokenService) -> Fixture {
        let pool = crate::db::in_memory().await.unwrap();
        let roles = Arc::new(RoleResolver::new(
            Arc::new(SqliteAccountRepository::new(pool.clone(), Role::User)),
            Arc::new(SqliteAccountRepository::new(pool, Role::Admin)),
        ));
        let cache = Arc::new(CacheStore::new(&CacheConfig::default()));
        let (queue, mail) = MailQueue::detached();
        Fixture {
            auth: AuthWorkflow::new(Arc::new(tokens), roles.clone(), cache, queue),
            roles,
            mail,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(TokenService::new(ACCESS, REFRESH)).await
    }

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: "Secr3t!pass".to_string(),
            firstname: "Jane".to_string(),
            lastname: "Doe".to_string(),
            username: None,
            profile_img: None,
        }
    }

    #[tokio::test]
    async fn test_register_persists_refresh_token_and_queues_mail() {
        let mut f = fixture().await;
        let session = f
            .auth
            .register(Role::User, registration("jane@example.com"))
            .await
            .unwrap();

        assert_eq!(session.account.username, "jane");
        let stored = f
            .roles
            .resolve(Role::User)
            .refresh
            .tokens(&session.account.id)
            .await
            .unwrap();
        assert_eq!(stored, vec![session.tokens.refresh_token.clone()]);

        assert_eq!(
            f.mail.try_recv().unwrap(),
            MailJob::Welcome {
                email: "jane@example.com".to_string(),
                username: "jane".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_register_conflicts() {
        let f = fixture().await;
        f.auth
            .register(Role::User, registration("jane@example.com"))
            .await
            .unwrap();

        let err = f
            .auth
            .register(Role::User, registration("jane@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "User already exists"));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let f = fixture().await;
        f.auth
            .register(Role::User, registration("jane@example.com"))
            .await
            .unwrap();

        let unknown = f
            .auth
            .login(Role::User, "nobody@example.com", "Secr3t!pass", None)
            .await
            .unwrap_err();
        let wrong = f
            .auth
            .login(Role::User, "jane@example.com", "Wr0ng!pass", None)
            .await
            .unwrap_err();

        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.status(), wrong.status());
        assert!(matches!(wrong, AppError::Auth(AuthError::IncorrectCredentials)));
    }

    #[tokio::test]
    async fn test_unknown_email_costs_a_password_verification() {
        let f = fixture().await;
        f.auth
            .register(Role::User, registration("jane@example.com"))
            .await
            .unwrap();

        // First miss also builds the throwaway hash
        assert_err!(
            f.auth
                .login(Role::User, "nobody@example.com", "Secr3t!pass", None)
                .await
        );

        let started = Instant::now();
        assert_err!(
            f.auth
                .login(Role::User, "nobody@example.com", "Secr3t!pass", None)
                .await
        );
        let unknown = started.elapsed();

        let started = Instant::now();
        assert_err!(
            f.auth
                .login(Role::User, "jane@example.com", "Wr0ng!pass", None)
                .await
        );
        let wrong = started.elapsed();

        assert!(
            unknown * 4 >= wrong,
            "unknown email took {:?}, wrong password took {:?}",
            unknown,
            wrong
        );
    }

    #[tokio::test]
    async fn test_login_roles_are_separate() {
        let f = fixture().await;
        f.auth
            .register(Role::User, registration("jane@example.com"))
            .await
            .unwrap();

        assert_err!(
            f.auth
                .login(Role::Admin, "jane@example.com", "Secr3t!pass", None)
                .await
        );
    }

    #[tokio::test]
    async fn test_login_with_live_session_conflicts() {
        let f = fixture().await;
        let session = f
            .auth
            .register(Role::User, registration("jane@example.com"))
            .await
            .unwrap();

        let err = f
            .auth
            .login(
                Role::User,
                "jane@example.com",
                "Secr3t!pass",
                Some(&session.tokens.refresh_token),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::AlreadyLoggedIn)));

        // A garbage cookie does not count as a session
        assert_ok!(
            f.auth
                .login(Role::User, "jane@example.com", "Secr3t!pass", Some("garbage"))
                .await
        );
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_replay() {
        let f = fixture().await;
        let session = f
            .auth
            .register(Role::User, registration("jane@example.com"))
            .await
            .unwrap();
        let old = session.tokens.refresh_token;

        let rotated = f.auth.refresh(Some(&old)).await.unwrap();
        assert_ne!(rotated.refresh_token, old);

        let replay = f.auth.refresh(Some(&old)).await.unwrap_err();
        assert!(matches!(replay, AppError::Auth(AuthError::InvalidRefreshToken)));

        // The replacement still works
        assert_ok!(f.auth.refresh(Some(&rotated.refresh_token)).await);
    }

    #[tokio::test]
    async fn test_refresh_without_token() {
        let f = fixture().await;
        let err = f.auth.refresh(None).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::NoTokenProvided)));

        let err = f.auth.refresh(Some("garbage")).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_with_expired_token() {
        let f = fixture_with(TokenService::with_lifetimes(
            ACCESS,
            REFRESH,
            Duration::minutes(15),
            Duration::seconds(-30),
        ))
        .await;
        let session = f
            .auth
            .register(Role::User, registration("jane@example.com"))
            .await
            .unwrap();

        let err = f
            .auth
            .refresh(Some(&session.tokens.refresh_token))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::ExpiredToken)));
    }

    #[tokio::test]
    async fn test_logout_revokes_and_never_fails() {
        let f = fixture().await;
        let session = f
            .auth
            .register(Role::Admin, registration("boss@example.com"))
            .await
            .unwrap();
        let token = session.tokens.refresh_token;

        f.auth.logout(Some(&token)).await;
        assert!(f
            .roles
            .resolve(Role::Admin)
            .refresh
            .tokens(&session.account.id)
            .await
            .unwrap()
            .is_empty());

        // Repeated, garbage and missing cookies are all fine
        f.auth.logout(Some(&token)).await;
        f.auth.logout(Some("garbage")).await;
        f.auth.logout(None).await;

        let err = f.auth.refresh(Some(&token)).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::InvalidRefreshToken)));
    }
}
