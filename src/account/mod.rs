/// Account management
///
/// Users and admins share one account shape. Each role is backed by its own
/// collection; `AccountService` is parameterized by the repository it is given.

mod password;
mod repository;
mod role;
mod service;

pub use password::{hash_password, verify_dummy_password, verify_password};
pub use repository::{derive_username, AccountRepository, SqliteAccountRepository};
pub use role::Role;
pub use service::AccountService;

use crate::error::AppResult;
use crate::pagination::PageMeta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored account, including its password hash
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub role: Role,
    pub email: String,
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub profile_img: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Compare a plaintext password against this account's hash
    pub async fn compare_password(&self, password: &str) -> AppResult<bool> {
        verify_password(password, &self.password_hash).await
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }

    /// The client-safe view of this account
    pub fn profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id.clone(),
            role: self.role,
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            profile_img: self.profile_img.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Account fields safe to return to clients. Never carries the password hash
/// or refresh tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: String,
    pub role: Role,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    pub profile_img: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account. `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub profile_img: Option<String>,
}

/// Partial profile update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub profile_img: Option<String>,
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        self.firstname.is_none()
            && self.lastname.is_none()
            && self.username.is_none()
            && self.email.is_none()
            && self.profile_img.is_none()
    }
}

/// One page of account profiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPage {
    pub accounts: Vec<PublicProfile>,
    pub meta: PageMeta,
}
