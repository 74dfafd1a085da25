/// Account database records
use crate::account::{Account, Role};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Account row, shared by the user and admin collections
#[derive(Debug, Clone, FromRow)]
pub struct AccountRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub profile_img: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountRecord {
    /// Attach the role implied by the collection the row came from
    pub fn into_account(self, role: Role) -> Account {
        Account {
            id: self.id,
            role,
            email: self.email,
            password_hash: self.password_hash,
            firstname: self.firstname,
            lastname: self.lastname,
            username: self.username,
            profile_img: self.profile_img,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Column list matching `AccountRecord`
pub const ACCOUNT_COLUMNS: &str =
    "id, email, password_hash, firstname, lastname, username, profile_img, created_at, updated_at";
