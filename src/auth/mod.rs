/// Authentication and session management
///
/// Dual-role JWT sessions: short-lived access tokens on the Authorization
/// header, rotating refresh tokens in a signed cookie and in a server-side
/// per-account set.

pub mod cookie;
mod extract;
mod guard;
mod refresh_store;
mod roles;
mod tokens;
mod workflow;

pub use extract::{AdminAuthContext, AuthContext};
pub use guard::{is_self_or_admin, require_self_or_admin};
pub use refresh_store::RefreshStore;
pub use roles::{AccountCollection, RoleResolver};
pub use tokens::{
    Claims, TokenPair, TokenService, ACCESS_TOKEN_LIFETIME_SECS, REFRESH_TOKEN_LIFETIME_SECS,
};
pub use workflow::{AuthWorkflow, Registration, Session};
