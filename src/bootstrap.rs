/// Startup provisioning
use crate::{
    account::{derive_username, hash_password, NewAccount, Role},
    config::SuperAdminConfig,
    context::AppContext,
    error::AppResult,
};

/// Create the configured super-admin unless an admin with that email exists.
/// Returns true if an account was created.
pub async fn ensure_superadmin(ctx: &AppContext, superadmin: &SuperAdminConfig) -> AppResult<bool> {
    let admins = &ctx.roles.resolve(Role::Admin).accounts;

    if admins.exists(&superadmin.email).await? {
        tracing::info!("Superadmin has already been created");
        return Ok(false);
    }

    let account = admins
        .create(NewAccount {
            email: superadmin.email.clone(),
            password_hash: hash_password(&superadmin.password).await?,
            firstname: "System".to_string(),
            lastname: "Superadmin".to_string(),
            username: derive_username(admins.as_ref(), &superadmin.email).await?,
            profile_img: None,
        })
        .await?;

    ctx.cache.invalidate_prefix(ctx.admins.list_prefix());
    tracing::info!(email = %account.email, "Superadmin created");
    Ok(true)
}
