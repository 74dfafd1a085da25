/// User account endpoints
use crate::{
    account::PublicProfile,
    api::{
        extract::{parse_id, ValidatedJson},
        response::ApiResponse,
        schemas::{PasswordUpdateRequest, UpdateAccountRequest},
    },
    auth::{cookie::delete_refresh_cookie, require_self_or_admin, AuthContext},
    context::AppContext,
    error::{AppResult, AuthError},
};
use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Router,
};
use axum_extra::extract::SignedCookieJar;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/:id/password", patch(change_password))
}

async fn get_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PublicProfile>> {
    let id = parse_id(&id, "User")?;
    require_self_or_admin(&auth.id, &id, auth.role)?;

    let user = ctx.users.get(&id).await?;
    Ok(ApiResponse::ok("User retrieved successfully", user))
}

async fn update_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateAccountRequest>,
) -> AppResult<ApiResponse<PublicProfile>> {
    let id = parse_id(&id, "User")?;
    require_self_or_admin(&auth.id, &id, auth.role)?;

    let user = ctx.users.update(&id, &req.into()).await?;
    Ok(ApiResponse::ok("User updated successfully", user))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PublicProfile>> {
    let id = parse_id(&id, "User")?;
    require_self_or_admin(&auth.id, &id, auth.role)?;

    let user = ctx.users.delete(&id).await?;
    Ok(ApiResponse::ok("User deleted successfully", user))
}

/// Only the account owner may change a password; every session is revoked.
async fn change_password(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    jar: SignedCookieJar,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<PasswordUpdateRequest>,
) -> AppResult<(SignedCookieJar, ApiResponse<()>)> {
    let id = parse_id(&id, "User")?;
    if auth.id != id || auth.role.is_admin() {
        return Err(
            AuthError::Forbidden("You are forbidden to perform this action".to_string()).into(),
        );
    }

    ctx.users
        .change_password(&id, &req.old_password, &req.new_password)
        .await?;

    let jar = delete_refresh_cookie(jar, &ctx.cookie_policy);
    Ok((
        jar,
        ApiResponse::message("Password updated successfully, please log in again"),
    ))
}
