/// Admin API endpoints
///
/// Session routes for admins plus management of admin and user accounts.
/// Everything except login and logout requires an admin access token.
use crate::{
    account::{AccountPage, PublicProfile, Role},
    api::{
        auth::{login_as, logout_session, SessionResponse},
        extract::{parse_id, ValidatedJson, ValidatedQuery},
        response::ApiResponse,
        schemas::{LoginRequest, PageQuery, RegisterAdminRequest, UpdateAccountRequest},
    },
    auth::{AdminAuthContext, TokenPair},
    context::AppContext,
    error::AppResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use axum_extra::extract::SignedCookieJar;
use serde::Serialize;

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/register", post(register))
        .route("/admin/users", get(list_users))
        .route(
            "/admin/:id",
            get(get_admin).patch(update_admin).delete(delete_admin),
        )
}

/// A new admin's profile and tokens. The registering admin keeps their own cookie.
#[derive(Debug, Serialize)]
pub struct AdminRegistration {
    pub account: PublicProfile,
    pub tokens: TokenPair,
}

async fn login(
    State(ctx): State<AppContext>,
    jar: SignedCookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<(SignedCookieJar, ApiResponse<SessionResponse>)> {
    login_as(&ctx, Role::Admin, jar, req).await
}

async fn logout(
    State(ctx): State<AppContext>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, ApiResponse<()>) {
    logout_session(&ctx, jar).await
}

async fn register(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    ValidatedJson(req): ValidatedJson<RegisterAdminRequest>,
) -> AppResult<(StatusCode, ApiResponse<AdminRegistration>)> {
    let session = ctx.auth.register(Role::Admin, req.into()).await?;
    tracing::info!(
        created_by = %auth.id,
        admin_id = %session.account.id,
        "Admin account created"
    );

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            "Admin registered successfully",
            AdminRegistration {
                account: session.account,
                tokens: session.tokens,
            },
        ),
    ))
}

async fn list_users(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> AppResult<ApiResponse<AccountPage>> {
    let page = ctx.users.list(query.pagination()).await?;
    Ok(ApiResponse::ok("Users retrieved successfully", page))
}

async fn get_admin(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PublicProfile>> {
    let id = parse_id(&id, "Admin")?;
    let admin = ctx.admins.get(&id).await?;
    Ok(ApiResponse::ok("Admin retrieved successfully", admin))
}

async fn update_admin(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateAccountRequest>,
) -> AppResult<ApiResponse<PublicProfile>> {
    let id = parse_id(&id, "Admin")?;
    let admin = ctx.admins.update(&id, &req.into()).await?;
    Ok(ApiResponse::ok("Admin updated successfully", admin))
}

async fn delete_admin(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PublicProfile>> {
    let id = parse_id(&id, "Admin")?;
    let admin = ctx.admins.delete(&id).await?;
    tracing::info!(deleted_by = %auth.id, admin_id = %id, "Admin account deleted");
    Ok(ApiResponse::ok("Admin deleted successfully", admin))
}
