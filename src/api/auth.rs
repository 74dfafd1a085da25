/// Session endpoints shared by both roles
///
/// Users register and log in under `/auth`; admins log in under `/admin`
/// (see `admin.rs`). Refresh is role-agnostic: the role travels inside the
/// refresh token.
use crate::{
    account::{PublicProfile, Role},
    api::{
        extract::ValidatedJson,
        response::ApiResponse,
        schemas::{LoginRequest, RegisterUserRequest},
    },
    auth::{
        cookie::{delete_refresh_cookie, read_refresh_cookie, set_refresh_cookie},
        Session,
    },
    context::AppContext,
    error::AppResult,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use axum_extra::extract::SignedCookieJar;
use serde::Serialize;

/// Build session routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/refresh", get(refresh))
}

/// Body returned after register and login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub account: PublicProfile,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Hand the refresh token to the cookie jar and the rest to the body
pub(crate) fn start_session(
    ctx: &AppContext,
    jar: SignedCookieJar,
    session: Session,
) -> (SignedCookieJar, SessionResponse) {
    let jar = set_refresh_cookie(jar, &ctx.cookie_policy, &session.tokens.refresh_token);
    let body = SessionResponse {
        account: session.account,
        access_token: session.tokens.access_token,
    };
    (jar, body)
}

/// Shared login flow for both roles
pub(crate) async fn login_as(
    ctx: &AppContext,
    role: Role,
    jar: SignedCookieJar,
    req: LoginRequest,
) -> AppResult<(SignedCookieJar, ApiResponse<SessionResponse>)> {
    let current = read_refresh_cookie(&jar);
    let session = ctx
        .auth
        .login(role, &req.email, &req.password, current.as_deref())
        .await?;

    let (jar, body) = start_session(ctx, jar, session);
    Ok((jar, ApiResponse::ok("Login successful", body)))
}

/// Shared logout flow; always succeeds and always clears the cookie
pub(crate) async fn logout_session(
    ctx: &AppContext,
    jar: SignedCookieJar,
) -> (SignedCookieJar, ApiResponse<()>) {
    let current = read_refresh_cookie(&jar);
    ctx.auth.logout(current.as_deref()).await;

    let jar = delete_refresh_cookie(jar, &ctx.cookie_policy);
    (jar, ApiResponse::message("Logged out successfully"))
}

async fn register(
    State(ctx): State<AppContext>,
    jar: SignedCookieJar,
    ValidatedJson(req): ValidatedJson<RegisterUserRequest>,
) -> AppResult<(StatusCode, SignedCookieJar, ApiResponse<SessionResponse>)> {
    let session = ctx.auth.register(Role::User, req.into()).await?;
    let (jar, body) = start_session(&ctx, jar, session);

    Ok((
        StatusCode::CREATED,
        jar,
        ApiResponse::ok("User registered successfully", body),
    ))
}

async fn login(
    State(ctx): State<AppContext>,
    jar: SignedCookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<(SignedCookieJar, ApiResponse<SessionResponse>)> {
    login_as(&ctx, Role::User, jar, req).await
}

async fn logout(
    State(ctx): State<AppContext>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, ApiResponse<()>) {
    logout_session(&ctx, jar).await
}

async fn refresh(
    State(ctx): State<AppContext>,
    jar: SignedCookieJar,
) -> AppResult<(SignedCookieJar, ApiResponse<AccessTokenResponse>)> {
    let current = read_refresh_cookie(&jar);
    let tokens = ctx.auth.refresh(current.as_deref()).await?;

    let jar = set_refresh_cookie(jar, &ctx.cookie_policy, &tokens.refresh_token);
    Ok((
        jar,
        ApiResponse::ok(
            "Token refreshed",
            AccessTokenResponse {
                access_token: tokens.access_token,
            },
        ),
    ))
}
