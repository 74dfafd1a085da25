/// Password recovery
use crate::{
    account::Role,
    api::{extract::ValidatedJson, response::ApiResponse, schemas::ForgotPasswordRequest},
    context::AppContext,
    error::AppResult,
    mailer::MailJob,
};
use axum::{extract::State, routing::post, Router};

const FORGOT_PASSWORD_ACK: &str =
    "If an account with that email exists, password reset instructions have been sent";

pub fn routes() -> Router<AppContext> {
    Router::new().route("/password/forgot", post(forgot_password))
}

/// Responds identically whether or not the email is registered
async fn forgot_password(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    let mut found = false;
    for role in [Role::User, Role::Admin] {
        let accounts = &ctx.roles.resolve(role).accounts;
        if let Some(account) = accounts.find_by_email(&req.email).await? {
            ctx.mail_queue.enqueue(MailJob::PasswordResetNotice {
                email: account.email,
                username: account.username,
            });
            found = true;
        }
    }

    if !found {
        tracing::debug!("Password reset requested for an unknown email");
    }

    Ok(ApiResponse::message(FORGOT_PASSWORD_ACK))
}
