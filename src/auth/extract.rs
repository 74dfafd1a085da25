/// Authentication extractors
use crate::{
    account::Role,
    api::middleware::extract_bearer_token,
    auth::Claims,
    context::AppContext,
    error::{AppError, AuthError},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated caller, from a valid access token whose account still exists
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub id: String,
    pub role: Role,
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or(AuthError::InvalidAuthorizationHeader)?;

        let claims = state.tokens.verify_access(&token)?;
        let collection = state.roles.resolve_tag(&claims.role)?;

        // Tokens outlive deleted accounts
        if !collection.accounts.exists_by_id(&claims.id).await? {
            tracing::warn!(account_id = %claims.id, "Access token for a missing account");
            return Err(AuthError::Forbidden("Forbidden".to_string()).into());
        }

        tracing::Span::current().record("caller_id", claims.id.as_str());

        Ok(AuthContext {
            id: claims.id.clone(),
            role: collection.role(),
            claims,
        })
    }
}

/// Admin authentication context - requires the admin role
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub id: String,
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        if !auth.role.is_admin() {
            tracing::warn!(account_id = %auth.id, "Admin route called by a non-admin");
            return Err(AuthError::Forbidden("Admin role required".to_string()).into());
        }

        Ok(AdminAuthContext {
            id: auth.id,
            claims: auth.claims,
        })
    }
}
