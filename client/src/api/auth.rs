use validator::Validate;

use super::{LOGIN_PATH, REGISTER_PATH};
use crate::{
    auth::{StorageKeys, UserProfile},
    error::{ClientError, Result},
    fetch::{FetchHook, RequestConfig},
    models::user::{AuthResponse, LoginRequest, RegisterRequest},
    ClientContext,
};

pub fn login_hook(ctx: &ClientContext) -> FetchHook<AuthResponse> {
    FetchHook::mount(ctx, RequestConfig::post(LOGIN_PATH).manual())
}

pub fn register_hook(ctx: &ClientContext) -> FetchHook<AuthResponse> {
    FetchHook::mount(ctx, RequestConfig::post(REGISTER_PATH).manual())
}

/// Validate credentials, log in through `hook`, and store the session.
pub async fn login_with(
    ctx: &ClientContext,
    hook: &FetchHook<AuthResponse>,
    req: &LoginRequest,
) -> Result<UserProfile> {
    req.validate()?;
    let resp = hook
        .trigger(Some(serde_json::to_value(req)?))
        .await?
        .ok_or(ClientError::Superseded)?;
    start_session(ctx, resp)
}

pub async fn login(ctx: &ClientContext, req: &LoginRequest) -> Result<UserProfile> {
    let hook = login_hook(ctx);
    login_with(ctx, &hook, req).await
}

/// Create an account; the server answers like a login, so the new user is
/// signed in straight away.
pub async fn register(ctx: &ClientContext, req: &RegisterRequest) -> Result<UserProfile> {
    req.validate()?;
    let hook = register_hook(ctx);
    let resp = hook
        .trigger(Some(serde_json::to_value(req)?))
        .await?
        .ok_or(ClientError::Superseded)?;
    start_session(ctx, resp)
}

pub fn logout(ctx: &ClientContext) -> Result<()> {
    ctx.session.teardown()?;
    Ok(())
}

/// Admin-scoped sessions only accept ADMIN users; anything else is stored
/// nowhere.
fn start_session(ctx: &ClientContext, resp: AuthResponse) -> Result<UserProfile> {
    let token = resp
        .access_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(ClientError::MissingToken)?;
    if ctx.session.keys() == StorageKeys::ADMIN && !resp.role.is_admin() {
        tracing::warn!(email = %resp.email, "Rejected non-admin login for admin session");
        return Err(ClientError::NotAdmin);
    }
    let profile = resp.profile();
    ctx.session.set_session(token, profile.clone())?;
    Ok(profile)
}
