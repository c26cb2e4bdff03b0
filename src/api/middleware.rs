use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{Redirect, Response},
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use crate::api::state::AppState;
use crate::db::{Session, SessionRepository, User, UserRepository};
use crate::error::AppError;

pub const SESSION_COOKIE_NAME: &str = "session";

/// The authenticated user; extracting it redirects anonymous requests to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The authenticated user, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

/// Session middleware - resolves the session cookie and records the user's last visit
pub async fn load_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = cookies.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string()) {
        match resolve(&state, &token).await? {
            Some(user) => {
                UserRepository::touch_last_seen(&state.db, user.id).await?;
                request.extensions_mut().insert(CurrentUser(user));
            }
            None => {
                tracing::debug!("dropping stale session cookie");
                clear_session_cookie(&cookies);
            }
        }
    }

    Ok(next.run(request).await)
}

async fn resolve(state: &AppState, token: &str) -> Result<Option<User>, AppError> {
    match SessionRepository::get_by_token(&state.db, token).await? {
        Some(session) => UserRepository::get_by_id(&state.db, session.user_id).await,
        None => Ok(None),
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<CurrentUser>() {
            Some(user) => Ok(user.clone()),
            None => {
                let target = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                Err(Redirect::to(&login_url(target)))
            }
        }
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<CurrentUser>().map(|user| user.0.clone()),
        ))
    }
}

pub fn login_url(next: &str) -> String {
    format!("/login?next={}", utf8_percent_encode(next, NON_ALPHANUMERIC))
}

/// Keep `next` only when it is a path on this site; anything else lands on the index.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(target) if is_local_path(target) => target.to_string(),
        _ => "/index".to_string(),
    }
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.starts_with("/\\")
        && !target.chars().any(char::is_control)
}

/// Persistent sessions get a cookie that survives the browser; others end with it.
pub fn set_session_cookie(cookies: &Cookies, session: &Session, remember_me_days: i64) {
    let mut cookie = Cookie::build((SESSION_COOKIE_NAME, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    if session.persistent {
        cookie.set_max_age(Duration::days(remember_me_days));
    }

    cookies.add(cookie);
}

pub fn clear_session_cookie(cookies: &Cookies) {
    cookies.remove(Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build());
}
