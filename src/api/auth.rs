use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::api::flash::Flash;
use crate::api::forms::{EditProfileForm, LoginForm, RegistrationForm};
use crate::api::middleware::{
    clear_session_cookie, safe_next, set_session_cookie, CurrentUser, MaybeUser,
    SESSION_COOKIE_NAME,
};
use crate::api::state::AppState;
use crate::api::views::View;
use crate::db::{SessionRepository, UserRepository};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterPage {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub form: EditProfileForm,
}

/// GET /login
pub async fn login_page(
    MaybeUser(user): MaybeUser,
    flash: Flash,
    Query(query): Query<NextQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/index").into_response();
    }

    View::new("Sign In", &flash, LoginPage { next: query.next }).into_response()
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    cookies: Cookies,
    flash: Flash,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if current.is_some() {
        return Ok(Redirect::to("/index").into_response());
    }

    if let Err(errors) = form.validate() {
        let page = View::new("Sign In", &flash, LoginPage { next: query.next });
        return Ok(page.with_errors(errors).into_response());
    }

    let Some(user) = UserRepository::authenticate(&state.db, &form.username, &form.password).await?
    else {
        tracing::info!(username = %form.username, "rejected login");
        flash.error("Invalid username or password");
        return Ok(Redirect::to("/login").into_response());
    };

    let persistent = form.remember();
    let lifetime_secs = if persistent {
        state.config.remember_me_days * 24 * 3600
    } else {
        state.config.session_expiry_hours * 3600
    };

    let session = SessionRepository::create(&state.db, user.id, lifetime_secs, persistent).await?;
    set_session_cookie(&cookies, &session, state.config.remember_me_days);

    tracing::info!(user_id = user.id, persistent, "user logged in");

    Ok(Redirect::to(&safe_next(query.next.as_deref())).into_response())
}

/// GET /logout
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Redirect, AppError> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE_NAME) {
        SessionRepository::delete(&state.db, cookie.value()).await?;
        clear_session_cookie(&cookies);
    }

    Ok(Redirect::to("/index"))
}

/// GET /register
pub async fn register_page(MaybeUser(user): MaybeUser, flash: Flash) -> Response {
    if user.is_some() {
        return Redirect::to("/index").into_response();
    }

    let page = RegisterPage {
        username: String::new(),
        email: String::new(),
    };
    View::new("Register", &flash, page).into_response()
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    flash: Flash,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    if current.is_some() {
        return Ok(Redirect::to("/index").into_response());
    }

    let mut errors = form.validate().err().unwrap_or_default();

    if errors.field("username").is_empty()
        && UserRepository::get_by_username(&state.db, &form.username).await?.is_some()
    {
        errors.add("username", "Please use a different username.");
    }
    if errors.field("email").is_empty()
        && UserRepository::get_by_email(&state.db, &form.email).await?.is_some()
    {
        errors.add("email", "Please use a different email address.");
    }

    if errors.is_empty() {
        match UserRepository::create(&state.db, &form.username, &form.email, &form.password).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %user.username, "registered user");
                flash.success("Congratulations, you are now a registered user!");
                return Ok(Redirect::to("/login").into_response());
            }
            Err(AppError::Conflict(message)) => errors.add("username", message),
            Err(e) => return Err(e),
        }
    }

    let page = RegisterPage {
        username: form.username,
        email: form.email,
    };
    Ok(View::new("Register", &flash, page).with_errors(errors).into_response())
}

/// GET /edit_profile
pub async fn edit_profile_page(CurrentUser(user): CurrentUser, flash: Flash) -> View<ProfilePage> {
    let form = EditProfileForm {
        username: user.username.clone(),
        about_me: user.about_me.clone().unwrap_or_default(),
    };

    View::new("Edit Profile", &flash, ProfilePage { form }).for_user(Some(&user))
}

/// POST /edit_profile
pub async fn edit_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Form(form): Form<EditProfileForm>,
) -> Result<Response, AppError> {
    let mut errors = form.validate().err().unwrap_or_default();

    if errors.field("username").is_empty()
        && form.username != user.username
        && UserRepository::get_by_username(&state.db, &form.username).await?.is_some()
    {
        errors.add("username", "Please use a different username.");
    }

    if errors.is_empty() {
        match UserRepository::update_profile(&state.db, user.id, &form.username, form.about_me())
            .await
        {
            Ok(()) => {
                flash.success("Your changes have been saved.");
                return Ok(Redirect::to("/edit_profile").into_response());
            }
            Err(AppError::Conflict(message)) => errors.add("username", message),
            Err(e) => return Err(e),
        }
    }

    let page = View::new("Edit Profile", &flash, ProfilePage { form });
    Ok(page.for_user(Some(&user)).with_errors(errors).into_response())
}
