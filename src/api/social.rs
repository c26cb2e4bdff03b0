use axum::{
    extract::{Path, State},
    response::Redirect,
};

use crate::api::flash::Flash;
use crate::api::middleware::CurrentUser;
use crate::api::state::AppState;
use crate::api::views::user_url;
use crate::db::UserRepository;
use crate::error::AppError;

/// GET /follow/{username}
pub async fn follow(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    flash: Flash,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let Some(user) = UserRepository::get_by_username(&state.db, &username).await? else {
        flash.error(format!("User {} not found.", username));
        return Ok(Redirect::to("/index"));
    };

    if user.id == me.id {
        flash.error("You cannot follow yourself!");
        return Ok(Redirect::to(&user_url(&username)));
    }

    UserRepository::follow(&state.db, me.id, user.id).await?;
    tracing::debug!(follower = me.id, followed = user.id, "follow");

    flash.success(format!("You are following {}!", username));
    Ok(Redirect::to(&user_url(&username)))
}

/// GET /unfollow/{username}
pub async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    flash: Flash,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let Some(user) = UserRepository::get_by_username(&state.db, &username).await? else {
        flash.error(format!("User {} not found.", username));
        return Ok(Redirect::to("/index"));
    };

    if user.id == me.id {
        flash.error("You cannot unfollow yourself!");
        return Ok(Redirect::to(&user_url(&username)));
    }

    UserRepository::unfollow(&state.db, me.id, user.id).await?;
    tracing::debug!(follower = me.id, followed = user.id, "unfollow");

    flash.info(format!("You are not following {}.", username));
    Ok(Redirect::to(&user_url(&username)))
}
