use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Serialize;

use crate::api::flash::Flash;
use crate::api::forms::PostForm;
use crate::api::middleware::CurrentUser;
use crate::api::state::AppState;
use crate::api::views::View;
use crate::db::{Post, PostRepository, User, UserRepository};
use crate::error::AppError;

const POST_AVATAR_SIZE: u32 = 36;
const PROFILE_AVATAR_SIZE: u32 = 128;

/// A post as listed on a page, with its author's avatar.
#[derive(Debug, Serialize)]
pub struct PostEntry {
    #[serde(flatten)]
    pub post: Post,
    pub avatar: String,
}

impl From<Post> for PostEntry {
    fn from(post: Post) -> Self {
        PostEntry {
            avatar: post.avatar(POST_AVATAR_SIZE),
            post,
        }
    }
}

fn entries(posts: Vec<Post>) -> Vec<PostEntry> {
    posts.into_iter().map(PostEntry::from).collect()
}

#[derive(Debug, Serialize)]
pub struct Timeline {
    pub posts: Vec<PostEntry>,
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub user: User,
    pub avatar: String,
    pub posts: Vec<PostEntry>,
    pub followers: i64,
    pub following: i64,
    pub is_following: bool,
    pub is_self: bool,
}

/// GET / and /index
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
) -> Result<View<Timeline>, AppError> {
    let posts = entries(UserRepository::followed_posts(&state.db, user.id).await?);
    Ok(View::new("Home Page", &flash, Timeline { posts }).for_user(Some(&user)))
}

/// POST / and /index
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        let posts = entries(UserRepository::followed_posts(&state.db, user.id).await?);
        let page = View::new("Home Page", &flash, Timeline { posts });
        return Ok(page.for_user(Some(&user)).with_errors(errors).into_response());
    }

    let post = PostRepository::create(&state.db, user.id, &form.post).await?;
    tracing::debug!(post_id = post.id, user_id = user.id, "post created");

    flash.success("Your post is now live!");
    Ok(Redirect::to("/index").into_response())
}

/// GET /explore
pub async fn explore(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
) -> Result<View<Timeline>, AppError> {
    let posts = entries(PostRepository::all(&state.db).await?);
    Ok(View::new("Explore", &flash, Timeline { posts }).for_user(Some(&user)))
}

/// GET /user/{username}
pub async fn user(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    flash: Flash,
    Path(username): Path<String>,
) -> Result<View<Profile>, AppError> {
    let user = UserRepository::get_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))?;

    let posts = entries(PostRepository::by_user(&state.db, user.id).await?);
    let (followers, following) = UserRepository::follow_counts(&state.db, user.id).await?;
    let is_following = UserRepository::is_following(&state.db, me.id, user.id).await?;

    let profile = Profile {
        is_self: user.id == me.id,
        avatar: user.avatar(PROFILE_AVATAR_SIZE),
        user,
        posts,
        followers,
        following,
        is_following,
    };

    Ok(View::new(username, &flash, profile).for_user(Some(&me)))
}
