//! Page documents: what a template would receive, served as JSON.

use axum::response::{IntoResponse, Response};
use axum::Json;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::api::flash::{Flash, FlashMessage};
use crate::api::forms::FormErrors;
use crate::db::User;

/// Characters left alone inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'+');

#[derive(Debug, Serialize)]
pub struct View<T> {
    pub title: String,
    pub current_user: Option<String>,
    pub flashes: Vec<FlashMessage>,
    #[serde(skip_serializing_if = "FormErrors::is_empty")]
    pub errors: FormErrors,
    #[serde(flatten)]
    pub content: T,
}

impl<T: Serialize> View<T> {
    /// Builds the page and consumes the pending flash messages.
    pub fn new(title: impl Into<String>, flash: &Flash, content: T) -> Self {
        View {
            title: title.into(),
            current_user: None,
            flashes: flash.take(),
            errors: FormErrors::default(),
            content,
        }
    }

    pub fn for_user(mut self, user: Option<&User>) -> Self {
        self.current_user = user.map(|u| u.username.clone());
        self
    }

    pub fn with_errors(mut self, errors: FormErrors) -> Self {
        self.errors = errors;
        self
    }
}

impl<T: Serialize> IntoResponse for View<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Percent-encode `value` for use as one path segment.
pub fn segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

pub fn user_url(username: &str) -> String {
    format!("/user/{}", segment(username))
}

pub fn owner_url(name: &str) -> String {
    format!("/owner/{}", segment(name))
}
