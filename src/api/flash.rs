//! One-shot status messages carried across a redirect in a cookie.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

pub const FLASH_COOKIE_NAME: &str = "_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

/// Handle on the flash cookie of the current request.
///
/// Messages pushed here are visible to the next page that calls [`Flash::take`],
/// whether that page is rendered by this request or after a redirect.
#[derive(Clone)]
pub struct Flash {
    cookies: Cookies,
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state).await?;
        Ok(Flash { cookies })
    }
}

impl Flash {
    pub fn info(&self, message: impl Into<String>) {
        self.push(FlashLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(FlashLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(FlashLevel::Error, message);
    }

    pub fn push(&self, level: FlashLevel, message: impl Into<String>) {
        let mut messages = self.pending();
        messages.push(FlashMessage {
            level,
            message: message.into(),
        });

        let cookie = Cookie::build((FLASH_COOKIE_NAME, encode(&messages)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        self.cookies.add(cookie);
    }

    /// Consume every pending message.
    pub fn take(&self) -> Vec<FlashMessage> {
        let messages = self.pending();
        if self.cookies.get(FLASH_COOKIE_NAME).is_some() {
            self.cookies
                .remove(Cookie::build((FLASH_COOKIE_NAME, "")).path("/").build());
        }
        messages
    }

    fn pending(&self) -> Vec<FlashMessage> {
        self.cookies
            .get(FLASH_COOKIE_NAME)
            .map(|cookie| decode(cookie.value()))
            .unwrap_or_default()
    }
}

fn encode(messages: &[FlashMessage]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    base64_simd::URL_SAFE_NO_PAD.encode_to_string(json)
}

fn decode(value: &str) -> Vec<FlashMessage> {
    let parsed = base64_simd::URL_SAFE_NO_PAD
        .decode_to_vec(value)
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()));

    match parsed {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(error = %e, "discarding malformed flash cookie");
            Vec::new()
        }
    }
}
