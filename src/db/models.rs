use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Gravatar identicon URL for `email` at `size` pixels.
pub fn gravatar(email: &str, size: u32) -> String {
    let digest = Md5::digest(email.to_lowercase().as_bytes());
    format!("https://www.gravatar.com/avatar/{:x}?d=identicon&s={}", digest, size)
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub about_me: Option<String>,
    pub last_seen: i64,
}

impl User {
    pub fn avatar(&self, size: u32) -> String {
        gravatar(&self.email, size)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub body: String,
    pub timestamp: i64,
    pub user_id: i64,
    pub author: String, // Joined from users table
    #[serde(skip_serializing)]
    pub author_email: String,
}

impl Post {
    pub fn avatar(&self, size: u32) -> String {
        gravatar(&self.author_email, size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub body: String,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub token: String,
    pub persistent: bool,
    pub expires_at: i64,
    pub created_at: i64,
}
