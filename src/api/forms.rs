//! Submitted forms and their field-level validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name → messages, rendered inline next to the form.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn finish(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn required(&mut self, field: &'static str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.add(field, "This field is required.");
            false
        } else {
            true
        }
    }

    fn length(&mut self, field: &'static str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            let message = if min == 0 {
                format!("Field cannot be longer than {} characters.", max)
            } else {
                format!("Field must be between {} and {} characters long.", min, max)
            };
            self.add(field, message);
        }
    }
}

/// Usernames end up in URLs, so they are limited to URL-safe characters.
fn check_username(errors: &mut FormErrors, username: &str) {
    if !errors.required("username", username) {
        return;
    }
    errors.length("username", username, 1, 64);
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        errors.add(
            "username",
            "Usernames must have only letters, numbers, dots, hyphens or underscores.",
        );
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// HTML checkboxes submit a value when ticked and nothing otherwise.
fn checked(value: Option<&str>) -> bool {
    !matches!(value, None | Some("") | Some("false"))
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember_me: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        errors.required("username", &self.username);
        errors.required("password", &self.password);
        errors.finish()
    }

    pub fn remember(&self) -> bool {
        checked(self.remember_me.as_deref())
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
}

impl RegistrationForm {
    /// Checks that need no database; uniqueness is checked by the handler.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        check_username(&mut errors, &self.username);

        if errors.required("email", &self.email) {
            errors.length("email", &self.email, 0, 120);
            if !looks_like_email(&self.email) {
                errors.add("email", "Invalid email address.");
            }
        }

        errors.required("password", &self.password);
        if errors.required("password2", &self.password2) && self.password2 != self.password {
            errors.add("password2", "Field must be equal to password.");
        }

        errors.finish()
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EditProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub about_me: String,
}

impl EditProfileForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        check_username(&mut errors, &self.username);
        errors.length("about_me", &self.about_me, 0, 140);
        errors.finish()
    }

    pub fn about_me(&self) -> Option<&str> {
        let about = self.about_me.trim();
        (!about.is_empty()).then_some(about)
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub post: String,
}

impl PostForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if errors.required("post", &self.post) {
            errors.length("post", &self.post, 1, 140);
        }
        errors.finish()
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LibraryForm {
    #[serde(default)]
    pub ownername: String,
    #[serde(default)]
    pub bookname: String,
    #[serde(default)]
    pub body: String,
}

impl LibraryForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if errors.required("ownername", &self.ownername) {
            errors.length("ownername", &self.ownername, 1, 64);
        }
        if errors.required("bookname", &self.bookname) {
            errors.length("bookname", &self.bookname, 1, 140);
        }
        errors.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, password: &str, password2: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password2: password2.to_string(),
        }
    }

    #[test]
    fn registration_accepts_good_input() {
        assert!(registration("susan", "susan@example.com", "cat", "cat").validate().is_ok());
    }

    #[test]
    fn registration_reports_each_field() {
        let errors = registration("", "not-an-email", "cat", "dog").validate().unwrap_err();
        assert_eq!(errors.field("username"), ["This field is required."]);
        assert_eq!(errors.field("email"), ["Invalid email address."]);
        assert_eq!(errors.field("password2"), ["Field must be equal to password."]);
        assert!(errors.field("password").is_empty());
    }

    #[test]
    fn usernames_must_be_url_safe() {
        let errors = registration("su san", "s@example.com", "x", "x").validate().unwrap_err();
        assert_eq!(errors.field("username").len(), 1);
        assert!(registration("Сюзан_1", "s@example.com", "x", "x").validate().is_ok());
    }

    #[test]
    fn post_length_counts_characters() {
        let ok = PostForm {
            post: "ж".repeat(140),
        };
        assert!(ok.validate().is_ok());

        let long = PostForm {
            post: "a".repeat(141),
        };
        assert_eq!(
            long.validate().unwrap_err().field("post"),
            ["Field must be between 1 and 140 characters long."]
        );

        let blank = PostForm {
            post: "   ".to_string(),
        };
        assert_eq!(blank.validate().unwrap_err().field("post"), ["This field is required."]);
    }

    #[test]
    fn remember_me_checkbox() {
        let mut form = LoginForm {
            username: "susan".to_string(),
            password: "cat".to_string(),
            remember_me: None,
        };
        assert!(!form.remember());
        form.remember_me = Some("y".to_string());
        assert!(form.remember());
        form.remember_me = Some("false".to_string());
        assert!(!form.remember());
    }

    #[test]
    fn about_me_is_capped() {
        let form = EditProfileForm {
            username: "susan".to_string(),
            about_me: "x".repeat(141),
        };
        assert_eq!(
            form.validate().unwrap_err().field("about_me"),
            ["Field cannot be longer than 140 characters."]
        );
    }

    #[test]
    fn library_needs_owner_and_book() {
        let errors = LibraryForm::default().validate().unwrap_err();
        assert_eq!(errors.field("ownername"), ["This field is required."]);
        assert_eq!(errors.field("bookname"), ["This field is required."]);
        assert!(errors.field("body").is_empty());
    }
}
