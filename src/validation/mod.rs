/// Input validation for the session endpoints
///
/// Each check collects every violation; callers report them joined with ", "
/// in field order.
use crate::error::{CmsError, CmsResult};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]{3,30}$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
}

/// Minimum password length in characters
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn into_result(errors: Vec<&'static str>) -> CmsResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CmsError::Validation(errors.join(", ")))
    }
}

/// Validate registration input: username, then email, then password
pub fn validate_register_input(
    username: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> CmsResult<()> {
    let mut errors = Vec::new();

    match username {
        _ if is_blank(username) => errors.push("Username is required"),
        Some(u) if !is_valid_username(u) => errors.push(
            "Username must be 3-30 characters (letters, digits, underscore)",
        ),
        _ => {}
    }

    match email {
        _ if is_blank(email) => errors.push("Email is required"),
        Some(e) if !is_valid_email(e) => errors.push("Invalid email format"),
        _ => {}
    }

    match password {
        None | Some("") => errors.push("Password is required"),
        Some(p) if !is_valid_password(p) => {
            errors.push("Password must be at least 6 characters")
        }
        _ => {}
    }

    into_result(errors)
}

/// Validate login input: both fields must be present
pub fn validate_login_input(username: Option<&str>, password: Option<&str>) -> CmsResult<()> {
    let mut errors = Vec::new();

    if is_blank(username) {
        errors.push("Username is required");
    }
    if password.map_or(true, str::is_empty) {
        errors.push("Password is required");
    }

    into_result(errors)
}
