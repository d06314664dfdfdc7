//! Launch-parameter validation, run before anything touches the network.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::types::LaunchRequest;

// Literal patterns; `patterns_compile` below forces both.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^1[3-9]\d{9}$").expect("valid regex")
});

static COURSE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+$").expect("valid regex")
});

/// Mainland mobile number: 11 digits, leading `1`, second digit 3-9.
pub fn validate_phone_number(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Comma-separated list of numeric course ids. Whitespace around items is allowed.
pub fn validate_course_list(list: &str) -> bool {
    if list.is_empty() {
        return false;
    }
    list.split(',').map(str::trim).all(|c| COURSE_ID_RE.is_match(c))
}

/// Check raw form input and build the request body.
///
/// Username and course list are trimmed; the trimmed course list is sent
/// as-is. The password is passed through untouched.
pub fn validate_launch(
    username: &str,
    password: &str,
    list_id: &str,
) -> Result<LaunchRequest, ValidationError> {
    let username = username.trim();
    let list_id = list_id.trim();

    if username.is_empty() {
        return Err(ValidationError::MissingField("username"));
    }
    if password.is_empty() {
        return Err(ValidationError::MissingField("password"));
    }
    if list_id.is_empty() {
        return Err(ValidationError::MissingField("list_id"));
    }
    if !validate_phone_number(username) {
        return Err(ValidationError::InvalidPhone);
    }
    if !validate_course_list(list_id) {
        return Err(ValidationError::InvalidCourseList);
    }

    Ok(LaunchRequest {
        username: username.to_string(),
        password: password.to_string(),
        list_id: list_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        assert!(PHONE_RE.is_match("13812345678"));
        assert!(COURSE_ID_RE.is_match("101"));
    }
}
