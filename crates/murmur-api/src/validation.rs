//! Input rules shared by sign-up, the username availability check and the
//! public send form.

use crate::error::ApiError;

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 6;
pub const CODE_LEN: usize = 6;
/// Lower bound on message length, applied at the HTTP boundary only.
pub const MESSAGE_MIN: usize = 10;

pub fn username(value: &str) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < USERNAME_MIN {
        return Err(ApiError::Validation(format!(
            "username must be at least {USERNAME_MIN} characters long"
        )));
    }
    if len > USERNAME_MAX {
        return Err(ApiError::Validation(format!(
            "username must be not more than {USERNAME_MAX} characters"
        )));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::Validation(
            "username must contain only letters, digits and underscores".into(),
        ));
    }
    Ok(())
}

/// Lower-cased, trimmed email, or a validation error.
pub fn email(value: &str) -> Result<String, ApiError> {
    let normalized = value.trim().to_ascii_lowercase();
    let invalid = || ApiError::Validation("invalid email address".into());

    let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || normalized.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || domain.contains("..")
    {
        return Err(invalid());
    }
    Ok(normalized)
}

pub fn password(value: &str) -> Result<(), ApiError> {
    if value.chars().count() < PASSWORD_MIN {
        return Err(ApiError::Validation(format!(
            "password must be at least {PASSWORD_MIN} characters long"
        )));
    }
    Ok(())
}

pub fn verify_code(value: &str) -> Result<(), ApiError> {
    if value.len() != CODE_LEN {
        return Err(ApiError::Validation(format!(
            "verification code must be {CODE_LEN} characters long"
        )));
    }
    Ok(())
}
