//! Client-side checks run before any credential or profile call.

use thiserror::Error;

use crate::event::Secret;
use crate::model::ProfileSeed;
use crate::MIN_PASSWORD_LEN;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter your {field}")]
    MissingField { field: &'static str },

    #[error("Both password fields are required")]
    MissingPasswords,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Please select a valid image file")]
    NotAnImage,

    #[error("Image size must be less than {max_mb}MB")]
    ImageTooLarge { max_mb: u64 },
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}

fn check_length(password: &Secret) -> Result<(), ValidationError> {
    if password.expose().chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    require(email, "email")
}

pub fn validate_sign_in(email: &str, password: &Secret) -> Result<(), ValidationError> {
    validate_email(email)?;
    require(password.expose(), "password")
}

pub fn validate_sign_up(
    email: &str,
    password: &Secret,
    seed: &ProfileSeed,
) -> Result<(), ValidationError> {
    validate_email(email)?;
    require(password.expose(), "password")?;
    check_length(password)?;
    require(&seed.username, "username")?;
    require(&seed.full_name, "full name")?;
    require(&seed.phone, "phone number")
}

/// Checks for the reset form: both fields present, equal, and long enough.
pub fn validate_new_password(new: &Secret, confirm: &Secret) -> Result<(), ValidationError> {
    if new.expose().is_empty() || confirm.expose().is_empty() {
        return Err(ValidationError::MissingPasswords);
    }
    if new.expose() != confirm.expose() {
        return Err(ValidationError::PasswordMismatch);
    }
    check_length(new)
}
