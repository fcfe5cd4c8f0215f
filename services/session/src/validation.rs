//! Input validation utilities
//!
//! Checks run before credentials leave the client, so obviously invalid
//! forms never cost a round trip. The backend validates again.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::AuthError;
use crate::models::{LoginCredentials, NewAccount};

/// Validate login credentials
pub fn validate_login(credentials: &LoginCredentials) -> Result<(), AuthError> {
    if credentials.username.trim().is_empty() || credentials.password.is_empty() {
        return Err(invalid("Please fill in all fields"));
    }

    Ok(())
}

/// Validate a registration form
pub fn validate_registration(account: &NewAccount) -> Result<(), AuthError> {
    if account.name.is_empty()
        || account.email.is_empty()
        || account.username.is_empty()
        || account.password.is_empty()
    {
        return Err(invalid("Please fill in all fields"));
    }

    validate_name(&account.name)?;
    validate_username(&account.username)?;
    validate_password(&account.password)?;
    validate_email(&account.email)?;

    Ok(())
}

/// Validate display name
pub fn validate_name(name: &str) -> Result<(), AuthError> {
    if name.trim().is_empty() {
        return Err(invalid("Name cannot be empty"));
    }

    Ok(())
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.chars().count() < 3 {
        return Err(invalid("Username must be at least 3 characters long"));
    }

    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("Username must contain only letters and numbers"));
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < 6 {
        return Err(invalid("Password must be at least 6 characters long"));
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Failed to compile email regex"));

    if !regex.is_match(email) {
        return Err(invalid("Please enter a valid email address"));
    }

    Ok(())
}

fn invalid(message: &str) -> AuthError {
    AuthError::Validation(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str, email: &str, username: &str, password: &str) -> NewAccount {
        NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(validate_registration(&account("Ada", "ada@example.com", "ada42", "secret1")).is_ok());
    }

    #[test]
    fn test_registration_rules() {
        let cases = [
            (account("", "a@b.co", "ada", "secret1"), "Please fill in all fields"),
            (account("   ", "a@b.co", "ada", "secret1"), "Name cannot be empty"),
            (account("Ada", "a@b.co", "ad", "secret1"), "Username must be at least 3 characters long"),
            (account("Ada", "a@b.co", "ada_1", "secret1"), "Username must contain only letters and numbers"),
            (account("Ada", "a@b.co", "ada", "12345"), "Password must be at least 6 characters long"),
            (account("Ada", "not-an-email", "ada", "secret1"), "Please enter a valid email address"),
            (account("Ada", "a b@c.de", "ada", "secret1"), "Please enter a valid email address"),
        ];

        for (form, expected) in cases {
            assert_eq!(
                validate_registration(&form),
                Err(AuthError::Validation(expected.to_string()))
            );
        }
    }

    #[test]
    fn test_login_requires_both_fields() {
        let missing = LoginCredentials {
            username: " ".to_string(),
            password: "pw".to_string(),
        };
        assert!(validate_login(&missing).is_err());

        let ok = LoginCredentials {
            username: "ada".to_string(),
            password: "pw".to_string(),
        };
        assert!(validate_login(&ok).is_ok());
    }
}
