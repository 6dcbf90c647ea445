//! Account forms: registration, reset request, new password
//!
//! Input is checked here, before the platform is called, so a refused form
//! never costs a round trip.

use serde::Deserialize;

/// Shortest password the platform accepts
pub const MIN_PASSWORD_LEN: usize = 6;

const MIN_NAME_LEN: usize = 2;
const MAX_NAME_LEN: usize = 100;

fn invalid(message: &str) -> crate::Error {
    crate::Error::Validation(message.to_string())
}

/// Trimmed e-mail, or a validation error
pub fn validate_email(email: &str) -> crate::Result<&str> {
    let email = email.trim();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && !domain.starts_with('.') && domain.contains('.') && !domain.ends_with('.')
    });
    if valid && !email.contains(char::is_whitespace) {
        Ok(email)
    } else {
        Err(invalid("Invalid email"))
    }
}

pub fn validate_password(password: &str) -> crate::Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(crate::Error::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Account registration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl SignUpForm {
    /// Check every field, returning the trimmed e-mail and name
    pub fn validate(&self) -> crate::Result<(&str, &str)> {
        let full_name = self.full_name.trim();
        let name_len = full_name.chars().count();
        if name_len < MIN_NAME_LEN {
            return Err(invalid("Name is required"));
        }
        if name_len > MAX_NAME_LEN {
            return Err(crate::Error::Validation(format!("Name must be at most {} characters", MAX_NAME_LEN)));
        }
        let email = validate_email(&self.email)?;
        validate_password(&self.password)?;
        Ok((email, full_name))
    }
}

/// New password, typed twice
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PasswordChange {
    pub password: String,
    pub confirm: String,
}

impl PasswordChange {
    pub fn validate(&self) -> crate::Result<&str> {
        validate_password(&self.password)?;
        if self.password != self.confirm {
            return Err(invalid("Passwords don't match"));
        }
        Ok(&self.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(email: &str, password: &str, full_name: &str) -> SignUpForm {
        SignUpForm { email: email.into(), password: password.into(), full_name: full_name.into() }
    }

    fn message(result: crate::Result<impl std::fmt::Debug>) -> String {
        match result {
            Err(crate::Error::Validation(message)) => message,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_email_shapes() {
        assert_eq!(validate_email("  ada@example.com ").unwrap(), "ada@example.com");
        for bad in ["", "ada", "@example.com", "ada@", "ada@localhost", "ada@.com", "ada@example.", "a da@example.com"] {
            assert!(validate_email(bad).is_err(), "{:?} accepted", bad);
        }
    }

    #[test]
    fn test_sign_up_form() {
        let valid = form(" ada@example.com", "s3cret", "  Ada Lovelace ");
        assert_eq!(valid.validate().unwrap(), ("ada@example.com", "Ada Lovelace"));

        assert_eq!(message(form("ada@example.com", "s3cret", " A ").validate()), "Name is required");
        assert_eq!(message(form("ada@example.com", "s3cret", &"x".repeat(101)).validate()), "Name must be at most 100 characters");
        assert_eq!(message(form("ada", "s3cret", "Ada").validate()), "Invalid email");
        assert_eq!(message(form("ada@example.com", "five5", "Ada").validate()), "Password must be at least 6 characters");
    }

    #[test]
    fn test_password_change() {
        let change = PasswordChange { password: "n3w-pass".into(), confirm: "n3w-pass".into() };
        assert_eq!(change.validate().unwrap(), "n3w-pass");

        let mismatch = PasswordChange { password: "n3w-pass".into(), confirm: "n3w-pas".into() };
        assert_eq!(message(mismatch.validate()), "Passwords don't match");

        // Length is checked before the confirmation.
        let short = PasswordChange { password: "abc".into(), confirm: "abd".into() };
        assert_eq!(message(short.validate()), "Password must be at least 6 characters");
    }
}
