//! Account input validation applied by auth backends on registration

use regex::Regex;

use crate::error::{Error, Result};

/// Characters that satisfy the "special character" password rule
const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validator for account fields
#[derive(Debug, Clone)]
pub struct AccountValidator {
    email_pattern: Regex,
    phone_pattern: Regex,
}

impl AccountValidator {
    pub fn new() -> Result<Self> {
        let email_pattern = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .map_err(|e| Error::ValidationFailed(format!("Invalid regex pattern: {}", e)))?;
        let phone_pattern = Regex::new(r"^\d{8,15}$")
            .map_err(|e| Error::ValidationFailed(format!("Invalid regex pattern: {}", e)))?;

        Ok(Self {
            email_pattern,
            phone_pattern,
        })
    }

    pub fn validate_email(&self, email: &str) -> Result<()> {
        if !self.email_pattern.is_match(email) {
            return Err(Error::ValidationFailed("Please enter a valid email address".to_string()));
        }
        Ok(())
    }

    /// At least 8 characters with lowercase, uppercase, digit and special character
    pub fn validate_password(&self, password: &str) -> Result<()> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::ValidationFailed(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

        if !(has_lower && has_upper && has_digit && has_special) {
            return Err(Error::ValidationFailed(
                "Password must contain uppercase, lowercase, number and special character".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_phone(&self, phone: &str) -> Result<()> {
        if !self.phone_pattern.is_match(phone) {
            return Err(Error::ValidationFailed("Phone number must be 8-15 digits".to_string()));
        }
        Ok(())
    }

    pub fn validate_name(&self, field: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(Error::ValidationFailed(format!("{} is required", field)));
        }
        Ok(())
    }
}

/// Canonical form used for account lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> AccountValidator {
        AccountValidator::new().unwrap()
    }

    #[test]
    fn test_email_validation() {
        let v = validator();
        assert!(v.validate_email("investor@example.com").is_ok());
        assert!(v.validate_email("a@b.co").is_ok());
        assert!(v.validate_email("no-at-sign.com").is_err());
        assert!(v.validate_email("two words@example.com").is_err());
        assert!(v.validate_email("user@nodot").is_err());
    }

    #[test]
    fn test_password_rules() {
        let v = validator();
        assert!(v.validate_password("Str0ng!pass").is_ok());
        assert!(v.validate_password("Sh0rt!").is_err());
        assert!(v.validate_password("alllower1!").is_err());
        assert!(v.validate_password("NoDigits!!").is_err());
        assert!(v.validate_password("NoSpecial12").is_err());
    }

    #[test]
    fn test_phone_validation() {
        let v = validator();
        assert!(v.validate_phone("5551234567").is_ok());
        assert!(v.validate_phone("1234567").is_err());
        assert!(v.validate_phone("+15551234567").is_err());
    }

    #[test]
    fn test_name_and_email_normalization() {
        let v = validator();
        assert!(v.validate_name("First name", "  ").is_err());
        assert!(v.validate_name("First name", "Ada").is_ok());
        assert_eq!(normalize_email("  Investor@Example.COM "), "investor@example.com");
    }
}
