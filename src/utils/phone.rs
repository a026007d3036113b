use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::OnceLock;

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 15;

/// Strips formatting from a phone number, keeping digits only.
pub fn normalize_phone(phone: &str) -> AppResult<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_DIGITS || digits.len() > MAX_DIGITS {
        return Err(AppError::ValidationError(format!(
            "Phone number must have between {MIN_DIGITS} and {MAX_DIGITS} digits"
        )));
    }
    Ok(digits)
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

/// Trims and lowercases an email address after a shape check.
pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if !email_regex().is_match(&email) {
        return Err(AppError::ValidationError(
            "Invalid email address".to_string(),
        ));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("055 310 3992").unwrap(), "0553103992");
        assert_eq!(normalize_phone("+233 (55) 310-3992").unwrap(), "233553103992");
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("1234567890123456").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Ama@Example.COM ").unwrap(),
            "ama@example.com"
        );
        assert!(normalize_email("ama@").is_err());
        assert!(normalize_email("ama example@x.com").is_err());
    }
}
