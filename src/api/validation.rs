//! Input validation for form submissions.
//!
//! Validators return `Err(message)` with a user-facing message. Collect them
//! into an `AppError` with `ValidationErrorBuilder` from the `error` module.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Loose email check: something@something.tld
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^\s@]+@[^\s@]+\.[^\s@]+$"
    ).unwrap();

    /// Phone numbers: optional leading +, digits with spaces or dashes
    static ref PHONE_REGEX: Regex = Regex::new(
        r"^\+?[0-9][0-9 \-]*[0-9]$"
    ).unwrap();

    /// Product codes such as `LH-101` or `SHERWANI_07`
    static ref PRODUCT_CODE_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9][A-Za-z0-9_\-/]*$"
    ).unwrap();
}

/// Date format used by forms and the database
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const MIN_PASSWORD_LEN: usize = 6;

/// Require a non-blank value
pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    if value.len() > 200 {
        return Err(format!("{} is too long (max 200 characters)", label));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required".to_string());
    }
    if !EMAIL_REGEX.is_match(email.trim()) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

/// Validate an optional email; empty input is accepted
pub fn validate_optional_email(email: Option<&str>) -> Result<(), String> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(e) => validate_email(e),
        None => Ok(()),
    }
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !PHONE_REGEX.is_match(phone) || !(7..=15).contains(&digits) {
        return Err("Invalid phone number".to_string());
    }
    Ok(())
}

pub fn validate_product_code(code: &str) -> Result<(), String> {
    let code = code.trim();
    if code.is_empty() {
        return Err("Product code is required".to_string());
    }
    if code.len() > 32 {
        return Err("Product code is too long (max 32 characters)".to_string());
    }
    if !PRODUCT_CODE_REGEX.is_match(code) {
        return Err(
            "Product code may only contain letters, digits, '-', '_' and '/'".to_string(),
        );
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

/// Parse a required, non-negative money amount
pub fn parse_amount(raw: &str, label: &str) -> Result<f64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(format!("{} is required", label));
    }

    let value: f64 = raw
        .replace(',', "")
        .parse()
        .map_err(|_| format!("{} must be a number", label))?;

    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} must be zero or more", label));
    }
    Ok(value)
}

/// Parse an optional money amount; empty input means zero
pub fn parse_optional_amount(raw: Option<&str>, label: &str) -> Result<f64, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_amount(value, label),
        None => Ok(0.0),
    }
}

/// Parse a `YYYY-MM-DD` form date
pub fn parse_date(raw: &str, label: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(format!("{} is required", label));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| format!("{} must be a date (YYYY-MM-DD)", label))
}

pub fn validate_rental_window(delivery: NaiveDate, return_date: NaiveDate) -> Result<(), String> {
    if return_date < delivery {
        return Err("Return date cannot be before delivery date".to_string());
    }
    Ok(())
}

pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }
    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("{} must be a valid id", field_name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("Asha", "Name").is_ok());
        assert_eq!(validate_required("   ", "Name").unwrap_err(), "Name is required");
        assert!(validate_required(&"x".repeat(201), "Name").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("staff@rental.com").is_ok());
        assert!(validate_email(" staff@rental.co.in ").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("staff").is_err());
        assert!(validate_email("staff@rental").is_err());
        assert!(validate_email("st aff@rental.com").is_err());

        assert!(validate_optional_email(None).is_ok());
        assert!(validate_optional_email(Some("")).is_ok());
        assert!(validate_optional_email(Some("nope")).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("+91 98765 43210").is_ok());
        assert!(validate_phone("0288-2551234").is_ok());

        assert!(validate_phone("").is_err());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("98765abc10").is_err());
        assert!(validate_phone("1234567890123456").is_err());
    }

    #[test]
    fn test_validate_product_code() {
        assert!(validate_product_code("LH-101").is_ok());
        assert!(validate_product_code("SHERWANI_07").is_ok());
        assert!(validate_product_code("GOWN/12").is_ok());

        assert!(validate_product_code("").is_err());
        assert!(validate_product_code("-LH").is_err());
        assert!(validate_product_code("LH 101").is_err());
        assert!(validate_product_code(&"A".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("admin123").is_ok());
        assert!(validate_password("abc").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1500", "Price").unwrap(), 1500.0);
        assert_eq!(parse_amount(" 2,499.50 ", "Price").unwrap(), 2499.5);
        assert_eq!(parse_amount("0", "Price").unwrap(), 0.0);

        assert_eq!(parse_amount("", "Price").unwrap_err(), "Price is required");
        assert_eq!(parse_amount("abc", "Price").unwrap_err(), "Price must be a number");
        assert!(parse_amount("-10", "Price").is_err());
        assert!(parse_amount("NaN", "Price").is_err());

        assert_eq!(parse_optional_amount(None, "Deposit").unwrap(), 0.0);
        assert_eq!(parse_optional_amount(Some(" "), "Deposit").unwrap(), 0.0);
        assert_eq!(parse_optional_amount(Some("500"), "Deposit").unwrap(), 500.0);
    }

    #[test]
    fn test_parse_dates_and_window() {
        let delivery = parse_date("2025-05-01", "Delivery date").unwrap();
        let same_day = parse_date("2025-05-01", "Return date").unwrap();
        let later = parse_date("2025-05-04", "Return date").unwrap();

        assert!(validate_rental_window(delivery, same_day).is_ok());
        assert!(validate_rental_window(delivery, later).is_ok());
        assert!(validate_rental_window(later, delivery).is_err());

        assert!(parse_date("", "Delivery date").is_err());
        assert!(parse_date("01-05-2025", "Delivery date").is_err());
        assert!(parse_date("2025-02-30", "Delivery date").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "product_id").is_ok());
        assert!(validate_uuid("", "product_id").is_err());
        assert!(validate_uuid("not-a-uuid", "product_id").is_err());
    }
}
