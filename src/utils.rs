//! Small filesystem and formatting helpers shared across modules.

use anyhow::{Context, Result};
use std::path::Path;

/// Create a directory (and parents) if it does not exist
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Reduce an uploaded file name to a safe ASCII name without path parts.
///
/// Whitespace becomes `_`; anything other than letters, digits, `.`, `_`
/// and `-` is dropped; leading dots and underscores are stripped.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Format an amount with thousands separators and two decimals: `12,345.50`
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{:02}", if negative { "-" } else { "" }, grouped, fraction)
}

/// Format a rupee amount for display: `Rs. 12,345.50`
pub fn format_rupees(amount: f64) -> String {
    format!("Rs. {}", format_amount(amount))
}

/// Reformat a `YYYY-MM-DD` date as `DD-MM-YYYY`, leaving other input unchanged
pub fn display_date(date: &str) -> String {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%d-%m-%Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My Photo.JPG"), "My_Photo.JPG");
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\dress (1).png"), "dress_1.png");
        assert_eq!(secure_filename("..hidden.png"), "hidden.png");
        assert_eq!(secure_filename("रंग.jpg"), "jpg");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(1500.0), "1,500.00");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-2500.0), "-2,500.00");
        assert_eq!(format_rupees(12345.5), "Rs. 12,345.50");
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date("2025-11-03"), "03-11-2025");
        assert_eq!(display_date("soon"), "soon");
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }
}
