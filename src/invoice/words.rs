//! Rupee amounts spelled out with Indian grouping (Thousand, Lakh, Crore).

const ONES: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const THOUSAND: u64 = 1_000;
const LAKH: u64 = 100_000;
const CRORE: u64 = 10_000_000;

/// Spell out the whole-rupee part of `amount`, e.g.
/// `125000.0` -> `One Lakh Twenty Five Thousand Rupees Only`.
/// Paise are dropped.
pub fn amount_in_words(amount: f64) -> String {
    let rupees = if amount.is_finite() && amount > 0.0 {
        amount.trunc() as u64
    } else {
        0
    };

    if rupees == 0 {
        return "Zero Rupees Only".to_string();
    }
    format!("{} Rupees Only", spell(rupees))
}

fn below_thousand(n: u64) -> String {
    match n {
        0 => String::new(),
        1..=19 => ONES[n as usize].to_string(),
        20..=99 => join(TENS[(n / 10) as usize], ONES[(n % 10) as usize]),
        _ => join(
            &format!("{} Hundred", ONES[(n / 100) as usize]),
            &below_thousand(n % 100),
        ),
    }
}

fn spell(n: u64) -> String {
    if n < THOUSAND {
        below_thousand(n)
    } else if n < LAKH {
        join(
            &format!("{} Thousand", below_thousand(n / THOUSAND)),
            &below_thousand(n % THOUSAND),
        )
    } else if n < CRORE {
        join(&format!("{} Lakh", below_thousand(n / LAKH)), &spell(n % LAKH))
    } else {
        join(&format!("{} Crore", spell(n / CRORE)), &spell(n % CRORE))
    }
}

fn join(head: &str, tail: &str) -> String {
    if tail.is_empty() {
        head.to_string()
    } else {
        format!("{} {}", head, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_non_positive() {
        assert_eq!(amount_in_words(0.0), "Zero Rupees Only");
        assert_eq!(amount_in_words(0.75), "Zero Rupees Only");
        assert_eq!(amount_in_words(-5.0), "Zero Rupees Only");
    }

    #[test]
    fn test_small_amounts() {
        assert_eq!(amount_in_words(7.0), "Seven Rupees Only");
        assert_eq!(amount_in_words(19.0), "Nineteen Rupees Only");
        assert_eq!(amount_in_words(40.0), "Forty Rupees Only");
        assert_eq!(amount_in_words(99.99), "Ninety Nine Rupees Only");
        assert_eq!(amount_in_words(100.0), "One Hundred Rupees Only");
        assert_eq!(amount_in_words(705.0), "Seven Hundred Five Rupees Only");
    }

    #[test]
    fn test_thousands() {
        assert_eq!(amount_in_words(1500.0), "One Thousand Five Hundred Rupees Only");
        assert_eq!(amount_in_words(4300.0), "Four Thousand Three Hundred Rupees Only");
        assert_eq!(
            amount_in_words(99_999.0),
            "Ninety Nine Thousand Nine Hundred Ninety Nine Rupees Only"
        );
    }

    #[test]
    fn test_lakhs_and_crores() {
        assert_eq!(amount_in_words(100_000.0), "One Lakh Rupees Only");
        assert_eq!(
            amount_in_words(125_000.0),
            "One Lakh Twenty Five Thousand Rupees Only"
        );
        assert_eq!(
            amount_in_words(1_234_567.0),
            "Twelve Lakh Thirty Four Thousand Five Hundred Sixty Seven Rupees Only"
        );
        assert_eq!(amount_in_words(10_000_000.0), "One Crore Rupees Only");
        assert_eq!(
            amount_in_words(250_100_005.0),
            "Twenty Five Crore One Lakh Five Rupees Only"
        );
    }
}
