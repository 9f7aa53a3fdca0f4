//! # Number Parsing
//!
//! Reads amounts typed in either US (`1,234.56`) or European (`1.234,56`)
//! notation.
//!
//! ## Separator Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Input          Separators      Decision                     Result     │
//! │  ─────────────  ──────────────  ───────────────────────────  ───────    │
//! │  123            none            plain integer                 123       │
//! │  123,45         one kind        last group ≤ 2 → decimal      123.45    │
//! │  12,345         one kind        last group = 3 → thousands    12345     │
//! │  1.234          one kind        last group = 3 → thousands    1234      │
//! │  1,234.56       both            later one is decimal          1234.56   │
//! │  1.234,56       both            later one is decimal          1234.56   │
//! │  1.234.567,891  both            group > 2 → all thousands     1234567891│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Anything other than digits and the two separators is ignored. Input with
//! no digits left yields `None`.

use once_cell::sync::Lazy;
use regex::Regex;

/// An amount token: digits with optional `.`/`,` separated groups.
pub const AMOUNT_PATTERN: &str = r"\d+(?:[.,]\d+)*(?:[.,]\d{1,2})?";

/// Matches a line that starts with an amount.
pub static AMOUNT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^{}", AMOUNT_PATTERN)).expect("amount pattern is valid")
});

/// Parses a locale-ambiguous decimal string.
///
/// ## Example
/// ```rust
/// use splitwiser_core::number::parse_amount;
///
/// assert_eq!(parse_amount("1.234,56"), Some(1234.56));
/// assert_eq!(parse_amount("12,345"), Some(12345.0));
/// assert_eq!(parse_amount("abc"), None);
/// ```
pub fn parse_amount(input: &str) -> Option<f64> {
    let input = input.trim();

    if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
        return input.parse().ok();
    }

    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (None, None) => cleaned,
        (Some(_), None) => single_separator(&cleaned, '.'),
        (None, Some(_)) => single_separator(&cleaned, ','),
        (Some(dot), Some(comma)) => {
            let last = dot.max(comma);
            let tail = &cleaned[last + 1..];
            if tail.len() <= 2 {
                decimal_at(&cleaned, last)
            } else {
                strip_separators(&cleaned)
            }
        }
    };

    to_finite(&normalized)
}

fn single_separator(cleaned: &str, separator: char) -> String {
    let parts: Vec<&str> = cleaned.split(separator).collect();
    match parts.split_last() {
        Some((last, head)) if !head.is_empty() && last.len() <= 2 => {
            format!("{}.{}", head.concat(), last)
        }
        _ => strip_separators(cleaned),
    }
}

/// Keeps the separator at byte index `at` as the decimal point.
fn decimal_at(cleaned: &str, at: usize) -> String {
    format!(
        "{}.{}",
        strip_separators(&cleaned[..at]),
        &cleaned[at + 1..]
    )
}

fn strip_separators(s: &str) -> String {
    s.chars().filter(|c| *c != '.' && *c != ',').collect()
}

fn to_finite(s: &str) -> Option<f64> {
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_integers_and_decimals() {
        assert_eq!(parse_amount("123"), Some(123.0));
        assert_eq!(parse_amount("123.45"), Some(123.45));
        assert_eq!(parse_amount("123,45"), Some(123.45));
        assert_eq!(parse_amount("  123.45  "), Some(123.45));
        assert_eq!(parse_amount("0.5"), Some(0.5));
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("12,345"), Some(12345.0));
        assert_eq!(parse_amount("12.345"), Some(12345.0));
        assert_eq!(parse_amount("1.234"), Some(1234.0));
        assert_eq!(parse_amount("1,234,567"), Some(1234567.0));
        assert_eq!(parse_amount("1.234.567,891"), Some(1234567891.0));
    }

    #[test]
    fn test_repeated_separator_with_short_tail() {
        assert_eq!(parse_amount("1.234.56"), Some(1234.56));
        assert_eq!(parse_amount("1,234,56"), Some(1234.56));
    }

    #[test]
    fn test_noise_is_ignored() {
        assert_eq!(parse_amount("$45.50"), Some(45.5));
        assert_eq!(parse_amount("R$ 1.234,56"), Some(1234.56));
    }

    #[test]
    fn test_unparseable_is_none() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("."), None);
        assert_eq!(parse_amount(",,"), None);
    }
}
