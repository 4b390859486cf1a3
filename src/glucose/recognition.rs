//! Value recognition from raw text
//!
//! Meter photos are run through OCR on the client; the raw text arrives here
//! and the most plausible glucose value is suggested. Suggestions only
//! pre-fill the input field.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Plausible meter readings, mg/dL
pub const PLAUSIBLE_MIN: i64 = 40;
pub const PLAUSIBLE_MAX: i64 = 400;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{2,3}").expect("valid regex"));

static LEADING_INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+").expect("valid regex"));

/// Best-guess glucose value in OCR output.
///
/// Returns the most frequent run of two or three digits within the
/// plausible range (earliest wins a tie), else the first run found.
pub fn extract_glucose_value(raw_text: &str) -> Option<i64> {
    let matches: Vec<i64> = NUMBER_RE
        .find_iter(raw_text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    let first = *matches.first()?;

    let plausible: Vec<i64> = matches
        .iter()
        .copied()
        .filter(|v| (PLAUSIBLE_MIN..=PLAUSIBLE_MAX).contains(v))
        .collect();

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for value in &plausible {
        *counts.entry(*value).or_insert(0) += 1;
    }

    let mut best: Option<(i64, usize)> = None;
    for value in plausible {
        let count = counts[&value];
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }

    Some(best.map_or(first, |(value, _)| value))
}

/// Lenient integer parse of form input.
///
/// Accepts leading whitespace, an optional sign and trailing garbage after
/// the digits, so `" 104 mg"` yields 104.
pub fn parse_value_input(text: &str) -> Option<i64> {
    let m = LEADING_INT_RE.find(text.trim_start())?;
    m.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_common_plausible_value() {
        assert_eq!(extract_glucose_value("104 mg/dL 12:30 104"), Some(104));
        assert_eq!(extract_glucose_value("mg/dL 98 10/05 98"), Some(98));
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        assert_eq!(extract_glucose_value("112 85"), Some(112));
    }

    #[test]
    fn test_falls_back_to_first_match() {
        // 12 and 30 are both outside 40-400
        assert_eq!(extract_glucose_value("12:30"), Some(12));
        assert_eq!(extract_glucose_value("no digits here"), None);
        assert_eq!(extract_glucose_value(""), None);
    }

    #[test]
    fn test_long_runs_split_into_chunks() {
        // 2024 scans as 202 then nothing; 4 alone is too short
        assert_eq!(extract_glucose_value("2024"), Some(202));
    }

    #[test]
    fn test_only_ascii_digits_count() {
        assert_eq!(extract_glucose_value("\u{661}23"), Some(23));
        assert_eq!(extract_glucose_value("\u{661}\u{662}\u{663} mg 110"), Some(110));
        assert_eq!(parse_value_input("\u{661}\u{662}"), None);
    }

    #[test]
    fn test_parse_value_input() {
        assert_eq!(parse_value_input("104"), Some(104));
        assert_eq!(parse_value_input("  87 mg/dL"), Some(87));
        assert_eq!(parse_value_input("-5"), Some(-5));
        assert_eq!(parse_value_input("+120"), Some(120));
        assert_eq!(parse_value_input("abc"), None);
        assert_eq!(parse_value_input(""), None);
        assert_eq!(parse_value_input("99999999999999999999999"), None);
    }
}
