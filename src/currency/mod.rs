//! Two-decimal money helpers shared by the ledger, settlement, and import layers.

use crate::errors::ValidationError;

/// Residuals at or below this value are treated as settled.
pub const SETTLEMENT_EPSILON: f64 = 0.01;

const MINOR_UNITS: i32 = 2;

/// Rounds a value to whole cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Converts a value to integer cents for exact comparisons.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Whether a value has no digits beyond whole cents.
pub fn has_whole_cents(amount: f64) -> bool {
    let cents = amount * 100.0;
    (cents - cents.round()).abs() < 1e-6
}

/// Rejects negative, NaN, and infinite amounts and rounds the rest to cents.
pub fn normalize_amount(amount: f64) -> Result<f64, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::InvalidAmount(format!(
            "`{amount}` is not a number"
        )));
    }
    if amount < 0.0 {
        return Err(ValidationError::InvalidAmount(format!(
            "{amount} is negative"
        )));
    }
    Ok(round_cents(amount))
}

/// Parses free-form amount input (`^\d*\.?\d{0,2}$`).
///
/// Blank input yields `None` so callers can treat it as a placeholder. A lone
/// decimal point parses as zero.
pub fn parse_amount(input: &str) -> Result<Option<f64>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (trimmed, None),
    };
    let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    let fraction_ok = fraction
        .map(|part| digits_only(part) && part.len() <= MINOR_UNITS as usize)
        .unwrap_or(true);
    if !digits_only(whole) || !fraction_ok {
        return Err(ValidationError::InvalidAmount(format!(
            "`{trimmed}` is not a valid amount"
        )));
    }
    if whole.is_empty() && fraction.map_or(true, str::is_empty) {
        return Ok(Some(0.0));
    }
    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        fraction.filter(|part| !part.is_empty()).unwrap_or("0")
    );
    normalized
        .parse::<f64>()
        .map(|value| Some(round_cents(value)))
        .map_err(|err| ValidationError::InvalidAmount(err.to_string()))
}

/// Parses the strict `^\d+(\.\d{1,2})?$` form used by exported fixed amounts.
pub fn parse_strict_amount(input: &str) -> Result<f64, ValidationError> {
    let invalid = || ValidationError::InvalidAmount(format!("`{input}` is not a valid amount"));
    let (whole, fraction) = match input.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (input, None),
    };
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if let Some(fraction) = fraction {
        let len_ok = (1..=MINOR_UNITS as usize).contains(&fraction.len());
        if !len_ok || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
    }
    input
        .parse::<f64>()
        .map(round_cents)
        .map_err(|_| invalid())
}

/// Renders an amount with two decimals, e.g. `12.50`.
pub fn format_plain(amount: f64) -> String {
    format!("{:.*}", MINOR_UNITS as usize, round_cents(amount))
}

/// Renders an amount for display, e.g. `$12.50` or `-$3.00`.
pub fn format_amount(amount: f64) -> String {
    let rounded = round_cents(amount);
    if rounded < 0.0 {
        format!("-${}", format_plain(rounded.abs()))
    } else {
        format!("${}", format_plain(rounded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_cents_tolerate_binary_representation() {
        assert!(has_whole_cents(12.34));
        assert!(has_whole_cents(0.1 + 0.2));
        assert!(has_whole_cents(300.0));
        assert!(!has_whole_cents(10.005));
        assert!(!has_whole_cents(0.001));
    }

    #[test]
    fn parse_amount_accepts_partial_decimal_input() {
        assert_eq!(parse_amount("").unwrap(), None);
        assert_eq!(parse_amount("   ").unwrap(), None);
        assert_eq!(parse_amount("12").unwrap(), Some(12.0));
        assert_eq!(parse_amount("12.").unwrap(), Some(12.0));
        assert_eq!(parse_amount(".5").unwrap(), Some(0.5));
        assert_eq!(parse_amount("3.25").unwrap(), Some(3.25));
        assert_eq!(parse_amount(".").unwrap(), Some(0.0));
    }

    #[test]
    fn parse_amount_rejects_malformed_input() {
        for input in ["-4", "1.234", "abc", "1.2.3", "1e3", "$5"] {
            let err = parse_amount(input).expect_err("input must be rejected");
            assert!(
                matches!(err, ValidationError::InvalidAmount(_)),
                "unexpected error for {input}: {err:?}"
            );
        }
    }

    #[test]
    fn strict_amount_requires_leading_digits() {
        assert_eq!(parse_strict_amount("40").unwrap(), 40.0);
        assert_eq!(parse_strict_amount("40.5").unwrap(), 40.5);
        assert_eq!(parse_strict_amount("0.05").unwrap(), 0.05);
        assert!(parse_strict_amount(".5").is_err());
        assert!(parse_strict_amount("5.").is_err());
        assert!(parse_strict_amount("5.123").is_err());
        assert!(parse_strict_amount("").is_err());
    }

    #[test]
    fn normalize_rounds_and_rejects_negatives() {
        assert_eq!(normalize_amount(10.006).unwrap(), 10.01);
        assert!(normalize_amount(-0.5).is_err());
        assert!(normalize_amount(f64::NAN).is_err());
    }

    #[test]
    fn formatting_uses_two_decimals() {
        assert_eq!(format_amount(7.5), "$7.50");
        assert_eq!(format_amount(-3.0), "-$3.00");
        assert_eq!(format_plain(15.0), "15.00");
        assert_eq!(to_cents(0.1 + 0.2), 30);
    }
}
