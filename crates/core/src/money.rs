//! Free-text currency parsing with Brazilian locale rules.
//!
//! Prices arrive as operator-typed strings (`"R$ 10,50"`, `"1.234,56"`).
//! Everything except digits, `,` and `.` is stripped; the comma is the
//! decimal separator. All price fields in the workspace go through this
//! single parser.

use rust_decimal::Decimal;

/// Parse a localized free-text amount into a `Decimal`.
///
/// Returns `Decimal::ZERO` when no digits survive the stripping pass,
/// matching the permissive entry semantics of the response forms: an
/// empty or garbage price field means "not priced", not an error.
pub fn parse_localized_currency(raw: &str) -> Decimal {
    let cleaned: String =
        raw.chars().filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.').collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Decimal::ZERO;
    }

    let normalized = if cleaned.contains(',') {
        // Comma is the decimal separator; dots are thousands grouping.
        cleaned.replace('.', "").replace(',', ".")
    } else {
        match cleaned.matches('.').count() {
            0 | 1 => cleaned,
            // Several dots without a comma: all but the last are grouping.
            _ => {
                let last = cleaned.rfind('.').unwrap_or(0);
                let (head, tail) = cleaned.split_at(last);
                format!("{}{}", head.replace('.', ""), tail)
            }
        }
    };

    normalized.parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

/// Format a `Decimal` amount for user-facing messages (`R$ 1.234,56`).
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let raw = format!("{rounded:.2}");
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::new();
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("R$ {sign}{grouped},{frac_part}")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{format_brl, parse_localized_currency};

    #[test]
    fn parses_currency_prefixed_comma_decimal() {
        assert_eq!(parse_localized_currency("R$ 10,50"), Decimal::new(1050, 2));
    }

    #[test]
    fn parses_thousands_grouping_with_comma_decimal() {
        assert_eq!(parse_localized_currency("1.234,56"), Decimal::new(123_456, 2));
    }

    #[test]
    fn parses_plain_dot_decimal() {
        assert_eq!(parse_localized_currency("10.50"), Decimal::new(1050, 2));
    }

    #[test]
    fn parses_multiple_dots_as_grouping() {
        assert_eq!(parse_localized_currency("1.234.567.89"), Decimal::new(123_456_789, 2));
    }

    #[test]
    fn empty_and_garbage_input_parse_to_zero() {
        assert_eq!(parse_localized_currency(""), Decimal::ZERO);
        assert_eq!(parse_localized_currency("a cobrar"), Decimal::ZERO);
        assert_eq!(parse_localized_currency("R$ "), Decimal::ZERO);
    }

    #[test]
    fn integer_input_parses_without_decimals() {
        assert_eq!(parse_localized_currency("250"), Decimal::new(250, 0));
    }

    #[test]
    fn formats_with_grouping_and_comma() {
        assert_eq!(format_brl(Decimal::new(123_456, 2)), "R$ 1.234,56");
        assert_eq!(format_brl(Decimal::new(2100, 2)), "R$ 21,00");
        assert_eq!(format_brl(Decimal::ZERO), "R$ 0,00");
    }
}
