//! Currency Normalizer Module
//! Parses and formats Brazilian-locale monetary strings.

use super::ParseError;

/// Prefix written by the patient export in front of every amount.
const BRL_SYMBOL: &str = "R$";

/// Parse a decimal-comma amount such as `"123,45"` (exam export).
///
/// The comma becomes the decimal point; anything else that is not a plain
/// non-negative number is rejected.
pub fn parse_decimal_comma(raw: &str) -> Result<f64, ParseError> {
    let normalized = raw.trim().replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| ParseError::Currency(raw.to_string()))?;

    if !value.is_finite() || value < 0.0 {
        return Err(ParseError::Currency(raw.to_string()));
    }
    Ok(value)
}

/// Parse a pre-formatted amount such as `"R$\u{a0}1.234,56"` (patient export).
///
/// The symbol and separators are stripped and the remaining digits are read
/// as an integer number of cents, so `"R$ 1.234,56"` is `1234.56` and
/// `"R$ 10"` is `0.10`.
pub fn parse_brl_cents(raw: &str) -> Result<f64, ParseError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix(BRL_SYMBOL)
        .map(|rest| rest.trim_start_matches(|c: char| c == '\u{a0}' || c.is_whitespace()))
        .unwrap_or(trimmed);

    let digits: String = body.chars().filter(|c| *c != '.' && *c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::Currency(raw.to_string()));
    }

    let cents: u64 = digits
        .parse()
        .map_err(|_| ParseError::Currency(raw.to_string()))?;
    Ok(cents as f64 / 100.0)
}

/// Render an amount as `R$ 1.234,56` with `digits` fractional digits.
pub fn format_brl(value: f64, digits: usize) -> String {
    let sign = if value < 0.0 && format_plain(value.abs(), digits) != format_plain(0.0, digits) {
        "-"
    } else {
        ""
    };
    format!("{}{} {}", sign, BRL_SYMBOL, format_plain(value.abs(), digits))
}

/// Render a non-negative number with period thousands and comma decimals.
pub fn format_plain(value: f64, digits: usize) -> String {
    let fixed = format!("{:.*}", digits, value);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{},{}", grouped, frac),
        None => grouped,
    }
}

/// Render a percentage with one decimal, as shown on the share charts.
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_comma_amounts() {
        assert_eq!(parse_decimal_comma("123,45").unwrap(), 123.45);
        assert_eq!(parse_decimal_comma(" 80 ").unwrap(), 80.0);
        assert_eq!(parse_decimal_comma("0,5").unwrap(), 0.5);
    }

    #[test]
    fn decimal_comma_rejects_thousands_and_garbage() {
        assert!(parse_decimal_comma("1.234,56").is_err());
        assert!(parse_decimal_comma("abc").is_err());
        assert!(parse_decimal_comma("").is_err());
        assert!(parse_decimal_comma("-3,00").is_err());
    }

    #[test]
    fn brl_cents_amounts() {
        assert_eq!(parse_brl_cents("R$ 1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_brl_cents("R$\u{a0}1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_brl_cents("R$ 0,50").unwrap(), 0.50);
        assert_eq!(parse_brl_cents("R$\u{a0}12.345.678,90").unwrap(), 12_345_678.90);
    }

    #[test]
    fn brl_cents_reads_digits_as_cents() {
        // No decimal comma: the digits are still cents.
        assert_eq!(parse_brl_cents("R$ 10").unwrap(), 0.10);
        assert_eq!(parse_brl_cents("1.500").unwrap(), 15.0);
    }

    #[test]
    fn brl_cents_rejects_residue() {
        assert!(parse_brl_cents("R$ 12a,00").is_err());
        assert!(parse_brl_cents("R$ ").is_err());
        assert!(parse_brl_cents("US$ 3,00").is_err());
        assert!(parse_brl_cents("-R$ 3,00").is_err());
    }

    #[test]
    fn formats_brazilian_locale() {
        assert_eq!(format_brl(1234.56, 2), "R$ 1.234,56");
        assert_eq!(format_brl(0.5, 2), "R$ 0,50");
        assert_eq!(format_brl(1_234_567.891, 0), "R$ 1.234.568");
        assert_eq!(format_brl(999.0, 2), "R$ 999,00");
        assert_eq!(format_brl(-42.1, 2), "-R$ 42,10");
        assert_eq!(format_brl(-0.001, 2), "R$ 0,00");
    }

    #[test]
    fn format_parse_round_trip() {
        let samples = [0.0, 0.01, 0.5, 9.99, 100.0, 1234.56, 1000.1, 98_765_432.1];
        for v in samples {
            let shown = format_brl(v, 2);
            let parsed = parse_brl_cents(&shown).unwrap();
            assert_eq!(format_brl(parsed, 2), shown, "round trip for {}", v);
        }
    }

    #[test]
    fn percent_one_decimal() {
        assert_eq!(format_percent(12.345), "12.3%");
        assert_eq!(format_percent(100.0), "100.0%");
    }
}
