//! Cent rounding shared by every monetary figure in the reports.

/// Round to two decimal places, half away from zero.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Round each amount, sum, then round the sum.
pub fn round_and_sum<I>(amounts: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    round_to_cents(amounts.into_iter().map(round_to_cents).sum())
}

/// True when two amounts agree to the cent within `tolerance`.
pub fn amounts_equal(a: f64, b: f64, tolerance: f64) -> bool {
    (round_to_cents(a) - round_to_cents(b)).abs() <= tolerance + 1e-9
}

/// Percentage of `part` in `whole`; 0 when `whole` is not positive.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Parse a money cell as exported by banks: `$1,234.50`, `-12.00`, `(45.10)`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let negative = s.starts_with('(') && s.ends_with(')');
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '(' | ')' | ' '))
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value.abs() } else { value })
}

/// `$1,234.50`, `-$12.00`
pub fn format_usd(amount: f64) -> String {
    let cents = (round_to_cents(amount).abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_cents() {
        assert_eq!(round_to_cents(10.006), 10.01);
        assert_eq!(round_to_cents(-3.333), -3.33);
        assert_eq!(round_to_cents(0.1 + 0.2), 0.3);
    }

    #[test]
    fn test_round_and_sum() {
        assert_eq!(round_and_sum([0.1, 0.2, 0.3]), 0.6);
        assert_eq!(round_and_sum(Vec::<f64>::new()), 0.0);
    }

    #[test]
    fn test_amounts_equal() {
        assert!(amounts_equal(100.001, 100.0, 0.01));
        assert!(amounts_equal(100.01, 100.0, 0.01));
        assert!(!amounts_equal(100.05, 100.0, 0.01));
    }

    #[test]
    fn test_percent_of_zero_guard() {
        assert_eq!(percent_of(5.0, 0.0), 0.0);
        assert_eq!(percent_of(25.0, 200.0), 12.5);
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("$1,234.50"), Some(1234.5));
        assert_eq!(parse_amount("-12.00"), Some(-12.0));
        assert_eq!(parse_amount("(45.10)"), Some(-45.1));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(1234.5), "$1,234.50");
        assert_eq!(format_usd(-8702.0), "-$8,702.00");
        assert_eq!(format_usd(0.37), "$0.37");
        assert_eq!(format_usd(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_usd(-0.001), "$0.00");
    }
}
