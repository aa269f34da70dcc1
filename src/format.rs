use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places used for amounts, prices and totals in reports.
pub const REPORT_DECIMALS: u32 = 6;

/// Marker rendered in place of a price that could not be fetched.
pub const NOT_AVAILABLE: &str = "N/A";

fn pad_fraction_to_dp(s: &str, dp: u32) -> String {
    if dp == 0 {
        return s
            .split_once('.')
            .map(|(i, _)| i.to_string())
            .unwrap_or_else(|| s.to_string());
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };

    let mut out = String::with_capacity(int_part.len() + 1 + dp as usize);
    out.push_str(int_part);
    out.push('.');

    let mut written = 0usize;
    for ch in frac_part.chars().take(dp as usize) {
        out.push(ch);
        written += 1;
    }
    while written < dp as usize {
        out.push('0');
        written += 1;
    }

    out
}

/// Format `value` with exactly `dp` decimal places.
///
/// The value is rounded half away from zero first, so `1.0000005` at six
/// places becomes `1.000001`.
pub fn format_fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    // Avoid rendering "-0.000000" for tiny negatives that round to zero.
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    pad_fraction_to_dp(&rounded.normalize().to_string(), dp)
}

/// Format a report figure (six decimal places).
pub fn format_report_value(value: Decimal) -> String {
    format_fixed(value, REPORT_DECIMALS)
}

/// Format an optional price, falling back to [`NOT_AVAILABLE`].
pub fn format_report_price(price: Option<Decimal>) -> String {
    match price {
        Some(price) => format_report_value(price),
        None => NOT_AVAILABLE.to_string(),
    }
}
