//! Display formatting for token amounts and market magnitudes.
//!
//! Everything here is pure: invalid or missing input renders as [`PLACEHOLDER`]
//! instead of failing.

use ethers::types::{Sign, I256, U256};

/// Rendered in place of any value that could not be resolved.
pub const PLACEHOLDER: &str = "—";

const BILLION: f64 = 1e9;
const MILLION: f64 = 1e6;
const THOUSAND: f64 = 1e3;

/// Integer amount in token base units. The sign is kept apart from the
/// magnitude so balance deltas can be rendered with the same routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    pub magnitude: U256,
    pub negative: bool,
}

impl TokenAmount {
    pub fn negative(magnitude: U256) -> Self {
        Self {
            magnitude,
            negative: true,
        }
    }
}

impl From<U256> for TokenAmount {
    fn from(magnitude: U256) -> Self {
        Self {
            magnitude,
            negative: false,
        }
    }
}

impl From<I256> for TokenAmount {
    fn from(value: I256) -> Self {
        let (sign, magnitude) = value.into_sign_and_abs();
        Self {
            magnitude,
            negative: sign == Sign::Negative,
        }
    }
}

/// Splits `raw` by `10^decimals` into whole and fractional digits.
///
/// The fraction is zero-padded to `decimals` digits, truncated (never rounded)
/// to `precision` digits, then trailing zeros and a dangling decimal point are
/// removed. The split works on the decimal digit string, so no precision is
/// lost for any magnitude or any number of decimals.
pub fn format_token_amount(raw: Option<TokenAmount>, decimals: u32, precision: usize) -> String {
    let Some(amount) = raw else {
        return PLACEHOLDER.to_string();
    };

    let digits = amount.magnitude.to_string();
    let decimals = decimals as usize;
    let (whole, fraction) = if digits.len() > decimals {
        let (whole, fraction) = digits.split_at(digits.len() - decimals);
        (whole.to_string(), fraction.to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };

    let fraction: String = fraction.chars().take(precision).collect();
    let fraction = fraction.trim_end_matches('0');

    let mut out = String::with_capacity(whole.len() + fraction.len() + 2);
    if amount.negative {
        out.push('-');
    }
    out.push_str(&whole);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Native currency balance: three fractional digits from one whole unit up,
/// four below.
pub fn format_native_balance(wei: Option<U256>, decimals: u32) -> String {
    let Some(wei) = wei else {
        return PLACEHOLDER.to_string();
    };
    let one = U256::from(10u8).checked_pow(U256::from(decimals));
    let precision = match one {
        Some(one) if wei >= one => 3,
        _ => 4,
    };
    format_token_amount(Some(wei.into()), decimals, precision)
}

/// `$1.23B`, `$4.56M`, `$7.89K`, `$12.34`, `$0.000123`.
pub fn format_usd_magnitude(n: Option<f64>) -> String {
    match n {
        Some(n) if n.is_finite() => match scaled(n) {
            Some((value, suffix)) => format!("${:.2}{}", value, suffix),
            None if n >= 1.0 => format!("${:.2}", n),
            None => format!("${:.6}", n),
        },
        _ => PLACEHOLDER.to_string(),
    }
}

/// Like [`format_usd_magnitude`] without the currency sign; values under a
/// thousand are rounded to the nearest integer.
pub fn format_compact_magnitude(n: Option<f64>) -> String {
    match n {
        Some(n) if n.is_finite() => match scaled(n) {
            Some((value, suffix)) => format!("{:.2}{}", value, suffix),
            None => format!("{}", (n + 0.5).floor() as i64),
        },
        _ => PLACEHOLDER.to_string(),
    }
}

/// Parses a decimal string (the data source sends prices as strings) and
/// renders it as a USD magnitude.
pub fn format_usd_text(text: Option<&str>) -> String {
    format_usd_magnitude(text.and_then(|t| t.trim().parse::<f64>().ok()))
}

/// `+1.23%`, `-4.50%`, `0.00%`.
pub fn format_percent_change(change: Option<f64>) -> String {
    match change {
        Some(c) if c.is_finite() => {
            let sign = if c > 0.0 { "+" } else { "" };
            format!("{}{:.2}%", sign, c)
        }
        _ => PLACEHOLDER.to_string(),
    }
}

fn scaled(n: f64) -> Option<(f64, &'static str)> {
    if n >= BILLION {
        Some((n / BILLION, "B"))
    } else if n >= MILLION {
        Some((n / MILLION, "M"))
    } else if n >= THOUSAND {
        Some((n / THOUSAND, "K"))
    } else {
        None
    }
}

/// `0x1234…abcd` for anything at least ten characters long.
pub fn short_address(address: &str) -> String {
    abbreviate(address, 6, 4)
}

/// Keeps `head` leading and `tail` trailing characters around an ellipsis.
/// Strings too short to abbreviate are returned verbatim.
pub fn abbreviate(text: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < (head + tail).max(10) {
        return text.to_string();
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{}…{}", start, end)
}

/// Intermediate text while animating a displayed figure from `from` to `to`.
///
/// Uses an ease-out cubic curve over `progress` in `[0, 1]`; the target's
/// prefix, suffix and number of decimals (at most six) are kept. Non-numeric
/// targets are shown as-is.
pub fn tween_text(from: &str, to: &str, progress: f64) -> String {
    if !to.chars().any(|c| c.is_ascii_digit()) {
        return to.to_string();
    }
    let (Some(from_num), Some(to_num)) = (numeric_part(from), numeric_part(to)) else {
        return to.to_string();
    };

    let p = progress.clamp(0.0, 1.0);
    let eased = 1.0 - (1.0 - p).powi(3);
    let value = from_num + (to_num - from_num) * eased;

    // The sign belongs to the number, not the prefix.
    let mut prefix: String = to
        .chars()
        .take_while(|c| !c.is_ascii_digit() && *c != '-')
        .collect();
    if value < 0.0 && prefix.ends_with('+') {
        prefix.pop();
    }
    let suffix: String = {
        let mut rev: Vec<char> = to.chars().rev().take_while(|c| !c.is_ascii_digit()).collect();
        rev.reverse();
        rev.into_iter().collect()
    };
    let decimals = to
        .split_once('.')
        .map(|(_, frac)| frac.chars().take_while(|c| c.is_ascii_digit()).count())
        .unwrap_or(0)
        .min(6);

    format!("{}{:.*}{}", prefix, decimals, value, suffix)
}

fn numeric_part(text: &str) -> Option<f64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if kept.is_empty() {
        return Some(0.0);
    }
    kept.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(v: u128) -> Option<TokenAmount> {
        Some(U256::from(v).into())
    }

    #[test]
    fn test_token_amount_truncates_and_strips() {
        // 1.23456789 tokens with 18 decimals
        let raw = 1_234_567_890_000_000_000u128;
        assert_eq!(format_token_amount(amount(raw), 18, 4), "1.2345");
        assert_eq!(format_token_amount(amount(raw), 18, 0), "1");
        assert_eq!(format_token_amount(amount(1_500_000_000_000_000_000), 18, 4), "1.5");
        assert_eq!(format_token_amount(amount(2_000_000_000_000_000_000), 18, 4), "2");
    }

    #[test]
    fn test_token_amount_small_values() {
        assert_eq!(format_token_amount(amount(0), 18, 4), "0");
        assert_eq!(format_token_amount(amount(1), 18, 4), "0");
        assert_eq!(format_token_amount(amount(1), 18, 18), "0.000000000000000001");
        assert_eq!(format_token_amount(amount(42), 0, 4), "42");
    }

    #[test]
    fn test_token_amount_sign_and_placeholder() {
        let neg = TokenAmount::negative(U256::from(2_500_000u64));
        assert_eq!(format_token_amount(Some(neg), 6, 2), "-2.5");
        assert_eq!(format_token_amount(Some(I256::from(-3_000_000i64).into()), 6, 2), "-3");
        assert_eq!(format_token_amount(None, 18, 4), PLACEHOLDER);
    }

    #[test]
    fn test_token_amount_full_precision_reconstructs_value() {
        let values = [
            U256::zero(),
            U256::from(7u8),
            U256::from(10u64).pow(U256::from(18u8)),
            U256::from(123_456_789_012_345_678_901_234_567u128),
            U256::MAX,
        ];
        for value in values {
            for decimals in [0u32, 1, 6, 18, 30, 80] {
                let text = format_token_amount(Some(value.into()), decimals, decimals as usize);
                let (whole, frac) = text.split_once('.').unwrap_or((&text, ""));
                let padded = format!("{}{:0<width$}", whole, frac, width = decimals as usize);
                let rebuilt = U256::from_dec_str(padded.trim_start_matches('0'))
                    .unwrap_or_else(|_| U256::zero());
                assert_eq!(rebuilt, value, "decimals {decimals}: {text}");
            }
        }
    }

    #[test]
    fn test_usd_magnitude() {
        assert_eq!(format_usd_magnitude(Some(0.0)), "$0.000000");
        assert_eq!(format_usd_magnitude(Some(1_234_000.0)), "$1.23M");
        assert_eq!(format_usd_magnitude(Some(999.0)), "$999.00");
        assert_eq!(format_usd_magnitude(Some(2_500_000_000.0)), "$2.50B");
        assert_eq!(format_usd_magnitude(Some(1_500.0)), "$1.50K");
        assert_eq!(format_usd_magnitude(Some(0.000123)), "$0.000123");
        assert_eq!(format_usd_magnitude(Some(f64::NAN)), PLACEHOLDER);
        assert_eq!(format_usd_magnitude(None), PLACEHOLDER);
    }

    #[test]
    fn test_compact_magnitude() {
        assert_eq!(format_compact_magnitude(Some(999.4)), "999");
        assert_eq!(format_compact_magnitude(Some(12.5)), "13");
        assert_eq!(format_compact_magnitude(Some(1_200.0)), "1.20K");
        assert_eq!(format_compact_magnitude(Some(3_000_000.0)), "3.00M");
        assert_eq!(format_compact_magnitude(None), PLACEHOLDER);
    }

    #[test]
    fn test_usd_text_and_percent() {
        assert_eq!(format_usd_text(Some("0.00042")), "$0.000420");
        assert_eq!(format_usd_text(Some("n/a")), PLACEHOLDER);
        assert_eq!(format_percent_change(Some(1.234)), "+1.23%");
        assert_eq!(format_percent_change(Some(-4.5)), "-4.50%");
        assert_eq!(format_percent_change(Some(0.0)), "0.00%");
        assert_eq!(format_percent_change(None), PLACEHOLDER);
    }

    #[test]
    fn test_native_balance_precision() {
        let one_and_bit = U256::from(1_234_567_000_000_000_000u128);
        assert_eq!(format_native_balance(Some(one_and_bit), 18), "1.234");
        let fraction = U256::from(123_456_000_000_000_000u128);
        assert_eq!(format_native_balance(Some(fraction), 18), "0.1234");
        assert_eq!(format_native_balance(None, 18), PLACEHOLDER);
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("0x1234567890123456789012345678901234567890"),
            "0x1234…7890"
        );
        assert_eq!(short_address("0x12345678"), "0x1234…5678");
        assert_eq!(short_address("0x1234"), "0x1234");
        assert_eq!(short_address(""), "");
    }

    #[test]
    fn test_tween_text() {
        assert_eq!(tween_text("$1.00M", "$2.00M", 1.0), "$2.00M");
        assert_eq!(tween_text("$1.00M", "$2.00M", 0.0), "$1.00M");
        // 1 - (0.5)^3 = 0.875 of the way
        assert_eq!(tween_text("$0.00", "$8.00", 0.5), "$7.00");
        assert_eq!(tween_text("$1.00", PLACEHOLDER, 0.5), PLACEHOLDER);
        assert_eq!(tween_text("+1.00%", "-4.50%", 1.0), "-4.50%");
        assert_eq!(tween_text("$0.00", "$-8.00", 0.5), "$-7.00");
        assert_eq!(tween_text("-2.00%", "+1.00%", 0.0), "-2.00%");
        assert_eq!(tween_text("-2.00%", "+1.00%", 1.0), "+1.00%");
    }
}
