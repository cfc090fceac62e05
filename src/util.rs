use log::warn;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;
use std::str::FromStr;

// 数值解析工具

// Decimal 最多 29 位整数、28 位小数
const MAX_INTEGER_DIGITS: i64 = 29;
const MAX_SCALE: i64 = 28;

/// Longest prefix of `s` that reads as a decimal number, after leading whitespace.
///
/// Mirrors how a browser's `parseFloat` tolerates trailing garbage: `"12.5%"` yields
/// `"12.5"`, `"abc"` yields nothing. An exponent is only consumed when digits follow it.
pub fn numeric_prefix(s: &str) -> Option<&str> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    Some(&s[..end])
}

/// Parse a lenient numeric string into an exact decimal.
///
/// Returns `None` for empty or non-numeric input and for values outside the range
/// `Decimal` can hold.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let prefix = numeric_prefix(s)?;

    let (sign, unsigned) = match prefix.as_bytes()[0] {
        b'-' => ("-", &prefix[1..]),
        b'+' => ("", &prefix[1..]),
        _ => ("", prefix),
    };

    let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
        Some(idx) => (&unsigned[..idx], Some(&unsigned[idx + 1..])),
        None => (unsigned, None),
    };

    // 把指数并入小数点位置，再交给 Decimal::from_str（溢出时返回 Err 而不是 panic）
    let (int_part, frac_part) = match mantissa.find('.') {
        Some(idx) => (&mantissa[..idx], &mantissa[idx + 1..]),
        None => (mantissa, ""),
    };
    let int_part = int_part.trim_start_matches('0');
    let digits = format!("{}{}", int_part, frac_part);
    if digits.bytes().all(|b| b == b'0') {
        return Some(Decimal::ZERO);
    }
    let shift = match exponent {
        Some(exp) => exp.parse::<i64>().unwrap_or(if exp.starts_with('-') { i64::MIN } else { i64::MAX }),
        None => 0,
    };
    let point = (int_part.len() as i64).saturating_add(shift);

    let literal = if point > MAX_INTEGER_DIGITS {
        None
    } else if point < -MAX_SCALE {
        Some("0".to_string())
    } else if point <= 0 {
        Some(format!("{}0.{}{}", sign, "0".repeat((-point) as usize), digits))
    } else if point as usize >= digits.len() {
        Some(format!("{}{}{}", sign, digits, "0".repeat(point as usize - digits.len())))
    } else {
        let (int_digits, frac_digits) = digits.split_at(point as usize);
        Some(format!("{}{}.{}", sign, int_digits, frac_digits))
    };

    match literal.map(|l| Decimal::from_str(&l)) {
        Some(Ok(value)) => Some(value),
        Some(Err(e)) => {
            warn!("Numeric value {:?} is out of range, treating it as missing: {}", prefix, e);
            None
        }
        None => {
            warn!("Numeric value {:?} is out of range, treating it as missing", prefix);
            None
        }
    }
}

fn round_2dp(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

/// Two decimal places, half away from zero. Missing values print as `0.00`.
pub fn format_fixed_2(value: Option<Decimal>) -> String {
    format!("{:.2}", round_2dp(value.unwrap_or(Decimal::ZERO)))
}

/// Currency string for a last price, e.g. `$150.01`.
pub fn format_price(value: Option<Decimal>) -> String {
    format!("${}", format_fixed_2(value))
}

// 排序工具

fn char_class(c: char) -> u8 {
    if c.is_whitespace() || c.is_ascii_punctuation() {
        0
    } else if c.is_numeric() {
        1
    } else if c.is_alphabetic() {
        2
    } else {
        3
    }
}

/// Locale-style comparison for ticker symbols.
///
/// Primary order ignores case and puts punctuation before digits before letters, so
/// `BRK.B` < `BRK1` < `BRKB` and `aapl` sits next to `AAPL`. Ties fall back to
/// lowercase-before-uppercase, then to plain code point order.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let primary = |s: &str| -> Vec<(u8, char)> {
        s.chars()
            .map(|c| (char_class(c), c.to_lowercase().next().unwrap_or(c)))
            .collect()
    };

    primary(a)
        .cmp(&primary(b))
        .then_with(|| {
            let case = |s: &str| -> Vec<bool> { s.chars().map(|c| c.is_uppercase()).collect() };
            case(a).cmp(&case(b))
        })
        .then_with(|| a.cmp(b))
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
