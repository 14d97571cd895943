//! Text conversion of scaled decimal values.

use quiver_common::{Result, error::Error};

use crate::bigint::i256;

/// Formats an unscaled integer (given as its base-10 text) with `scale`
/// fractional digits. Negative scales append zeros.
///
/// ```
/// use quiver_format::decimal::format_decimal_str;
///
/// assert_eq!(format_decimal_str("12345", 2), "123.45");
/// assert_eq!(format_decimal_str("-5", 3), "-0.005");
/// assert_eq!(format_decimal_str("7", -2), "700");
/// assert_eq!(format_decimal_str("7", 0), "7");
/// ```
pub fn format_decimal_str(unscaled: &str, scale: i8) -> String {
    let (sign, digits) = match unscaled.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", unscaled),
    };
    if scale <= 0 {
        let zeros = "0".repeat((-(scale as i32)) as usize);
        return if digits == "0" {
            "0".to_string()
        } else {
            format!("{sign}{digits}{zeros}")
        };
    }
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{digits}", "0".repeat(scale + 1 - digits.len()))
    } else {
        digits.to_string()
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{sign}{int_part}.{frac_part}")
}

/// Formats a 256-bit unscaled decimal value.
pub fn format_decimal(value: i256, scale: i8) -> String {
    format_decimal_str(&value.to_string(), scale)
}

/// Parses decimal text into its unscaled value for the given precision and
/// scale.
///
/// Accepts an optional sign, digits, an optional fractional part and an
/// optional exponent (`1.5e3`). Extra fractional digits are rounded half
/// away from zero. The result must fit in `precision` digits.
pub fn parse_decimal(s: &str, precision: u8, scale: i8) -> Result<i256> {
    let err = |msg: &str| Error::parse(s, format!("decimal({precision}, {scale})"), msg);
    let text = s.trim();
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        Some(_) => (false, text),
        None => return Err(err("empty input")),
    };
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => {
            let exp = body[pos + 1..]
                .parse::<i32>()
                .map_err(|_| err("invalid exponent"))?;
            (&body[..pos], exp)
        }
        None => (body, 0),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(err("no digits"));
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(err("invalid digit"));
    }

    // All digits as one integer, with the decimal point `shift` places from the right.
    let mut digits = format!("{int_part}{frac_part}");
    let shift = frac_part.len() as i32 - exponent;
    let target = scale as i32;

    let mut round_up = false;
    if shift > target {
        let drop = (shift - target) as usize;
        if drop >= digits.len() {
            round_up = drop == digits.len() && digits.as_bytes()[0] >= b'5';
            digits = "0".to_string();
        } else {
            let cut = digits.len() - drop;
            round_up = digits.as_bytes()[cut] >= b'5';
            digits.truncate(cut);
        }
    } else if shift < target {
        digits.push_str(&"0".repeat((target - shift) as usize));
    }

    let mut value = i256::from_decimal_str(if digits.is_empty() { "0" } else { &digits })
        .ok_or_else(|| err("value out of range"))?;
    if round_up {
        value = value
            .checked_add(i256::ONE)
            .ok_or_else(|| err("value out of range"))?;
    }
    if value != i256::ZERO && value.decimal_digits() > precision as usize {
        return Err(err("value exceeds precision"));
    }
    if negative {
        value = value.checked_neg().ok_or_else(|| err("value out of range"))?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str, p: u8, scale: i8) -> String {
        parse_decimal(s, p, scale).unwrap().to_string()
    }

    #[test]
    fn test_format() {
        assert_eq!(format_decimal(i256::from_i128(100), 2), "1.00");
        assert_eq!(format_decimal(i256::from_i128(-123), 1), "-12.3");
        assert_eq!(format_decimal(i256::ZERO, 2), "0.00");
    }

    #[test]
    fn test_parse_basic() {
        assert_eq!(parse("1.23", 10, 2), "123");
        assert_eq!(parse("-1.2", 10, 2), "-120");
        assert_eq!(parse("42", 10, 0), "42");
        assert_eq!(parse(".5", 10, 1), "5");
        assert_eq!(parse("1.5e2", 10, 0), "150");
        assert_eq!(parse("1200", 10, -2), "12");
    }

    #[test]
    fn test_parse_rounding() {
        assert_eq!(parse("1.235", 10, 2), "124");
        assert_eq!(parse("1.234", 10, 2), "123");
        assert_eq!(parse("-1.235", 10, 2), "-124");
        assert_eq!(parse("0.006", 10, 2), "1");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_decimal("", 10, 2).is_err());
        assert!(parse_decimal("abc", 10, 2).is_err());
        assert!(parse_decimal("1.2.3", 10, 2).is_err());
        assert!(parse_decimal("12345", 4, 0).is_err());
        assert!(parse_decimal("1e", 4, 0).is_err());
    }
}
