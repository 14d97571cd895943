//! 256-bit signed integer used as the native value of `decimal256`.

use std::{cmp::Ordering, fmt};

use bytemuck::{Pod, Zeroable};

/// A little-endian two's complement 256-bit signed integer.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct i256 {
    low: u128,
    high: i128,
}

impl i256 {
    pub const ZERO: i256 = i256 { low: 0, high: 0 };
    pub const ONE: i256 = i256 { low: 1, high: 0 };
    pub const MAX: i256 = i256 {
        low: u128::MAX,
        high: i128::MAX,
    };
    pub const MIN: i256 = i256 {
        low: 0,
        high: i128::MIN,
    };

    pub const fn from_parts(low: u128, high: i128) -> i256 {
        i256 { low, high }
    }

    pub const fn to_parts(self) -> (u128, i128) {
        (self.low, self.high)
    }

    pub const fn from_i128(v: i128) -> i256 {
        i256 {
            low: v as u128,
            high: if v < 0 { -1 } else { 0 },
        }
    }

    /// Returns the value as `i128` when it fits.
    pub fn to_i128(self) -> Option<i128> {
        let low = self.low as i128;
        let sign_ext = if low < 0 { -1 } else { 0 };
        (self.high == sign_ext).then_some(low)
    }

    pub fn is_negative(self) -> bool {
        self.high < 0
    }

    pub fn wrapping_neg(self) -> i256 {
        let (low, high) = (!self.low, !self.high);
        let (low, carry) = low.overflowing_add(1);
        i256 {
            low,
            high: high.wrapping_add(carry as i128),
        }
    }

    pub fn checked_neg(self) -> Option<i256> {
        (self != i256::MIN).then(|| self.wrapping_neg())
    }

    pub fn checked_add(self, other: i256) -> Option<i256> {
        let (low, carry) = self.low.overflowing_add(other.low);
        let (high, o1) = self.high.overflowing_add(other.high);
        let (high, o2) = high.overflowing_add(carry as i128);
        (!(o1 ^ o2)).then_some(i256 { low, high })
    }

    pub fn checked_sub(self, other: i256) -> Option<i256> {
        self.checked_add(other.checked_neg()?)
    }

    /// Multiplies by a small unsigned factor, `None` on overflow.
    pub fn checked_mul_small(self, factor: u64) -> Option<i256> {
        let negative = self.is_negative();
        let magnitude = if negative { self.checked_neg()? } else { self };
        let mut limbs = magnitude.to_limbs();
        let mut carry = 0u128;
        for limb in limbs.iter_mut() {
            let product = (*limb as u128) * (factor as u128) + carry;
            *limb = product as u64;
            carry = product >> 64;
        }
        if carry != 0 {
            return None;
        }
        let result = i256::from_limbs(limbs);
        if result.is_negative() {
            return None;
        }
        Some(if negative { result.wrapping_neg() } else { result })
    }

    /// Multiplies by `10^exp`, `None` on overflow.
    pub fn checked_mul_pow10(self, exp: u32) -> Option<i256> {
        let mut v = self;
        let mut remaining = exp;
        while remaining > 0 {
            let step = remaining.min(19);
            v = v.checked_mul_small(10u64.pow(step))?;
            remaining -= step;
        }
        Some(v)
    }

    /// Divides the magnitude by a small divisor, returning quotient and
    /// remainder of the magnitude (truncating towards zero).
    fn div_rem_small_magnitude(self, divisor: u64) -> (i256, u64) {
        let mut limbs = self.to_limbs();
        let mut rem = 0u128;
        for limb in limbs.iter_mut().rev() {
            let cur = (rem << 64) | (*limb as u128);
            *limb = (cur / divisor as u128) as u64;
            rem = cur % divisor as u128;
        }
        (i256::from_limbs(limbs), rem as u64)
    }

    fn to_limbs(self) -> [u64; 4] {
        let high = self.high as u128;
        [
            self.low as u64,
            (self.low >> 64) as u64,
            high as u64,
            (high >> 64) as u64,
        ]
    }

    fn from_limbs(limbs: [u64; 4]) -> i256 {
        i256 {
            low: (limbs[0] as u128) | ((limbs[1] as u128) << 64),
            high: ((limbs[2] as u128) | ((limbs[3] as u128) << 64)) as i128,
        }
    }

    /// Number of decimal digits in the absolute value (at least 1).
    pub fn decimal_digits(self) -> usize {
        let s = self.to_string();
        s.trim_start_matches('-').len()
    }

    /// Parses an optionally signed base-10 integer.
    pub fn from_decimal_str(s: &str) -> Option<i256> {
        let (negative, digits) = match s.as_bytes().first()? {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mut v = i256::ZERO;
        for b in digits.bytes() {
            v = v
                .checked_mul_small(10)?
                .checked_add(i256::from_i128((b - b'0') as i128))?;
        }
        if negative { v.checked_neg() } else { Some(v) }
    }
}

impl PartialOrd for i256 {
    fn partial_cmp(&self, other: &i256) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for i256 {
    fn cmp(&self, other: &i256) -> Ordering {
        self.high
            .cmp(&other.high)
            .then_with(|| self.low.cmp(&other.low))
    }
}

impl From<i128> for i256 {
    fn from(v: i128) -> i256 {
        i256::from_i128(v)
    }
}

impl From<i64> for i256 {
    fn from(v: i64) -> i256 {
        i256::from_i128(v as i128)
    }
}

impl fmt::Display for i256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const CHUNK: u64 = 10_000_000_000_000_000_000;
        if let Some(v) = self.to_i128() {
            return write!(f, "{v}");
        }
        // The magnitude of MIN is not representable; its limbs read as the
        // unsigned value 2^255, which is exactly the magnitude.
        let mut magnitude = if self.is_negative() {
            self.wrapping_neg()
        } else {
            *self
        };
        let mut chunks = Vec::new();
        while magnitude != i256::ZERO {
            let (q, r) = magnitude.div_rem_small_magnitude(CHUNK);
            chunks.push(r);
            magnitude = q;
        }
        let mut out = String::new();
        if self.is_negative() {
            out.push('-');
        }
        let mut iter = chunks.iter().rev();
        if let Some(first) = iter.next() {
            out.push_str(&first.to_string());
        }
        for chunk in iter {
            out.push_str(&format!("{chunk:019}"));
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values() {
        assert_eq!(i256::from_i128(-42).to_string(), "-42");
        assert_eq!(i256::ZERO.to_string(), "0");
        assert_eq!(i256::from_i128(-42).to_i128(), Some(-42));
        assert!(i256::from_i128(-1) < i256::ZERO);
        assert!(i256::from_i128(i128::MAX) < i256::from_parts(0, 1));
    }

    #[test]
    fn test_large_display_and_parse() {
        let s = "123456789012345678901234567890123456789012345678901234567890";
        let v = i256::from_decimal_str(s).unwrap();
        assert_eq!(v.to_string(), s);
        assert_eq!(v.to_i128(), None);
        let neg = i256::from_decimal_str(&format!("-{s}")).unwrap();
        assert_eq!(neg.to_string(), format!("-{s}"));
        assert_eq!(neg.checked_add(v), Some(i256::ZERO));
    }

    #[test]
    fn test_extremes() {
        assert_eq!(
            i256::MAX.to_string(),
            "57896044618658097711785492504343953926634992332820282019728792003956564819967"
        );
        assert_eq!(
            i256::MIN.to_string(),
            "-57896044618658097711785492504343953926634992332820282019728792003956564819968"
        );
        assert_eq!(i256::MAX.checked_add(i256::ONE), None);
        assert_eq!(i256::MIN.checked_neg(), None);
        assert_eq!(i256::MAX.checked_mul_small(2), None);
    }

    #[test]
    fn test_mul_pow10() {
        let v = i256::from_i128(-7).checked_mul_pow10(40).unwrap();
        assert_eq!(v.to_string(), format!("-7{}", "0".repeat(40)));
        assert_eq!(v.decimal_digits(), 41);
    }
}
