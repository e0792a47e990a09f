//! Exact base-10 fixed-point numbers.
//!
//! An [`ExactDecimal`] is `mantissa * 10^exponent` with an arbitrary-size
//! integer mantissa. Every constructor and operation leaves the value
//! normalized: the exponent is never positive and the mantissa carries no
//! trailing zeros that the exponent could absorb. Zero is always `0 * 10^0`.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Exact decimal value `mantissa * 10^exponent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExactDecimal {
    mantissa: BigInt,
    exponent: i32,
}

fn pow10(n: u32) -> BigInt {
    BigInt::from(10u32).pow(n)
}

impl ExactDecimal {
    /// Create a normalized decimal from a mantissa and a base-10 exponent.
    pub fn new(mantissa: impl Into<BigInt>, exponent: i32) -> Self {
        let mut value = Self {
            mantissa: mantissa.into(),
            exponent,
        };
        value.optimize();
        value
    }

    /// The value zero.
    pub fn zero() -> Self {
        Self {
            mantissa: BigInt::from(0),
            exponent: 0,
        }
    }

    /// Create an integral decimal.
    pub fn from_i64(value: i64) -> Self {
        Self::new(value, 0)
    }

    /// Mantissa of the normalized value.
    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    /// Exponent of the normalized value (never positive).
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Number of fractional digits.
    pub fn scale(&self) -> u32 {
        self.exponent.unsigned_abs()
    }

    /// Check if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.mantissa.sign() == Sign::NoSign
    }

    /// Check if this value has no fractional part.
    pub fn is_integer(&self) -> bool {
        self.exponent == 0
    }

    /// -1, 0 or 1 according to the sign of the value.
    pub fn signum(&self) -> i32 {
        match self.mantissa.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        if self.signum() < 0 {
            -self
        } else {
            self.clone()
        }
    }

    /// Restore the normalization invariant.
    ///
    /// A positive exponent is folded into the mantissa, then trailing zeros
    /// are stripped while the exponent is negative.
    pub fn optimize(&mut self) {
        if self.is_zero() {
            self.exponent = 0;
            return;
        }
        if self.exponent > 0 {
            self.mantissa *= pow10(self.exponent.unsigned_abs());
            self.exponent = 0;
        }
        let ten = BigInt::from(10u32);
        let zero = BigInt::from(0u32);
        while self.exponent < 0 && &self.mantissa % &ten == zero {
            self.mantissa /= &ten;
            self.exponent += 1;
        }
    }

    /// Mantissa rescaled to `exponent`, which must not exceed ours.
    fn mantissa_at(&self, exponent: i32) -> BigInt {
        // Both exponents lie in i32::MIN..=0, so the gap fits in u32.
        let gap = (i64::from(self.exponent) - i64::from(exponent)) as u32;
        &self.mantissa * pow10(gap)
    }

    /// Multiply exactly.
    ///
    /// Fails with `ArithmeticDomain` when the product's exponent leaves the
    /// `i32` range.
    pub fn checked_mul(&self, rhs: &Self) -> Result<Self, Error> {
        let exponent = self.exponent.checked_add(rhs.exponent).ok_or_else(|| {
            Error::ArithmeticDomain(format!(
                "product exponent {} + {} out of range",
                self.exponent, rhs.exponent
            ))
        })?;
        Ok(Self::new(&self.mantissa * &rhs.mantissa, exponent))
    }

    /// Divide by `divisor`, keeping `digits` fractional digits.
    ///
    /// The quotient is truncated toward zero. When `digits` is `None` the
    /// dividend's current scale is kept.
    pub fn div(&self, divisor: &Self, digits: Option<u32>) -> Result<Self, Error> {
        if divisor.is_zero() {
            return Err(Error::ArithmeticDomain(format!(
                "division of {self} by zero"
            )));
        }
        let digits = digits.unwrap_or_else(|| self.scale());
        let shift =
            i64::from(self.exponent) - i64::from(divisor.exponent) + i64::from(digits);
        let (numerator, denominator) = if shift >= 0 {
            (
                &self.mantissa * pow10(u32::try_from(shift).unwrap_or(u32::MAX)),
                divisor.mantissa.clone(),
            )
        } else {
            (
                self.mantissa.clone(),
                &divisor.mantissa * pow10(u32::try_from(-shift).unwrap_or(u32::MAX)),
            )
        };
        let exponent = i32::try_from(digits)
            .map(|d| -d)
            .map_err(|_| Error::ArithmeticDomain(format!("scale {digits} out of range")))?;
        // BigInt division truncates toward zero.
        Ok(Self::new(numerator / denominator, exponent))
    }

    /// Drop fractional digits beyond `digits`, truncating toward zero.
    pub fn truncate(&self, digits: u32) -> Self {
        if self.scale() <= digits {
            return self.clone();
        }
        let dropped = self.scale() - digits;
        Self::new(&self.mantissa / pow10(dropped), -(digits as i32))
    }

    /// Render with exactly `digits` fractional digits, truncating extra ones.
    pub fn to_fixed_string(&self, digits: u32) -> String {
        let truncated = self.truncate(digits);
        let mantissa = truncated.mantissa_at(-(digits as i32));
        render(&mantissa, digits as usize)
    }

    /// Convert an integral value to `i64`.
    pub fn to_i64(&self) -> Option<i64> {
        if !self.is_integer() {
            return None;
        }
        i64::try_from(&self.mantissa).ok()
    }
}

fn render(mantissa: &BigInt, scale: usize) -> String {
    let mut digits = mantissa.magnitude().to_string();
    let sign = if mantissa.sign() == Sign::Minus { "-" } else { "" };
    if scale == 0 {
        return format!("{sign}{digits}");
    }
    if digits.len() <= scale {
        digits = format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits);
    }
    let (int_part, frac_part) = digits.split_at(digits.len() - scale);
    format!("{sign}{int_part}.{frac_part}")
}

impl fmt::Display for ExactDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.mantissa, self.scale() as usize))
    }
}

impl FromStr for ExactDecimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidDecimal(s.to_string());
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (unsigned, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }
        let digits = format!("{int_part}{frac_part}");
        let mut mantissa = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;
        if negative {
            mantissa = -mantissa;
        }
        let exponent = i32::try_from(frac_part.len()).map_err(|_| invalid())?;
        Ok(Self::new(mantissa, -exponent))
    }
}

impl Ord for ExactDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self - other).mantissa.sign() {
            Sign::Minus => Ordering::Less,
            Sign::NoSign => Ordering::Equal,
            Sign::Plus => Ordering::Greater,
        }
    }
}

impl PartialOrd for ExactDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for &ExactDecimal {
    type Output = ExactDecimal;

    fn add(self, rhs: Self) -> ExactDecimal {
        let exponent = self.exponent.min(rhs.exponent);
        ExactDecimal::new(self.mantissa_at(exponent) + rhs.mantissa_at(exponent), exponent)
    }
}

impl Sub for &ExactDecimal {
    type Output = ExactDecimal;

    fn sub(self, rhs: Self) -> ExactDecimal {
        let exponent = self.exponent.min(rhs.exponent);
        ExactDecimal::new(self.mantissa_at(exponent) - rhs.mantissa_at(exponent), exponent)
    }
}

impl Neg for &ExactDecimal {
    type Output = ExactDecimal;

    fn neg(self) -> ExactDecimal {
        ExactDecimal {
            mantissa: -&self.mantissa,
            exponent: self.exponent,
        }
    }
}

impl Add for ExactDecimal {
    type Output = ExactDecimal;

    fn add(self, rhs: Self) -> ExactDecimal {
        &self + &rhs
    }
}

impl Sub for ExactDecimal {
    type Output = ExactDecimal;

    fn sub(self, rhs: Self) -> ExactDecimal {
        &self - &rhs
    }
}

impl Neg for ExactDecimal {
    type Output = ExactDecimal;

    fn neg(self) -> ExactDecimal {
        -&self
    }
}

impl Default for ExactDecimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<i64> for ExactDecimal {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl From<i32> for ExactDecimal {
    fn from(value: i32) -> Self {
        Self::from_i64(i64::from(value))
    }
}

impl Serialize for ExactDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExactDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> ExactDecimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_canonical_form() {
        assert_eq!(dec("1.50").to_string(), "1.5");
        assert_eq!(dec("0.00").to_string(), "0");
        assert_eq!(dec("-0.00").to_string(), "0");
        assert_eq!(dec("007.250").to_string(), "7.25");
        assert_eq!(dec("+12").to_string(), "12");
        assert_eq!(dec(".5").to_string(), "0.5");
        assert_eq!(dec("-.05").to_string(), "-0.05");
        assert_eq!(dec("100").to_string(), "100");
        assert_eq!(dec("123456789012345678901234567890.000001").to_string(),
            "123456789012345678901234567890.000001");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", ".", "-", "1.2.3", "1e5", "abc", "1,5", "--1"] {
            assert!(input.parse::<ExactDecimal>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_normalization() {
        let value = ExactDecimal::new(1200, -2);
        assert_eq!(value.mantissa(), &BigInt::from(12));
        assert_eq!(value.exponent(), 0);

        let value = ExactDecimal::new(15, 2);
        assert_eq!(value.mantissa(), &BigInt::from(1500));
        assert_eq!(value.exponent(), 0);

        let value = ExactDecimal::new(0, -7);
        assert_eq!(value, ExactDecimal::zero());
        assert_eq!(value.exponent(), 0);
    }

    #[test]
    fn test_add_sub_rescale() {
        assert_eq!((dec("0.1") + dec("0.2")).to_string(), "0.3");
        assert_eq!((dec("1.25") - dec("0.25")).to_string(), "1");
        assert_eq!((dec("10") - dec("0.001")).to_string(), "9.999");
        assert_eq!((dec("-1.5") + dec("1.5")).to_string(), "0");
    }

    #[test]
    fn test_mult() {
        let mul = |a: &str, b: &str| dec(a).checked_mul(&dec(b)).unwrap().to_string();
        assert_eq!(mul("1.5", "2"), "3");
        assert_eq!(mul("0.1", "0.1"), "0.01");
        assert_eq!(mul("-2.5", "4.02"), "-10.05");
    }

    #[test]
    fn test_mult_exponent_overflow() {
        let tiny = ExactDecimal::new(1, i32::MIN + 1);
        assert!(matches!(
            tiny.checked_mul(&tiny),
            Err(Error::ArithmeticDomain(_))
        ));
        assert_eq!(tiny.checked_mul(&dec("10")).unwrap(), ExactDecimal::new(1, i32::MIN + 2));
    }

    #[test]
    fn test_div_truncates_toward_zero() {
        assert_eq!(dec("10").div(&dec("3"), Some(4)).unwrap().to_string(), "3.3333");
        assert_eq!(dec("-10").div(&dec("3"), Some(2)).unwrap().to_string(), "-3.33");
        assert_eq!(dec("2").div(&dec("3"), Some(0)).unwrap().to_string(), "0");
        assert_eq!(dec("1").div(&dec("0.3"), Some(3)).unwrap().to_string(), "3.333");
        assert_eq!(dec("7.5").div(&dec("2.5"), Some(5)).unwrap().to_string(), "3");
    }

    #[test]
    fn test_div_default_digits_uses_dividend_scale() {
        let quotient = dec("10.00").div(&dec("3"), None).unwrap();
        // "10.00" normalizes to scale 0.
        assert_eq!(quotient.to_string(), "3");

        let quotient = dec("1.25").div(&dec("3"), None).unwrap();
        assert_eq!(quotient.to_string(), "0.41");
    }

    #[test]
    fn test_div_by_zero() {
        let err = dec("1").div(&dec("0.000"), Some(2)).unwrap_err();
        assert!(matches!(err, Error::ArithmeticDomain(_)));
    }

    #[test]
    fn test_compare() {
        assert!(dec("1.10") == dec("1.1"));
        assert!(dec("1.01") > dec("1.001"));
        assert!(dec("-2") < dec("-1.999"));
        assert_eq!(dec("3").cmp(&dec("3.000")), Ordering::Equal);
    }

    #[test]
    fn test_truncate_and_fixed_rendering() {
        assert_eq!(dec("1.999").truncate(2).to_string(), "1.99");
        assert_eq!(dec("-1.999").truncate(0).to_string(), "-1");
        assert_eq!(dec("1.5").to_fixed_string(2), "1.50");
        assert_eq!(dec("-0.05").to_fixed_string(3), "-0.050");
        assert_eq!(dec("12.345").to_fixed_string(0), "12");
    }

    #[test]
    fn test_to_i64() {
        assert_eq!(dec("42").to_i64(), Some(42));
        assert_eq!(dec("4.2").to_i64(), None);
        assert_eq!(dec("99999999999999999999").to_i64(), None);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&dec("12.50")).unwrap();
        assert_eq!(json, "\"12.5\"");
        let back: ExactDecimal = serde_json::from_str("\"-0.010\"").unwrap();
        assert_eq!(back, dec("-0.01"));
    }

    fn arb_decimal() -> impl Strategy<Value = ExactDecimal> {
        (any::<i64>(), -12i32..=4).prop_map(|(m, e)| ExactDecimal::new(m, e))
    }

    proptest! {
        #[test]
        fn add_is_commutative_and_associative(
            a in arb_decimal(), b in arb_decimal(), c in arb_decimal()
        ) {
            prop_assert_eq!(&a + &b, &b + &a);
            prop_assert_eq!(&(&a + &b) + &c, &a + &(&b + &c));
        }

        #[test]
        fn mult_is_commutative_and_associative(
            a in arb_decimal(), b in arb_decimal(), c in arb_decimal()
        ) {
            let ab = a.checked_mul(&b).unwrap();
            prop_assert_eq!(&ab, &b.checked_mul(&a).unwrap());
            prop_assert_eq!(
                ab.checked_mul(&c).unwrap(),
                a.checked_mul(&b.checked_mul(&c).unwrap()).unwrap()
            );
        }

        #[test]
        fn sub_inverts_add(a in arb_decimal(), b in arb_decimal()) {
            prop_assert_eq!(&(&a + &b) - &b, a);
        }

        #[test]
        fn display_parse_roundtrip(a in arb_decimal()) {
            let parsed: ExactDecimal = a.to_string().parse().unwrap();
            prop_assert_eq!(parsed, a);
        }

        #[test]
        fn div_keeps_requested_digits(
            a in arb_decimal(), b in arb_decimal(), digits in 0u32..8
        ) {
            prop_assume!(!b.is_zero());
            let quotient = a.div(&b, Some(digits)).unwrap();
            prop_assert!(quotient.scale() <= digits);
            // |q * b| never exceeds |a| when truncating toward zero.
            prop_assert!(quotient.checked_mul(&b).unwrap().abs() <= a.abs());
        }
    }
}
