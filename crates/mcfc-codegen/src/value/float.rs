//! Decimal floating-point values.
//!
//! A float is stored as a compound `{m:<int>,e:<int>,s:<byte>}` holding an
//! eight-digit mantissa, a decimal exponent and a sign. The number is
//! `m × 10^(e−7)`, negated when `s` is `1b`.

use std::fmt;
use thiserror::Error;

pub const MANTISSA_DIGITS: usize = 8;
pub const MIN_MANTISSA: u32 = 10_000_000;
pub const MAX_EXPONENT: i32 = 127;
pub const MIN_EXPONENT: i32 = -128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FloatError {
    #[error("'{0}' is not a decimal number")]
    Syntax(String),
    #[error("'{0}' is too large for a decimal float")]
    Overflow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DecimalFloat {
    mantissa: u32,
    exponent: i32,
    negative: bool,
}

impl DecimalFloat {
    pub const ZERO: DecimalFloat = DecimalFloat {
        mantissa: 0,
        exponent: 0,
        negative: false,
    };

    pub fn mantissa(&self) -> u32 {
        self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    /// Parse a decimal literal such as `3.25`, `-0.001` or `1e-128`.
    ///
    /// Rounds half-up to eight significant digits. Magnitudes below the
    /// smallest exponent become zero.
    pub fn parse(text: &str) -> Result<Self, FloatError> {
        let syntax = || FloatError::Syntax(text.to_string());
        let trimmed = text.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (number, exp10) = match body.find(&['e', 'E'][..]) {
            Some(at) => {
                let exp: i64 = body[at + 1..].parse().map_err(|_| syntax())?;
                (&body[..at], exp)
            }
            None => (body, 0),
        };
        let (int_part, frac_part) = match number.split_once('.') {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(syntax());
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(syntax());
        }

        let all: Vec<u8> = int_part
            .bytes()
            .chain(frac_part.bytes())
            .map(|b| b - b'0')
            .collect();
        let Some(first) = all.iter().position(|&d| d != 0) else {
            return Ok(Self::ZERO);
        };
        let digits = &all[first..];
        // value = d1.d2d3... × 10^exponent
        let overflow = || FloatError::Overflow(text.to_string());
        let Some(mut exponent) = (int_part.len() as i64 - first as i64 - 1).checked_add(exp10)
        else {
            return if exp10 < 0 { Ok(Self::ZERO) } else { Err(overflow()) };
        };

        let mut mantissa: u64 = 0;
        for i in 0..MANTISSA_DIGITS {
            mantissa = mantissa * 10 + u64::from(digits.get(i).copied().unwrap_or(0));
        }
        if digits.get(MANTISSA_DIGITS).is_some_and(|&d| d >= 5) {
            mantissa += 1;
            if mantissa == 10 * u64::from(MIN_MANTISSA) {
                mantissa = u64::from(MIN_MANTISSA);
                exponent = exponent.checked_add(1).ok_or_else(overflow)?;
            }
        }

        if exponent > i64::from(MAX_EXPONENT) {
            return Err(overflow());
        }
        if exponent < i64::from(MIN_EXPONENT) {
            return Ok(Self::ZERO);
        }
        Ok(Self {
            mantissa: mantissa as u32,
            exponent: exponent as i32,
            negative,
        })
    }

    pub fn from_i32(value: i32) -> Self {
        Self::parse(&value.to_string()).unwrap_or_default()
    }

    pub fn to_f64(&self) -> f64 {
        let magnitude = f64::from(self.mantissa) * 10f64.powi(self.exponent - 7);
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Plain notation for exponents in `-7..=20`, scientific otherwise.
    pub fn to_literal(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let full = self.mantissa.to_string();
        let digits = full.trim_end_matches('0');
        let sign = if self.negative { "-" } else { "" };
        let e = self.exponent;
        let body = if (-7..=20).contains(&e) {
            if e >= 0 {
                let int_len = e as usize + 1;
                if digits.len() <= int_len {
                    format!("{digits}{}", "0".repeat(int_len - digits.len()))
                } else {
                    format!("{}.{}", &digits[..int_len], &digits[int_len..])
                }
            } else {
                format!("0.{}{digits}", "0".repeat((-e - 1) as usize))
            }
        } else if digits.len() > 1 {
            format!("{}.{}e{e}", &digits[..1], &digits[1..])
        } else {
            format!("{digits}e{e}")
        };
        format!("{sign}{body}")
    }

    /// Stored compound form.
    pub fn to_snbt(&self) -> String {
        format!(
            "{{m:{},e:{},s:{}b}}",
            self.mantissa, self.exponent, self.negative as u8
        )
    }
}

impl fmt::Display for DecimalFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(text: &str) -> (u32, i32, bool) {
        let f = DecimalFloat::parse(text).unwrap();
        (f.mantissa(), f.exponent(), f.is_negative())
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(parts("3.25"), (32_500_000, 0, false));
        assert_eq!(parts("-0.001"), (10_000_000, -3, true));
        assert_eq!(parts("1200"), (12_000_000, 3, false));
        assert_eq!(parts("0.5e3"), (50_000_000, 2, false));
    }

    #[test]
    fn test_parse_rounds_to_eight_digits() {
        assert_eq!(parts("123456789"), (12_345_679, 8, false));
        assert_eq!(parts("99999999.5"), (10_000_000, 8, false));
        assert_eq!(parts("1.23456784"), (12_345_678, 0, false));
    }

    #[test]
    fn test_zero_and_underflow() {
        assert!(DecimalFloat::parse("0.000").unwrap().is_zero());
        assert!(DecimalFloat::parse("1e-129").unwrap().is_zero());
        assert_eq!(parts("1e-128"), (10_000_000, -128, false));
    }

    #[test]
    fn test_overflow_and_syntax() {
        assert!(matches!(
            DecimalFloat::parse("1e128"),
            Err(FloatError::Overflow(_))
        ));
        assert!(matches!(DecimalFloat::parse("1.2.3"), Err(FloatError::Syntax(_))));
        assert!(matches!(DecimalFloat::parse("."), Err(FloatError::Syntax(_))));
        assert!(matches!(DecimalFloat::parse("abc"), Err(FloatError::Syntax(_))));
    }

    #[test]
    fn test_extreme_exponents_do_not_wrap() {
        for text in ["11e9223372036854775807", "9.99999999e9223372036854775807"] {
            assert!(matches!(DecimalFloat::parse(text), Err(FloatError::Overflow(_))));
        }
        assert!(DecimalFloat::parse("0.01e-9223372036854775808").unwrap().is_zero());
    }

    #[test]
    fn test_literal_forms() {
        let lit = |t: &str| DecimalFloat::parse(t).unwrap().to_literal();
        assert_eq!(lit("3.25"), "3.25");
        assert_eq!(lit("-0.001"), "-0.001");
        assert_eq!(lit("1200"), "1200");
        assert_eq!(lit("1e-128"), "1e-128");
        assert_eq!(lit("3.25e21"), "3.25e21");
        assert_eq!(lit("0.0000001"), "0.0000001");
        assert_eq!(lit("0.00000001"), "1e-8");
        assert_eq!(lit("0"), "0");
    }

    #[test]
    fn test_literal_parses_back() {
        for text in ["3.25", "-0.001", "1e-128", "12345678", "9.9999999e127"] {
            let f = DecimalFloat::parse(text).unwrap();
            assert_eq!(DecimalFloat::parse(&f.to_literal()).unwrap(), f);
        }
    }

    #[test]
    fn test_snbt_and_f64() {
        let f = DecimalFloat::parse("-3.25").unwrap();
        assert_eq!(f.to_snbt(), "{m:32500000,e:0,s:1b}");
        assert!((f.to_f64() + 3.25).abs() < 1e-12);
        assert_eq!(DecimalFloat::from_i32(-42).to_literal(), "-42");
    }
}
