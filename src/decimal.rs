//! Fixed-point decimal with exactly one fractional digit.
//!
//! Values are stored as an integer count of tenths so that sums over any
//! number of observations are exact and independent of merge order.

use std::fmt;
use std::str::FromStr;

use memchr::memchr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseDecimalError {
    #[error("empty token")]
    Empty,
    #[error("missing '.' separator")]
    MissingSeparator,
    #[error("no digits before '.'")]
    MissingIntegerDigits,
    #[error("expected exactly one fractional digit, found {0}")]
    FractionDigits(usize),
    #[error("non-digit character")]
    InvalidDigit,
    #[error("value out of range")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedDecimal {
    tenths: i64,
}

impl FixedDecimal {
    pub const fn from_tenths(tenths: i64) -> Self {
        Self { tenths }
    }

    pub const fn tenths(self) -> i64 {
        self.tenths
    }

    pub fn as_f64(self) -> f64 {
        self.tenths as f64 / 10.0
    }

    /// Parses `-?[0-9]+\.[0-9]`.
    pub fn parse(token: &[u8]) -> Result<Self, ParseDecimalError> {
        if token.is_empty() {
            return Err(ParseDecimalError::Empty);
        }
        let (negative, digits) = match token.strip_prefix(b"-") {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let dot = memchr(b'.', digits).ok_or(ParseDecimalError::MissingSeparator)?;
        let (whole, fraction) = (&digits[..dot], &digits[dot + 1..]);
        if whole.is_empty() {
            return Err(ParseDecimalError::MissingIntegerDigits);
        }
        if fraction.len() != 1 {
            return Err(ParseDecimalError::FractionDigits(fraction.len()));
        }
        if !whole.iter().all(u8::is_ascii_digit) || !fraction[0].is_ascii_digit() {
            return Err(ParseDecimalError::InvalidDigit);
        }

        let whole: i64 =
            lexical_core::parse(whole).map_err(|_| ParseDecimalError::Overflow)?;
        let tenths = whole
            .checked_mul(10)
            .and_then(|t| t.checked_add(i64::from(fraction[0] - b'0')))
            .ok_or(ParseDecimalError::Overflow)?;

        Ok(Self::from_tenths(if negative { -tenths } else { tenths }))
    }

    /// `sum_tenths / count` rounded half away from zero, in tenths.
    ///
    /// `count` must be positive.
    pub fn mean(sum_tenths: i64, count: u64) -> Self {
        debug_assert!(count > 0);
        let sum = i128::from(sum_tenths);
        let count = i128::from(count);
        let quotient = sum / count;
        let remainder = (sum % count).abs();
        let rounded = if 2 * remainder >= count {
            quotient + sum.signum()
        } else {
            quotient
        };
        Self::from_tenths(rounded as i64)
    }
}

impl FromStr for FixedDecimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.tenths.unsigned_abs();
        if self.tenths < 0 {
            f.write_str("-")?;
        }
        write!(f, "{}.{}", abs / 10, abs % 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! parse_ok {
        ( $( $name:ident : $input:expr => $expected:expr ),+ $(,)? ) => {
            $(
                #[test]
                fn $name() {
                    let got = FixedDecimal::parse($input).map(FixedDecimal::tenths);
                    assert_eq!(got, Ok($expected), "input = {:?}", $input);
                }
            )+
        };
    }

    macro_rules! parse_err {
        ( $( $name:ident : $input:expr => $expected:expr ),+ $(,)? ) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(FixedDecimal::parse($input), Err($expected), "input = {:?}", $input);
                }
            )+
        };
    }

    parse_ok! {
        parses_positive_double_digit: b"99.9" => 999,
        parses_negative_double_digit: b"-99.9" => -999,
        parses_single_digit: b"3.0" => 30,
        parses_only_fraction: b"0.6" => 6,
        parses_negative_only_fraction: b"-0.8" => -8,
        parses_negative_zero: b"-0.0" => 0,
        parses_leading_zeros: b"007.5" => 75,
        parses_wide_integer_part: b"123456.7" => 1_234_567,
    }

    parse_err! {
        rejects_empty: b"" => ParseDecimalError::Empty,
        rejects_bare_minus: b"-" => ParseDecimalError::MissingSeparator,
        rejects_integer: b"12" => ParseDecimalError::MissingSeparator,
        rejects_two_fraction_digits: b"12.34" => ParseDecimalError::FractionDigits(2),
        rejects_no_fraction_digit: b"12." => ParseDecimalError::FractionDigits(0),
        rejects_missing_integer: b".5" => ParseDecimalError::MissingIntegerDigits,
        rejects_plus_sign: b"+1.5" => ParseDecimalError::InvalidDigit,
        rejects_double_minus: b"--1.5" => ParseDecimalError::InvalidDigit,
        rejects_letters: b"1a.5" => ParseDecimalError::InvalidDigit,
        rejects_letter_fraction: b"1.x" => ParseDecimalError::InvalidDigit,
        rejects_trailing_space: b"1.5 " => ParseDecimalError::FractionDigits(2),
        rejects_huge: b"99999999999999999999.9" => ParseDecimalError::Overflow,
    }

    #[test]
    fn formats_with_one_fraction_digit() {
        assert_eq!(FixedDecimal::from_tenths(0).to_string(), "0.0");
        assert_eq!(FixedDecimal::from_tenths(50).to_string(), "5.0");
        assert_eq!(FixedDecimal::from_tenths(-8).to_string(), "-0.8");
        assert_eq!(FixedDecimal::from_tenths(-999).to_string(), "-99.9");
        assert_eq!(FixedDecimal::from_tenths(1_234_567).to_string(), "123456.7");
    }

    #[test]
    fn format_inverts_parse() {
        for token in ["-99.9", "-0.1", "0.0", "0.1", "9.9", "10.0", "42.7"] {
            let value: FixedDecimal = token.parse().unwrap();
            assert_eq!(value.to_string(), token);
        }
    }

    #[test]
    fn float_view_matches_tenths() {
        assert_eq!(FixedDecimal::from_tenths(-123).as_f64(), -12.3);
        assert_eq!(FixedDecimal::from_tenths(5).as_f64(), 0.5);
    }

    #[test]
    fn mean_rounds_half_away_from_zero() {
        assert_eq!(FixedDecimal::mean(14_550, 100).tenths(), 146);
        assert_eq!(FixedDecimal::mean(-14_550, 100).tenths(), -146);
        assert_eq!(FixedDecimal::mean(14_549, 100).tenths(), 145);
        assert_eq!(FixedDecimal::mean(-14_549, 100).tenths(), -145);
        assert_eq!(FixedDecimal::mean(5, 2).tenths(), 3);
        assert_eq!(FixedDecimal::mean(-5, 2).tenths(), -3);
        assert_eq!(FixedDecimal::mean(-1, 3).tenths(), 0);
        assert_eq!(FixedDecimal::mean(50, 1).tenths(), 50);
    }

    macro_rules! mean_of {
        ( $( $name:ident : [ $( $v:expr ),+ $(,)? ] => $expected:expr ),+ $(,)? ) => {
            $(
                #[test]
                fn $name() {
                    let values: &[f64] = &[$( $v as f64 ),+];
                    let sum: i64 = values.iter().map(|v| (v * 10.0).round() as i64).sum();
                    let mean = FixedDecimal::mean(sum, values.len() as u64);
                    assert_eq!(mean.to_string(), $expected);
                }
            )+
        };
    }

    mean_of! {
        mean_of_hundred_rounds_up_from_14_55: [
            7.8, 0.8, 15.2, 21, 3, 16.1, 23.4, 13.9, 16.2, 16.9, 20.3,
            15.6, 18.7, 6, 13.9, 20, 6.7, 6.5, 17.6, 21.9, -0.8, 17.2,
            19.1, 7.7, 1.8, 15.7, 20.4, 7.7, 15.2, 19.3, 32.7, 15.6,
            13.7, 13.8, 22.4, 11.5, 20.3, 12.5, 10.6, 5.4, 18.2, 15.4,
            12.7, 12.7, 11.8, 14.2, 27.1, 17.9, 22.3, 23.9, 27, 6.8, 24,
            7.4, 5.3, -1.5, 18.6, 15.7, 11.1, 11.1, 14.6, 8.4, 29.1, 8.1,
            26.2, 9.7, 23.6, 9.6, 24.3, 10.1, 21.1, 17.8, 22.4, 13.6,
            12.8, 28.3, 15.8, 12.6, 11.7, 22.1, 11.9, 17.7, 7.3, 3.8,
            23.7, 7.5, 9.3, 11.5, 8.6, 9.8, 23.1, 4.5, 16, 20.7, 8.7,
            12.1, 13.3, 16.5, 6.4, 15.7,
        ] => "14.6",
        mean_rounds_up_from_18_35: [
            11.9, 5, 28.3, 13.1, 22.4, 20.7, 17.9, 23.7, 15.7, 13.7, 9.6,
            9.3, 29.4, 23.2, 14.7, 26.7, 16.7, 20.5, 34.6, 25.5, 11.7,
            25.5, 20.4, 25, 13.1, 26.7, 15.2, 11.5, 14.6, 21.9, 19.8,
            20.5, 17.5, 19.6, 12.9, 24.5, 24.3, 18.1, 15.3, 25.9, 19.4,
            22.5, 22.5, 18.6, 12.5, 16.4, 12.8, 21.3, 22.7, 27.1, 5.1,
            19.5, 7.1, 10.2, 19.5, 16.6, 14.1, 29, 11.6, 19.9, 8.8, 26.7,
            28.6, 21.9, 16.9, 9.2, 16.3, 19.8, 9.6, 24.4, 11.9, 20.7, 17.6,
            31.1, 16.1, 15.9, 15, 20.1, 19.5, 17.5, 9, 14.1, 14.2, 25,
            16.9, 19.3, 24.5, 15.8, 2.9, 12.1, 19.3, 11.3, 17.6, 23.8,
            38.8, 20.1, 10.2, 24.1, 13.2, 16.9, 20, 16.1, 17.8, 22.2, 12.8,
            24.5,
        ] => "18.4",
        mean_rounds_up_from_16_45: [
            14.5, 16.2, 9.4, 25.5, 21.4, 2, 9.5, 23.1, 26.4, 3.1, 31.6,
            1.6, 14.8, 19.8, 18.2, 19.1, 19.8, 20.2, 24.4, 13.8, 12,
            25.5, 12.2, 23.1, 19.1, 20.7, 1.8, 14.9, 7.4, 24.8, 28.4,
            26.4, 8.5, 14.2, 19.3, 6, 3.3, 1.7, 11.7, 14.6, 15.4, 34.5,
            6.5, 17.6, 19.3, 20.9, 26.7, 23.9, 15.4, 19.1, 28.2, 13.4,
            20.9, 11.5, 24.2, 15.2, 22.6, 20.1, 22.3, 10.8, 11.5, 26.5,
            8.5, 2, 19.9, 19.2, 24.9, 13.3, 12.9, 14.7, 26.5, 14.6, 11.2,
            4.3, 10.4, 4.3, 10.2, 19.3, 12.5, 28.1, 10.9, 23.2, 24.2, 15.9,
            12.6, 13.1, 12.7, 15.7, 18.4, 20.5,
        ] => "16.5",
    }
}
