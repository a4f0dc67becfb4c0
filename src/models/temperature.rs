use std::{fmt::Display, str::FromStr, time::Instant};

use thiserror::Error;

/// A temperature in the sensor's native unit. Always finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature {
    value: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemperatureError {
    /// The text did not parse as a decimal number.
    #[error("Temperature value is not a valid number: {0:?}")]
    NotANumber(String),

    /// The number parsed but is NaN or infinite.
    #[error("Temperature value is not finite: {0}")]
    NotFinite(f64),
}

impl Temperature {
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl TryFrom<f64> for Temperature {
    type Error = TemperatureError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(TemperatureError::NotFinite(value));
        }
        Ok(Temperature { value })
    }
}

impl FromStr for Temperature {
    type Err = TemperatureError;

    /// Parse a plain-text body such as `"21.5"`, `"21.5\n"` or `"21.5 C"`.
    /// Leading whitespace is skipped and the longest leading decimal is
    /// used; anything after it is ignored. Text that does not start with a
    /// number is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start();
        let raw = leading_decimal(trimmed)
            .and_then(|number| number.parse::<f64>().ok())
            .ok_or_else(|| TemperatureError::NotANumber(trimmed.trim_end().to_string()))?;
        Temperature::try_from(raw)
    }
}

/// The longest prefix of `s` shaped like `[+-]digits[.digits][(e|E)[+-]digits]`,
/// with at least one digit before the exponent. `None` if there is none.
fn leading_decimal(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = match bytes.first() {
        Some(b'+') | Some(b'-') => 1,
        _ => 0,
    };
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_start = end + 1;
        if matches!(bytes.get(exp_start), Some(b'+') | Some(b'-')) {
            exp_start += 1;
        }
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    Some(&s[..end])
}

impl Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} deg)", self.value)
    }
}

/// One validated reading plus the moment it was fetched. The timestamp is
/// bookkeeping only; nothing checks it for staleness.
#[derive(Debug, Clone, Copy)]
pub struct TemperatureReading {
    pub temperature: Temperature,
    pub fetched_at: Instant,
}

impl TemperatureReading {
    pub fn new(temperature: Temperature) -> Self {
        Self {
            temperature,
            fetched_at: Instant::now(),
        }
    }

    pub fn value(&self) -> f64 {
        self.temperature.value()
    }
}

impl Display for TemperatureReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(TemperatureReading: temperature={})", self.temperature)
    }
}
