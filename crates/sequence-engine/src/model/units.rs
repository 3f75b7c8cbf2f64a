//! Exact quantities used throughout sequence generation.
//!
//! Every quantity is stored as an integer in its smallest unit so that
//! sums of step estimates are exact:
//! - [`TimeSpan`]: microseconds
//! - [`Angle`]: microarcseconds
//! - [`Wavelength`] / [`WavelengthDither`]: picometers

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROARCSEC_PER_ARCSEC: i64 = 1_000_000;
const PICOMETERS_PER_NANOMETER: i64 = 1_000;

/// Format a fixed-point integer as a decimal string with `digits` decimals.
fn format_fixed(value: i64, scale: i64, digits: usize) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let scale = scale.unsigned_abs();
    format!("{}{}.{:0width$}", sign, abs / scale, abs % scale, width = digits)
}

/// Parse a decimal string into a fixed-point integer with `digits` decimals.
///
/// Extra fractional digits beyond the supported precision are rejected
/// rather than rounded.
fn parse_fixed(text: &str, digits: u32) -> Option<i64> {
    let text = text.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (whole, frac) = match unsigned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (unsigned, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > digits as usize || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let padded = format!("{:0<width$}", frac, width = digits as usize);
    let frac: i64 = if padded.is_empty() { 0 } else { padded.parse().ok()? };
    let magnitude = whole
        .checked_mul(10_i64.pow(digits))?
        .checked_add(frac)?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Wire input accepted for any fixed-point quantity.
///
/// A bare number or string is read in the display unit (seconds, arcseconds,
/// nanometers); an object carries the exact base-unit integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum FixedInput {
    Number(f64),
    Text(String),
    Exact {
        #[serde(alias = "microseconds", alias = "microarcseconds", alias = "picometers")]
        base: i64,
    },
}

impl FixedInput {
    fn resolve(self, scale: i64, digits: u32) -> Result<i64, String> {
        match self {
            FixedInput::Number(n) if n.is_finite() => Ok((n * scale as f64).round() as i64),
            FixedInput::Number(n) => Err(format!("invalid quantity: {}", n)),
            FixedInput::Text(s) => {
                parse_fixed(&s, digits).ok_or_else(|| format!("invalid decimal quantity: {}", s))
            }
            FixedInput::Exact { base } => Ok(base),
        }
    }
}

// ============================================================================
// TimeSpan
// ============================================================================

/// Non-negative duration with microsecond precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSpan(i64);

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan(0);

    /// Negative inputs clamp to zero.
    pub fn from_micros(micros: i64) -> Self {
        Self(micros.max(0))
    }

    pub fn from_millis(millis: i64) -> Self {
        Self::from_micros(millis.saturating_mul(1_000))
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self::from_micros(seconds.saturating_mul(MICROS_PER_SECOND))
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::from_seconds(minutes.saturating_mul(60))
    }

    pub fn to_micros(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(self, other: TimeSpan) -> Self {
        Self((self.0 - other.0).max(0))
    }

    pub fn saturating_mul(self, factor: i64) -> Self {
        Self::from_micros(self.0.saturating_mul(factor))
    }

    /// Integer division, truncating sub-microsecond remainders.
    pub fn div(self, divisor: i64) -> Self {
        if divisor <= 0 {
            return self;
        }
        Self(self.0 / divisor)
    }

    /// Minutes rounded to two decimals, e.g. `"61.50"`.
    pub fn format_minutes(self) -> String {
        let hundredths = (self.0 as i128 * 100 + 30 * MICROS_PER_SECOND as i128)
            / (60 * MICROS_PER_SECOND as i128);
        format!("{}.{:02}", hundredths / 100, hundredths % 100)
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_fixed(self.0, MICROS_PER_SECOND, 6))
    }
}

impl FromStr for TimeSpan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let micros = parse_fixed(s, 6).ok_or_else(|| format!("invalid seconds: {}", s))?;
        if micros < 0 {
            return Err(format!("time span cannot be negative: {}", s));
        }
        Ok(Self(micros))
    }
}

impl Add for TimeSpan {
    type Output = TimeSpan;

    fn add(self, rhs: TimeSpan) -> TimeSpan {
        TimeSpan(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for TimeSpan {
    fn add_assign(&mut self, rhs: TimeSpan) {
        *self = *self + rhs;
    }
}

impl Sum for TimeSpan {
    fn sum<I: Iterator<Item = TimeSpan>>(iter: I) -> Self {
        iter.fold(TimeSpan::ZERO, Add::add)
    }
}

impl Serialize for TimeSpan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TimeSpan", 2)?;
        s.serialize_field("microseconds", &self.0)?;
        s.serialize_field("seconds", &self.to_string())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for TimeSpan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let micros = FixedInput::deserialize(deserializer)?
            .resolve(MICROS_PER_SECOND, 6)
            .map_err(serde::de::Error::custom)?;
        if micros < 0 {
            return Err(serde::de::Error::custom("time span cannot be negative"));
        }
        Ok(TimeSpan(micros))
    }
}

// ============================================================================
// Angle and Offset
// ============================================================================

/// Signed angle with microarcsecond precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Angle(i64);

impl Angle {
    pub const ZERO: Angle = Angle(0);

    pub fn from_micro_arcseconds(value: i64) -> Self {
        Self(value)
    }

    pub fn from_arcseconds(value: i64) -> Self {
        Self(value.saturating_mul(MICROARCSEC_PER_ARCSEC))
    }

    pub fn to_micro_arcseconds(self) -> i64 {
        self.0
    }

    pub fn to_arcseconds_f64(self) -> f64 {
        self.0 as f64 / MICROARCSEC_PER_ARCSEC as f64
    }

    /// Arcseconds with six decimals, e.g. `"-10.000000"`.
    pub fn format_arcseconds(self) -> String {
        format_fixed(self.0, MICROARCSEC_PER_ARCSEC, 6)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}″", self.format_arcseconds())
    }
}

impl Serialize for Angle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Angle", 2)?;
        s.serialize_field("microarcseconds", &self.0)?;
        s.serialize_field("arcseconds", &self.format_arcseconds())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Angle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        FixedInput::deserialize(deserializer)?
            .resolve(MICROARCSEC_PER_ARCSEC, 6)
            .map(Angle)
            .map_err(serde::de::Error::custom)
    }
}

/// Telescope offset in the instrument frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    #[serde(default)]
    pub p: Angle,
    #[serde(default)]
    pub q: Angle,
}

impl Offset {
    pub const ZERO: Offset = Offset {
        p: Angle::ZERO,
        q: Angle::ZERO,
    };

    pub fn new(p: Angle, q: Angle) -> Self {
        Self { p, q }
    }

    /// Offset along the slit only.
    pub fn along_slit(q: Angle) -> Self {
        Self { p: Angle::ZERO, q }
    }

    /// Euclidean distance to another offset, in arcseconds.
    pub fn distance_arcsec(&self, other: &Offset) -> f64 {
        let dp = self.p.0.saturating_sub(other.p.0) as f64 / MICROARCSEC_PER_ARCSEC as f64;
        let dq = self.q.0.saturating_sub(other.q.0) as f64 / MICROARCSEC_PER_ARCSEC as f64;
        dp.hypot(dq)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.p, self.q)
    }
}

// ============================================================================
// Wavelength
// ============================================================================

/// Wavelength with picometer precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wavelength(i64);

impl Wavelength {
    pub fn from_picometers(value: i64) -> Self {
        Self(value.max(0))
    }

    pub fn from_nanometers(value: i64) -> Self {
        Self::from_picometers(value.saturating_mul(PICOMETERS_PER_NANOMETER))
    }

    pub fn to_picometers(self) -> i64 {
        self.0
    }

    /// Shift by a dither, clamping at zero.
    pub fn offset_by(self, dither: WavelengthDither) -> Self {
        Self::from_picometers(self.0.saturating_add(dither.0))
    }
}

impl fmt::Display for Wavelength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} nm", format_fixed(self.0, PICOMETERS_PER_NANOMETER, 3))
    }
}

impl Serialize for Wavelength {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Wavelength", 2)?;
        s.serialize_field("picometers", &self.0)?;
        s.serialize_field("nanometers", &format_fixed(self.0, PICOMETERS_PER_NANOMETER, 3))?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Wavelength {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pm = FixedInput::deserialize(deserializer)?
            .resolve(PICOMETERS_PER_NANOMETER, 3)
            .map_err(serde::de::Error::custom)?;
        if pm <= 0 {
            return Err(serde::de::Error::custom("wavelength must be positive"));
        }
        Ok(Wavelength(pm))
    }
}

/// Signed wavelength shift applied to a central wavelength.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WavelengthDither(i64);

impl WavelengthDither {
    pub const ZERO: WavelengthDither = WavelengthDither(0);

    pub fn from_picometers(value: i64) -> Self {
        Self(value)
    }

    pub fn from_nanometers(value: i64) -> Self {
        Self(value.saturating_mul(PICOMETERS_PER_NANOMETER))
    }

    pub fn to_picometers(self) -> i64 {
        self.0
    }

    pub fn negate(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl fmt::Display for WavelengthDither {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} nm", format_fixed(self.0, PICOMETERS_PER_NANOMETER, 3))
    }
}

impl Serialize for WavelengthDither {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("WavelengthDither", 2)?;
        s.serialize_field("picometers", &self.0)?;
        s.serialize_field("nanometers", &format_fixed(self.0, PICOMETERS_PER_NANOMETER, 3))?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for WavelengthDither {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        FixedInput::deserialize(deserializer)?
            .resolve(PICOMETERS_PER_NANOMETER, 3)
            .map(WavelengthDither)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_span_display() {
        assert_eq!(TimeSpan::from_millis(67_100).to_string(), "67.100000");
        assert_eq!(TimeSpan::from_micros(1).to_string(), "0.000001");
        assert_eq!(TimeSpan::ZERO.to_string(), "0.000000");
    }

    #[test]
    fn test_time_span_parse() {
        assert_eq!("1266.1".parse::<TimeSpan>(), Ok(TimeSpan::from_millis(1_266_100)));
        assert_eq!("41.100000".parse::<TimeSpan>(), Ok(TimeSpan::from_millis(41_100)));
        assert!("1.0000001".parse::<TimeSpan>().is_err());
        assert!("-3".parse::<TimeSpan>().is_err());
        assert!("abc".parse::<TimeSpan>().is_err());
    }

    #[test]
    fn test_time_span_arithmetic_is_exact() {
        let total: TimeSpan = (0..10).map(|_| TimeSpan::from_millis(100)).sum();
        assert_eq!(total, TimeSpan::from_seconds(1));
        assert_eq!(
            TimeSpan::from_seconds(1).saturating_sub(TimeSpan::from_seconds(5)),
            TimeSpan::ZERO
        );
        assert_eq!(TimeSpan::from_seconds(36).div(4), TimeSpan::from_seconds(9));
    }

    #[test]
    fn test_time_span_minutes() {
        assert_eq!(TimeSpan::from_seconds(90).format_minutes(), "1.50");
        assert_eq!(TimeSpan::from_minutes(60).format_minutes(), "60.00");
    }

    #[test]
    fn test_time_span_serde() {
        let json = serde_json::to_value(TimeSpan::from_millis(1_251_100)).unwrap();
        assert_eq!(json["microseconds"], 1_251_100_000_i64);
        assert_eq!(json["seconds"], "1251.100000");

        let decoded: TimeSpan = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, TimeSpan::from_millis(1_251_100));

        let from_number: TimeSpan = serde_json::from_str("1200").unwrap();
        assert_eq!(from_number, TimeSpan::from_seconds(1200));

        let from_text: TimeSpan = serde_json::from_str("\"0.5\"").unwrap();
        assert_eq!(from_text, TimeSpan::from_millis(500));
    }

    #[test]
    fn test_angle_format() {
        assert_eq!(Angle::from_arcseconds(10).format_arcseconds(), "10.000000");
        assert_eq!(Angle::from_arcseconds(-10).format_arcseconds(), "-10.000000");
        assert_eq!(Angle::from_micro_arcseconds(-500_000).format_arcseconds(), "-0.500000");
    }

    #[test]
    fn test_offset_distance() {
        let a = Offset::along_slit(Angle::from_arcseconds(10));
        let b = Offset::along_slit(Angle::from_arcseconds(-10));
        assert_eq!(a.distance_arcsec(&b), 20.0);
        let c = Offset::new(Angle::from_arcseconds(3), Angle::from_arcseconds(4));
        assert_eq!(c.distance_arcsec(&Offset::ZERO), 5.0);
    }

    #[test]
    fn test_extreme_values_saturate() {
        let far = Offset::along_slit(Angle::from_micro_arcseconds(i64::MAX));
        let near = Offset::along_slit(Angle::from_micro_arcseconds(i64::MIN));
        assert!(far.distance_arcsec(&near).is_finite());
        assert_eq!(
            WavelengthDither::from_picometers(i64::MIN).negate(),
            WavelengthDither::from_picometers(i64::MAX)
        );
    }

    #[test]
    fn test_wavelength_dither_display() {
        assert_eq!(WavelengthDither::from_nanometers(5).to_string(), "5.000 nm");
        assert_eq!(WavelengthDither::from_nanometers(-5).to_string(), "-5.000 nm");
        assert_eq!(WavelengthDither::ZERO.to_string(), "0.000 nm");
        assert_eq!(
            Wavelength::from_nanometers(500).offset_by(WavelengthDither::from_picometers(-2_500)),
            Wavelength::from_picometers(497_500)
        );
    }

    #[test]
    fn test_wavelength_deserialize_from_nanometers() {
        let w: Wavelength = serde_json::from_str("500.5").unwrap();
        assert_eq!(w, Wavelength::from_picometers(500_500));
        assert!(serde_json::from_str::<Wavelength>("0").is_err());
    }
}
