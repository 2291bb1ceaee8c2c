#![forbid(unsafe_code)]

//! Size tokens and unit conversion.
//!
//! A pane declares its track size as a suffixed literal: `1fr`, `240px` or
//! `25%`. Bounds (`min`/`max`) are restricted to pixel or percentage lengths.
//! Tokens are validated when parsed; nothing downstream re-checks them.
//!
//! Fractional sizes never resolve to pixels on their own. They are converted
//! through the engine's pixels-per-fraction ratio, which depends on every
//! other track in the container.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::LayoutError;

/// Unit family of a size token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeUnit {
    Fraction,
    Pixel,
    Percentage,
}

impl SizeUnit {
    /// CSS suffix for the unit.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Fraction => "fr",
            Self::Pixel => "px",
            Self::Percentage => "%",
        }
    }
}

/// A declared track size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Size {
    /// Share of the space left after all non-fractional tracks.
    Fr(f64),
    /// Absolute CSS pixels.
    Px(f64),
    /// Percentage of the container's measured size along the split axis.
    Percent(f64),
}

impl Size {
    #[must_use]
    pub const fn unit(self) -> SizeUnit {
        match self {
            Self::Fr(_) => SizeUnit::Fraction,
            Self::Px(_) => SizeUnit::Pixel,
            Self::Percent(_) => SizeUnit::Percentage,
        }
    }

    /// Numeric part of the token, in the token's own unit.
    #[must_use]
    pub const fn value(self) -> f64 {
        match self {
            Self::Fr(v) | Self::Px(v) | Self::Percent(v) => v,
        }
    }

    #[must_use]
    pub const fn is_fraction(self) -> bool {
        matches!(self, Self::Fr(_))
    }

    /// The same size as a bound-compatible length, or `None` for fractions.
    #[must_use]
    pub const fn as_length(self) -> Option<Length> {
        match self {
            Self::Fr(_) => None,
            Self::Px(v) => Some(Length::Px(v)),
            Self::Percent(v) => Some(Length::Percent(v)),
        }
    }

    /// Resolve a non-fractional size to pixels. Fractions yield `None`.
    #[must_use]
    pub fn resolve_non_fraction(self, container_px: f64) -> Option<f64> {
        self.as_length().map(|length| length.resolve(container_px))
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::Fr(1.0)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_number(self.value()), self.unit().suffix())
    }
}

impl FromStr for Size {
    type Err = SizeParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (value, unit) = parse_token(token)?;
        Ok(match unit {
            SizeUnit::Fraction => Self::Fr(value),
            SizeUnit::Pixel => Self::Px(value),
            SizeUnit::Percentage => Self::Percent(value),
        })
    }
}

/// A pixel or percentage length, used for `min`/`max` bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    Percent(f64),
}

impl Length {
    /// Resolve to pixels against the container's measured size.
    ///
    /// Percentages resolve as `(container_px / 100) * value`.
    #[inline]
    #[must_use]
    pub fn resolve(self, container_px: f64) -> f64 {
        match self {
            Self::Px(v) => v,
            Self::Percent(v) => container_px / 100.0 * v,
        }
    }

    #[must_use]
    pub const fn unit(self) -> SizeUnit {
        match self {
            Self::Px(_) => SizeUnit::Pixel,
            Self::Percent(_) => SizeUnit::Percentage,
        }
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        match self {
            Self::Px(v) | Self::Percent(v) => v,
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_number(self.value()), self.unit().suffix())
    }
}

impl FromStr for Length {
    type Err = SizeParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match parse_token(token)? {
            (value, SizeUnit::Pixel) => Ok(Self::Px(value)),
            (value, SizeUnit::Percentage) => Ok(Self::Percent(value)),
            (_, SizeUnit::Fraction) => Err(SizeParseError::FractionBound {
                token: token.trim().to_owned(),
            }),
        }
    }
}

/// A pane's complete size declaration: base size plus optional bounds.
///
/// Fractional sizes never carry bounds; [`SizeSpec::bounded`] rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeSpec {
    size: Size,
    min: Option<Length>,
    max: Option<Length>,
}

impl SizeSpec {
    /// An unbounded size.
    #[must_use]
    pub const fn new(size: Size) -> Self {
        Self {
            size,
            min: None,
            max: None,
        }
    }

    /// A size with optional bounds, validated.
    pub fn bounded(
        size: Size,
        min: Option<Length>,
        max: Option<Length>,
    ) -> Result<Self, LayoutError> {
        if size.is_fraction() && (min.is_some() || max.is_some()) {
            return Err(LayoutError::BoundedFraction {
                size: size.to_string(),
            });
        }
        if let (Some(lo), Some(hi)) = (min, max)
            && lo.unit() == hi.unit()
            && lo.value() > hi.value()
        {
            return Err(LayoutError::InvertedBounds {
                min: lo.to_string(),
                max: hi.to_string(),
            });
        }
        Ok(Self { size, min, max })
    }

    /// Parse a size token with optional bound tokens.
    pub fn parse(size: &str, min: Option<&str>, max: Option<&str>) -> Result<Self, LayoutError> {
        let size: Size = size.parse()?;
        let min = min.map(str::parse::<Length>).transpose()?;
        let max = max.map(str::parse::<Length>).transpose()?;
        Self::bounded(size, min, max)
    }

    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub const fn min(&self) -> Option<Length> {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> Option<Length> {
        self.max
    }

    #[must_use]
    pub const fn is_fraction(&self) -> bool {
        self.size.is_fraction()
    }

    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// Pixel range the track may occupy: `[max(min, 0), max]`.
    ///
    /// A `max` that resolves below the lower bound collapses the range onto
    /// the lower bound.
    #[must_use]
    pub fn pixel_range(&self, container_px: f64) -> (f64, f64) {
        let lo = self
            .min
            .map_or(0.0, |min| min.resolve(container_px))
            .max(0.0);
        let hi = self
            .max
            .map_or(f64::INFINITY, |max| max.resolve(container_px))
            .max(lo);
        (lo, hi)
    }
}

impl From<Size> for SizeSpec {
    fn from(size: Size) -> Self {
        Self::new(size)
    }
}

/// Error returned when a size or length token cannot be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeParseError {
    Empty,
    MissingUnit { token: String },
    UnknownUnit { token: String },
    InvalidNumber { token: String },
    NonFinite { token: String },
    Negative { token: String },
    FractionBound { token: String },
}

impl fmt::Display for SizeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty size token"),
            Self::MissingUnit { token } => {
                write!(f, "size token {token:?} has no unit (expected fr, px or %)")
            }
            Self::UnknownUnit { token } => {
                write!(f, "size token {token:?} has an unknown unit (expected fr, px or %)")
            }
            Self::InvalidNumber { token } => {
                write!(f, "size token {token:?} does not start with a number")
            }
            Self::NonFinite { token } => write!(f, "size token {token:?} is not finite"),
            Self::Negative { token } => write!(f, "size token {token:?} is negative"),
            Self::FractionBound { token } => {
                write!(f, "bound {token:?} must be a px or % length, not fr")
            }
        }
    }
}

impl std::error::Error for SizeParseError {}

fn parse_token(token: &str) -> Result<(f64, SizeUnit), SizeParseError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(SizeParseError::Empty);
    }
    let unit = [SizeUnit::Fraction, SizeUnit::Pixel, SizeUnit::Percentage]
        .into_iter()
        .find(|unit| token.ends_with(unit.suffix()));
    let Some(unit) = unit else {
        return Err(if token.parse::<f64>().is_ok() {
            SizeParseError::MissingUnit {
                token: token.to_owned(),
            }
        } else {
            SizeParseError::UnknownUnit {
                token: token.to_owned(),
            }
        });
    };
    let number = &token[..token.len() - unit.suffix().len()];
    // `f64::from_str` accepts "inf"/"nan"; those are caught below.
    let value: f64 = number
        .trim_end()
        .parse()
        .map_err(|_| SizeParseError::InvalidNumber {
            token: token.to_owned(),
        })?;
    if !value.is_finite() {
        return Err(SizeParseError::NonFinite {
            token: token.to_owned(),
        });
    }
    if value < 0.0 {
        return Err(SizeParseError::Negative {
            token: token.to_owned(),
        });
    }
    Ok((value, unit))
}

/// Format a number the way it would be written in a stylesheet: integers
/// without a decimal point, otherwise at most six decimals.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_owned()
    } else {
        text.to_owned()
    }
}

impl Serialize for Size {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Length {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Length {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_suffixed_tokens() {
        assert_eq!("1fr".parse::<Size>(), Ok(Size::Fr(1.0)));
        assert_eq!("240px".parse::<Size>(), Ok(Size::Px(240.0)));
        assert_eq!(" 12.5% ".parse::<Size>(), Ok(Size::Percent(12.5)));
        assert_eq!("0.25fr".parse::<Size>().map(Size::unit), Ok(SizeUnit::Fraction));
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert_eq!("".parse::<Size>(), Err(SizeParseError::Empty));
        assert!(matches!(
            "120".parse::<Size>(),
            Err(SizeParseError::MissingUnit { .. })
        ));
        assert!(matches!(
            "3em".parse::<Size>(),
            Err(SizeParseError::UnknownUnit { .. })
        ));
        assert!(matches!(
            "px".parse::<Size>(),
            Err(SizeParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            "infpx".parse::<Size>(),
            Err(SizeParseError::NonFinite { .. })
        ));
        assert!(matches!(
            "-4px".parse::<Size>(),
            Err(SizeParseError::Negative { .. })
        ));
    }

    #[test]
    fn bounds_cannot_be_fractions() {
        assert!(matches!(
            "1fr".parse::<Length>(),
            Err(SizeParseError::FractionBound { .. })
        ));
        assert_eq!("40%".parse::<Length>(), Ok(Length::Percent(40.0)));
    }

    #[test]
    fn percentage_resolves_against_container() {
        assert_eq!(Length::Percent(25.0).resolve(800.0), 200.0);
        assert_eq!(Length::Px(33.0).resolve(800.0), 33.0);
        assert_eq!(Size::Percent(50.0).resolve_non_fraction(300.0), Some(150.0));
        assert_eq!(Size::Fr(2.0).resolve_non_fraction(300.0), None);
    }

    #[test]
    fn fraction_with_bounds_fails_fast() {
        let err = SizeSpec::parse("1fr", Some("10px"), None).expect_err("fraction bound");
        assert!(matches!(err, LayoutError::BoundedFraction { .. }));
    }

    #[test]
    fn inverted_same_unit_bounds_rejected() {
        let err = SizeSpec::parse("50px", Some("80px"), Some("20px")).expect_err("inverted");
        assert!(matches!(err, LayoutError::InvertedBounds { .. }));
        // Mixed units cannot be compared without a container size.
        assert!(SizeSpec::parse("50px", Some("80px"), Some("20%")).is_ok());
    }

    #[test]
    fn pixel_range_clamps_lower_bound_at_zero() {
        let spec = SizeSpec::parse("50%", Some("10%"), Some("300px")).expect("valid spec");
        assert_eq!(spec.pixel_range(1000.0), (100.0, 300.0));
        let unbounded = SizeSpec::new(Size::Px(10.0));
        assert_eq!(unbounded.pixel_range(1000.0), (0.0, f64::INFINITY));
    }

    #[test]
    fn display_reproduces_literal_tokens() {
        for token in ["1fr", "0.5fr", "240px", "33.333%", "0px"] {
            let size: Size = token.parse().expect("valid token");
            assert_eq!(size.to_string(), token);
        }
        assert_eq!(format_number(-0.0000001), "0");
        assert_eq!(format_number(2.50), "2.5");
    }

    #[test]
    fn serde_uses_string_tokens() {
        let size: Size = serde_json::from_str("\"75px\"").expect("deserialize");
        assert_eq!(size, Size::Px(75.0));
        assert_eq!(serde_json::to_string(&Size::Fr(2.0)).expect("serialize"), "\"2fr\"");
        assert!(serde_json::from_str::<Length>("\"2fr\"").is_err());
    }
}
