#![forbid(unsafe_code)]

//! Axis and pointer primitives.

use serde::{Deserialize, Serialize};

/// Split axis of a container.
///
/// A `Row` container lays its children out left to right and splits its
/// measured width; a `Column` container stacks them top to bottom and splits
/// its measured height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    #[default]
    Row,
    Column,
}

impl Axis {
    /// Component of a pointer movement that lies along this axis.
    #[inline]
    #[must_use]
    pub fn delta(self, from: PointerPosition, to: PointerPosition) -> f64 {
        match self {
            Self::Row => to.x - from.x,
            Self::Column => to.y - from.y,
        }
    }

    /// The box dimension this axis splits.
    #[must_use]
    pub const fn dimension(self) -> &'static str {
        match self {
            Self::Row => "width",
            Self::Column => "height",
        }
    }

    /// Stable lowercase name used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Column => "column",
        }
    }
}

/// Pointer position in CSS pixels, relative to any fixed origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pointer button reported with down/up events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}
