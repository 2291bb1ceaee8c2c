#![forbid(unsafe_code)]

//! Grid-template generation.
//!
//! The template is a pure function of the child order, the declarations and
//! the offset table. One token per track, separated by single spaces:
//!
//! | track                 | offset = 0   | offset != 0                  |
//! |-----------------------|--------------|------------------------------|
//! | `fr`                  | `1fr`        | `1.25fr` (`value - offset`)  |
//! | `px` / `%`            | `240px`      | `calc(240px + 30px)`         |
//! | bounded `px` / `%`    | `max(MIN, min(TOKEN, MAX))`, one side omitted when unset |

use gridpane_core::Axis;

use crate::engine::ResizeEngine;
use crate::unit::{Size, SizeSpec, format_number};

/// CSS property the template is assigned to for a container on `axis`.
#[must_use]
pub const fn grid_template_property(axis: Axis) -> &'static str {
    match axis {
        Axis::Row => "grid-template-columns",
        Axis::Column => "grid-template-rows",
    }
}

/// Track token for one declaration carrying `offset` (native unit,
/// subtracted from the base).
#[must_use]
pub fn track_token(spec: &SizeSpec, offset: f64) -> String {
    let size = spec.size();
    let token = match size {
        Size::Fr(value) => {
            if offset == 0.0 {
                size.to_string()
            } else {
                format!("{}fr", format_number((value - offset).max(0.0)))
            }
        }
        Size::Px(_) | Size::Percent(_) => offset_calc(size, offset),
    };
    match (spec.min(), spec.max()) {
        (None, None) => token,
        (Some(min), None) => format!("max({min}, {token})"),
        (None, Some(max)) => format!("min({token}, {max})"),
        (Some(min), Some(max)) => format!("max({min}, min({token}, {max}))"),
    }
}

fn offset_calc(size: Size, offset: f64) -> String {
    let magnitude = format_number(offset.abs());
    if offset == 0.0 || magnitude == "0" {
        return size.to_string();
    }
    // Offsets shrink the base, so a negative offset is growth.
    let sign = if offset < 0.0 { '+' } else { '-' };
    format!("calc({size} {sign} {magnitude}{})", size.unit().suffix())
}

/// Render the engine's tracks into a grid-template value.
#[must_use]
pub fn grid_template(engine: &ResizeEngine) -> String {
    engine
        .order()
        .iter()
        .filter_map(|id| {
            let spec = engine.spec(*id)?;
            Some(track_token(spec, engine.offsets().get(*id)))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl ResizeEngine {
    /// Current grid-template value for this container.
    #[must_use]
    pub fn template(&self) -> String {
        grid_template(self)
    }
}
