use std::f64::consts::{PI, TAU};

use serde_json::Value;

use crate::error::{ConfigError, Result};

/// Segments used to approximate a circular section.
pub const CIRCLE_SEGMENTS: u32 = 32;

/// Shape swept along a coil filament, centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossSection {
    /// Round conductor pack.
    Circle {
        /// Radius.
        radius: f64,
    },
    /// Rectangular winding pack.
    Rectangle {
        /// Extent along the binormal.
        width: f64,
        /// Extent along the normal, away from the coil centre.
        thickness: f64,
    },
}

impl CrossSection {
    /// Parses `["circle", radius]` or `["rectangle", width, thickness]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCrossSection`] for another shape keyword
    /// and [`ConfigError::InvalidValue`] for wrong arity or a non-positive
    /// dimension.
    pub fn from_values(values: &[Value]) -> Result<Self> {
        let shape = values
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("cross_section must start with a shape name".into()))?;
        let dims: Vec<f64> = values[1..]
            .iter()
            .map(|v| v.as_f64().ok_or_else(|| invalid(format!("dimension {v} is not a number"))))
            .collect::<Result<_>>()?;
        let section = match (shape, dims.as_slice()) {
            ("circle", &[radius]) => Self::Circle { radius },
            ("rectangle", &[width, thickness]) => Self::Rectangle { width, thickness },
            ("circle" | "rectangle", _) => {
                return Err(invalid(format!(
                    "{shape} takes {} dimension(s), got {}",
                    if shape == "circle" { 1 } else { 2 },
                    dims.len()
                )));
            }
            (other, _) => return Err(ConfigError::UnknownCrossSection(other.to_string()).into()),
        };
        if dims.iter().any(|&d| !(d > 0.0 && d.is_finite())) {
            return Err(invalid(format!("{shape} dimensions must be positive")));
        }
        Ok(section)
    }

    /// Exact section area.
    #[must_use]
    pub fn area(&self) -> f64 {
        match *self {
            Self::Circle { radius } => PI * radius * radius,
            Self::Rectangle { width, thickness } => width * thickness,
        }
    }

    /// Section polygon in `(normal, binormal)` coordinates, counter-clockwise.
    #[must_use]
    pub fn outline(&self) -> Vec<(f64, f64)> {
        match *self {
            Self::Circle { radius } => (0..CIRCLE_SEGMENTS)
                .map(|i| {
                    let t = f64::from(i) * TAU / f64::from(CIRCLE_SEGMENTS);
                    (radius * t.cos(), radius * t.sin())
                })
                .collect(),
            Self::Rectangle { width, thickness } => {
                let (u, v) = (thickness / 2.0, width / 2.0);
                vec![(-u, -v), (u, -v), (u, v), (-u, v)]
            }
        }
    }
}

fn invalid(reason: String) -> crate::error::StellforgeError {
    ConfigError::InvalidValue {
        key: "cross_section",
        reason,
    }
    .into()
}
