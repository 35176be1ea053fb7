use std::f64::consts::TAU;

use crate::error::{ConfigError, GeometryError, Result};
use crate::math::polygon::centroid;
use crate::math::units::scale_point;
use crate::math::{Point3, TOLERANCE};

/// One closed coil filament as read from the coil file.
#[derive(Debug, Clone, PartialEq)]
pub struct Filament {
    /// Points in file order; the last usually repeats the first.
    pub points: Vec<Point3>,
}

impl Filament {
    /// Mean of the filament points.
    #[must_use]
    pub fn center_of_mass(&self) -> Point3 {
        centroid(&self.points)
    }

    /// Toroidal angle of the centre of mass in `[0, 2π)`.
    #[must_use]
    pub fn toroidal_angle(&self) -> f64 {
        let com = self.center_of_mass();
        com.y.atan2(com.x).rem_euclid(TAU)
    }

    /// Every `sample_mod`-th point, keeping the first and last.
    ///
    /// A closing point coincident with the first is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::DegenerateFilament`] if fewer than three
    /// points remain.
    pub fn sample(&self, index: usize, sample_mod: usize) -> Result<Vec<Point3>> {
        let step = sample_mod.max(1);
        let mut points: Vec<Point3> = self.points.iter().step_by(step).copied().collect();
        if let Some(&last) = self.points.last() {
            if (self.points.len() - 1) % step != 0 {
                points.push(last);
            }
        }
        if points.len() > 1 && (points[points.len() - 1] - points[0]).norm() < TOLERANCE {
            points.pop();
        }
        if points.len() < 3 {
            return Err(GeometryError::DegenerateFilament {
                index,
                points: points.len(),
            }
            .into());
        }
        Ok(points)
    }
}

/// Reads filaments from whitespace-separated `x y z current` lines.
///
/// Lines before `start_line` are skipped. A line starting with `end` stops
/// reading. A point with zero current closes the filament being read; an
/// unclosed trailing filament is discarded. Blank lines are ignored.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for a data line with fewer than
/// four numeric columns.
pub fn parse_filaments(text: &str, start_line: usize, scale: f64) -> Result<Vec<Filament>> {
    let mut filaments = Vec::new();
    let mut current = Vec::new();
    for (number, line) in text.lines().enumerate().skip(start_line) {
        let mut columns = line.split_whitespace().peekable();
        match columns.peek() {
            None => continue,
            Some(&"end") => break,
            Some(_) => {}
        }
        let values: Vec<f64> = columns
            .take(4)
            .map(str::parse::<f64>)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| bad_line(number, &e.to_string()))?;
        let &[x, y, z, s] = values.as_slice() else {
            return Err(bad_line(number, "expected x y z current"));
        };
        current.push(scale_point(&Point3::new(x, y, z), scale));
        if s.abs() < TOLERANCE {
            filaments.push(Filament {
                points: std::mem::take(&mut current),
            });
        }
    }
    Ok(filaments)
}

/// Keeps filaments whose centre of mass lies within `[0, extent]` toroidally,
/// ordered by that angle.
#[must_use]
pub fn filter_toroidal_extent(filaments: Vec<Filament>, extent: f64) -> Vec<Filament> {
    let mut kept: Vec<(f64, Filament)> = filaments
        .into_iter()
        .map(|f| (f.toroidal_angle(), f))
        .filter(|(angle, _)| *angle <= extent + TOLERANCE)
        .collect();
    kept.sort_by(|a, b| a.0.total_cmp(&b.0));
    kept.into_iter().map(|(_, f)| f).collect()
}

fn bad_line(number: usize, reason: &str) -> crate::error::StellforgeError {
    ConfigError::InvalidValue {
        key: "coils_file_path",
        reason: format!("line {}: {reason}", number + 1),
    }
    .into()
}
