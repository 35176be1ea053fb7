use std::collections::HashSet;
use std::f64::consts::TAU;

use tracing::warn;

use crate::error::{ConfigError, Result};
use crate::math::{linspace, TOLERANCE};

/// Angular slack used when comparing configured angles.
const ANGLE_TOLERANCE: f64 = 1e-9;

/// Thickness values of one component, `values[i][j]` at `(T[i], P[j])`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThicknessMatrix {
    values: Vec<Vec<f64>>,
}

impl ThicknessMatrix {
    /// Wraps a row-major matrix.
    #[must_use]
    pub fn new(values: Vec<Vec<f64>>) -> Self {
        Self { values }
    }

    /// A matrix of zeros, used for the plasma and scrape-off pseudo-layers.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            values: vec![vec![0.0; cols]; rows],
        }
    }

    /// Stored entry at `[i][j]`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i).and_then(|row| row.get(j)).copied()
    }

    fn at(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }
}

/// A named layer of the radial build.
#[derive(Debug, Clone)]
pub struct GridComponent {
    /// Component name, unique within the build.
    pub name: String,
    /// Thickness in centimetres over the angular grid.
    pub thickness: ThicknessMatrix,
    /// Material tag handed to the export sink.
    pub mat_tag: String,
}

/// Sparse thickness grid over toroidal and poloidal angles.
///
/// Angles are radians. The toroidal list covers one build segment
/// `[0, T[-1]]`; the poloidal list covers at most one turn starting at
/// `P[0]`, and is treated as periodic.
#[derive(Debug, Clone)]
pub struct RadialBuildGrid {
    toroidal_angles: Vec<f64>,
    poloidal_angles: Vec<f64>,
    components: Vec<GridComponent>,
}

/// One component's thickness, resolved against its grid.
#[derive(Debug, Clone, Copy)]
pub struct ComponentThickness<'a> {
    grid: &'a RadialBuildGrid,
    component: &'a GridComponent,
}

impl RadialBuildGrid {
    /// Builds a grid, checking every structural invariant up front.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the toroidal list does not start at 0,
    /// is not strictly increasing or exceeds a full turn; if the poloidal
    /// list has fewer than two angles, is not increasing or spans more than
    /// a full turn; if a matrix has the wrong shape or a negative or
    /// non-finite entry; or if a component name repeats.
    pub fn new(
        toroidal_angles: Vec<f64>,
        poloidal_angles: Vec<f64>,
        components: Vec<GridComponent>,
    ) -> Result<Self> {
        if toroidal_angles.len() < 2 {
            return Err(invalid("toroidal_angles", "need at least two angles".into()));
        }
        if toroidal_angles[0].abs() > ANGLE_TOLERANCE {
            return Err(invalid(
                "toroidal_angles",
                format!("first angle must be 0, got {}", toroidal_angles[0].to_degrees()),
            ));
        }
        if !strictly_increasing(&toroidal_angles) {
            return Err(invalid("toroidal_angles", "angles must be strictly increasing".into()));
        }
        if toroidal_angles[toroidal_angles.len() - 1] > TAU + ANGLE_TOLERANCE {
            return Err(invalid("toroidal_angles", "segment exceeds 360 degrees".into()));
        }

        if poloidal_angles.len() < 2 {
            return Err(invalid("poloidal_angles", "need at least two angles".into()));
        }
        if !strictly_increasing(&poloidal_angles) {
            return Err(invalid("poloidal_angles", "angles must be strictly increasing".into()));
        }
        if poloidal_angles[poloidal_angles.len() - 1] - poloidal_angles[0] > TAU + ANGLE_TOLERANCE {
            return Err(invalid("poloidal_angles", "angles span more than 360 degrees".into()));
        }

        let rows = toroidal_angles.len();
        let cols = poloidal_angles.len();
        let mut names = HashSet::new();
        for component in &components {
            if !names.insert(component.name.as_str()) {
                return Err(invalid(
                    "radial_build",
                    format!("component '{}' is listed twice", component.name),
                ));
            }
            check_matrix(component, rows, cols)?;
        }

        let grid = Self {
            toroidal_angles,
            poloidal_angles,
            components,
        };
        grid.warn_discontinuous_wrap();
        Ok(grid)
    }

    /// Toroidal sample angles.
    #[must_use]
    pub fn toroidal_angles(&self) -> &[f64] {
        &self.toroidal_angles
    }

    /// Poloidal sample angles.
    #[must_use]
    pub fn poloidal_angles(&self) -> &[f64] {
        &self.poloidal_angles
    }

    /// Toroidal extent of one segment, `T[-1]`.
    #[must_use]
    pub fn toroidal_extent(&self) -> f64 {
        self.toroidal_angles[self.toroidal_angles.len() - 1]
    }

    /// Components in build order, innermost first.
    #[must_use]
    pub fn components(&self) -> &[GridComponent] {
        &self.components
    }

    /// Resolves a component by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownComponent`] if no component has that name.
    pub fn component(&self, name: &str) -> Result<ComponentThickness<'_>> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .map(|component| ComponentThickness {
                grid: self,
                component,
            })
            .ok_or_else(|| ConfigError::UnknownComponent(name.to_string()).into())
    }

    /// Resolved views of every component, in build order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentThickness<'_>> {
        self.components.iter().map(move |component| ComponentThickness {
            grid: self,
            component,
        })
    }

    /// Interpolated thickness of `component` at `(phi, theta)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownComponent`] if the component is absent.
    pub fn thickness_at(&self, component: &str, phi: f64, theta: f64) -> Result<f64> {
        Ok(self.component(component)?.thickness_at(phi, theta))
    }

    /// Toroidal rib angles: every `T[i]`, with extra ribs placed between
    /// them in proportion to each interval's share of the segment.
    ///
    /// Returns `max(num_ribs, T.len())` angles, ends included.
    #[must_use]
    pub fn rib_angles(&self, num_ribs: usize) -> Vec<f64> {
        let mut angles = subdivide(&self.toroidal_angles, num_ribs.saturating_sub(1));
        angles.push(self.toroidal_extent());
        angles
    }

    /// Poloidal rib-point angles over one turn from `P[0]`: every `P[j]`
    /// below `P[0] + 2pi`, with extra points placed between them in
    /// proportion to each interval's share of the turn.
    ///
    /// Returns at least `num_rib_pts` angles; the closing angle
    /// `P[0] + 2pi` is never repeated.
    #[must_use]
    pub fn rib_point_angles(&self, num_rib_pts: usize) -> Vec<f64> {
        let mut bounds = self.poloidal_angles.clone();
        if !self.poloidal_closed() {
            bounds.push(self.poloidal_angles[0] + TAU);
        }
        subdivide(&bounds, num_rib_pts)
    }

    /// Whether the poloidal list already ends one full turn after it starts.
    fn poloidal_closed(&self) -> bool {
        let p = &self.poloidal_angles;
        (p[p.len() - 1] - p[0] - TAU).abs() < ANGLE_TOLERANCE
    }

    fn warn_discontinuous_wrap(&self) {
        if !self.poloidal_closed() {
            return;
        }
        for component in &self.components {
            let jump = component
                .thickness
                .values
                .iter()
                .any(|row| (row[row.len() - 1] - row[0]).abs() > TOLERANCE);
            if jump {
                warn!(
                    component = %component.name,
                    "thickness at 360 degrees differs from 0; poloidal wrap is discontinuous"
                );
            }
        }
    }

    /// Bracketing toroidal rows and weight.
    fn toroidal_cell(&self, phi: f64) -> (usize, f64) {
        let t = &self.toroidal_angles;
        let extent = self.toroidal_extent();
        let phi = if phi < t[0] - ANGLE_TOLERANCE || phi > extent + ANGLE_TOLERANCE {
            phi.rem_euclid(extent)
        } else {
            phi.clamp(t[0], extent)
        };
        let i = bracket(t, phi);
        (i, (phi - t[i]) / (t[i + 1] - t[i]))
    }

    /// Bracketing poloidal columns and weight, wrapping past the last sample.
    fn poloidal_cell(&self, theta: f64) -> (usize, usize, f64) {
        let p = &self.poloidal_angles;
        let start = p[0];
        let last = p.len() - 1;
        let mut offset = (theta - start).rem_euclid(TAU);
        if offset >= TAU {
            // Round-off for theta just below a multiple of 2pi.
            offset = 0.0;
        }
        let theta = start + offset;
        if theta >= p[last] {
            let span = start + TAU - p[last];
            if span <= ANGLE_TOLERANCE {
                return (last, 0, 0.0);
            }
            return (last, 0, (theta - p[last]) / span);
        }
        let j = bracket(p, theta);
        (j, j + 1, (theta - p[j]) / (p[j + 1] - p[j]))
    }
}

impl ComponentThickness<'_> {
    /// Component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.component.name
    }

    /// Component material tag.
    #[must_use]
    pub fn mat_tag(&self) -> &str {
        &self.component.mat_tag
    }

    /// Bilinearly interpolated thickness at `(phi, theta)`.
    ///
    /// `theta` is periodic; `phi` outside the segment is reduced modulo the
    /// segment extent. Grid nodes return their stored entries exactly.
    #[must_use]
    pub fn thickness_at(&self, phi: f64, theta: f64) -> f64 {
        let (i, wt) = self.grid.toroidal_cell(phi);
        let (j0, j1, wp) = self.grid.poloidal_cell(theta);
        let m = &self.component.thickness;
        let lower = m.at(i, j0) * (1.0 - wp) + m.at(i, j1) * wp;
        let upper = m.at(i + 1, j0) * (1.0 - wp) + m.at(i + 1, j1) * wp;
        lower * (1.0 - wt) + upper * wt
    }
}

/// Interior sample angles for the intervals of `bounds`.
///
/// Returns the left end of every sub-interval, so the last bound is left
/// out. Each interval gets one sub-interval, and the remaining
/// `total - intervals` are shared out by span with largest remainders.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn subdivide(bounds: &[f64], total: usize) -> Vec<f64> {
    let intervals = bounds.len() - 1;
    let extent = bounds[intervals] - bounds[0];
    let extra = total.saturating_sub(intervals);
    let shares: Vec<f64> = bounds
        .windows(2)
        .map(|w| extra as f64 * (w[1] - w[0]) / extent)
        .collect();
    let mut counts: Vec<usize> = shares.iter().map(|x| 1 + x.floor() as usize).collect();
    let assigned: usize = counts.iter().sum::<usize>() - intervals;
    let mut order: Vec<usize> = (0..intervals).collect();
    order.sort_by(|&a, &b| {
        let ra = shares[a] - shares[a].floor();
        let rb = shares[b] - shares[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &k in order.iter().take(extra.saturating_sub(assigned)) {
        counts[k] += 1;
    }
    bounds
        .windows(2)
        .zip(counts)
        .flat_map(|(w, n)| linspace(w[0], w[1], n, false))
        .collect()
}

/// Index `k` of the interval `[v[k], v[k+1]]` holding `x`, clamped to the ends.
fn bracket(v: &[f64], x: f64) -> usize {
    let upper = v.partition_point(|&a| a <= x);
    upper.saturating_sub(1).min(v.len() - 2)
}

fn strictly_increasing(v: &[f64]) -> bool {
    v.windows(2).all(|w| w[1] > w[0])
}

fn check_matrix(component: &GridComponent, rows: usize, cols: usize) -> Result<()> {
    let values = &component.thickness.values;
    let bad_shape = values.len() != rows || values.iter().any(|row| row.len() != cols);
    if bad_shape {
        return Err(ConfigError::MatrixDimensions {
            component: component.name.clone(),
            rows: values.len(),
            cols: values.iter().map(Vec::len).max().unwrap_or(0),
            expected_rows: rows,
            expected_cols: cols,
        }
        .into());
    }
    for (row, entries) in values.iter().enumerate() {
        for (col, &value) in entries.iter().enumerate() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::NegativeThickness {
                    component: component.name.clone(),
                    row,
                    col,
                    value,
                }
                .into());
            }
        }
    }
    Ok(())
}

fn invalid(key: &'static str, reason: String) -> crate::error::StellforgeError {
    ConfigError::InvalidValue { key, reason }.into()
}
