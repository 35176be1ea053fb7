use std::collections::HashSet;

use crate::error::{ConfigError, GeometryError, Result};
use crate::math::Point3;

use super::FluxSurface;

/// One stellarator-symmetric Fourier harmonic of the flux-surface shape.
///
/// `rmnc[k]` and `zmns[k]` are the coefficients on surface `s_grid[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FourierMode {
    /// Poloidal mode number, `m >= 0`.
    pub m: i32,
    /// Toroidal mode number per field period.
    pub n: i32,
    /// `R` cosine coefficients per surface.
    pub rmnc: Vec<f64>,
    /// `Z` sine coefficients per surface.
    pub zmns: Vec<f64>,
}

/// Flux surfaces given by VMEC-style Fourier coefficients.
///
/// `R = sum rmnc(s) cos(m theta - n nfp phi)` and
/// `Z = sum zmns(s) sin(m theta - n nfp phi)`. Coefficients are
/// interpolated linearly between the tabulated surfaces and extrapolated
/// linearly from the outermost pair, which is how walls at `s > 1` are
/// reached. Reading the equilibrium file is left to the caller.
#[derive(Debug, Clone)]
pub struct FourierFluxSurface {
    nfp: u32,
    s_grid: Vec<f64>,
    modes: Vec<FourierMode>,
}

impl FourierFluxSurface {
    /// Creates a flux-surface description from tabulated modes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `nfp` is zero, the surface
    /// grid is not strictly increasing with at least two entries, a mode has
    /// `m < 0`, is duplicated, has non-finite coefficients, or its
    /// coefficient tables do not match the grid.
    pub fn new(nfp: u32, s_grid: Vec<f64>, modes: Vec<FourierMode>) -> Result<Self> {
        if nfp == 0 {
            return Err(invalid("nfp", "field period count must be at least 1".into()));
        }
        if s_grid.len() < 2 || s_grid.windows(2).any(|w| w[1] <= w[0]) {
            return Err(invalid(
                "s_grid",
                "need at least two strictly increasing flux labels".into(),
            ));
        }
        let mut seen = HashSet::with_capacity(modes.len());
        for (idx, mode) in modes.iter().enumerate() {
            if mode.m < 0 {
                return Err(invalid(
                    "modes",
                    format!("mode[{idx}] requires m >= 0, got {}", mode.m),
                ));
            }
            if !seen.insert((mode.m, mode.n)) {
                return Err(invalid(
                    "modes",
                    format!("duplicate mode (m={}, n={})", mode.m, mode.n),
                ));
            }
            if mode.rmnc.len() != s_grid.len() || mode.zmns.len() != s_grid.len() {
                return Err(invalid(
                    "modes",
                    format!("mode[{idx}] coefficient tables do not match the flux grid"),
                ));
            }
            if mode.rmnc.iter().chain(&mode.zmns).any(|c| !c.is_finite()) {
                return Err(invalid(
                    "modes",
                    format!("mode[{idx}] contains non-finite coefficients"),
                ));
            }
        }
        Ok(Self { nfp, s_grid, modes })
    }

    /// Number of field periods.
    #[must_use]
    pub fn nfp(&self) -> u32 {
        self.nfp
    }

    /// Interpolation weights `(k, w)` such that `c(s) = (1-w) c[k] + w c[k+1]`.
    fn bracket(&self, s: f64) -> (usize, f64) {
        let last = self.s_grid.len() - 2;
        let k = self
            .s_grid
            .windows(2)
            .position(|w| s <= w[1])
            .unwrap_or(last);
        let (s0, s1) = (self.s_grid[k], self.s_grid[k + 1]);
        (k, (s - s0) / (s1 - s0))
    }
}

fn invalid(key: &'static str, reason: String) -> crate::error::StellforgeError {
    ConfigError::InvalidValue { key, reason }.into()
}

impl FluxSurface for FourierFluxSurface {
    fn position(&self, s: f64, theta: f64, phi: f64) -> Result<Point3> {
        if !(s.is_finite() && theta.is_finite() && phi.is_finite()) || s < 0.0 {
            return Err(GeometryError::FluxQuery {
                s,
                theta,
                phi,
                reason: "flux label must be finite and non-negative".into(),
            }
            .into());
        }
        let (k, w) = self.bracket(s);
        let nfp = f64::from(self.nfp);
        let mut r = 0.0;
        let mut z = 0.0;
        for mode in &self.modes {
            let rmn = mode.rmnc[k] * (1.0 - w) + mode.rmnc[k + 1] * w;
            let zmn = mode.zmns[k] * (1.0 - w) + mode.zmns[k + 1] * w;
            let angle = f64::from(mode.m) * theta - f64::from(mode.n) * nfp * phi;
            let (sin, cos) = angle.sin_cos();
            r += rmn * cos;
            z += zmn * sin;
        }
        Ok(Point3::new(r * phi.cos(), r * phi.sin(), z))
    }
}
