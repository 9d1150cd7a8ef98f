//! 2-D histogram with explicit bin edges on both axes.

use crate::hist1::{locate, BinLookup};
use serde::{Deserialize, Serialize};
use tt_core::{Error, Result};

/// A 2-D histogram stored row-major: `bin_content[ix * n_y + iy]`.
///
/// Weight falling outside the binned rectangle on either axis is folded
/// into a single `outside` accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist2D {
    /// Histogram name.
    pub name: String,
    /// Bin edges along x (length = x bins + 1).
    pub x_edges: Vec<f64>,
    /// Bin edges along y (length = y bins + 1).
    pub y_edges: Vec<f64>,
    /// Bin contents, row-major in x.
    pub bin_content: Vec<f64>,
    /// Weight accumulated outside the binned rectangle.
    pub outside: f64,
    /// Total number of fill calls.
    pub entries: u64,
}

impl Hist2D {
    /// Create an empty histogram with uniform binning on both axes.
    pub fn with_uniform_bins(
        name: impl Into<String>,
        n_x: usize,
        x_lo: f64,
        x_hi: f64,
        n_y: usize,
        y_lo: f64,
        y_hi: f64,
    ) -> Result<Self> {
        if n_x == 0 || n_y == 0 {
            return Err(Error::Validation("Hist2D requires at least 1 bin per axis".into()));
        }
        if !(x_lo.is_finite() && x_hi.is_finite() && x_lo < x_hi)
            || !(y_lo.is_finite() && y_hi.is_finite() && y_lo < y_hi)
        {
            return Err(Error::Validation(format!(
                "Hist2D requires finite lo < hi per axis, got x=[{x_lo}, {x_hi}], y=[{y_lo}, {y_hi}]"
            )));
        }

        let wx = (x_hi - x_lo) / n_x as f64;
        let wy = (y_hi - y_lo) / n_y as f64;
        let x_edges = (0..=n_x).map(|i| x_lo + wx * i as f64).collect();
        let y_edges = (0..=n_y).map(|i| y_lo + wy * i as f64).collect();
        Self::from_edges(name, x_edges, y_edges)
    }

    /// Create an empty histogram from explicit edges.
    pub fn from_edges(name: impl Into<String>, x_edges: Vec<f64>, y_edges: Vec<f64>) -> Result<Self> {
        let n_x = x_edges.len().saturating_sub(1);
        let n_y = y_edges.len().saturating_sub(1);
        let hist = Self {
            name: name.into(),
            x_edges,
            y_edges,
            bin_content: vec![0.0; n_x * n_y],
            outside: 0.0,
            entries: 0,
        };
        hist.validate()?;
        Ok(hist)
    }

    /// Check the structural invariants; used after deserialization.
    pub fn validate(&self) -> Result<()> {
        for (axis, edges) in [("x", &self.x_edges), ("y", &self.y_edges)] {
            if edges.len() < 2 {
                return Err(Error::Validation(format!(
                    "Hist2D '{}' requires at least 2 {axis} edges, got {}",
                    self.name,
                    edges.len()
                )));
            }
            for (i, e) in edges.iter().enumerate() {
                if !e.is_finite() {
                    return Err(Error::Validation(format!(
                        "Hist2D '{}' {axis}_edges[{i}] must be finite, got {e}",
                        self.name
                    )));
                }
                if i > 0 && edges[i - 1] >= *e {
                    return Err(Error::Validation(format!(
                        "Hist2D '{}' {axis} edges must be strictly increasing at index {i}",
                        self.name
                    )));
                }
            }
        }
        if self.bin_content.len() != self.n_x() * self.n_y() {
            return Err(Error::Validation(format!(
                "Hist2D '{}' bin_content length mismatch: expected {}, got {}",
                self.name,
                self.n_x() * self.n_y(),
                self.bin_content.len()
            )));
        }
        for (i, w) in self.bin_content.iter().enumerate() {
            if !w.is_finite() || *w < 0.0 {
                return Err(Error::Validation(format!(
                    "Hist2D '{}' bin_content[{i}] must be finite and >= 0, got {w}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Number of bins along x.
    pub fn n_x(&self) -> usize {
        self.x_edges.len() - 1
    }

    /// Number of bins along y.
    pub fn n_y(&self) -> usize {
        self.y_edges.len() - 1
    }

    /// Add weight `w` at `(x, y)`.
    pub fn fill(&mut self, x: f64, y: f64, w: f64) {
        self.entries += 1;
        let n_y = self.n_y();
        match self.find_bin(x, y) {
            Some((ix, iy)) => self.bin_content[ix * n_y + iy] += w,
            None => self.outside += w,
        }
    }

    /// Locate `(x, y)`, or `None` when either coordinate is out of range.
    ///
    /// Upper edges are counted inside the last bin of each axis.
    pub fn find_bin(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let ix = match locate(&self.x_edges, x) {
            BinLookup::Bin(i) => i,
            _ => return None,
        };
        let iy = match locate(&self.y_edges, y) {
            BinLookup::Bin(i) => i,
            _ => return None,
        };
        Some((ix, iy))
    }

    /// Content of bin `(ix, iy)`.
    pub fn value(&self, ix: usize, iy: usize) -> f64 {
        self.bin_content[ix * self.n_y() + iy]
    }

    /// Content of the bin containing `(x, y)`, or `None` outside the binning.
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        self.find_bin(x, y).map(|(ix, iy)| self.value(ix, iy))
    }

    /// Integral over the binned rectangle: sum of content times cell area.
    pub fn integral(&self) -> f64 {
        let mut total = 0.0;
        for ix in 0..self.n_x() {
            let wx = self.x_edges[ix + 1] - self.x_edges[ix];
            for iy in 0..self.n_y() {
                let wy = self.y_edges[iy + 1] - self.y_edges[iy];
                total += self.value(ix, iy) * wx * wy;
            }
        }
        total
    }

    /// Scale the contents so the integral over the binned rectangle is 1.
    pub fn normalize_to_density(&mut self) -> Result<()> {
        let integral = self.integral();
        if !(integral.is_finite() && integral > 0.0) {
            return Err(Error::Validation(format!(
                "Hist2D '{}' cannot be normalized: integral = {integral}",
                self.name
            )));
        }
        for c in &mut self.bin_content {
            *c /= integral;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fill_and_lookup() {
        let mut h = Hist2D::with_uniform_bins("h", 2, 0.0, 2.0, 2, 0.0, 2.0).unwrap();
        h.fill(0.5, 1.5, 2.0);
        h.fill(1.5, 0.5, 3.0);
        h.fill(-1.0, 0.5, 1.0);
        h.fill(0.5, 5.0, 1.0);

        assert_eq!(h.entries, 4);
        assert_relative_eq!(h.outside, 2.0);
        assert_relative_eq!(h.value_at(0.5, 1.5).unwrap(), 2.0);
        assert_relative_eq!(h.value_at(1.5, 0.5).unwrap(), 3.0);
        assert!(h.value_at(0.5, 2.5).is_none());
        // Upper corner lands in the last cell.
        assert_eq!(h.find_bin(2.0, 2.0), Some((1, 1)));
    }

    #[test]
    fn test_normalize_to_density() {
        let mut h = Hist2D::with_uniform_bins("h", 2, 0.0, 2.0, 1, 0.0, 4.0).unwrap();
        h.fill(0.5, 2.0, 1.0);
        h.fill(1.5, 2.0, 3.0);
        h.normalize_to_density().unwrap();
        assert_relative_eq!(h.integral(), 1.0, max_relative = 1e-12);
        // Cell area is 4.0, so the denser cell holds 3/4 of the mass.
        assert_relative_eq!(h.value(1, 0), 0.75 / 4.0, max_relative = 1e-12);
    }

    #[test]
    fn test_bad_construction_rejected() {
        assert!(Hist2D::with_uniform_bins("h", 0, 0.0, 1.0, 2, 0.0, 1.0).is_err());
        assert!(Hist2D::from_edges("h", vec![0.0, 1.0], vec![1.0, 1.0]).is_err());
    }
}
