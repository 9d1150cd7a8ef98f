//! 1-D histogram with explicit bin edges and under/overflow tracking.

use serde::{Deserialize, Serialize};
use tt_core::{Error, Result};

/// Outcome of locating a value on a histogram's binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinLookup {
    /// Below the first bin edge.
    Underflow,
    /// Inside the binned range; holds the bin index.
    Bin(usize),
    /// Above the last bin edge (non-finite values land here too).
    Overflow,
}

/// A 1-D histogram.
///
/// Bin edges are explicit and strictly increasing; contents exclude the
/// under/overflow accumulators. After [`Hist1D::normalize_to_density`] the
/// contents are a probability density on the binned range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist1D {
    /// Histogram name.
    pub name: String,
    /// Bin edges (length = number of bins + 1).
    pub bin_edges: Vec<f64>,
    /// Bin contents (length = number of bins).
    pub bin_content: Vec<f64>,
    /// Underflow accumulator.
    pub underflow: f64,
    /// Overflow accumulator.
    pub overflow: f64,
    /// Total number of fill calls.
    pub entries: u64,
}

impl Hist1D {
    /// Create an empty histogram with `n_bins` uniform bins on `[lo, hi]`.
    pub fn with_uniform_bins(name: impl Into<String>, n_bins: usize, lo: f64, hi: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Validation("Hist1D requires at least 1 bin".into()));
        }
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(Error::Validation(format!(
                "Hist1D requires finite lo < hi, got [{lo}, {hi}]"
            )));
        }

        let width = (hi - lo) / n_bins as f64;
        let edges = (0..=n_bins).map(|i| lo + width * i as f64).collect();
        Self::from_edges(name, edges)
    }

    /// Create an empty histogram from explicit bin edges.
    pub fn from_edges(name: impl Into<String>, bin_edges: Vec<f64>) -> Result<Self> {
        let n_bins = bin_edges.len().saturating_sub(1);
        let hist = Self {
            name: name.into(),
            bin_edges,
            bin_content: vec![0.0; n_bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        };
        hist.validate()?;
        Ok(hist)
    }

    /// Check the structural invariants; used after deserialization.
    pub fn validate(&self) -> Result<()> {
        if self.bin_edges.len() < 2 {
            return Err(Error::Validation(format!(
                "Hist1D '{}' requires at least 2 bin edges, got {}",
                self.name,
                self.bin_edges.len()
            )));
        }
        if self.bin_content.len() + 1 != self.bin_edges.len() {
            return Err(Error::Validation(format!(
                "Hist1D '{}' bin_content length mismatch: expected {}, got {}",
                self.name,
                self.bin_edges.len() - 1,
                self.bin_content.len()
            )));
        }
        for (i, e) in self.bin_edges.iter().enumerate() {
            if !e.is_finite() {
                return Err(Error::Validation(format!(
                    "Hist1D '{}' bin_edges[{i}] must be finite, got {e}",
                    self.name
                )));
            }
            if i > 0 && self.bin_edges[i - 1] >= *e {
                return Err(Error::Validation(format!(
                    "Hist1D '{}' bin edges must be strictly increasing at index {i}",
                    self.name
                )));
            }
        }
        for (i, w) in self.bin_content.iter().enumerate() {
            if !w.is_finite() || *w < 0.0 {
                return Err(Error::Validation(format!(
                    "Hist1D '{}' bin_content[{i}] must be finite and >= 0, got {w}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Number of bins, excluding under/overflow.
    pub fn n_bins(&self) -> usize {
        self.bin_content.len()
    }

    /// Width of bin `i`.
    pub fn bin_width(&self, i: usize) -> f64 {
        self.bin_edges[i + 1] - self.bin_edges[i]
    }

    /// Center of bin `i`.
    pub fn bin_center(&self, i: usize) -> f64 {
        0.5 * (self.bin_edges[i] + self.bin_edges[i + 1])
    }

    /// Add weight `w` at coordinate `x`.
    pub fn fill(&mut self, x: f64, w: f64) {
        self.entries += 1;
        match self.find_bin(x) {
            BinLookup::Underflow => self.underflow += w,
            BinLookup::Overflow => self.overflow += w,
            BinLookup::Bin(i) => self.bin_content[i] += w,
        }
    }

    /// Locate coordinate `x` on the binning.
    ///
    /// The upper edge of the last bin is counted inside the last bin.
    pub fn find_bin(&self, x: f64) -> BinLookup {
        locate(&self.bin_edges, x)
    }

    /// Content of bin `i`.
    pub fn value(&self, i: usize) -> f64 {
        self.bin_content[i]
    }

    /// Content of the bin containing `x`, or `None` outside the binning.
    pub fn value_at(&self, x: f64) -> Option<f64> {
        match self.find_bin(x) {
            BinLookup::Bin(i) => Some(self.bin_content[i]),
            _ => None,
        }
    }

    /// Integral over the binned range: sum of content times bin width.
    pub fn integral(&self) -> f64 {
        self.bin_content
            .iter()
            .enumerate()
            .map(|(i, c)| c * self.bin_width(i))
            .sum()
    }

    /// Scale the contents so the integral over the binned range is 1.
    ///
    /// Idempotent: applying it to a histogram that already holds a density
    /// leaves the contents unchanged.
    pub fn normalize_to_density(&mut self) -> Result<()> {
        let integral = self.integral();
        if !(integral.is_finite() && integral > 0.0) {
            return Err(Error::Validation(format!(
                "Hist1D '{}' cannot be normalized: integral = {integral}",
                self.name
            )));
        }
        for c in &mut self.bin_content {
            *c /= integral;
        }
        Ok(())
    }
}

/// Locate `x` on a strictly increasing edge sequence.
///
/// The upper edge of the last bin counts as inside it; NaN is excluded
/// like overflow.
pub(crate) fn locate(edges: &[f64], x: f64) -> BinLookup {
    if x.is_nan() {
        return BinLookup::Overflow;
    }

    let lo = edges[0];
    let hi = *edges.last().unwrap_or(&lo);
    if x < lo {
        return BinLookup::Underflow;
    }
    if x > hi {
        return BinLookup::Overflow;
    }
    if x >= hi {
        return BinLookup::Bin(edges.len() - 2);
    }

    // `k` is the number of edges <= x, so the bin index is k-1.
    let k = edges.partition_point(|e| *e <= x);
    BinLookup::Bin(k - 1)
}
