//! Profile histogram: per-bin weighted mean of a dependent quantity.

use crate::hist1::{locate, BinLookup};
use crate::Hist1D;
use serde::{Deserialize, Serialize};
use tt_core::Result;

/// Accumulates the weighted mean of `y` in bins of `x`.
///
/// Entries falling outside the binned range are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile1D {
    /// Profile name.
    pub name: String,
    /// Bin edges (length = number of bins + 1).
    pub bin_edges: Vec<f64>,
    /// Per-bin sum of weights.
    pub sum_w: Vec<f64>,
    /// Per-bin sum of weight times y.
    pub sum_wy: Vec<f64>,
    /// Total number of in-range fill calls.
    pub entries: u64,
}

impl Profile1D {
    /// Create an empty profile with `n_bins` uniform bins on `[lo, hi]`.
    pub fn with_uniform_bins(name: impl Into<String>, n_bins: usize, lo: f64, hi: f64) -> Result<Self> {
        let template = Hist1D::with_uniform_bins("", n_bins, lo, hi)?;
        Ok(Self {
            name: name.into(),
            bin_edges: template.bin_edges,
            sum_w: vec![0.0; n_bins],
            sum_wy: vec![0.0; n_bins],
            entries: 0,
        })
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.sum_w.len()
    }

    /// Center of bin `i`.
    pub fn bin_center(&self, i: usize) -> f64 {
        0.5 * (self.bin_edges[i] + self.bin_edges[i + 1])
    }

    /// Accumulate `y` with weight `w` in the bin containing `x`.
    pub fn fill(&mut self, x: f64, y: f64, w: f64) {
        if let BinLookup::Bin(i) = locate(&self.bin_edges, x) {
            self.sum_w[i] += w;
            self.sum_wy[i] += w * y;
            self.entries += 1;
        }
    }

    /// Weighted mean of `y` in bin `i`, or `None` for an empty bin.
    pub fn mean(&self, i: usize) -> Option<f64> {
        if self.sum_w[i] > 0.0 {
            Some(self.sum_wy[i] / self.sum_w[i])
        } else {
            None
        }
    }
}
