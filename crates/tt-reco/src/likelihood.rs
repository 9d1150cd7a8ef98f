//! Likelihood densities used to rank event interpretations.
//!
//! Two empirical densities, produced by the calibration pass and loaded
//! once at startup: a 1-D density over the neutrino-compatibility
//! distance and a 2-D joint density over the reconstructed hadronic top
//! and W masses. Read-only after initialization; share via `Arc`.

use std::path::Path;
use tt_core::Result;
use tt_hist::{BinLookup, DensityTables, Hist1D, Hist2D};

/// Name of the 1-D neutrino-distance table in the persisted file.
pub const NU_DIST_TABLE: &str = "neutrino_dist";
/// Name of the 2-D (hadronic top mass, hadronic W mass) table.
pub const MASSES_HAD_TABLE: &str = "masses_had";

/// Outcome of a 1-D density lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NuLookup {
    /// Natural log of the density at the given distance.
    LogDensity(f64),
    /// Distance below the table's binning; only reachable through the
    /// signed tiny-negative distance of a rounding anomaly.
    OffLowEnd,
    /// Distance beyond the table's binning.
    OffHighEnd,
}

/// The pair of density tables used for hypothesis ranking.
#[derive(Debug, Clone)]
pub struct LikelihoodTables {
    nu_dist: Hist1D,
    masses_had: Hist2D,
}

impl LikelihoodTables {
    /// Build tables from histograms, normalizing each to unit integral.
    ///
    /// Normalization is idempotent, so histograms that already hold
    /// densities pass through unchanged.
    pub fn from_histograms(mut nu_dist: Hist1D, mut masses_had: Hist2D) -> Result<Self> {
        nu_dist.validate()?;
        masses_had.validate()?;
        nu_dist.normalize_to_density()?;
        masses_had.normalize_to_density()?;
        Ok(Self { nu_dist, masses_had })
    }

    /// Load the tables from a persisted [`DensityTables`] file.
    ///
    /// A missing or malformed file is a fatal startup error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let tables = DensityTables::load(path.as_ref())?;
        let loaded = Self::from_histograms(
            tables.get_1d(NU_DIST_TABLE)?.clone(),
            tables.get_2d(MASSES_HAD_TABLE)?.clone(),
        )?;
        tracing::info!(
            path = %path.as_ref().display(),
            nu_bins = loaded.nu_dist.n_bins(),
            mass_bins = loaded.masses_had.bin_content.len(),
            "loaded likelihood tables"
        );
        Ok(loaded)
    }

    /// Log density of the neutrino-compatibility distance.
    pub fn log_nu_density(&self, distance: f64) -> NuLookup {
        match self.nu_dist.find_bin(distance) {
            BinLookup::Bin(i) => NuLookup::LogDensity(self.nu_dist.value(i).ln()),
            BinLookup::Underflow => NuLookup::OffLowEnd,
            BinLookup::Overflow => NuLookup::OffHighEnd,
        }
    }

    /// Log density of the (hadronic top mass, hadronic W mass) pair, or
    /// `None` when either mass is outside the table's binning.
    pub fn log_mass_density(&self, mass_top: f64, mass_w: f64) -> Option<f64> {
        self.masses_had.value_at(mass_top, mass_w).map(f64::ln)
    }

    /// The 1-D neutrino-distance density.
    pub fn nu_dist(&self) -> &Hist1D {
        &self.nu_dist
    }

    /// The 2-D (hadronic top mass, hadronic W mass) density.
    pub fn masses_had(&self) -> &Hist2D {
        &self.masses_had
    }
}
