//! Run configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tt_core::{Error, Result};

/// Top-quark mass used in the constraints by default (GeV); matches the
/// mass the calibration samples were generated with.
pub const DEFAULT_MASS_TOP: f64 = 173.0;
/// W-boson mass used in the constraints by default (GeV).
pub const DEFAULT_MASS_W: f64 = 80.419002;

fn default_mass_top() -> f64 {
    DEFAULT_MASS_TOP
}

fn default_mass_w() -> f64 {
    DEFAULT_MASS_W
}

fn default_matching_max_dr() -> f64 {
    0.2
}

/// Configuration for a reconstruction run.
///
/// All fields except the tables path have defaults, so a minimal config
/// file only names the likelihood tables.
#[derive(Debug, Clone, Deserialize)]
pub struct RecoConfig {
    /// Top-quark mass entering the constraints (GeV).
    #[serde(default = "default_mass_top")]
    pub mass_top: f64,
    /// W-boson mass entering the constraints (GeV).
    #[serde(default = "default_mass_w")]
    pub mass_w: f64,
    /// Pt floor of the jet selection inside the hypothesis search (GeV).
    #[serde(default)]
    pub jet_min_pt: f64,
    /// Absolute-pseudorapidity ceiling of that selection; unrestricted
    /// when absent.
    #[serde(default)]
    pub jet_max_abs_eta: Option<f64>,
    /// Angular threshold for truth-jet matching in the calibration and
    /// performance passes.
    #[serde(default = "default_matching_max_dr")]
    pub matching_max_dr: f64,
    /// Path of the likelihood tables file.
    pub tables_path: PathBuf,
}

impl RecoConfig {
    /// Defaults with the given tables path.
    pub fn with_tables_path(tables_path: impl Into<PathBuf>) -> Self {
        Self {
            mass_top: DEFAULT_MASS_TOP,
            mass_w: DEFAULT_MASS_W,
            jet_min_pt: 0.0,
            jet_max_abs_eta: None,
            matching_max_dr: default_matching_max_dr(),
            tables_path: tables_path.into(),
        }
    }

    /// Load and validate a JSON config file. Any problem here is fatal
    /// and must abort before event processing starts.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.mass_top.is_finite() && self.mass_top > 0.0) {
            return Err(Error::Validation(format!(
                "mass_top must be finite and > 0, got {}",
                self.mass_top
            )));
        }
        if !(self.mass_w.is_finite() && self.mass_w > 0.0) {
            return Err(Error::Validation(format!(
                "mass_w must be finite and > 0, got {}",
                self.mass_w
            )));
        }
        if self.mass_w >= self.mass_top {
            return Err(Error::Validation(format!(
                "mass_w ({}) must be below mass_top ({})",
                self.mass_w, self.mass_top
            )));
        }
        if !(self.jet_min_pt.is_finite() && self.jet_min_pt >= 0.0) {
            return Err(Error::Validation(format!(
                "jet_min_pt must be finite and >= 0, got {}",
                self.jet_min_pt
            )));
        }
        if let Some(eta) = self.jet_max_abs_eta {
            if !(eta.is_finite() && eta > 0.0) {
                return Err(Error::Validation(format!(
                    "jet_max_abs_eta must be finite and > 0, got {eta}"
                )));
            }
        }
        if !(self.matching_max_dr.is_finite() && self.matching_max_dr > 0.0) {
            return Err(Error::Validation(format!(
                "matching_max_dr must be finite and > 0, got {}",
                self.matching_max_dr
            )));
        }
        Ok(())
    }

    /// The pseudorapidity ceiling as a plain number.
    pub fn jet_max_abs_eta(&self) -> f64 {
        self.jet_max_abs_eta.unwrap_or(f64::INFINITY)
    }
}
