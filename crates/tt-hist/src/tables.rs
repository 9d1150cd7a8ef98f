//! Persisted collections of named histograms.
//!
//! The calibration pass writes its normalized densities as a
//! `DensityTables` JSON file; reconstruction loads them by name at
//! startup. Bin edges are part of the persisted format and survive the
//! round trip exactly.

use crate::{Hist1D, Hist2D};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tt_core::{Error, Result};

/// Schema identifier written into every tables file.
pub const DENSITY_TABLES_SCHEMA: &str = "ttbar_reco_density_tables_v1";

/// A named set of 1-D and 2-D histograms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityTables {
    /// Schema identifier; checked on load.
    pub schema_version: String,
    /// 1-D histograms by name.
    pub hists_1d: BTreeMap<String, Hist1D>,
    /// 2-D histograms by name.
    pub hists_2d: BTreeMap<String, Hist2D>,
}

impl DensityTables {
    /// Create an empty set with the current schema version.
    pub fn new() -> Self {
        Self {
            schema_version: DENSITY_TABLES_SCHEMA.to_string(),
            hists_1d: BTreeMap::new(),
            hists_2d: BTreeMap::new(),
        }
    }

    /// Look up a 1-D histogram by name.
    pub fn get_1d(&self, name: &str) -> Result<&Hist1D> {
        self.hists_1d
            .get(name)
            .ok_or_else(|| Error::Validation(format!("tables hold no 1-D histogram '{name}'")))
    }

    /// Look up a 2-D histogram by name.
    pub fn get_2d(&self, name: &str) -> Result<&Hist2D> {
        self.hists_2d
            .get(name)
            .ok_or_else(|| Error::Validation(format!("tables hold no 2-D histogram '{name}'")))
    }

    /// Write the tables as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read tables from a JSON file, checking the schema version and the
    /// structural invariants of every histogram.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let tables: Self = serde_json::from_reader(BufReader::new(file))?;

        if tables.schema_version != DENSITY_TABLES_SCHEMA {
            return Err(Error::Validation(format!(
                "unsupported tables schema '{}', expected '{}'",
                tables.schema_version, DENSITY_TABLES_SCHEMA
            )));
        }
        for h in tables.hists_1d.values() {
            h.validate()?;
        }
        for h in tables.hists_2d.values() {
            h.validate()?;
        }
        Ok(tables)
    }
}

impl Default for DensityTables {
    fn default() -> Self {
        Self::new()
    }
}
