//! # tt-hist
//!
//! Binned containers for ttbar-reco: 1-D and 2-D histograms with explicit
//! bin edges, profile histograms, and a named-table file format used to
//! persist the pre-normalized likelihood densities.
//!
//! ## Example
//!
//! ```
//! use tt_hist::Hist1D;
//!
//! let mut h = Hist1D::with_uniform_bins("dist", 100, 0.0, 200.0).unwrap();
//! h.fill(12.5, 1.0);
//! h.normalize_to_density().unwrap();
//! assert!(h.value_at(12.5).unwrap() > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hist1;
pub mod hist2;
pub mod profile;
pub mod tables;

pub use hist1::{BinLookup, Hist1D};
pub use hist2::Hist2D;
pub use profile::Profile1D;
pub use tables::{DensityTables, DENSITY_TABLES_SCHEMA};
