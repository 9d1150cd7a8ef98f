//! # tt-core
//!
//! Shared building blocks for ttbar-reco: the error type, kinematic value
//! types (four-momenta, physics objects, events), and the event-source
//! trait that decouples reconstruction from any concrete file format.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{EventSource, VecEventSource};
pub use types::{
    Event, FourMomentum, GenParticle, Jet, Lepton, LeptonFlavor, MissingMomentum,
};
