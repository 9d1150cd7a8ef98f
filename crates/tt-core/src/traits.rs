//! Core traits for ttbar-reco
//!
//! Reconstruction code depends on the `EventSource` abstraction rather
//! than on any concrete file format; readers live outside this workspace.

use crate::types::Event;
use crate::Result;

/// A source of collision events.
///
/// Implementations own whatever buffering and decoding they need and hand
/// out one event at a time. Jets must be sorted by descending pt and pass
/// the reader-level kinematic selection before they reach this interface.
pub trait EventSource {
    /// Produce the next event, or `None` when the source is exhausted.
    fn next_event(&mut self) -> Result<Option<Event>>;

    /// Whether events carry a generator-level record.
    ///
    /// Stages that need truth information (calibration, performance
    /// probes) check this once before a run starts.
    fn provides_generator_particles(&self) -> bool {
        false
    }
}

/// An in-memory event source backed by a `Vec`.
///
/// Used by tests and small calibration runs.
pub struct VecEventSource {
    events: std::vec::IntoIter<Event>,
    has_gen: bool,
}

impl VecEventSource {
    /// Wrap a collection of events.
    pub fn new(events: Vec<Event>) -> Self {
        let has_gen = events.iter().any(|ev| !ev.gen_particles.is_empty());
        Self { events: events.into_iter(), has_gen }
    }
}

impl EventSource for VecEventSource {
    fn next_event(&mut self) -> Result<Option<Event>> {
        Ok(self.events.next())
    }

    fn provides_generator_particles(&self) -> bool {
        self.has_gen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Event, MissingMomentum};

    fn empty_event() -> Event {
        Event {
            leptons: vec![],
            jets: vec![],
            missing: MissingMomentum { pt: 0.0, phi: 0.0 },
            weight: 1.0,
            gen_particles: vec![],
        }
    }

    #[test]
    fn test_vec_source_drains() {
        let mut source = VecEventSource::new(vec![empty_event(), empty_event()]);
        assert!(!source.provides_generator_particles());
        assert!(source.next_event().unwrap().is_some());
        assert!(source.next_event().unwrap().is_some());
        assert!(source.next_event().unwrap().is_none());
    }
}
