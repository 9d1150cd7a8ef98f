//! Ordered event-processing stages over a shared per-event context.
//!
//! Stages run one event at a time, single-threaded, in registration
//! order. A stage that rejects an event short-circuits the rest of the
//! chain for that event; a stage error aborts the whole run.

use crate::ranker::RecoResult;
use tt_core::{Event, EventSource, FourMomentum, Result};

/// Per-event state shared along the stage chain.
///
/// Owned exclusively by the pipeline for the duration of one event; a
/// fresh context is built for every event, so no state leaks between
/// events through it.
#[derive(Debug)]
pub struct EventContext {
    /// The event as delivered by the source.
    pub event: Event,
    /// Four-momentum of the selected tight lepton, once selection ran.
    pub lepton: Option<FourMomentum>,
    /// Transverse W mass computed by the selection stage.
    pub mt_w: Option<f64>,
    /// Outcome of the hypothesis ranker, once it ran.
    pub reco: Option<RecoResult>,
}

impl EventContext {
    /// Wrap a freshly read event.
    pub fn new(event: Event) -> Self {
        Self { event, lepton: None, mt_w: None, reco: None }
    }
}

/// Decision of a stage about the current event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageVerdict {
    /// Hand the event to the next stage.
    Continue,
    /// Drop the event; later stages do not see it.
    Reject,
}

/// One step of the event-processing chain.
pub trait Stage {
    /// Stage name used in run summaries and logs.
    fn name(&self) -> &str;

    /// Process one event, reading and extending the shared context.
    fn process(&mut self, ctx: &mut EventContext) -> Result<StageVerdict>;

    /// Called once after the last event; stages that accumulate state
    /// (calibration histograms, counters) finalize it here.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Counts collected over one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Events read from the source.
    pub events_read: u64,
    /// Events accepted by every stage.
    pub events_accepted: u64,
    /// Per-stage rejection counts, in registration order.
    pub rejections: Vec<(String, u64)>,
}

/// An ordered chain of stages driven over an event source.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage to the end of the chain.
    pub fn register(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    /// Drain the source, running every event through the chain.
    ///
    /// Per-event rejections are counted, not errors; an `Err` from a
    /// stage (violated internal assumption, misconfiguration) aborts the
    /// run immediately.
    pub fn run(&mut self, source: &mut dyn EventSource) -> Result<RunSummary> {
        let mut summary = RunSummary {
            events_read: 0,
            events_accepted: 0,
            rejections: self.stages.iter().map(|s| (s.name().to_string(), 0)).collect(),
        };

        while let Some(event) = source.next_event()? {
            summary.events_read += 1;
            let mut ctx = EventContext::new(event);

            let mut accepted = true;
            for (i, stage) in self.stages.iter_mut().enumerate() {
                match stage.process(&mut ctx)? {
                    StageVerdict::Continue => {}
                    StageVerdict::Reject => {
                        summary.rejections[i].1 += 1;
                        accepted = false;
                        break;
                    }
                }
            }
            if accepted {
                summary.events_accepted += 1;
            }
        }

        for stage in &mut self.stages {
            stage.finish()?;
        }

        tracing::info!(
            events_read = summary.events_read,
            events_accepted = summary.events_accepted,
            "pipeline run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_core::{Error, MissingMomentum, VecEventSource};

    fn empty_event() -> Event {
        Event {
            leptons: vec![],
            jets: vec![],
            missing: MissingMomentum { pt: 0.0, phi: 0.0 },
            weight: 1.0,
            gen_particles: vec![],
        }
    }

    /// Rejects every `n`-th event; counts how many it saw.
    struct RejectEvery {
        n: u64,
        seen: u64,
    }

    impl Stage for RejectEvery {
        fn name(&self) -> &str {
            "reject_every"
        }

        fn process(&mut self, _ctx: &mut EventContext) -> Result<StageVerdict> {
            self.seen += 1;
            if self.seen % self.n == 0 {
                Ok(StageVerdict::Reject)
            } else {
                Ok(StageVerdict::Continue)
            }
        }
    }

    struct CountOnly {
        seen: u64,
    }

    impl Stage for CountOnly {
        fn name(&self) -> &str {
            "count_only"
        }

        fn process(&mut self, _ctx: &mut EventContext) -> Result<StageVerdict> {
            self.seen += 1;
            Ok(StageVerdict::Continue)
        }
    }

    #[test]
    fn test_rejection_short_circuits() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(RejectEvery { n: 3, seen: 0 }));
        pipeline.register(Box::new(CountOnly { seen: 0 }));

        let mut source = VecEventSource::new((0..9).map(|_| empty_event()).collect());
        let summary = pipeline.run(&mut source).unwrap();

        assert_eq!(summary.events_read, 9);
        assert_eq!(summary.events_accepted, 6);
        assert_eq!(summary.rejections[0], ("reject_every".to_string(), 3));
        assert_eq!(summary.rejections[1], ("count_only".to_string(), 0));
    }

    struct FailingStage;

    impl Stage for FailingStage {
        fn name(&self) -> &str {
            "failing"
        }

        fn process(&mut self, _ctx: &mut EventContext) -> Result<StageVerdict> {
            Err(Error::Internal("assumption violated".into()))
        }
    }

    #[test]
    fn test_stage_error_aborts_run() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(FailingStage));

        let mut source = VecEventSource::new(vec![empty_event(), empty_event()]);
        assert!(matches!(pipeline.run(&mut source), Err(Error::Internal(_))));
    }
}
