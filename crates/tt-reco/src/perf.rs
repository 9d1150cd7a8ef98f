//! Performance probe for the hypothesis search.
//!
//! For truth-known events that the ranker reconstructed, accumulates the
//! relative bias of the reconstructed ttbar mass and the efficiency of
//! identifying all four role jets, both as profiles versus the true
//! ttbar mass.

use crate::pipeline::{EventContext, Stage, StageVerdict};
use crate::ranker::RecoStatus;
use crate::truth::{classify_semileptonic, match_decay_jets};
use tt_core::{Error, Result};
use tt_hist::Profile1D;

/// Stage comparing ranked interpretations against the generator truth.
///
/// Must run after the hypothesis ranker, which rejects events it could
/// not reconstruct, so only successes arrive here.
pub struct PerformanceProbe {
    prof_bias: Profile1D,
    prof_efficiency: Profile1D,
    max_dr: f64,
    n_visited: u64,
    n_targeted: u64,
    n_matchable: u64,
}

impl PerformanceProbe {
    /// Create a probe with the given truth-matching threshold; profiles
    /// cover true ttbar masses from 350 to 1000 GeV in 12 bins.
    pub fn new(max_dr: f64) -> Result<Self> {
        Ok(Self {
            prof_bias: Profile1D::with_uniform_bins("mass_bias", 12, 350.0, 1000.0)?,
            prof_efficiency: Profile1D::with_uniform_bins("assignment_efficiency", 12, 350.0, 1000.0)?,
            max_dr,
            n_visited: 0,
            n_targeted: 0,
            n_matchable: 0,
        })
    }

    /// Relative bias of the reconstructed ttbar mass versus the true one.
    pub fn bias(&self) -> &Profile1D {
        &self.prof_bias
    }

    /// Fraction of events with all four role jets identified correctly.
    pub fn efficiency(&self) -> &Profile1D {
        &self.prof_efficiency
    }

    /// (visited, targeted, matchable) event counts.
    pub fn counts(&self) -> (u64, u64, u64) {
        (self.n_visited, self.n_targeted, self.n_matchable)
    }
}

impl Stage for PerformanceProbe {
    fn name(&self) -> &str {
        "performance_probe"
    }

    fn process(&mut self, ctx: &mut EventContext) -> Result<StageVerdict> {
        self.n_visited += 1;

        let particles = &ctx.event.gen_particles;
        let decay = match classify_semileptonic(particles)? {
            Some(decay) => decay,
            None => return Ok(StageVerdict::Reject),
        };
        self.n_targeted += 1;

        let jets = &ctx.event.jets;
        let matched = match match_decay_jets(jets, particles, &decay, self.max_dr) {
            Some(matched) => matched,
            None => return Ok(StageVerdict::Reject),
        };
        self.n_matchable += 1;

        let lepton = ctx.lepton.ok_or_else(|| {
            Error::Validation("performance probe requires a selected lepton upstream".into())
        })?;
        let reco = ctx.reco.as_ref().ok_or_else(|| {
            Error::Validation("performance probe requires the hypothesis ranker upstream".into())
        })?;
        if reco.status != RecoStatus::Success {
            return Ok(StageVerdict::Reject);
        }
        let Some(hypothesis) = reco.hypothesis.as_ref() else {
            return Ok(StageVerdict::Reject);
        };

        // True ttbar mass from the b quarks' top mothers.
        let top_lep = particles[decay.b_lep].mother.ok_or_else(|| {
            Error::Validation("classified b quark without a top mother".into())
        })?;
        let top_had = particles[decay.b_had].mother.ok_or_else(|| {
            Error::Validation("classified b quark without a top mother".into())
        })?;
        let true_mtt = (particles[top_lep].p4 + particles[top_had].p4).mass();

        let reco_mtt =
            (hypothesis.top_lep_p4(&lepton, jets) + hypothesis.top_had_p4(jets)).mass();
        let weight = ctx.event.weight;

        self.prof_bias.fill(true_mtt, reco_mtt / true_mtt - 1.0, weight);

        let all_matched = hypothesis.b_top_lep == matched.b_lep
            && hypothesis.b_top_had == matched.b_had
            && hypothesis.q1_top_had == matched.q1
            && hypothesis.q2_top_had == matched.q2;
        self.prof_efficiency.fill(true_mtt, f64::from(u8::from(all_matched)), weight);

        Ok(StageVerdict::Continue)
    }

    fn finish(&mut self) -> Result<()> {
        tracing::info!(
            visited = self.n_visited,
            targeted = self.n_targeted,
            matchable = self.n_matchable,
            "performance probe complete"
        );
        Ok(())
    }
}
