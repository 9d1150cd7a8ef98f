//! Combinatorial assignment of jets to the quarks of `tt -> (b l nu)(b q q)`.
//!
//! Every way of choosing the four role jets that respects the b-tagging
//! decisions is considered; each interpretation is ranked by the log of a
//! combined likelihood over the neutrino-compatibility distance and the
//! reconstructed hadronic top and W masses, and the highest-ranked one is
//! accepted.

use crate::likelihood::{LikelihoodTables, NuLookup};
use crate::nu::{NeutrinoSolution, NeutrinoSolver};
use crate::pipeline::{EventContext, Stage, StageVerdict};
use serde::Serialize;
use std::sync::Arc;
use tt_core::{Error, FourMomentum, Jet, MissingMomentum, Result};

/// Jets to be identified in the final state of a ttbar system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayJet {
    /// b-jet from the semileptonically decaying top quark.
    BTopLep,
    /// b-jet from the hadronically decaying top quark.
    BTopHad,
    /// Leading light-flavor jet from the hadronic W decay.
    Q1TopHad,
    /// Subleading light-flavor jet from the hadronic W decay.
    Q2TopHad,
}

/// The accepted interpretation of one event.
///
/// Role jets are referenced by index into the event's jet collection,
/// which is owned by the reader and valid only for the current event.
#[derive(Debug, Clone)]
pub struct Hypothesis {
    /// Index of the b-jet assigned to the leptonic top.
    pub b_top_lep: usize,
    /// Index of the b-jet assigned to the hadronic top.
    pub b_top_had: usize,
    /// Index of the leading light-flavor jet.
    pub q1_top_had: usize,
    /// Index of the subleading light-flavor jet.
    pub q2_top_had: usize,
    /// Rank of this interpretation: the summed log likelihoods.
    pub rank: f64,
    /// Neutrino solution from the winning leptonic-b candidate.
    pub neutrino: NeutrinoSolution,
}

impl Hypothesis {
    /// Index of the jet filling the given role.
    pub fn jet_index(&self, role: DecayJet) -> usize {
        match role {
            DecayJet::BTopLep => self.b_top_lep,
            DecayJet::BTopHad => self.b_top_had,
            DecayJet::Q1TopHad => self.q1_top_had,
            DecayJet::Q2TopHad => self.q2_top_had,
        }
    }

    /// The jet filling the given role.
    pub fn jet<'a>(&self, jets: &'a [Jet], role: DecayJet) -> &'a Jet {
        &jets[self.jet_index(role)]
    }

    /// Four-momentum of the reconstructed leptonically decaying top.
    pub fn top_lep_p4(&self, lepton: &FourMomentum, jets: &[Jet]) -> FourMomentum {
        *lepton + self.neutrino.p4 + jets[self.b_top_lep].p4
    }

    /// Four-momentum of the reconstructed hadronically decaying top.
    pub fn top_had_p4(&self, jets: &[Jet]) -> FourMomentum {
        jets[self.b_top_had].p4 + jets[self.q1_top_had].p4 + jets[self.q2_top_had].p4
    }

    /// Four-momentum of the reconstructed hadronically decaying W.
    pub fn w_had_p4(&self, jets: &[Jet]) -> FourMomentum {
        jets[self.q1_top_had].p4 + jets[self.q2_top_had].p4
    }
}

/// Per-event outcome of the hypothesis search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoStatus {
    /// An interpretation was found and ranked.
    Success,
    /// Fewer than four jets survived the kinematic pre-selection.
    InsufficientJets,
    /// Jets were available but no interpretation could be scored.
    NoInterpretation,
}

impl RecoStatus {
    /// Numeric status code for writer-facing records.
    pub fn code(&self) -> u32 {
        match self {
            RecoStatus::Success => 0,
            RecoStatus::InsufficientJets => 1,
            RecoStatus::NoInterpretation => 2,
        }
    }
}

/// Status plus, on success, the winning hypothesis.
#[derive(Debug, Clone)]
pub struct RecoResult {
    /// Outcome of the search.
    pub status: RecoStatus,
    /// The winning hypothesis; `Some` iff `status` is `Success`.
    pub hypothesis: Option<Hypothesis>,
}

/// Enumerates jet-to-quark assignments and keeps the best-ranked one.
pub struct HypothesisRanker {
    solver: NeutrinoSolver,
    tables: Arc<LikelihoodTables>,
    min_pt: f64,
    max_abs_eta: f64,
    /// Indices of jets passing the kinematic selection; kept across
    /// events only to reuse the allocation.
    selected: Vec<usize>,
}

impl HypothesisRanker {
    /// Create a ranker with the given constraint masses and shared
    /// likelihood tables. Jet selection defaults to no pt floor and no
    /// pseudorapidity ceiling.
    pub fn new(mass_top: f64, mass_w: f64, tables: Arc<LikelihoodTables>) -> Self {
        Self {
            solver: NeutrinoSolver::new(mass_top, mass_w),
            tables,
            min_pt: 0.0,
            max_abs_eta: f64::INFINITY,
            selected: Vec::new(),
        }
    }

    /// Restrict which jets are tried as decay products.
    pub fn set_jet_selection(&mut self, min_pt: f64, max_abs_eta: f64) {
        self.min_pt = min_pt;
        self.max_abs_eta = max_abs_eta;
    }

    /// Access the underlying neutrino solver.
    pub fn solver(&self) -> &NeutrinoSolver {
        &self.solver
    }

    /// Find the best-ranked jet assignment for one event.
    ///
    /// `jets` must be sorted by descending pt; the pt floor of the jet
    /// selection relies on that ordering to stop scanning early.
    pub fn process_event(
        &mut self,
        lepton: &FourMomentum,
        jets: &[Jet],
        missing: &MissingMomentum,
    ) -> Result<RecoResult> {
        self.selected.clear();
        for (i, jet) in jets.iter().enumerate() {
            if jet.p4.eta().abs() > self.max_abs_eta {
                continue;
            }
            if jet.p4.pt() < self.min_pt {
                // The collection is ordered in pt.
                break;
            }
            self.selected.push(i);
        }

        let n_selected = self.selected.len();
        if n_selected < 4 {
            return Ok(RecoResult { status: RecoStatus::InsufficientJets, hypothesis: None });
        }

        let mut highest_rank = f64::NEG_INFINITY;
        let mut best: Option<Hypothesis> = None;

        for ii_b_lep in 0..n_selected {
            let b_lep = self.selected[ii_b_lep];

            // Jets matched to b quarks must be b-tagged.
            if !jets[b_lep].b_tagged {
                continue;
            }

            // The neutrino depends only on the lepton, the leptonic-b
            // candidate, and the missing pt: one solver call covers all
            // hadronic-side combinations.
            let neutrino = match self.solver.reconstruct(lepton, &jets[b_lep].p4, missing)? {
                Some(solution) => solution,
                None => continue,
            };

            let ll_nu = match self.tables.log_nu_density(neutrino.distance) {
                NuLookup::LogDensity(v) => v,
                NuLookup::OffHighEnd | NuLookup::OffLowEnd => continue,
            };

            for ii_b_had in 0..n_selected {
                if ii_b_had == ii_b_lep {
                    continue;
                }
                let b_had = self.selected[ii_b_had];
                if !jets[b_had].b_tagged {
                    continue;
                }

                for ii_q1 in 0..n_selected {
                    if ii_q1 == ii_b_lep || ii_q1 == ii_b_had {
                        continue;
                    }

                    // The surviving list is still ordered in pt, so a
                    // strictly larger second index counts each unordered
                    // light pair exactly once.
                    for ii_q2 in (ii_q1 + 1)..n_selected {
                        if ii_q2 == ii_b_lep || ii_q2 == ii_b_had {
                            continue;
                        }

                        let q1 = self.selected[ii_q1];
                        let q2 = self.selected[ii_q2];

                        let p4_w = jets[q1].p4 + jets[q2].p4;
                        let p4_top = p4_w + jets[b_had].p4;

                        let ll_mass =
                            match self.tables.log_mass_density(p4_top.mass(), p4_w.mass()) {
                                Some(v) => v,
                                None => continue,
                            };

                        let rank = ll_nu + ll_mass;
                        if rank > highest_rank {
                            highest_rank = rank;
                            best = Some(Hypothesis {
                                b_top_lep: b_lep,
                                b_top_had: b_had,
                                q1_top_had: q1,
                                q2_top_had: q2,
                                rank,
                                neutrino,
                            });
                        }
                    }
                }
            }
        }

        match best {
            Some(hypothesis) => {
                tracing::debug!(rank = hypothesis.rank, "accepted interpretation");
                Ok(RecoResult { status: RecoStatus::Success, hypothesis: Some(hypothesis) })
            }
            None => Ok(RecoResult { status: RecoStatus::NoInterpretation, hypothesis: None }),
        }
    }
}

impl Stage for HypothesisRanker {
    fn name(&self) -> &str {
        "hypothesis_ranker"
    }

    fn process(&mut self, ctx: &mut EventContext) -> Result<StageVerdict> {
        let lepton = ctx.lepton.ok_or_else(|| {
            Error::Validation("hypothesis ranker requires a selected lepton upstream".into())
        })?;

        let result = self.process_event(&lepton, &ctx.event.jets, &ctx.event.missing)?;
        let verdict = if result.status == RecoStatus::Success {
            StageVerdict::Continue
        } else {
            StageVerdict::Reject
        };
        ctx.reco = Some(result);
        Ok(verdict)
    }
}

/// Writer-facing flattening of a successful reconstruction.
#[derive(Debug, Clone, Serialize)]
pub struct RecoRecord {
    /// Numeric status code; 0 for success.
    pub status: u32,
    /// Rank of the accepted interpretation.
    pub rank: f64,
    /// Selected lepton.
    pub lepton: FourMomentum,
    /// Solved neutrino.
    pub neutrino: FourMomentum,
    /// b-jet of the leptonic top.
    pub b_top_lep: FourMomentum,
    /// b-jet of the hadronic top.
    pub b_top_had: FourMomentum,
    /// Leading light-flavor jet.
    pub q1_top_had: FourMomentum,
    /// Subleading light-flavor jet.
    pub q2_top_had: FourMomentum,
    /// Reconstructed leptonically decaying top.
    pub top_lep: FourMomentum,
    /// Reconstructed hadronically decaying top.
    pub top_had: FourMomentum,
}

impl RecoRecord {
    /// Flatten a successful result; `None` if reconstruction failed.
    pub fn from_result(result: &RecoResult, lepton: &FourMomentum, jets: &[Jet]) -> Option<Self> {
        let hypothesis = result.hypothesis.as_ref()?;
        Some(Self {
            status: result.status.code(),
            rank: hypothesis.rank,
            lepton: *lepton,
            neutrino: hypothesis.neutrino.p4,
            b_top_lep: jets[hypothesis.b_top_lep].p4,
            b_top_had: jets[hypothesis.b_top_had].p4,
            q1_top_had: jets[hypothesis.q1_top_had].p4,
            q2_top_had: jets[hypothesis.q2_top_had].p4,
            top_lep: hypothesis.top_lep_p4(lepton, jets),
            top_had: hypothesis.top_had_p4(jets),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::likelihood::{MASSES_HAD_TABLE, NU_DIST_TABLE};
    use tt_hist::{Hist1D, Hist2D};

    /// Tables with a falling distance density and a mass density peaked
    /// at the given point.
    fn peaked_tables(mass_top: f64, mass_w: f64) -> Arc<LikelihoodTables> {
        let mut nu = Hist1D::with_uniform_bins(NU_DIST_TABLE, 100, 0.0, 200.0).unwrap();
        for i in 0..nu.n_bins() {
            let center = nu.bin_center(i);
            nu.bin_content[i] = (-center / 20.0).exp();
        }

        let mut masses =
            Hist2D::with_uniform_bins(MASSES_HAD_TABLE, 200, 50.0, 250.0, 150, 0.0, 150.0)
                .unwrap();
        let n_y = masses.n_y();
        for ix in 0..masses.n_x() {
            let mt = 0.5 * (masses.x_edges[ix] + masses.x_edges[ix + 1]);
            for iy in 0..n_y {
                let mw = 0.5 * (masses.y_edges[iy] + masses.y_edges[iy + 1]);
                let arg = ((mt - mass_top) / 15.0).powi(2) + ((mw - mass_w) / 10.0).powi(2);
                masses.bin_content[ix * n_y + iy] = (-0.5 * arg).exp();
            }
        }

        Arc::new(LikelihoodTables::from_histograms(nu, masses).unwrap())
    }

    fn jet(px: f64, py: f64, pz: f64, m: f64, b_tagged: bool) -> Jet {
        Jet { p4: FourMomentum::from_px_py_pz_m(px, py, pz, m), b_tagged }
    }

    #[test]
    fn test_insufficient_jets_skips_solver() {
        let tables = peaked_tables(173.0, 80.4);
        let mut ranker = HypothesisRanker::new(173.0, 80.419002, tables);
        let lepton = FourMomentum::from_px_py_pz_m(40.0, 10.0, 5.0, 0.0);
        let missing = MissingMomentum::from_px_py(20.0, -5.0);

        let jets = vec![
            jet(60.0, 5.0, 20.0, 4.8, true),
            jet(-50.0, 10.0, -10.0, 4.8, true),
            jet(30.0, -40.0, 5.0, 1.0, false),
        ];
        let result = ranker.process_event(&lepton, &jets, &missing).unwrap();
        assert_eq!(result.status, RecoStatus::InsufficientJets);
        assert!(result.hypothesis.is_none());
    }

    #[test]
    fn test_pt_floor_short_circuits_sorted_jets() {
        let tables = peaked_tables(173.0, 80.4);
        let mut ranker = HypothesisRanker::new(173.0, 80.419002, tables);
        ranker.set_jet_selection(40.0, f64::INFINITY);
        let lepton = FourMomentum::from_px_py_pz_m(40.0, 10.0, 5.0, 0.0);
        let missing = MissingMomentum::from_px_py(20.0, -5.0);

        // Sorted by descending pt; only the first two pass the floor.
        let jets = vec![
            jet(60.0, 5.0, 20.0, 4.8, true),
            jet(-50.0, 10.0, -10.0, 4.8, true),
            jet(30.0, -10.0, 5.0, 1.0, false),
            jet(-20.0, 15.0, 5.0, 1.0, false),
            jet(10.0, 12.0, 5.0, 1.0, false),
        ];
        let result = ranker.process_event(&lepton, &jets, &missing).unwrap();
        assert_eq!(result.status, RecoStatus::InsufficientJets);
    }

    #[test]
    fn test_no_b_tags_means_no_interpretation() {
        let tables = peaked_tables(173.0, 80.4);
        let mut ranker = HypothesisRanker::new(173.0, 80.419002, tables);
        let lepton = FourMomentum::from_px_py_pz_m(40.0, 10.0, 5.0, 0.0);
        let missing = MissingMomentum::from_px_py(20.0, -5.0);

        let jets = vec![
            jet(60.0, 5.0, 20.0, 4.8, false),
            jet(-50.0, 10.0, -10.0, 4.8, false),
            jet(30.0, -40.0, 5.0, 1.0, false),
            jet(-20.0, 35.0, 5.0, 1.0, false),
        ];
        let result = ranker.process_event(&lepton, &jets, &missing).unwrap();
        assert_eq!(result.status, RecoStatus::NoInterpretation);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RecoStatus::Success.code(), 0);
        assert_eq!(RecoStatus::InsufficientJets.code(), 1);
        assert_eq!(RecoStatus::NoInterpretation.code(), 2);
    }
}
