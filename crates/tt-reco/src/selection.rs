//! Selection of single-lepton plus jets events.
//!
//! Upstream of the hypothesis search: requires exactly one tight charged
//! lepton (and no additional loose one), enough jets and b-tags for a
//! semileptonic ttbar interpretation, and optionally a floor on the
//! transverse W mass.

use crate::pipeline::{EventContext, Stage, StageVerdict};
use tt_core::{LeptonFlavor, Result};

/// Lepton + jets event selection stage.
///
/// Publishes the tight lepton's four-momentum and the transverse W mass
/// into the event context for downstream stages.
#[derive(Debug, Clone)]
pub struct LeptonJetsSelection {
    pt_ele_tight: f64,
    pt_ele_loose: f64,
    pt_mu_tight: f64,
    pt_mu_loose: f64,
    mt_w_threshold: f64,
}

impl LeptonJetsSelection {
    /// Selection with the nominal thresholds: tight leptons above 30 GeV,
    /// loose veto leptons above 10 GeV, no transverse-mass cut.
    pub fn new() -> Self {
        Self {
            pt_ele_tight: 30.0,
            pt_ele_loose: 10.0,
            pt_mu_tight: 30.0,
            pt_mu_loose: 10.0,
            mt_w_threshold: 0.0,
        }
    }

    /// Override the per-flavor lepton pt thresholds.
    pub fn with_lepton_thresholds(
        mut self,
        pt_ele_tight: f64,
        pt_ele_loose: f64,
        pt_mu_tight: f64,
        pt_mu_loose: f64,
    ) -> Self {
        self.pt_ele_tight = pt_ele_tight;
        self.pt_ele_loose = pt_ele_loose;
        self.pt_mu_tight = pt_mu_tight;
        self.pt_mu_loose = pt_mu_loose;
        self
    }

    /// Require the transverse W mass to be at least `threshold`.
    pub fn with_mt_w_threshold(mut self, threshold: f64) -> Self {
        self.mt_w_threshold = threshold;
        self
    }
}

impl Default for LeptonJetsSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for LeptonJetsSelection {
    fn name(&self) -> &str {
        "lepton_jets_selection"
    }

    fn process(&mut self, ctx: &mut EventContext) -> Result<StageVerdict> {
        // Count tight and loose leptons; keep the momentum of the tight one.
        let mut n_tight = 0u32;
        let mut n_loose = 0u32;
        let mut tight_p4 = None;

        for lepton in &ctx.event.leptons {
            let (pt_tight, pt_loose, max_abs_eta) = match lepton.flavor {
                LeptonFlavor::Electron => (self.pt_ele_tight, self.pt_ele_loose, 2.5),
                LeptonFlavor::Muon => (self.pt_mu_tight, self.pt_mu_loose, 2.4),
            };

            if lepton.p4.pt() < pt_loose || lepton.p4.eta().abs() > max_abs_eta {
                continue;
            }
            n_loose += 1;

            if lepton.p4.pt() > pt_tight {
                n_tight += 1;
                tight_p4 = Some(lepton.p4);
            }
        }

        if n_tight != 1 || n_loose != 1 {
            return Ok(StageVerdict::Reject);
        }
        let Some(lepton) = tight_p4 else {
            return Ok(StageVerdict::Reject);
        };

        // Jet counting; the reader-level kinematic selection already ran.
        let jets = &ctx.event.jets;
        if jets.len() < 4 {
            return Ok(StageVerdict::Reject);
        }
        if jets.iter().filter(|j| j.b_tagged).count() < 2 {
            return Ok(StageVerdict::Reject);
        }

        let missing = &ctx.event.missing;
        let mt_w = (2.0
            * lepton.pt()
            * missing.pt
            * (1.0 - (lepton.phi() - missing.phi).cos()))
        .sqrt();

        if mt_w < self.mt_w_threshold {
            return Ok(StageVerdict::Reject);
        }

        ctx.lepton = Some(lepton);
        ctx.mt_w = Some(mt_w);
        Ok(StageVerdict::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_core::{Event, FourMomentum, Jet, Lepton, MissingMomentum};

    fn lepton(pt: f64, flavor: LeptonFlavor) -> Lepton {
        Lepton { p4: FourMomentum::from_pt_eta_phi_m(pt, 0.5, 1.0, 0.0), flavor }
    }

    fn jet(pt: f64, b_tagged: bool) -> Jet {
        Jet { p4: FourMomentum::from_pt_eta_phi_m(pt, -0.3, 2.0, 4.0), b_tagged }
    }

    fn event(leptons: Vec<Lepton>, jets: Vec<Jet>) -> EventContext {
        EventContext::new(Event {
            leptons,
            jets,
            missing: MissingMomentum { pt: 40.0, phi: -1.5 },
            weight: 1.0,
            gen_particles: vec![],
        })
    }

    fn four_jets() -> Vec<Jet> {
        vec![jet(80.0, true), jet(60.0, true), jet(50.0, false), jet(40.0, false)]
    }

    #[test]
    fn test_accepts_single_tight_lepton() {
        let mut stage = LeptonJetsSelection::new();
        let mut ctx = event(vec![lepton(45.0, LeptonFlavor::Muon)], four_jets());
        assert_eq!(stage.process(&mut ctx).unwrap(), StageVerdict::Continue);
        assert!(ctx.lepton.is_some());
        assert!(ctx.mt_w.unwrap() > 0.0);
    }

    #[test]
    fn test_rejects_extra_loose_lepton() {
        let mut stage = LeptonJetsSelection::new();
        let mut ctx = event(
            vec![lepton(45.0, LeptonFlavor::Muon), lepton(15.0, LeptonFlavor::Electron)],
            four_jets(),
        );
        assert_eq!(stage.process(&mut ctx).unwrap(), StageVerdict::Reject);
    }

    #[test]
    fn test_rejects_too_few_jets_or_tags() {
        let mut stage = LeptonJetsSelection::new();

        let mut ctx = event(
            vec![lepton(45.0, LeptonFlavor::Electron)],
            vec![jet(80.0, true), jet(60.0, true), jet(50.0, false)],
        );
        assert_eq!(stage.process(&mut ctx).unwrap(), StageVerdict::Reject);

        let mut ctx = event(
            vec![lepton(45.0, LeptonFlavor::Electron)],
            vec![jet(80.0, true), jet(60.0, false), jet(50.0, false), jet(40.0, false)],
        );
        assert_eq!(stage.process(&mut ctx).unwrap(), StageVerdict::Reject);
    }

    #[test]
    fn test_mt_w_threshold() {
        let mut stage = LeptonJetsSelection::new().with_mt_w_threshold(1e4);
        let mut ctx = event(vec![lepton(45.0, LeptonFlavor::Muon)], four_jets());
        assert_eq!(stage.process(&mut ctx).unwrap(), StageVerdict::Reject);
    }
}
