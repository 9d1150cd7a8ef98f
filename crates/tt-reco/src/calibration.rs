//! Calibration pass producing the likelihood density tables.
//!
//! Runs over a truth-known sample: events whose generator record is the
//! targeted semileptonic decay and whose four quarks match uniquely onto
//! reconstructed jets contribute one entry to the neutrino-distance
//! histogram and one to the (hadronic top mass, hadronic W mass)
//! histogram, weighted by the per-event weight. On finish both
//! histograms are normalized to densities and written as a named tables
//! file. This pass shares the neutrino solver with reconstruction but
//! not the hypothesis ranker.

use crate::likelihood::{MASSES_HAD_TABLE, NU_DIST_TABLE};
use crate::nu::NeutrinoSolver;
use crate::pipeline::{EventContext, Stage, StageVerdict};
use crate::truth::{classify_semileptonic, match_decay_jets};
use std::path::PathBuf;
use tt_core::{Error, Result};
use tt_hist::{DensityTables, Hist1D, Hist2D};

/// Event counters kept by the calibration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibrationCounts {
    /// Events seen.
    pub visited: u64,
    /// Events with the targeted decay in the generator record.
    pub targeted: u64,
    /// Targeted events with a unique four-fold jet match.
    pub matchable: u64,
    /// Matchable events that also passed neutrino reconstruction and
    /// entered the histograms.
    pub filled: u64,
}

/// Stage that fills and persists the likelihood histograms.
pub struct CalibrationFiller {
    solver: NeutrinoSolver,
    hist_nu_dist: Hist1D,
    hist_masses_had: Hist2D,
    max_dr: f64,
    output: Option<PathBuf>,
    counts: CalibrationCounts,
}

impl CalibrationFiller {
    /// Create a filler with the given constraint masses and matching
    /// threshold. The binnings are fixed: 100 bins over [0, 200] GeV for
    /// the neutrino distance, 200 x 150 bins over [50, 250] x [0, 150]
    /// GeV for the hadronic masses.
    pub fn new(mass_top: f64, mass_w: f64, max_dr: f64) -> Result<Self> {
        Ok(Self {
            solver: NeutrinoSolver::new(mass_top, mass_w),
            hist_nu_dist: Hist1D::with_uniform_bins(NU_DIST_TABLE, 100, 0.0, 200.0)?,
            hist_masses_had: Hist2D::with_uniform_bins(
                MASSES_HAD_TABLE,
                200,
                50.0,
                250.0,
                150,
                0.0,
                150.0,
            )?,
            max_dr,
            output: None,
            counts: CalibrationCounts::default(),
        })
    }

    /// Write the tables to `path` when the run finishes.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Counters accumulated so far.
    pub fn counts(&self) -> CalibrationCounts {
        self.counts
    }

    /// Normalize the filled histograms to densities and package them as
    /// a named tables set.
    ///
    /// Fails when a histogram is still empty, which means the sample had
    /// no usable events.
    pub fn build_tables(&self) -> Result<DensityTables> {
        let mut nu = self.hist_nu_dist.clone();
        let mut masses = self.hist_masses_had.clone();
        nu.normalize_to_density()?;
        masses.normalize_to_density()?;

        let mut tables = DensityTables::new();
        tables.hists_1d.insert(nu.name.clone(), nu);
        tables.hists_2d.insert(masses.name.clone(), masses);
        Ok(tables)
    }
}

impl Stage for CalibrationFiller {
    fn name(&self) -> &str {
        "calibration_filler"
    }

    fn process(&mut self, ctx: &mut EventContext) -> Result<StageVerdict> {
        self.counts.visited += 1;

        let decay = match classify_semileptonic(&ctx.event.gen_particles)? {
            Some(decay) => decay,
            None => return Ok(StageVerdict::Reject),
        };
        self.counts.targeted += 1;

        let jets = &ctx.event.jets;
        let matched = match match_decay_jets(jets, &ctx.event.gen_particles, &decay, self.max_dr)
        {
            Some(matched) => matched,
            None => return Ok(StageVerdict::Reject),
        };
        self.counts.matchable += 1;

        let lepton = ctx.lepton.ok_or_else(|| {
            Error::Validation("calibration filler requires a selected lepton upstream".into())
        })?;

        let solution =
            match self.solver.reconstruct(&lepton, &jets[matched.b_lep].p4, &ctx.event.missing)? {
                Some(solution) => solution,
                None => return Ok(StageVerdict::Reject),
            };

        let weight = ctx.event.weight;
        self.hist_nu_dist.fill(solution.distance, weight);

        let p4_w_had = jets[matched.q1].p4 + jets[matched.q2].p4;
        let p4_top_had = p4_w_had + jets[matched.b_had].p4;
        self.hist_masses_had.fill(p4_top_had.mass(), p4_w_had.mass(), weight);

        self.counts.filled += 1;
        Ok(StageVerdict::Continue)
    }

    fn finish(&mut self) -> Result<()> {
        tracing::info!(
            visited = self.counts.visited,
            targeted = self.counts.targeted,
            matchable = self.counts.matchable,
            filled = self.counts.filled,
            "calibration pass complete"
        );

        if let Some(path) = &self.output {
            let tables = self.build_tables()?;
            tables.save(path)?;
            tracing::info!(path = %path.display(), "wrote likelihood tables");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_core::{Event, FourMomentum, GenParticle, Jet, MissingMomentum};

    fn particle(pdg_id: i32, p4: FourMomentum, mother: Option<usize>) -> GenParticle {
        GenParticle { p4, pdg_id, mother }
    }

    /// A fully matchable semileptonic event: jets sit exactly on the
    /// quarks and the missing pt sits a few GeV off the neutrino's
    /// transverse momentum, so the solver sees consistent constraints
    /// and a small positive distance.
    fn matchable_event() -> (Event, FourMomentum, f64, f64) {
        let lepton = FourMomentum::from_px_py_pz_m(26.0, 10.0, -5.0, 0.0);
        let nu = FourMomentum::from_px_py_pz_m(-40.0, 30.0, 12.0, 0.0);
        let b_lep = FourMomentum::from_px_py_pz_m(15.0, -60.0, 40.0, 4.8);

        let b_had = FourMomentum::from_px_py_pz_m(-70.0, 20.0, -30.0, 4.8);
        let q1 = FourMomentum::from_px_py_pz_m(55.0, 35.0, 10.0, 0.5);
        let q2 = FourMomentum::from_px_py_pz_m(-10.0, -45.0, 25.0, 0.5);

        let top_lep = lepton + nu + b_lep;
        let top_had = b_had + q1 + q2;
        let w_had = q1 + q2;

        // Record: 0 t(lep), 1 t(had), 2 W(lep), 3 W(had), 4 b(lep),
        // 5 b(had), 6 lepton, 7 q1, 8 q2.
        let gen_particles = vec![
            particle(6, top_lep, None),
            particle(-6, top_had, None),
            particle(24, lepton + nu, Some(0)),
            particle(-24, w_had, Some(1)),
            particle(5, b_lep, Some(0)),
            particle(-5, b_had, Some(1)),
            particle(13, lepton, Some(2)),
            particle(3, q1, Some(3)),
            particle(-4, q2, Some(3)),
        ];

        let mut jets = vec![
            Jet { p4: b_lep, b_tagged: true },
            Jet { p4: b_had, b_tagged: true },
            Jet { p4: q1, b_tagged: false },
            Jet { p4: q2, b_tagged: false },
        ];
        jets.sort_by(|a, b| b.p4.pt().total_cmp(&a.p4.pt()));

        let event = Event {
            leptons: vec![],
            jets,
            missing: MissingMomentum::from_px_py(nu.px() + 3.0, nu.py() - 2.0),
            weight: 1.0,
            gen_particles,
        };

        (event, lepton, top_had.mass(), w_had.mass())
    }

    #[test]
    fn test_fills_matchable_event() {
        let (event, lepton, m_top_had, m_w_had) = matchable_event();

        // Constraint masses taken from the assembled leptonic leg so the
        // solver succeeds exactly.
        let nu = FourMomentum::from_px_py_pz_m(-40.0, 30.0, 12.0, 0.0);
        let b_lep = FourMomentum::from_px_py_pz_m(15.0, -60.0, 40.0, 4.8);
        let mass_w = (lepton + nu).mass();
        let mass_top = (lepton + nu + b_lep).mass();

        let mut filler = CalibrationFiller::new(mass_top, mass_w, 0.2).unwrap();
        let mut ctx = EventContext::new(event);
        ctx.lepton = Some(lepton);

        assert_eq!(filler.process(&mut ctx).unwrap(), StageVerdict::Continue);
        let counts = filler.counts();
        assert_eq!(
            counts,
            CalibrationCounts { visited: 1, targeted: 1, matchable: 1, filled: 1 }
        );

        // The distance entry is bounded by the 3.6 GeV offset between
        // the missing pt and the true neutrino, so it lands in the first
        // couple of bins; the mass entry sits at the assembled masses.
        assert_eq!(filler.hist_nu_dist.entries, 1);
        assert_eq!(filler.hist_nu_dist.underflow, 0.0);
        assert_eq!(filler.hist_nu_dist.overflow, 0.0);
        assert!(filler.hist_nu_dist.bin_content[0] + filler.hist_nu_dist.bin_content[1] > 0.0);
        assert_eq!(filler.hist_masses_had.entries, 1);
        assert!(filler.hist_masses_had.value_at(m_top_had, m_w_had).unwrap() > 0.0);

        let tables = filler.build_tables().unwrap();
        assert!(tables.get_1d(NU_DIST_TABLE).is_ok());
        assert!(tables.get_2d(MASSES_HAD_TABLE).is_ok());
    }

    #[test]
    fn test_untargeted_event_rejected() {
        let (mut event, lepton, _, _) = matchable_event();
        // Promote the decay to dileptonic.
        event.gen_particles[7] = particle(
            11,
            FourMomentum::from_px_py_pz_m(55.0, 35.0, 10.0, 0.0),
            Some(3),
        );
        event.gen_particles[8].mother = None;

        let mut filler = CalibrationFiller::new(173.0, 80.419002, 0.2).unwrap();
        let mut ctx = EventContext::new(event);
        ctx.lepton = Some(lepton);

        assert_eq!(filler.process(&mut ctx).unwrap(), StageVerdict::Reject);
        assert_eq!(filler.counts().targeted, 0);
    }

    #[test]
    fn test_empty_sample_cannot_build_tables() {
        let filler = CalibrationFiller::new(173.0, 80.419002, 0.2).unwrap();
        assert!(filler.build_tables().is_err());
    }
}
