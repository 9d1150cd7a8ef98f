//! Generator-record classification and jet-to-quark matching.
//!
//! The calibration and performance passes both need to know whether an
//! event is the targeted `tt -> (b l nu)(b q q)` decay and which
//! reconstructed jets correspond to its four quarks.

use tt_core::{types::wrap_phi, Error, GenParticle, Jet, Result};

/// Indices of the decay's quarks within the generator record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemileptonicDecay {
    /// b quark from the semileptonically decaying top.
    pub b_lep: usize,
    /// b quark from the hadronically decaying top.
    pub b_had: usize,
    /// Leading light-flavor quark from the W decay.
    pub q1: usize,
    /// Subleading light-flavor quark from the W decay.
    pub q2: usize,
}

/// Indices of the reconstructed jets matched to the decay's quarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedJets {
    /// Jet matched to the leptonic-top b quark.
    pub b_lep: usize,
    /// Jet matched to the hadronic-top b quark.
    pub b_had: usize,
    /// Leading (by jet pt) light-flavor jet.
    pub q1: usize,
    /// Subleading light-flavor jet.
    pub q2: usize,
}

fn mother_pdg(particles: &[GenParticle], p: &GenParticle) -> Option<i32> {
    p.mother.map(|m| particles[m].pdg_id)
}

/// Identify the targeted semileptonic decay in a generator record.
///
/// Returns `Ok(None)` for events with a different decay (dileptonic,
/// all-hadronic, taus, extra light quarks from W decays). A record with
/// more than two b quarks from top decays, or with an incomplete decay
/// tree for an otherwise targeted event, is malformed and reported as a
/// validation error.
pub fn classify_semileptonic(particles: &[GenParticle]) -> Result<Option<SemileptonicDecay>> {
    let mut n_lep = 0u32;
    let mut n_tau = 0u32;
    let mut b_quarks = [0usize; 2];
    let mut n_b = 0usize;
    let mut light_quarks = [0usize; 2];
    let mut n_q = 0usize;

    for (i, p) in particles.iter().enumerate() {
        let abs_id = p.pdg_id.abs();

        if abs_id == 11 || abs_id == 13 {
            n_lep += 1;
        } else if abs_id == 15 {
            n_tau += 1;
        } else if abs_id == 5 && mother_pdg(particles, p).map(i32::abs) == Some(6) {
            if n_b == 2 {
                return Err(Error::Validation(
                    "generator record holds more than two b quarks from top decays".into(),
                ));
            }
            b_quarks[n_b] = i;
            n_b += 1;
        } else if (1..=4).contains(&abs_id) && mother_pdg(particles, p).map(i32::abs) == Some(24) {
            if n_q == 2 {
                // A third W-decay quark: cannot be the targeted decay.
                return Ok(None);
            }
            light_quarks[n_q] = i;
            n_q += 1;
        }
    }

    if n_lep != 1 || n_tau > 0 {
        return Ok(None);
    }
    if n_b != 2 || n_q != 2 {
        return Err(Error::Validation(format!(
            "targeted decay with an incomplete quark record: {n_b} b quarks, {n_q} light quarks"
        )));
    }

    // Order the light quarks by pt.
    let (mut q1, mut q2) = (light_quarks[0], light_quarks[1]);
    if particles[q1].p4.pt() < particles[q2].p4.pt() {
        std::mem::swap(&mut q1, &mut q2);
    }

    // The hadronic-top b quark shares its mother with the light quarks'
    // W boson.
    let hadronic_top = particles[q1].mother.and_then(|w| particles[w].mother);
    if hadronic_top.is_none() {
        return Err(Error::Validation(
            "light quarks from a W decay without a recorded top mother".into(),
        ));
    }

    let (mut b_lep, mut b_had) = (b_quarks[0], b_quarks[1]);
    if particles[b_lep].mother == hadronic_top {
        std::mem::swap(&mut b_lep, &mut b_had);
    }
    if particles[b_had].mother != hadronic_top {
        return Err(Error::Validation(
            "neither b quark shares a top mother with the hadronic W".into(),
        ));
    }

    Ok(Some(SemileptonicDecay { b_lep, b_had, q1, q2 }))
}

/// Nearest jet to `particle` within `max_dr` in angular separation, or
/// `None` when no jet is close enough.
pub fn match_jet(jets: &[Jet], particle: &GenParticle, max_dr: f64) -> Option<usize> {
    let mut best = None;
    let mut min_dr2 = max_dr * max_dr;

    for (i, jet) in jets.iter().enumerate() {
        let d_eta = particle.p4.eta() - jet.p4.eta();
        let d_phi = wrap_phi(particle.p4.phi() - jet.p4.phi());
        let dr2 = d_eta * d_eta + d_phi * d_phi;

        if dr2 < min_dr2 {
            best = Some(i);
            min_dr2 = dr2;
        }
    }

    best
}

/// Match all four quarks of a classified decay to reconstructed jets.
///
/// Requires a unique one-to-one match: each quark matched within
/// `max_dr`, the four jets pairwise distinct, and both b-matched jets
/// b-tagged. The light pair is reordered by jet pt, which can differ
/// from the quark-level ordering.
pub fn match_decay_jets(
    jets: &[Jet],
    particles: &[GenParticle],
    decay: &SemileptonicDecay,
    max_dr: f64,
) -> Option<MatchedJets> {
    let b_lep = match_jet(jets, &particles[decay.b_lep], max_dr)?;
    let b_had = match_jet(jets, &particles[decay.b_had], max_dr)?;
    let mut q1 = match_jet(jets, &particles[decay.q1], max_dr)?;
    let mut q2 = match_jet(jets, &particles[decay.q2], max_dr)?;

    let indices = [b_lep, b_had, q1, q2];
    for i in 0..indices.len() {
        for j in (i + 1)..indices.len() {
            if indices[i] == indices[j] {
                return None;
            }
        }
    }

    if !jets[b_lep].b_tagged || !jets[b_had].b_tagged {
        return None;
    }

    if jets[q1].p4.pt() < jets[q2].p4.pt() {
        std::mem::swap(&mut q1, &mut q2);
    }

    Some(MatchedJets { b_lep, b_had, q1, q2 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_core::FourMomentum;

    fn particle(pdg_id: i32, pt: f64, eta: f64, phi: f64, mother: Option<usize>) -> GenParticle {
        GenParticle {
            p4: FourMomentum::from_pt_eta_phi_m(pt, eta, phi, 0.0),
            pdg_id,
            mother,
        }
    }

    /// Record layout: 0 t, 1 tbar, 2 W+ (from t), 3 W- (from tbar),
    /// 4 b (from t), 5 bbar (from tbar), 6 mu (from W+), 7 q (from W-),
    /// 8 qbar (from W-).
    fn semileptonic_record() -> Vec<GenParticle> {
        vec![
            particle(6, 100.0, 0.2, 0.0, None),
            particle(-6, 110.0, -0.4, 3.0, None),
            particle(24, 70.0, 0.3, 0.5, Some(0)),
            particle(-24, 75.0, -0.5, -2.5, Some(1)),
            particle(5, 60.0, 0.1, -0.8, Some(0)),
            particle(-5, 65.0, -0.3, 2.2, Some(1)),
            particle(13, 45.0, 0.4, 0.9, Some(2)),
            particle(3, 55.0, -0.6, -2.0, Some(3)),
            particle(-4, 40.0, -0.2, -3.0, Some(3)),
        ]
    }

    #[test]
    fn test_classify_targeted_decay() {
        let particles = semileptonic_record();
        let decay = classify_semileptonic(&particles).unwrap().unwrap();

        // The tbar decays hadronically: its b quark is index 5.
        assert_eq!(decay.b_lep, 4);
        assert_eq!(decay.b_had, 5);
        // Light quarks ordered by pt.
        assert_eq!(decay.q1, 7);
        assert_eq!(decay.q2, 8);
    }

    #[test]
    fn test_dileptonic_not_targeted() {
        let mut particles = semileptonic_record();
        // Replace one light quark by a second lepton.
        particles[7] = particle(11, 55.0, -0.6, -2.0, Some(3));
        particles[8] = particle(1, 0.0, 0.0, 0.0, None); // spectator, no W mother

        assert!(classify_semileptonic(&particles).unwrap().is_none());
    }

    #[test]
    fn test_tau_vetoed() {
        let mut particles = semileptonic_record();
        particles.push(particle(15, 30.0, 1.0, 1.0, None));
        assert!(classify_semileptonic(&particles).unwrap().is_none());
    }

    #[test]
    fn test_three_b_quarks_is_malformed() {
        let mut particles = semileptonic_record();
        particles.push(particle(5, 30.0, 1.0, 1.0, Some(0)));
        assert!(classify_semileptonic(&particles).is_err());
    }

    fn jet_at(pt: f64, eta: f64, phi: f64, b_tagged: bool) -> Jet {
        Jet { p4: FourMomentum::from_pt_eta_phi_m(pt, eta, phi, 5.0), b_tagged }
    }

    #[test]
    fn test_match_decay_jets_unique() {
        let particles = semileptonic_record();
        let decay = classify_semileptonic(&particles).unwrap().unwrap();

        // One jet near each quark, slightly displaced.
        let jets = vec![
            jet_at(58.0, 0.12, -0.82, true),   // b_lep
            jet_at(63.0, -0.28, 2.23, true),   // b_had
            jet_at(52.0, -0.58, -2.03, false), // q1
            jet_at(42.0, -0.22, -2.97, false), // q2
        ];

        let matched = match_decay_jets(&jets, &particles, &decay, 0.2).unwrap();
        assert_eq!(matched, MatchedJets { b_lep: 0, b_had: 1, q1: 2, q2: 3 });

        // A tighter threshold loses the match.
        assert!(match_decay_jets(&jets, &particles, &decay, 0.01).is_none());
    }

    #[test]
    fn test_match_rejects_shared_jet() {
        let particles = semileptonic_record();
        let decay = classify_semileptonic(&particles).unwrap().unwrap();

        // Only three jets: both light quarks fall onto the same jet.
        let jets = vec![
            jet_at(58.0, 0.12, -0.82, true),
            jet_at(63.0, -0.28, 2.23, true),
            jet_at(52.0, -0.4, -2.5, false),
        ];
        assert!(match_decay_jets(&jets, &particles, &decay, 1.5).is_none());
    }

    #[test]
    fn test_match_requires_b_tags() {
        let particles = semileptonic_record();
        let decay = classify_semileptonic(&particles).unwrap().unwrap();

        let jets = vec![
            jet_at(58.0, 0.12, -0.82, false), // b_lep jet untagged
            jet_at(63.0, -0.28, 2.23, true),
            jet_at(52.0, -0.58, -2.03, false),
            jet_at(42.0, -0.22, -2.97, false),
        ];
        assert!(match_decay_jets(&jets, &particles, &decay, 0.2).is_none());
    }

    #[test]
    fn test_light_pair_reordered_by_jet_pt() {
        let particles = semileptonic_record();
        let decay = classify_semileptonic(&particles).unwrap().unwrap();

        // The jet matched to the subleading quark has the larger pt.
        let jets = vec![
            jet_at(58.0, 0.12, -0.82, true),
            jet_at(63.0, -0.28, 2.23, true),
            jet_at(42.0, -0.58, -2.03, false),
            jet_at(52.0, -0.22, -2.97, false),
        ];
        let matched = match_decay_jets(&jets, &particles, &decay, 0.2).unwrap();
        assert_eq!((matched.q1, matched.q2), (3, 2));
    }
}
