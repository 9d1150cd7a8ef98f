//! Kinematic value types shared by all ttbar-reco crates.
//!
//! Collections of physics objects are produced by an external reader and
//! arrive sorted by descending transverse momentum, already passing the
//! reader-level kinematic selection.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Energy-momentum four-vector in Cartesian components.
///
/// Immutable value type; all derived quantities (mass, pt, angles) are
/// computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourMomentum {
    px: f64,
    py: f64,
    pz: f64,
    e: f64,
}

impl FourMomentum {
    /// Zero four-momentum.
    pub const fn zero() -> Self {
        Self { px: 0.0, py: 0.0, pz: 0.0, e: 0.0 }
    }

    /// Construct from Cartesian momentum components and energy.
    pub const fn from_px_py_pz_e(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }

    /// Construct from Cartesian momentum components and mass.
    pub fn from_px_py_pz_m(px: f64, py: f64, pz: f64, m: f64) -> Self {
        let e = (px * px + py * py + pz * pz + m * m).sqrt();
        Self { px, py, pz, e }
    }

    /// Construct from transverse momentum, pseudorapidity, azimuth, and mass.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        Self::from_px_py_pz_m(px, py, pz, m)
    }

    /// x component of momentum.
    pub fn px(&self) -> f64 {
        self.px
    }

    /// y component of momentum.
    pub fn py(&self) -> f64 {
        self.py
    }

    /// z (longitudinal) component of momentum.
    pub fn pz(&self) -> f64 {
        self.pz
    }

    /// Energy.
    pub fn e(&self) -> f64 {
        self.e
    }

    /// Magnitude of the three-momentum.
    pub fn p(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Transverse momentum.
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Squared invariant mass; negative for spacelike vectors.
    pub fn mass2(&self) -> f64 {
        self.e * self.e - (self.px * self.px + self.py * self.py + self.pz * self.pz)
    }

    /// Invariant mass. The sign of `mass2` is preserved:
    /// `-sqrt(-mass2)` for spacelike vectors.
    pub fn mass(&self) -> f64 {
        let m2 = self.mass2();
        if m2 >= 0.0 { m2.sqrt() } else { -(-m2).sqrt() }
    }

    /// Azimuthal angle in (-pi, pi].
    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    /// Polar angle measured from the +z axis.
    pub fn theta(&self) -> f64 {
        self.pt().atan2(self.pz)
    }

    /// Pseudorapidity. Infinite along the beam axis.
    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt == 0.0 {
            if self.pz >= 0.0 { f64::INFINITY } else { f64::NEG_INFINITY }
        } else {
            (self.pz / pt).asinh()
        }
    }

    /// Velocity |p|/E in units of c.
    pub fn beta(&self) -> f64 {
        self.p() / self.e
    }

    /// Cosine of the angle between the three-momenta, clamped to [-1, 1].
    pub fn cos_angle(&self, other: &FourMomentum) -> f64 {
        let dot = self.px * other.px + self.py * other.py + self.pz * other.pz;
        let c = dot / (self.p() * other.p());
        c.clamp(-1.0, 1.0)
    }

    /// Azimuthal separation wrapped into (-pi, pi].
    pub fn delta_phi(&self, other: &FourMomentum) -> f64 {
        wrap_phi(self.phi() - other.phi())
    }

    /// Angular separation sqrt(d_eta^2 + d_phi^2).
    pub fn delta_r(&self, other: &FourMomentum) -> f64 {
        let d_eta = self.eta() - other.eta();
        let d_phi = self.delta_phi(other);
        (d_eta * d_eta + d_phi * d_phi).sqrt()
    }
}

impl Add for FourMomentum {
    type Output = FourMomentum;

    fn add(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum {
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
            e: self.e + rhs.e,
        }
    }
}

impl AddAssign for FourMomentum {
    fn add_assign(&mut self, rhs: FourMomentum) {
        self.px += rhs.px;
        self.py += rhs.py;
        self.pz += rhs.pz;
        self.e += rhs.e;
    }
}

impl Sum for FourMomentum {
    fn sum<I: Iterator<Item = FourMomentum>>(iter: I) -> FourMomentum {
        iter.fold(FourMomentum::zero(), |acc, p| acc + p)
    }
}

/// Wrap an azimuthal difference into (-pi, pi].
pub fn wrap_phi(mut phi: f64) -> f64 {
    while phi > std::f64::consts::PI {
        phi -= 2.0 * std::f64::consts::PI;
    }
    while phi <= -std::f64::consts::PI {
        phi += 2.0 * std::f64::consts::PI;
    }
    phi
}

/// Charged-lepton flavor distinguished by the selection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeptonFlavor {
    /// Electron
    Electron,
    /// Muon
    Muon,
}

/// A reconstructed charged lepton.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Lepton {
    /// Four-momentum.
    pub p4: FourMomentum,
    /// Flavor.
    pub flavor: LeptonFlavor,
}

/// A reconstructed jet with its b-tagging decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Jet {
    /// Four-momentum.
    pub p4: FourMomentum,
    /// Whether the jet was b-tagged upstream.
    pub b_tagged: bool,
}

/// A generator-level particle from the hard-process record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenParticle {
    /// Four-momentum.
    pub p4: FourMomentum,
    /// PDG identifier, signed.
    pub pdg_id: i32,
    /// Index of the mother particle within the same record, if any.
    pub mother: Option<usize>,
}

/// Missing transverse momentum: a 2-vector standing in for the neutrino's
/// transverse component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MissingMomentum {
    /// Magnitude.
    pub pt: f64,
    /// Azimuthal angle.
    pub phi: f64,
}

impl MissingMomentum {
    /// x component.
    pub fn px(&self) -> f64 {
        self.pt * self.phi.cos()
    }

    /// y component.
    pub fn py(&self) -> f64 {
        self.pt * self.phi.sin()
    }

    /// Construct from Cartesian transverse components.
    pub fn from_px_py(px: f64, py: f64) -> Self {
        Self { pt: px.hypot(py), phi: py.atan2(px) }
    }
}

/// One collision event as delivered by the reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Reconstructed charged leptons.
    pub leptons: Vec<Lepton>,
    /// Jets, sorted by descending pt and passing the reader-level selection.
    pub jets: Vec<Jet>,
    /// Missing transverse momentum.
    pub missing: MissingMomentum,
    /// Nominal per-event weight.
    pub weight: f64,
    /// Generator-level record; empty unless the source provides it.
    pub gen_particles: Vec<GenParticle>,
}
