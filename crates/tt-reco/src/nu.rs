//! Neutrino momentum reconstruction under top and W mass constraints.
//!
//! The algorithm follows B.A. Betchart, R. Demina, A. Harel,
//! Nucl. Instrum. Meth. A736 (2014) 169 [arXiv:1305.1878]. The two mass
//! constraints, together with the zero neutrino mass, define an ellipse
//! in the space of the neutrino three-momentum; the unique solution is
//! the point on that ellipse whose transverse component is closest to the
//! measured missing transverse momentum.

use nalgebra::{Matrix3, Vector3};
use std::f64::consts::{FRAC_PI_2, PI};
use tt_core::{Error, FourMomentum, MissingMomentum, Result};

/// A successfully reconstructed neutrino.
#[derive(Debug, Clone, Copy)]
pub struct NeutrinoSolution {
    /// Zero-mass neutrino four-momentum in lab coordinates.
    pub p4: FourMomentum,
    /// Euclidean distance between the solution's transverse momentum and
    /// the measured missing transverse momentum.
    ///
    /// The squared distance at the minimum can come out slightly negative
    /// through rounding; the sign is preserved (`-sqrt(-d2)`) to expose
    /// the anomaly rather than mask it.
    pub distance: f64,
}

/// Reconstructs the neutrino from `t -> b l nu` for a given lepton and
/// b-jet candidate.
///
/// The configured top and W masses enter the two constraints; they are
/// fixed per analysis run but can be changed between events. No solution
/// exists when the constraints are mutually inconsistent for the given
/// lepton/b-jet pair.
#[derive(Debug, Clone)]
pub struct NeutrinoSolver {
    mass_top2: f64,
    mass_w2: f64,
}

/// Coordinate axes for elementary rotations.
#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

impl NeutrinoSolver {
    /// Create a solver with the given top and W masses (GeV).
    pub fn new(mass_top: f64, mass_w: f64) -> Self {
        let mut solver = Self { mass_top2: 0.0, mass_w2: 0.0 };
        solver.set_masses(mass_top, mass_w);
        solver
    }

    /// Change the top and W masses used in the constraints.
    pub fn set_masses(&mut self, mass_top: f64, mass_w: f64) {
        self.mass_top2 = mass_top * mass_top;
        self.mass_w2 = mass_w * mass_w;
    }

    /// Configured (top, W) masses in GeV.
    pub fn masses(&self) -> (f64, f64) {
        (self.mass_top2.sqrt(), self.mass_w2.sqrt())
    }

    /// Reconstruct the neutrino for the given lepton, b-jet, and missing
    /// transverse momentum.
    ///
    /// Returns `Ok(None)` when the two mass constraints cannot be met
    /// simultaneously. `Err` is reserved for a violated assumption about
    /// the shape of the distance objective and aborts the run.
    pub fn reconstruct(
        &self,
        lepton: &FourMomentum,
        b_jet: &FourMomentum,
        missing: &MissingMomentum,
    ) -> Result<Option<NeutrinoSolution>> {
        // Matrix H maps the solution parameter onto the constraint
        // ellipse in lab coordinates: p = H (cos t, sin t, 1)'.
        let h = match self.solve_mass_constraints(lepton, b_jet) {
            Some(h) => h,
            None => return Ok(None),
        };

        // Missing pt in matrix form, with the unconstrained z component
        // zeroed out by the weight matrix below.
        let mut v0 = Matrix3::zeros();
        v0[(0, 2)] = missing.px();
        v0[(1, 2)] = missing.py();

        // Identity weighting in the transverse plane; the compatibility
        // T'XT then coincides with the squared Euclidean distance between
        // the candidate and measured transverse momenta.
        let sigma2 = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 0.0));
        let lambda = v0 - h;
        let x = lambda.transpose() * sigma2 * lambda;

        // The derivative of T'XT with respect to t is T'MT.
        let mut d = Matrix3::zeros();
        d[(0, 1)] = -1.0;
        d[(1, 0)] = 1.0;
        let xd = x * d;
        let m = xd + xd.transpose();

        let (t_best, min_d2) = minimize(&x, &m)?;

        let t_vec = Vector3::new(t_best.cos(), t_best.sin(), 1.0);
        let p3 = h * t_vec;
        let p4 = FourMomentum::from_px_py_pz_m(p3.x, p3.y, p3.z, 0.0);
        let distance = if min_d2 >= 0.0 { min_d2.sqrt() } else { -(-min_d2).sqrt() };

        Ok(Some(NeutrinoSolution { p4, distance }))
    }

    /// Solve the two mass constraints, building the transformation from
    /// the unit-circle parameter to the lab-frame neutrino momentum.
    ///
    /// Returns `None` when the constraints are inconsistent (negative
    /// discriminant), including when degenerate kinematics turn the
    /// discriminant into NaN.
    fn solve_mass_constraints(
        &self,
        lepton: &FourMomentum,
        b_jet: &FourMomentum,
    ) -> Option<Matrix3<f64>> {
        // Cosine and sine of the angle between the lepton and b-jet
        // three-momenta.
        let c = lepton.cos_angle(b_jet);
        let s = (1.0 - c * c).sqrt();

        let x0p = -(self.mass_top2 - self.mass_w2 - b_jet.mass2()) / (2.0 * b_jet.e());
        let x0 = -(self.mass_w2 - lepton.mass2()) / (2.0 * lepton.e());

        let beta_lep = lepton.beta();
        let beta_b = b_jet.beta();

        let epsilon2 = self.mass_w2 * (1.0 - beta_lep * beta_lep);

        let sx = (x0 * beta_lep - lepton.p() * (1.0 - beta_lep * beta_lep))
            / (beta_lep * beta_lep);
        let sy = (x0p / beta_b - c * sx) / s;

        let omega = (beta_lep / beta_b - c) / s;
        let big_omega2 = omega * omega + 1.0 - beta_lep * beta_lep;
        let x1 = sx - (sx + omega * sy) / big_omega2;
        let y1 = sy - (sx + omega * sy) * omega / big_omega2;
        let z2 = x1 * x1 * big_omega2
            - (sy - omega * sx).powi(2)
            - (self.mass_w2 - x0 * x0 - epsilon2);

        // Negated comparison so that NaN from degenerate kinematics is
        // classified as inconsistent instead of corrupting the scan.
        if !(z2 >= 0.0) {
            return None;
        }
        let z = z2.sqrt();

        let mut h_tilde = Matrix3::zeros();
        h_tilde[(0, 0)] = z / big_omega2.sqrt();
        h_tilde[(0, 2)] = x1 - lepton.p();
        h_tilde[(1, 0)] = omega * z / big_omega2.sqrt();
        h_tilde[(1, 2)] = y1;
        h_tilde[(2, 1)] = z;

        // Rotation aligning the coordinate frame with the lepton and
        // b-jet directions, transposed to map back into the lab frame.
        let rz = rotation(Axis::Z, -lepton.phi());
        let ry = rotation(Axis::Y, FRAC_PI_2 - lepton.theta());

        let p3_b = Vector3::new(b_jet.px(), b_jet.py(), b_jet.pz());
        let p3_b_rotated = ry * rz * p3_b;
        let rx = rotation(Axis::X, -p3_b_rotated.z.atan2(p3_b_rotated.y));

        let r = (rx * ry * rz).transpose();
        Some(r * h_tilde)
    }
}

/// T'MT for T = (cos t, sin t, 1)'.
fn quadratic_form(m: &Matrix3<f64>, t: f64) -> f64 {
    let v = Vector3::new(t.cos(), t.sin(), 1.0);
    v.dot(&(m * v))
}

/// Find the global minimum of the squared transverse distance over the
/// solution parameter.
///
/// The objective T'XT is smooth and periodic with at most two local
/// minima. A coarse scan over 100 equidistant points brackets every
/// negative-to-positive sign change of the derivative T'MT; each bracket
/// is then refined by bisection on the derivative and the objective
/// decides between the refined candidates.
fn minimize(x: &Matrix3<f64>, m: &Matrix3<f64>) -> Result<(f64, f64)> {
    const N_POINTS: usize = 100;
    let step = 2.0 * PI / N_POINTS as f64;

    let mut prev_derivative = quadratic_form(m, 0.0);

    // Fixed-size storage: the objective cannot have more than two minima.
    let mut approx_minima = [0.0f64; 2];
    let mut n_minima = 0;

    // The scan wraps through 2 pi so every consecutive pair is covered.
    let mut t = step;
    for _ in 1..=N_POINTS {
        let derivative = quadratic_form(m, t);

        if prev_derivative < 0.0 && derivative > 0.0 {
            approx_minima[n_minima] = t - step / 2.0;
            n_minima += 1;
            if n_minima == 2 {
                break;
            }
        }

        prev_derivative = derivative;
        t += step;
    }

    if n_minima == 0 {
        return Err(Error::Internal(
            "neutrino solver grid scan bracketed no minimum of the distance objective".into(),
        ));
    }

    let mut min_d2 = f64::INFINITY;
    let mut t_best = 0.0;

    for &t_approx in &approx_minima[..n_minima] {
        // Bisection on the sign of the derivative within half a grid step
        // of the bracketed location.
        let mut t_lo = t_approx - step / 2.0;
        let mut t_hi = t_approx + step / 2.0;

        while t_hi - t_lo > 1e-8 {
            let t0 = 0.5 * (t_lo + t_hi);
            if quadratic_form(m, t0) > 0.0 {
                // Growing at t0: the minimum is to the left.
                t_hi = t0;
            } else {
                t_lo = t0;
            }
        }

        let t0 = 0.5 * (t_lo + t_hi);
        let d2 = quadratic_form(x, t0);
        if d2 < min_d2 {
            min_d2 = d2;
            t_best = t0;
        }
    }

    Ok((t_best, min_d2))
}

fn rotation(axis: Axis, angle: f64) -> Matrix3<f64> {
    let c = angle.cos();
    let s = angle.sin();
    let mut r = Matrix3::identity();

    match axis {
        Axis::X => {
            r[(1, 1)] = c;
            r[(1, 2)] = -s;
            r[(2, 1)] = s;
            r[(2, 2)] = c;
        }
        Axis::Y => {
            r[(0, 0)] = c;
            r[(0, 2)] = s;
            r[(2, 0)] = -s;
            r[(2, 2)] = c;
        }
        Axis::Z => {
            r[(0, 0)] = c;
            r[(0, 1)] = -s;
            r[(1, 0)] = s;
            r[(1, 1)] = c;
        }
    }

    r
}
