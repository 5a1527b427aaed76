use crate::core::contact::bond::{BondView, FailureMode};
use crate::core::contact::history::ContactHistory;
use crate::core::forcefield::params::MaterialParams;
use crate::core::forcefield::potentials::{
    cohesive_shear_budget, effective_mass, friction_limit, normal_force_scale, project_tangential,
    return_map, tangential_force,
};
use crate::core::forcefield::term::PairForce;
use crate::core::models::particle::Particle;
use nalgebra::Vector3;

/// What a pair evaluation contributed this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactOutcome {
    /// The pair is not in contact (or its bond just failed in tension).
    Ignored,
    /// Coincident centers; no direction exists to apply force along.
    Degenerate,
    /// The pair is in contact and produced a force.
    Loaded(PairForce),
}

/// Result of evaluating one candidate pair.
///
/// Bond transitions are reported, not applied: the caller stages `failure` and
/// commits it to the bond table after the pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEvaluation {
    pub outcome: ContactOutcome,
    pub failure: Option<FailureMode>,
    /// `x_i - x_j`.
    pub del: Vector3<f64>,
    /// Gap change relative to formation; positive is compression.
    pub stretch: f64,
    /// Signed normal force magnitude `ccel * r`; positive pushes the pair apart.
    pub normal_force: f64,
    /// Tangential force magnitude after return mapping.
    pub tangential_force: f64,
    /// Friction plus cohesion limit that applied this step.
    pub friction_limit: f64,
}

impl PairEvaluation {
    fn ignored(del: Vector3<f64>, stretch: f64) -> Self {
        Self {
            outcome: ContactOutcome::Ignored,
            failure: None,
            del,
            stretch,
            normal_force: 0.0,
            tangential_force: 0.0,
            friction_limit: 0.0,
        }
    }

    /// The pair force, if the pair was loaded.
    pub fn force(&self) -> Option<&PairForce> {
        match &self.outcome {
            ContactOutcome::Loaded(force) => Some(force),
            _ => None,
        }
    }
}

/// The per-pair cohesive contact force law.
///
/// Evaluation is a pure function of the two particles, their bond view and the
/// relation's history record; the only side effect is the update of that record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactForceKernel {
    material: MaterialParams,
    timestep: f64,
    freeze_group_bit: u32,
}

impl ContactForceKernel {
    pub fn new(material: MaterialParams, timestep: f64, freeze_group_bit: u32) -> Self {
        Self {
            material,
            timestep,
            freeze_group_bit,
        }
    }

    #[inline]
    pub fn material(&self) -> &MaterialParams {
        &self.material
    }

    #[inline]
    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub(crate) fn set_timestep(&mut self, timestep: f64) {
        self.timestep = timestep;
    }

    /// Evaluates the contact between `pi` and `pj`.
    ///
    /// # Arguments
    ///
    /// * `pi`, `pj` - The two particles; the reported force acts on `pi`.
    /// * `mass_i`, `mass_j` - Masses to combine, after any rigid-body override.
    /// * `bond` - The pair's bond state at the start of the step.
    /// * `history` - The relation's persistent record, updated in place.
    pub fn evaluate(
        &self,
        pi: &Particle,
        pj: &Particle,
        mass_i: f64,
        mass_j: f64,
        bond: BondView,
        history: &mut ContactHistory,
    ) -> PairEvaluation {
        let del = pi.position - pj.position;
        let rsq = del.norm_squared();
        let radsum = pi.radius + pj.radius;

        if rsq == 0.0 {
            return PairEvaluation {
                outcome: ContactOutcome::Degenerate,
                ..PairEvaluation::ignored(del, 0.0)
            };
        }

        let r = rsq.sqrt();
        if !bond.bonded && r > radsum {
            history.deactivate();
            return PairEvaluation::ignored(del, radsum - r);
        }

        let stretch = (radsum - r) - bond.initial_gap;
        if stretch < 0.0 {
            if !bond.bonded {
                history.deactivate();
                return PairEvaluation::ignored(del, stretch);
            }
            if stretch.abs() >= bond.tensile_failure_distance {
                history.deactivate();
                history.tensile_breaks += 1;
                return PairEvaluation {
                    failure: Some(FailureMode::Tensile),
                    ..PairEvaluation::ignored(del, stretch)
                };
            }
        }

        let m = &self.material;
        let vr = pi.velocity - pj.velocity;
        let vnnr = vr.dot(&del);
        let vt = vr - del * (vnnr / rsq);
        let wr = (pi.angular_velocity * pi.radius + pj.angular_velocity * pj.radius) / r;

        let meff = effective_mass(
            mass_i,
            mass_j,
            pi.in_group(self.freeze_group_bit),
            pj.in_group(self.freeze_group_bit),
        );
        let ccel = normal_force_scale(m.normal_stiffness(), stretch, r, meff, m.normal_damping(), vnnr);

        // Sliding velocity at the contact point.
        let vtr = vt - wr.cross(&del);

        history.touching = true;
        history.shear += vtr * self.timestep;
        let shrmag = history.shear.norm();
        project_tangential(&mut history.shear, &del);

        let kt = m.tangential_stiffness();
        let gamma_t = m.tangential_damping();
        let mut fs = tangential_force(kt, &history.shear, meff, gamma_t, &vtr);

        let cohesion = if bond.bonded {
            cohesive_shear_budget(pi.radius.min(pj.radius), m.cohesive_shear_strength())
        } else {
            0.0
        };
        let limit = friction_limit(m.friction_coefficient(), ccel, r, cohesion);

        let mut failure = None;
        if fs.norm() >= limit {
            fs = return_map(&mut history.shear, &fs, limit, kt, meff * gamma_t, &vtr, shrmag);
            if bond.bonded {
                history.shear_breaks += 1;
                failure = Some(FailureMode::Shear);
                if rsq > radsum * radsum {
                    history.deactivate();
                    fs = Vector3::zeros();
                }
            }
        }

        let tor = del.cross(&fs) / r;
        PairEvaluation {
            outcome: ContactOutcome::Loaded(PairForce {
                force: del * ccel + fs,
                torque_i: -tor * pi.radius,
                torque_j: -tor * pj.radius,
            }),
            failure,
            del,
            stretch,
            normal_force: ccel * r,
            tangential_force: fs.norm(),
            friction_limit: limit,
        }
    }
}
