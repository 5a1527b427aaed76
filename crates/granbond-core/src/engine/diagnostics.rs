use super::kernel::PairEvaluation;
use crate::core::contact::bond::BondView;
use crate::core::contact::history::ContactHistory;
use crate::core::models::ids::ParticleTag;
use serde::Serialize;

/// Length of [`ContactDiagnostics::to_vector`].
pub const DIAGNOSTIC_WIDTH: usize = 11;

/// Inspection record of one evaluated contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContactDiagnostics {
    pub owner: ParticleTag,
    pub partner: ParticleTag,
    /// Slot of the relation within the owner's neighbor row.
    pub slot: usize,
    /// Bond state after this evaluation.
    pub bonded: bool,
    pub stretch: f64,
    pub tensile_failure_distance: f64,
    pub normal_force: f64,
    pub tangential_force: f64,
    pub friction_limit: f64,
    pub tensile_breaks: u32,
    pub shear_breaks: u32,
}

impl ContactDiagnostics {
    pub fn from_evaluation(
        owner: ParticleTag,
        partner: ParticleTag,
        slot: usize,
        bond: BondView,
        evaluation: &PairEvaluation,
        history: &ContactHistory,
    ) -> Self {
        let bonded = bond.bonded && evaluation.failure.is_none();
        Self {
            owner,
            partner,
            slot,
            bonded,
            stretch: evaluation.stretch,
            tensile_failure_distance: if bonded {
                bond.tensile_failure_distance
            } else {
                0.0
            },
            normal_force: evaluation.normal_force,
            tangential_force: evaluation.tangential_force,
            friction_limit: evaluation.friction_limit,
            tensile_breaks: history.tensile_breaks,
            shear_breaks: history.shear_breaks,
        }
    }

    /// Fixed-order scalar export:
    /// `[owner, partner, slot, bonded, stretch, tensile distance, normal force,
    /// tangential force, limit, tensile breaks, shear breaks]`.
    pub fn to_vector(&self) -> [f64; DIAGNOSTIC_WIDTH] {
        [
            self.owner.0 as f64,
            self.partner.0 as f64,
            self.slot as f64,
            if self.bonded { 1.0 } else { 0.0 },
            self.stretch,
            self.tensile_failure_distance,
            self.normal_force,
            self.tangential_force,
            self.friction_limit,
            f64::from(self.tensile_breaks),
            f64::from(self.shear_breaks),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contact::bond::FailureMode;
    use crate::engine::kernel::ContactOutcome;
    use nalgebra::Vector3;

    fn evaluation(failure: Option<FailureMode>) -> PairEvaluation {
        PairEvaluation {
            outcome: ContactOutcome::Ignored,
            failure,
            del: Vector3::new(-1.0, 0.0, 0.0),
            stretch: -0.02,
            normal_force: -3.0,
            tangential_force: 1.5,
            friction_limit: 4.0,
        }
    }

    fn bond() -> BondView {
        BondView {
            bonded: true,
            initial_gap: 0.1,
            tensile_failure_distance: 0.05,
        }
    }

    #[test]
    fn to_vector_uses_fixed_order() {
        let history = ContactHistory {
            tensile_breaks: 0,
            shear_breaks: 2,
            ..Default::default()
        };
        let diag = ContactDiagnostics::from_evaluation(
            ParticleTag(4),
            ParticleTag(9),
            1,
            bond(),
            &evaluation(None),
            &history,
        );
        assert_eq!(
            diag.to_vector(),
            [4.0, 9.0, 1.0, 1.0, -0.02, 0.05, -3.0, 1.5, 4.0, 0.0, 2.0]
        );
    }

    #[test]
    fn failure_in_this_step_reports_unbonded() {
        let diag = ContactDiagnostics::from_evaluation(
            ParticleTag(1),
            ParticleTag(2),
            0,
            bond(),
            &evaluation(Some(FailureMode::Tensile)),
            &ContactHistory::default(),
        );
        assert!(!diag.bonded);
        assert_eq!(diag.tensile_failure_distance, 0.0);
    }
}
