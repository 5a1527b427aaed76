use crate::core::contact::bond::BreakCounts;
use crate::core::forcefield::term::Virial;

/// Summary of the one-shot bond formation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormationReport {
    /// Neighbor-list slots examined.
    pub candidate_pairs: usize,
    /// Distinct pairs that bonded.
    pub bonds_formed: usize,
}

/// Summary of one force evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReport {
    /// Neighbor-list slots evaluated.
    pub evaluated: usize,
    /// Slots that produced a force.
    pub loaded: usize,
    /// Slots with coincident particle centers.
    pub degenerate: usize,
    /// Bonds that failed during this pass.
    pub broken: BreakCounts,
    /// Bonds still intact after the pass.
    pub intact_bonds: usize,
    /// Pair virial accumulated over the pass.
    pub virial: Virial,
}
