use super::progress::{Progress, ProgressReporter};
use super::state::FormationReport;
use crate::core::contact::bond::{BondEntry, BondKey, BondStateTable};
use crate::core::contact::history::ContactHistoryStore;
use crate::core::contact::neighbor::{NeighborList, neighbor_index};
use crate::core::forcefield::params::MaterialParams;
use crate::core::forcefield::potentials::{bond_formation_threshold, tensile_failure_distance};
use crate::core::models::particle::Particle;
use crate::core::models::system::ParticleSystem;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Decides whether two particles bond at formation.
///
/// The comparison is inclusive: a pair exactly at the enlarged threshold bonds.
pub fn classify(pi: &Particle, pj: &Particle, material: &MaterialParams) -> Option<BondEntry> {
    let radius_sum = pi.radius + pj.radius;
    let radius_min = pi.radius.min(pj.radius);
    let distance = (pi.position - pj.position).norm();
    let threshold = bond_formation_threshold(radius_sum, radius_min, material.enlarge_factor());
    (distance <= threshold).then(|| {
        BondEntry::formed(
            radius_sum - distance,
            tensile_failure_distance(
                radius_min,
                material.tensile_strength(),
                material.normal_stiffness(),
            ),
        )
    })
}

/// Runs the one-shot bond formation pass over every listed pair.
///
/// Bonded pairs are recorded in `bonds`; the history of every other slot is
/// reset to not-touching. Classification of rows runs in parallel when the
/// `parallel` feature is on; insertion happens afterwards in list order.
pub(crate) fn run(
    material: &MaterialParams,
    system: &ParticleSystem,
    neighbors: &NeighborList,
    bonds: &mut BondStateTable,
    histories: &mut ContactHistoryStore,
    reporter: &ProgressReporter,
) -> FormationReport {
    let candidate_pairs = neighbors.pair_count();
    info!(candidate_pairs, "Starting bond formation pass.");
    reporter.report(Progress::FormationStart {
        candidate_pairs: candidate_pairs as u64,
    });

    if material.enlarge_factor() < 1.0 {
        warn!(
            enlarge_factor = material.enlarge_factor(),
            "Enlarge factor below 1 requires overlap to bond; some touching pairs will stay unbonded."
        );
    }

    let particles = system.particles();
    let rows: Vec<(usize, &[u32])> = neighbors.rows().collect();

    #[cfg(not(feature = "parallel"))]
    let iterator = rows.iter();

    #[cfg(feature = "parallel")]
    let iterator = rows.par_iter();

    let classified: Vec<Vec<Option<(BondKey, BondEntry)>>> = iterator
        .map(|&(i, raw)| {
            let pi = &particles[i];
            raw.iter()
                .map(|&r| {
                    let pj = &particles[neighbor_index(r)];
                    classify(pi, pj, material).map(|entry| (BondKey::new(pi.tag, pj.tag), entry))
                })
                .collect()
        })
        .collect();

    let mut bonds_formed = 0;
    for (ii, row) in classified.into_iter().enumerate() {
        let records = histories.row_mut(ii);
        for (jj, outcome) in row.into_iter().enumerate() {
            match outcome {
                Some((key, entry)) => {
                    if bonds.insert_formed(key, entry) {
                        bonds_formed += 1;
                    }
                }
                None => records[jj].deactivate(),
            }
        }
    }

    debug!(
        table_bytes = bonds.memory_usage(),
        "Bond table allocated."
    );
    info!(bonds_formed, "Bond formation finished.");
    reporter.report(Progress::FormationFinish {
        bonds_formed: bonds_formed as u64,
    });

    FormationReport {
        candidate_pairs,
        bonds_formed,
    }
}
