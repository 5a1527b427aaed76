use crate::core::models::particle::Particle;
use crate::core::models::system::ParticleSystem;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bits of a raw neighbor entry that hold the particle index.
///
/// The top two bits carry special-bond flags set by the host's list
/// builder and must be stripped before the entry is used as an index.
pub const NEIGHMASK: u32 = 0x1FFF_FFFF;
/// Shift of the special-bond flags within a raw neighbor entry.
pub const SBBITS: u32 = 30;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NeighborError {
    #[error("Neighbor list owner index {index} is not a locally owned particle (nlocal = {nlocal})")]
    OwnerNotLocal { index: usize, nlocal: usize },
    #[error("Neighbor index {index} of particle {owner} is outside the particle set (len = {len})")]
    IndexOutOfRange {
        owner: usize,
        index: usize,
        len: usize,
    },
    #[error("Particle {index} lists itself as a neighbor")]
    SelfPair { index: usize },
}

/// How pairs are distributed over the per-particle neighbor rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListKind {
    /// Each unordered pair appears in exactly one row.
    #[default]
    Half,
    /// Every owned particle lists all of its partners, so local pairs appear twice.
    Full,
}

/// Per-step candidate pairs, as delivered by the host's neighbor-list builder.
///
/// Row `ii` belongs to owned particle `ilist[ii]` and holds raw neighbor entries;
/// the slot position within the row addresses that pair's contact history.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborList {
    kind: ListKind,
    ilist: Vec<usize>,
    rows: Vec<Vec<u32>>,
    rebuilt: bool,
}

/// Decodes the particle index of a raw neighbor entry.
#[inline]
pub fn neighbor_index(raw: u32) -> usize {
    (raw & NEIGHMASK) as usize
}

/// Decodes the special-bond flags of a raw neighbor entry.
#[inline]
pub fn special_bits(raw: u32) -> u32 {
    (raw >> SBBITS) & 0b11
}

impl NeighborList {
    /// Wraps rows produced by an external builder.
    ///
    /// The list is marked as freshly rebuilt.
    pub fn from_rows(kind: ListKind, rows: Vec<(usize, Vec<u32>)>) -> Self {
        let (ilist, rows) = rows.into_iter().unzip();
        Self {
            kind,
            ilist,
            rows,
            rebuilt: true,
        }
    }

    /// Builds a list by testing every pair against `cutoff`.
    ///
    /// A pair is listed when its center distance does not exceed
    /// `cutoff(p_i, p_j)`. Half lists give every pair to the lower index, so a pair
    /// of an owned particle and a ghost is always listed on this side.
    pub fn brute_force<F>(system: &ParticleSystem, kind: ListKind, cutoff: F) -> Self
    where
        F: Fn(&Particle, &Particle) -> f64,
    {
        let particles = system.particles();
        let within = |i: usize, j: usize| {
            let (a, b) = (&particles[i], &particles[j]);
            let reach = cutoff(a, b);
            (a.position - b.position).norm_squared() <= reach * reach
        };

        let rows = (0..system.nlocal())
            .map(|i| {
                let candidates: Vec<u32> = match kind {
                    ListKind::Half => ((i + 1)..particles.len())
                        .filter(|&j| within(i, j))
                        .map(|j| j as u32)
                        .collect(),
                    ListKind::Full => (0..particles.len())
                        .filter(|&j| j != i && within(i, j))
                        .map(|j| j as u32)
                        .collect(),
                };
                (i, candidates)
            })
            .collect();

        Self::from_rows(kind, rows)
    }

    #[inline]
    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// Number of rows (owned particles with a neighbor row).
    #[inline]
    pub fn len(&self) -> usize {
        self.ilist.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ilist.is_empty()
    }

    /// Total number of listed pairs over all rows.
    pub fn pair_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Owner particle index of row `ii`.
    #[inline]
    pub fn owner(&self, ii: usize) -> usize {
        self.ilist[ii]
    }

    /// Raw entries of row `ii`, special bits included.
    #[inline]
    pub fn raw_row(&self, ii: usize) -> &[u32] {
        &self.rows[ii]
    }

    /// Masked neighbor indices of row `ii`.
    pub fn neighbors(&self, ii: usize) -> impl Iterator<Item = usize> + '_ {
        self.rows[ii].iter().map(|&raw| neighbor_index(raw))
    }

    /// Rows as `(owner index, raw entries)` in list order.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[u32])> + '_ {
        self.ilist
            .iter()
            .copied()
            .zip(self.rows.iter().map(Vec::as_slice))
    }

    /// Whether the rows changed since the previous step.
    #[inline]
    pub fn is_rebuilt(&self) -> bool {
        self.rebuilt
    }

    /// Marks the list as reused (or rebuilt) for the next evaluation.
    pub fn set_rebuilt(&mut self, rebuilt: bool) {
        self.rebuilt = rebuilt;
    }

    /// Checks that every row owner is local and every neighbor index exists.
    pub fn validate(&self, system: &ParticleSystem) -> Result<(), NeighborError> {
        for (owner, raw) in self.rows() {
            if owner >= system.nlocal() {
                return Err(NeighborError::OwnerNotLocal {
                    index: owner,
                    nlocal: system.nlocal(),
                });
            }
            if let Some(index) = raw
                .iter()
                .map(|&r| neighbor_index(r))
                .find(|&j| j >= system.len())
            {
                return Err(NeighborError::IndexOutOfRange {
                    owner,
                    index,
                    len: system.len(),
                });
            }
            if raw.iter().any(|&r| neighbor_index(r) == owner) {
                return Err(NeighborError::SelfPair { index: owner });
            }
        }
        Ok(())
    }

    /// Distinct unordered pairs `(i, j)` with `i < j`, sorted.
    ///
    /// Collapses the two listings of a full list into one.
    pub fn unique_pairs(&self) -> Vec<(usize, usize)> {
        self.rows()
            .flat_map(|(i, raw)| {
                raw.iter().map(move |&r| {
                    let j = neighbor_index(r);
                    if i < j { (i, j) } else { (j, i) }
                })
            })
            .sorted_unstable()
            .dedup()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn line_of_particles(n: usize, spacing: f64) -> ParticleSystem {
        ParticleSystem::new(
            (0..n)
                .map(|k| Particle::new(k as u64 + 1, Point3::new(k as f64 * spacing, 0.0, 0.0), 0.5, 1.0))
                .collect(),
        )
    }

    fn touching(a: &Particle, b: &Particle) -> f64 {
        a.radius + b.radius
    }

    #[test]
    fn neighbor_index_strips_special_bits() {
        let raw = (2u32 << SBBITS) | 17;
        assert_eq!(neighbor_index(raw), 17);
        assert_eq!(special_bits(raw), 2);
    }

    #[test]
    fn brute_force_half_lists_each_pair_once() {
        let system = line_of_particles(4, 1.0);
        let list = NeighborList::brute_force(&system, ListKind::Half, touching);
        assert_eq!(list.len(), 4);
        assert_eq!(list.pair_count(), 3);
        assert_eq!(list.neighbors(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(list.neighbors(3).count(), 0);
        assert!(list.is_rebuilt());
    }

    #[test]
    fn brute_force_full_lists_each_pair_from_both_sides() {
        let system = line_of_particles(3, 1.0);
        let list = NeighborList::brute_force(&system, ListKind::Full, touching);
        assert_eq!(list.pair_count(), 4);
        assert_eq!(list.neighbors(1).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(list.unique_pairs(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn brute_force_respects_cutoff() {
        let system = line_of_particles(3, 1.5);
        let list = NeighborList::brute_force(&system, ListKind::Half, touching);
        assert_eq!(list.pair_count(), 0);
        let list = NeighborList::brute_force(&system, ListKind::Half, |a, b| a.radius + b.radius + 0.5);
        assert_eq!(list.pair_count(), 2);
    }

    #[test]
    fn brute_force_only_builds_rows_for_owned_particles() {
        let owned = vec![Particle::new(1, Point3::origin(), 0.5, 1.0)];
        let ghosts = vec![Particle::new(2, Point3::new(0.9, 0.0, 0.0), 0.5, 1.0)];
        let system = ParticleSystem::with_ghosts(owned, ghosts, true);
        let list = NeighborList::brute_force(&system, ListKind::Full, touching);
        assert_eq!(list.len(), 1);
        assert_eq!(list.neighbors(0).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn validate_rejects_out_of_range_neighbor() {
        let system = line_of_particles(2, 1.0);
        let list = NeighborList::from_rows(ListKind::Half, vec![(0, vec![5])]);
        assert_eq!(
            list.validate(&system),
            Err(NeighborError::IndexOutOfRange {
                owner: 0,
                index: 5,
                len: 2
            })
        );
    }

    #[test]
    fn validate_masks_special_bits_before_checking() {
        let system = line_of_particles(2, 1.0);
        let list = NeighborList::from_rows(ListKind::Half, vec![(0, vec![(1u32 << SBBITS) | 1])]);
        assert!(list.validate(&system).is_ok());
    }

    #[test]
    fn validate_rejects_ghost_owner_and_self_pair() {
        let system = ParticleSystem::with_ghosts(
            vec![Particle::new(1, Point3::origin(), 0.5, 1.0)],
            vec![Particle::new(2, Point3::new(1.0, 0.0, 0.0), 0.5, 1.0)],
            true,
        );
        let ghost_owner = NeighborList::from_rows(ListKind::Half, vec![(1, vec![0])]);
        assert!(matches!(
            ghost_owner.validate(&system),
            Err(NeighborError::OwnerNotLocal { index: 1, nlocal: 1 })
        ));
        let self_pair = NeighborList::from_rows(ListKind::Half, vec![(0, vec![0])]);
        assert_eq!(
            self_pair.validate(&system),
            Err(NeighborError::SelfPair { index: 0 })
        );
    }

    #[test]
    fn set_rebuilt_toggles_flag() {
        let mut list = NeighborList::from_rows(ListKind::Half, Vec::new());
        list.set_rebuilt(false);
        assert!(!list.is_rebuilt());
        assert!(list.is_empty());
    }
}
