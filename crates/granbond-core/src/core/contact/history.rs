use super::neighbor::{NeighborError, NeighborList, neighbor_index};
use crate::core::models::ids::ParticleTag;
use crate::core::models::system::ParticleSystem;
use nalgebra::Vector3;
use std::collections::HashMap;

/// Number of scalars in the flat per-contact history layout.
pub const HISTORY_SIZE: usize = 7;

/// Persistent state of one neighbor relation.
///
/// The flat layout exchanged with hosts is `[shear.x, shear.y, shear.z, reserved,
/// formation marker, tensile breaks, shear breaks]`. The formation marker slot is
/// kept for layout compatibility and always reads 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactHistory {
    /// Time-integrated tangential displacement, kept tangent to the contact normal.
    pub shear: Vector3<f64>,
    /// Whether the relation contributed force at the last evaluation.
    pub touching: bool,
    pub tensile_breaks: u32,
    pub shear_breaks: u32,
    /// Diagnostic scalar passed through untouched.
    pub reserved: f64,
}

impl ContactHistory {
    /// Marks the relation as not touching and drops its tangential spring.
    #[inline]
    pub fn deactivate(&mut self) {
        self.touching = false;
        self.shear = Vector3::zeros();
    }

    pub fn to_scalars(&self) -> [f64; HISTORY_SIZE] {
        [
            self.shear.x,
            self.shear.y,
            self.shear.z,
            self.reserved,
            0.0,
            f64::from(self.tensile_breaks),
            f64::from(self.shear_breaks),
        ]
    }

    /// Rebuilds a record from its flat layout and the separately kept touch flag.
    ///
    /// Counters are truncated towards zero and saturate at the `u32` range.
    pub fn from_scalars(values: &[f64; HISTORY_SIZE], touching: bool) -> Self {
        Self {
            shear: Vector3::new(values[0], values[1], values[2]),
            touching,
            tensile_breaks: values[5] as u32,
            shear_breaks: values[6] as u32,
            reserved: values[3],
        }
    }
}

/// Outcome of realigning a store with a rebuilt neighbor list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStats {
    /// Relations present before and after the rebuild.
    pub carried: usize,
    /// Relations that appeared with the rebuild.
    pub fresh: usize,
    /// Relations that disappeared with the rebuild.
    pub dropped: usize,
}

/// Contact history for every slot of a neighbor list.
///
/// Row `ii` and slot `jj` address the same relation as row `ii`, slot `jj` of the
/// neighbor list the store was last synced with. Relations are identified by
/// particle tags so they survive index reshuffles between rebuilds.
#[derive(Debug, Clone, Default)]
pub struct ContactHistoryStore {
    owners: Vec<ParticleTag>,
    partners: Vec<Vec<ParticleTag>>,
    records: Vec<Vec<ContactHistory>>,
}

impl ContactHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with zeroed records for every slot of `neighbors`.
    pub fn for_neighbors(
        system: &ParticleSystem,
        neighbors: &NeighborList,
    ) -> Result<Self, NeighborError> {
        let mut store = Self::new();
        store.sync(system, neighbors)?;
        Ok(store)
    }

    /// Realigns the store with `neighbors`.
    ///
    /// Records of relations that persist are carried over by tag; new relations
    /// start zeroed and relations no longer listed are discarded. A relation that
    /// moved to its partner's row keeps its counters with the shear displacement
    /// negated, since the separation vector flips with the owner. Exact matches
    /// are resolved before such hand-overs, so full lists keep both directions.
    ///
    /// Relations are keyed by `(owner tag, partner tag)`. Two periodic images of
    /// the same partner in one row therefore share a record (and a bond), which
    /// only happens when the box is shorter than twice the cutoff.
    pub fn sync(
        &mut self,
        system: &ParticleSystem,
        neighbors: &NeighborList,
    ) -> Result<SyncStats, NeighborError> {
        neighbors.validate(system)?;
        let particles = system.particles();

        let mut previous: HashMap<(ParticleTag, ParticleTag), ContactHistory> = self
            .owners
            .iter()
            .zip(&self.partners)
            .zip(&self.records)
            .flat_map(|((&owner, partners), records)| {
                partners
                    .iter()
                    .zip(records)
                    .map(move |(&partner, &record)| ((owner, partner), record))
            })
            .collect();

        let mut stats = SyncStats::default();
        let mut owners = Vec::with_capacity(neighbors.len());
        let mut partners = Vec::with_capacity(neighbors.len());
        let mut matched: Vec<Vec<Option<ContactHistory>>> = Vec::with_capacity(neighbors.len());

        for (i, raw) in neighbors.rows() {
            let owner = particles[i].tag;
            let row_partners: Vec<ParticleTag> = raw
                .iter()
                .map(|&r| particles[neighbor_index(r)].tag)
                .collect();
            matched.push(
                row_partners
                    .iter()
                    .map(|&partner| previous.remove(&(owner, partner)))
                    .collect(),
            );
            owners.push(owner);
            partners.push(row_partners);
        }

        let records = owners
            .iter()
            .zip(&partners)
            .zip(matched)
            .map(|((&owner, row_partners), row)| {
                row_partners
                    .iter()
                    .zip(row)
                    .map(|(&partner, exact)| {
                        let carried = exact.or_else(|| {
                            previous.remove(&(partner, owner)).map(|mut record| {
                                record.shear = -record.shear;
                                record
                            })
                        });
                        match carried {
                            Some(record) => {
                                stats.carried += 1;
                                record
                            }
                            None => {
                                stats.fresh += 1;
                                ContactHistory::default()
                            }
                        }
                    })
                    .collect()
            })
            .collect();
        stats.dropped = previous.len();

        self.owners = owners;
        self.partners = partners;
        self.records = records;
        Ok(stats)
    }

    /// Whether the store's shape and tags match `neighbors` over `system`.
    pub fn is_aligned(&self, system: &ParticleSystem, neighbors: &NeighborList) -> bool {
        if self.owners.len() != neighbors.len() {
            return false;
        }
        let particles = system.particles();
        neighbors.rows().enumerate().all(|(ii, (i, raw))| {
            particles.get(i).map(|p| p.tag) == Some(self.owners[ii])
                && raw.len() == self.partners[ii].len()
                && raw.iter().zip(&self.partners[ii]).all(|(&r, &tag)| {
                    particles.get(neighbor_index(r)).map(|p| p.tag) == Some(tag)
                })
        })
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total number of relations over all rows.
    pub fn relation_count(&self) -> usize {
        self.records.iter().map(Vec::len).sum()
    }

    pub fn row(&self, ii: usize) -> &[ContactHistory] {
        &self.records[ii]
    }

    pub fn row_mut(&mut self, ii: usize) -> &mut [ContactHistory] {
        &mut self.records[ii]
    }

    /// All rows, for evaluation passes that walk the neighbor list in step.
    pub fn rows_mut(&mut self) -> &mut [Vec<ContactHistory>] {
        &mut self.records
    }

    /// Looks up the record `owner` keeps for `partner`.
    pub fn get(&self, owner: ParticleTag, partner: ParticleTag) -> Option<&ContactHistory> {
        let ii = self.owners.iter().position(|&t| t == owner)?;
        let jj = self.partners[ii].iter().position(|&t| t == partner)?;
        Some(&self.records[ii][jj])
    }

    /// Iterates `(owner, partner, record)` over every relation.
    pub fn iter(&self) -> impl Iterator<Item = (ParticleTag, ParticleTag, &ContactHistory)> + '_ {
        self.owners
            .iter()
            .zip(&self.partners)
            .zip(&self.records)
            .flat_map(|((&owner, partners), records)| {
                partners
                    .iter()
                    .zip(records)
                    .map(move |(&partner, record)| (owner, partner, record))
            })
    }

    /// Approximate heap bytes held by the store.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;
        let rows = self.owners.capacity() * size_of::<ParticleTag>()
            + self.partners.capacity() * size_of::<Vec<ParticleTag>>()
            + self.records.capacity() * size_of::<Vec<ContactHistory>>();
        let slots: usize = self
            .records
            .iter()
            .zip(&self.partners)
            .map(|(r, p)| {
                r.capacity() * size_of::<ContactHistory>() + p.capacity() * size_of::<ParticleTag>()
            })
            .sum();
        rows + slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contact::neighbor::ListKind;
    use crate::core::models::particle::Particle;
    use nalgebra::Point3;

    fn system_at(xs: &[(u64, f64)]) -> ParticleSystem {
        ParticleSystem::new(
            xs.iter()
                .map(|&(tag, x)| Particle::new(tag, Point3::new(x, 0.0, 0.0), 0.5, 1.0))
                .collect(),
        )
    }

    fn touching_list(system: &ParticleSystem) -> NeighborList {
        NeighborList::brute_force(system, ListKind::Half, |a, b| a.radius + b.radius)
    }

    #[test]
    fn scalars_layout_places_counters_in_last_slots() {
        let record = ContactHistory {
            shear: Vector3::new(0.1, 0.2, 0.3),
            touching: true,
            tensile_breaks: 2,
            shear_breaks: 5,
            reserved: 9.0,
        };
        let scalars = record.to_scalars();
        assert_eq!(scalars, [0.1, 0.2, 0.3, 9.0, 0.0, 2.0, 5.0]);
        assert_eq!(ContactHistory::from_scalars(&scalars, true), record);
    }

    #[test]
    fn from_scalars_ignores_formation_marker() {
        let record = ContactHistory::from_scalars(&[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0], false);
        assert_eq!(record.to_scalars()[4], 0.0);
    }

    #[test]
    fn deactivate_clears_shear_but_keeps_counters() {
        let mut record = ContactHistory {
            shear: Vector3::new(1.0, 0.0, 0.0),
            touching: true,
            tensile_breaks: 1,
            shear_breaks: 0,
            reserved: 0.0,
        };
        record.deactivate();
        assert!(!record.touching);
        assert_eq!(record.shear, Vector3::zeros());
        assert_eq!(record.tensile_breaks, 1);
    }

    #[test]
    fn for_neighbors_creates_zeroed_records_per_slot() {
        let system = system_at(&[(1, 0.0), (2, 1.0), (3, 2.0)]);
        let list = touching_list(&system);
        let store = ContactHistoryStore::for_neighbors(&system, &list).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.relation_count(), 2);
        assert!(store.iter().all(|(_, _, r)| *r == ContactHistory::default()));
        assert!(store.is_aligned(&system, &list));
    }

    #[test]
    fn sync_carries_records_by_tag_across_reordering() {
        let system = system_at(&[(1, 0.0), (2, 1.0), (3, 2.0)]);
        let list = touching_list(&system);
        let mut store = ContactHistoryStore::for_neighbors(&system, &list).unwrap();
        store.row_mut(0)[0].shear = Vector3::new(0.0, 0.5, 0.0);
        store.row_mut(0)[0].tensile_breaks = 3;

        // Same particles, permuted storage order: tag 2 now sits at index 0.
        let reordered = system_at(&[(2, 1.0), (1, 0.0), (3, 2.0)]);
        let new_list = NeighborList::from_rows(
            ListKind::Half,
            vec![(0, vec![2]), (1, vec![0]), (2, vec![])],
        );
        let stats = store.sync(&reordered, &new_list).unwrap();

        // (1, 2) was owned by tag 1 before and still is; (2, 3) likewise by tag 2.
        assert_eq!(stats, SyncStats { carried: 2, fresh: 0, dropped: 0 });
        let carried = store.get(ParticleTag(1), ParticleTag(2)).unwrap();
        assert_eq!(carried.shear, Vector3::new(0.0, 0.5, 0.0));
        assert_eq!(carried.tensile_breaks, 3);
        assert!(store.is_aligned(&reordered, &new_list));
    }

    #[test]
    fn sync_hands_record_to_new_owner_with_flipped_shear() {
        let system = system_at(&[(1, 0.0), (2, 1.0)]);
        let mut store = ContactHistoryStore::for_neighbors(&system, &touching_list(&system)).unwrap();
        store.row_mut(0)[0].shear = Vector3::new(0.0, 0.5, 0.0);
        store.row_mut(0)[0].touching = true;
        store.row_mut(0)[0].shear_breaks = 1;

        // Tag 2 now sits at index 0, so the half list gives the pair to tag 2.
        let resorted = system_at(&[(2, 1.0), (1, 0.0)]);
        let list = touching_list(&resorted);
        let stats = store.sync(&resorted, &list).unwrap();

        assert_eq!(stats, SyncStats { carried: 1, fresh: 0, dropped: 0 });
        assert!(store.get(ParticleTag(1), ParticleTag(2)).is_none());
        let handed = store.get(ParticleTag(2), ParticleTag(1)).unwrap();
        assert_eq!(handed.shear, Vector3::new(0.0, -0.5, 0.0));
        assert!(handed.touching);
        assert_eq!(handed.shear_breaks, 1);
        assert!(store.is_aligned(&resorted, &list));
    }

    #[test]
    fn sync_prefers_exact_matches_in_full_lists() {
        let system = system_at(&[(1, 0.0), (2, 1.0)]);
        let list = NeighborList::brute_force(&system, ListKind::Full, |a, b| a.radius + b.radius);
        let mut store = ContactHistoryStore::for_neighbors(&system, &list).unwrap();
        store.row_mut(0)[0].shear = Vector3::new(0.0, 0.5, 0.0);
        store.row_mut(1)[0].shear = Vector3::new(0.0, -0.5, 0.0);

        let stats = store.sync(&system, &list).unwrap();

        assert_eq!(stats, SyncStats { carried: 2, fresh: 0, dropped: 0 });
        assert_eq!(
            store.get(ParticleTag(1), ParticleTag(2)).unwrap().shear,
            Vector3::new(0.0, 0.5, 0.0)
        );
        assert_eq!(
            store.get(ParticleTag(2), ParticleTag(1)).unwrap().shear,
            Vector3::new(0.0, -0.5, 0.0)
        );
    }

    #[test]
    fn sync_zeroes_new_relations_and_drops_vanished_ones() {
        let system = system_at(&[(1, 0.0), (2, 1.0), (3, 5.0)]);
        let list = touching_list(&system);
        let mut store = ContactHistoryStore::for_neighbors(&system, &list).unwrap();
        store.row_mut(0)[0].touching = true;

        let moved = system_at(&[(1, 0.0), (2, 3.0), (3, 4.0)]);
        let stats = store.sync(&moved, &touching_list(&moved)).unwrap();
        assert_eq!(stats, SyncStats { carried: 0, fresh: 1, dropped: 1 });
        assert!(store.get(ParticleTag(1), ParticleTag(2)).is_none());
        assert_eq!(
            store.get(ParticleTag(2), ParticleTag(3)),
            Some(&ContactHistory::default())
        );
    }

    #[test]
    fn sync_rejects_invalid_list() {
        let system = system_at(&[(1, 0.0)]);
        let list = NeighborList::from_rows(ListKind::Half, vec![(0, vec![4])]);
        assert!(ContactHistoryStore::for_neighbors(&system, &list).is_err());
    }

    #[test]
    fn is_aligned_detects_stale_store() {
        let system = system_at(&[(1, 0.0), (2, 1.0)]);
        let store = ContactHistoryStore::new();
        assert!(!store.is_aligned(&system, &touching_list(&system)));
        assert!(store.memory_usage() == 0);
    }
}
