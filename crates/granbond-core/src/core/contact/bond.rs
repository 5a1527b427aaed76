use crate::core::models::ids::ParticleTag;
use std::collections::HashMap;
use std::fmt;

/// Unordered particle pair identity, stored with the smaller tag first.
///
/// Keying the table on the ordered pair makes `(a, b)` and `(b, a)` the same
/// entry, so the bonded flag is symmetric by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BondKey {
    lo: ParticleTag,
    hi: ParticleTag,
}

impl BondKey {
    pub fn new(a: ParticleTag, b: ParticleTag) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    #[inline]
    pub fn lo(&self) -> ParticleTag {
        self.lo
    }

    #[inline]
    pub fn hi(&self) -> ParticleTag {
        self.hi
    }
}

impl fmt::Display for BondKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lo, self.hi)
    }
}

/// How a bond failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureMode {
    /// Stretch beyond the formation gap exceeded the tensile failure distance.
    Tensile,
    /// Tangential demand exceeded the friction plus cohesion budget.
    Shear,
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureMode::Tensile => write!(f, "tensile"),
            FailureMode::Shear => write!(f, "shear"),
        }
    }
}

/// Bond record for one particle pair that was within range at formation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondEntry {
    initial_gap: f64,
    tensile_failure_distance: f64,
    failure: Option<FailureMode>,
}

impl BondEntry {
    /// An intact bond formed with surface overlap `initial_gap`.
    ///
    /// `tensile_failure_distance` is clamped to be non-negative.
    pub fn formed(initial_gap: f64, tensile_failure_distance: f64) -> Self {
        Self {
            initial_gap,
            tensile_failure_distance: tensile_failure_distance.max(0.0),
            failure: None,
        }
    }

    #[inline]
    pub fn is_bonded(&self) -> bool {
        self.failure.is_none()
    }

    /// `radius_sum - distance` at formation; zero once broken.
    #[inline]
    pub fn initial_gap(&self) -> f64 {
        self.initial_gap
    }

    /// Zero once broken.
    #[inline]
    pub fn tensile_failure_distance(&self) -> f64 {
        self.tensile_failure_distance
    }

    #[inline]
    pub fn failure(&self) -> Option<FailureMode> {
        self.failure
    }

    fn fail(&mut self, mode: FailureMode) -> bool {
        if self.failure.is_some() {
            return false;
        }
        self.failure = Some(mode);
        self.initial_gap = 0.0;
        self.tensile_failure_distance = 0.0;
        true
    }
}

/// Bond state as seen by the force kernel for a single evaluation.
///
/// Pairs that never bonded and pairs whose bond broke both read as an unbonded
/// view with zero geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BondView {
    pub bonded: bool,
    pub initial_gap: f64,
    pub tensile_failure_distance: f64,
}

impl From<&BondEntry> for BondView {
    fn from(entry: &BondEntry) -> Self {
        Self {
            bonded: entry.is_bonded(),
            initial_gap: entry.initial_gap,
            tensile_failure_distance: entry.tensile_failure_distance,
        }
    }
}

/// Tallies of bond failures applied in one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BreakCounts {
    pub tensile: usize,
    pub shear: usize,
}

impl BreakCounts {
    #[inline]
    pub fn total(&self) -> usize {
        self.tensile + self.shear
    }
}

/// Sparse table of bonds keyed by particle pair.
///
/// Entries are created only by the formation pass and are never re-formed once
/// broken. The table holds O(bonds) entries rather than O(N²).
#[derive(Debug, Clone, Default)]
pub struct BondStateTable {
    entries: HashMap<BondKey, BondEntry>,
}

impl BondStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a bond formed at the formation pass.
    ///
    /// # Return
    ///
    /// `false` if the pair already had an entry, which is left unchanged.
    pub fn insert_formed(&mut self, key: BondKey, entry: BondEntry) -> bool {
        use std::collections::hash_map::Entry;
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn get(&self, a: ParticleTag, b: ParticleTag) -> Option<&BondEntry> {
        self.entries.get(&BondKey::new(a, b))
    }

    pub fn view(&self, a: ParticleTag, b: ParticleTag) -> BondView {
        self.get(a, b).map(BondView::from).unwrap_or_default()
    }

    pub fn is_bonded(&self, a: ParticleTag, b: ParticleTag) -> bool {
        self.get(a, b).is_some_and(BondEntry::is_bonded)
    }

    /// Permanently breaks the bond of `key`.
    ///
    /// # Return
    ///
    /// `true` if an intact bond transitioned; `false` for unknown or already
    /// broken pairs.
    pub fn break_bond(&mut self, key: BondKey, mode: FailureMode) -> bool {
        self.entries
            .get_mut(&key)
            .is_some_and(|entry| entry.fail(mode))
    }

    /// Commits a batch of staged failures.
    ///
    /// A pair reported more than once (once from each side of a full neighbor
    /// list) is counted once, with the first reported mode.
    pub fn apply<I>(&mut self, failures: I) -> BreakCounts
    where
        I: IntoIterator<Item = (BondKey, FailureMode)>,
    {
        let mut counts = BreakCounts::default();
        for (key, mode) in failures {
            if self.break_bond(key, mode) {
                match mode {
                    FailureMode::Tensile => counts.tensile += 1,
                    FailureMode::Shear => counts.shear += 1,
                }
            }
        }
        counts
    }

    /// Number of entries ever formed, intact or broken.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn intact_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_bonded()).count()
    }

    pub fn broken_count(&self, mode: FailureMode) -> usize {
        self.entries
            .values()
            .filter(|e| e.failure == Some(mode))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BondKey, &BondEntry)> {
        self.entries.iter()
    }

    /// Approximate heap bytes held by the table.
    pub fn memory_usage(&self) -> usize {
        self.entries.capacity()
            * (std::mem::size_of::<BondKey>() + std::mem::size_of::<BondEntry>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(v: u64) -> ParticleTag {
        ParticleTag(v)
    }

    #[test]
    fn bond_key_is_order_independent() {
        assert_eq!(BondKey::new(tag(5), tag(2)), BondKey::new(tag(2), tag(5)));
        let key = BondKey::new(tag(9), tag(3));
        assert_eq!(key.lo(), tag(3));
        assert_eq!(key.hi(), tag(9));
    }

    #[test]
    fn formed_entry_clamps_negative_tensile_distance() {
        let entry = BondEntry::formed(0.1, -1.0);
        assert_eq!(entry.tensile_failure_distance(), 0.0);
        assert!(entry.is_bonded());
    }

    #[test]
    fn view_of_absent_pair_is_unbonded_with_zero_geometry() {
        let table = BondStateTable::new();
        assert_eq!(table.view(tag(1), tag(2)), BondView::default());
    }

    #[test]
    fn view_is_symmetric() {
        let mut table = BondStateTable::new();
        table.insert_formed(BondKey::new(tag(1), tag(2)), BondEntry::formed(0.1, 0.05));
        let ab = table.view(tag(1), tag(2));
        let ba = table.view(tag(2), tag(1));
        assert_eq!(ab, ba);
        assert!(ab.bonded);
        assert_eq!(ab.initial_gap, 0.1);
    }

    #[test]
    fn insert_formed_does_not_overwrite_existing_entry() {
        let mut table = BondStateTable::new();
        let key = BondKey::new(tag(1), tag(2));
        assert!(table.insert_formed(key, BondEntry::formed(0.1, 0.05)));
        assert!(!table.insert_formed(key, BondEntry::formed(0.3, 0.2)));
        assert_eq!(table.get(tag(2), tag(1)).unwrap().initial_gap(), 0.1);
    }

    #[test]
    fn break_bond_zeroes_geometry_and_is_permanent() {
        let mut table = BondStateTable::new();
        let key = BondKey::new(tag(1), tag(2));
        table.insert_formed(key, BondEntry::formed(0.1, 0.05));

        assert!(table.break_bond(key, FailureMode::Tensile));
        let entry = table.get(tag(1), tag(2)).unwrap();
        assert!(!entry.is_bonded());
        assert_eq!(entry.initial_gap(), 0.0);
        assert_eq!(entry.tensile_failure_distance(), 0.0);
        assert_eq!(entry.failure(), Some(FailureMode::Tensile));

        assert!(!table.break_bond(key, FailureMode::Shear));
        assert_eq!(
            table.get(tag(1), tag(2)).unwrap().failure(),
            Some(FailureMode::Tensile)
        );
    }

    #[test]
    fn break_bond_on_unknown_pair_is_noop() {
        let mut table = BondStateTable::new();
        assert!(!table.break_bond(BondKey::new(tag(1), tag(2)), FailureMode::Shear));
        assert!(table.is_empty());
    }

    #[test]
    fn apply_counts_duplicate_reports_once() {
        let mut table = BondStateTable::new();
        let a = BondKey::new(tag(1), tag(2));
        let b = BondKey::new(tag(3), tag(4));
        table.insert_formed(a, BondEntry::formed(0.0, 0.1));
        table.insert_formed(b, BondEntry::formed(0.0, 0.1));

        let counts = table.apply([
            (a, FailureMode::Tensile),
            (a, FailureMode::Tensile),
            (b, FailureMode::Shear),
        ]);
        assert_eq!(counts, BreakCounts { tensile: 1, shear: 1 });
        assert_eq!(counts.total(), 2);
        assert_eq!(table.intact_count(), 0);
        assert_eq!(table.broken_count(FailureMode::Tensile), 1);
        assert_eq!(table.broken_count(FailureMode::Shear), 1);
        assert_eq!(table.len(), 2);
    }
}
