use crate::core::models::system::ParticleSystem;
use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CoefficientError {
    #[error("Particle type {value} is outside 1..={ntypes}")]
    TypeOutOfRange { value: usize, ntypes: usize },
    #[error("Coefficient assignment {i:?} x {j:?} covers no type pairs")]
    EmptyAssignment {
        i: RangeInclusive<usize>,
        j: RangeInclusive<usize>,
    },
    #[error("Expected {expected} type-pair flags but found {found}")]
    FlagCount { expected: usize, found: usize },
}

/// Records which unordered type pairs the contact model is active for.
///
/// Types are numbered `1..=ntypes`. Only pairs with `i <= j` are stored; lookups
/// are symmetric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCoefficients {
    ntypes: usize,
    assigned: Vec<bool>,
}

impl TypeCoefficients {
    pub fn new(ntypes: usize) -> Self {
        Self {
            ntypes,
            assigned: vec![false; ntypes * (ntypes + 1) / 2],
        }
    }

    /// Creates a table with every type pair active.
    pub fn all(ntypes: usize) -> Self {
        Self {
            ntypes,
            assigned: vec![true; ntypes * (ntypes + 1) / 2],
        }
    }

    #[inline]
    pub fn ntypes(&self) -> usize {
        self.ntypes
    }

    fn offset(&self, i: usize, j: usize) -> usize {
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        // Row-major upper triangle with 1-based types.
        (lo - 1) * (2 * self.ntypes + 2 - lo) / 2 + (hi - lo)
    }

    fn check(&self, value: usize) -> Result<(), CoefficientError> {
        if value == 0 || value > self.ntypes {
            Err(CoefficientError::TypeOutOfRange {
                value,
                ntypes: self.ntypes,
            })
        } else {
            Ok(())
        }
    }

    /// Activates every pair `(i, j)` with `i` in `i_types`, `j` in `j_types`, `j >= i`.
    ///
    /// # Return
    ///
    /// The number of pairs covered by the assignment.
    ///
    /// # Errors
    ///
    /// Fails if a range bound lies outside `1..=ntypes` or the ranges select no pair.
    pub fn assign(
        &mut self,
        i_types: RangeInclusive<usize>,
        j_types: RangeInclusive<usize>,
    ) -> Result<usize, CoefficientError> {
        for bound in [*i_types.start(), *i_types.end(), *j_types.start(), *j_types.end()] {
            self.check(bound)?;
        }

        let mut count = 0;
        for i in i_types.clone() {
            for j in i.max(*j_types.start())..=*j_types.end() {
                let offset = self.offset(i, j);
                self.assigned[offset] = true;
                count += 1;
            }
        }

        if count == 0 {
            return Err(CoefficientError::EmptyAssignment {
                i: i_types,
                j: j_types,
            });
        }
        Ok(count)
    }

    pub fn is_assigned(&self, i: usize, j: usize) -> bool {
        if self.check(i).is_err() || self.check(j).is_err() {
            return false;
        }
        self.assigned[self.offset(i, j)]
    }

    /// Type pairs `(i, j)`, `i <= j`, that have not been activated.
    pub fn unassigned_pairs(&self) -> Vec<(usize, usize)> {
        self.pairs()
            .filter(|&(i, j)| !self.assigned[self.offset(i, j)])
            .collect()
    }

    /// All type pairs `(i, j)` with `i <= j`, in row order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (1..=self.ntypes).flat_map(move |i| (i..=self.ntypes).map(move |j| (i, j)))
    }

    /// Activation flags in row order, matching [`TypeCoefficients::pairs`].
    pub fn flags(&self) -> Vec<bool> {
        self.pairs().map(|(i, j)| self.is_assigned(i, j)).collect()
    }

    /// Rebuilds a table from flags in row order.
    pub fn from_flags(ntypes: usize, flags: &[bool]) -> Result<Self, CoefficientError> {
        let expected = ntypes * (ntypes + 1) / 2;
        if flags.len() != expected {
            return Err(CoefficientError::FlagCount {
                expected,
                found: flags.len(),
            });
        }
        Ok(Self {
            ntypes,
            assigned: flags.to_vec(),
        })
    }
}

/// Largest particle radius per type, split by frozen and dynamic particles.
///
/// Used to derive per-type-pair interaction cutoffs for the neighbor-list builder.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusExtents {
    dynamic: Vec<f64>,
    frozen: Vec<f64>,
}

impl RadiusExtents {
    pub fn new(ntypes: usize) -> Self {
        Self {
            dynamic: vec![0.0; ntypes + 1],
            frozen: vec![0.0; ntypes + 1],
        }
    }

    /// Scans the owned particles of `system`.
    ///
    /// Types above `ntypes` are ignored.
    pub fn from_system(system: &ParticleSystem, ntypes: usize, freeze_group_bit: u32) -> Self {
        let mut extents = Self::new(ntypes);
        for particle in system.local_particles() {
            if particle.type_id == 0 || particle.type_id > ntypes {
                continue;
            }
            let slot = if particle.in_group(freeze_group_bit) {
                &mut extents.frozen[particle.type_id]
            } else {
                &mut extents.dynamic[particle.type_id]
            };
            *slot = slot.max(particle.radius);
        }
        extents
    }

    /// Accounts for particles of `type_id` that will be inserted later.
    pub fn with_inserted_radius(mut self, type_id: usize, radius: f64) -> Self {
        if let Some(slot) = self.dynamic.get_mut(type_id) {
            *slot = slot.max(radius);
        }
        self
    }

    /// Element-wise maximum with extents gathered on another domain.
    pub fn merge(&mut self, other: &Self) {
        for (a, b) in self.dynamic.iter_mut().zip(&other.dynamic) {
            *a = a.max(*b);
        }
        for (a, b) in self.frozen.iter_mut().zip(&other.frozen) {
            *a = a.max(*b);
        }
    }

    /// Contact cutoff for type pair `(i, j)`.
    ///
    /// Frozen/frozen pairs never interact, so the sum of two frozen radii is not
    /// considered.
    pub fn cutoff(&self, i: usize, j: usize) -> f64 {
        let dyn_i = self.dynamic.get(i).copied().unwrap_or(0.0);
        let dyn_j = self.dynamic.get(j).copied().unwrap_or(0.0);
        let frz_i = self.frozen.get(i).copied().unwrap_or(0.0);
        let frz_j = self.frozen.get(j).copied().unwrap_or(0.0);
        (dyn_i + dyn_j).max(frz_i + dyn_j).max(dyn_i + frz_j)
    }
}
