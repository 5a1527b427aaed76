use super::error::EngineError;
use crate::core::models::ids::ParticleTag;
use crate::core::models::system::ParticleSystem;
use std::collections::HashMap;
use tracing::debug;

/// Membership of particles in rigid aggregates and the aggregates' total masses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RigidBodies {
    membership: HashMap<ParticleTag, usize>,
    masses: Vec<f64>,
}

impl RigidBodies {
    /// Creates a body set from explicit membership and body masses.
    ///
    /// # Errors
    ///
    /// Fails if a particle refers to a body index without a mass, or a body mass
    /// is not finite and positive.
    pub fn new(
        membership: HashMap<ParticleTag, usize>,
        masses: Vec<f64>,
    ) -> Result<Self, EngineError> {
        if let Some((tag, body)) = membership.iter().find(|(_, b)| **b >= masses.len()) {
            return Err(EngineError::Precondition(format!(
                "Particle {tag} belongs to body {body}, but only {} body masses are known",
                masses.len()
            )));
        }
        if let Some(mass) = masses.iter().find(|m| !(m.is_finite() && **m > 0.0)) {
            return Err(EngineError::Precondition(format!(
                "Rigid body mass {mass} must be finite and positive"
            )));
        }
        Ok(Self { membership, masses })
    }

    /// Groups the owned particles of `system` by body label.
    ///
    /// `labels` is aligned with the system's particle order; each body's mass is
    /// the sum of its members' masses.
    pub fn from_labels(system: &ParticleSystem, labels: &[Option<u64>]) -> Result<Self, EngineError> {
        let mut index_of_label: HashMap<u64, usize> = HashMap::new();
        let mut membership = HashMap::new();
        let mut masses: Vec<f64> = Vec::new();

        for (particle, label) in system.local_particles().iter().zip(labels) {
            let Some(label) = label else { continue };
            let body = *index_of_label.entry(*label).or_insert_with(|| {
                masses.push(0.0);
                masses.len() - 1
            });
            masses[body] += particle.mass;
            membership.insert(particle.tag, body);
        }
        Self::new(membership, masses)
    }

    #[inline]
    pub fn body_count(&self) -> usize {
        self.masses.len()
    }

    pub fn body_of(&self, tag: ParticleTag) -> Option<usize> {
        self.membership.get(&tag).copied()
    }

    pub fn body_mass(&self, body: usize) -> Option<f64> {
        self.masses.get(body).copied()
    }
}

/// Delivers owned per-particle scalars to the ghost copies of those particles.
pub trait GhostExchange {
    /// Fills `values[nlocal..]` from the owners of the corresponding ghosts.
    fn forward(&mut self, values: &mut [f64], nlocal: usize) -> Result<(), EngineError>;
}

/// Packs the values of the particles in `send_list` into a contiguous buffer.
///
/// # Errors
///
/// Returns [`EngineError::Internal`] if `send_list` names a particle outside `values`.
pub fn pack_forward(values: &[f64], send_list: &[usize]) -> Result<Vec<f64>, EngineError> {
    send_list
        .iter()
        .map(|&i| {
            values.get(i).copied().ok_or_else(|| {
                EngineError::Internal(format!(
                    "Send list entry {i} is outside the {} exchanged values",
                    values.len()
                ))
            })
        })
        .collect()
}

/// Writes a received buffer into consecutive slots starting at `first`.
///
/// # Errors
///
/// Returns [`EngineError::Internal`] if the buffer does not fit behind `first`.
pub fn unpack_forward(values: &mut [f64], first: usize, buffer: &[f64]) -> Result<(), EngineError> {
    let len = values.len();
    let target = first
        .checked_add(buffer.len())
        .and_then(|end| values.get_mut(first..end))
        .ok_or_else(|| {
            EngineError::Internal(format!(
                "Cannot unpack {} values at slot {first} into {len} exchanged values",
                buffer.len()
            ))
        })?;
    target.copy_from_slice(buffer);
    Ok(())
}

/// Exchange for ghosts that are images of particles owned by the same process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalImages {
    /// Owner index of each ghost, in ghost order.
    owners: Vec<usize>,
}

impl LocalImages {
    /// Resolves every ghost of `system` to its owned copy by tag.
    ///
    /// # Errors
    ///
    /// Fails if a ghost's particle is not owned by this system.
    pub fn from_system(system: &ParticleSystem) -> Result<Self, EngineError> {
        let owned: HashMap<ParticleTag, usize> = system
            .local_particles()
            .iter()
            .enumerate()
            .map(|(i, p)| (p.tag, i))
            .collect();
        let owners = system.particles()[system.nlocal()..]
            .iter()
            .map(|ghost| {
                owned.get(&ghost.tag).copied().ok_or_else(|| {
                    EngineError::Precondition(format!(
                        "Ghost particle {} has no local owner to copy from",
                        ghost.tag
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { owners })
    }
}

impl GhostExchange for LocalImages {
    fn forward(&mut self, values: &mut [f64], nlocal: usize) -> Result<(), EngineError> {
        if values.len() != nlocal + self.owners.len() {
            return Err(EngineError::Internal(format!(
                "Image map covers {} ghosts but {} values follow the owned block",
                self.owners.len(),
                values.len().saturating_sub(nlocal)
            )));
        }
        let buffer = pack_forward(values, &self.owners)?;
        unpack_forward(values, nlocal, &buffer)
    }
}

/// Per-particle effective-mass overrides for members of rigid aggregates.
///
/// An override of 0 means "use the particle's own mass".
#[derive(Debug, Clone, Default)]
pub struct RigidMassResolver {
    bodies: RigidBodies,
    overrides: Vec<f64>,
}

impl RigidMassResolver {
    pub fn new(bodies: RigidBodies) -> Self {
        Self {
            bodies,
            overrides: Vec::new(),
        }
    }

    /// Whether overrides must be recomputed before evaluating `system`.
    pub fn is_stale(&self, system: &ParticleSystem) -> bool {
        self.overrides.len() != system.len()
    }

    /// Recomputes overrides for owned particles and forwards them to ghosts.
    pub fn refresh(
        &mut self,
        system: &ParticleSystem,
        exchange: &mut dyn GhostExchange,
    ) -> Result<(), EngineError> {
        self.overrides.clear();
        self.overrides.resize(system.len(), 0.0);
        for (slot, particle) in self.overrides.iter_mut().zip(system.local_particles()) {
            if let Some(mass) = self
                .bodies
                .body_of(particle.tag)
                .and_then(|body| self.bodies.body_mass(body))
            {
                *slot = mass;
            }
        }
        if system.nghost() > 0 {
            exchange.forward(&mut self.overrides, system.nlocal())?;
        }
        debug!(
            bodies = self.bodies.body_count(),
            particles = system.len(),
            "Rigid-body mass overrides refreshed."
        );
        Ok(())
    }

    /// Mass to use for particle `index` whose own mass is `particle_mass`.
    #[inline]
    pub fn mass(&self, index: usize, particle_mass: f64) -> f64 {
        match self.overrides.get(index) {
            Some(&m) if m > 0.0 => m,
            _ => particle_mass,
        }
    }

    pub fn overrides(&self) -> &[f64] {
        &self.overrides
    }

    pub fn bodies(&self) -> &RigidBodies {
        &self.bodies
    }

    /// Bytes held by the override array.
    pub fn memory_usage(&self) -> usize {
        self.overrides.capacity() * std::mem::size_of::<f64>()
    }
}
