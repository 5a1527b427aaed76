use super::ids::ParticleTag;
use super::particle::Particle;
use std::collections::HashMap;

/// The particle set visible to one process: owned particles followed by ghosts.
///
/// Indices `0..nlocal` are owned by this process. Indices `nlocal..` are read-only
/// replicas of particles owned elsewhere (or periodic images), refreshed by the
/// host's communication layer before every force evaluation.
#[derive(Debug, Clone, Default)]
pub struct ParticleSystem {
    /// Owned particles first, then ghosts.
    particles: Vec<Particle>,
    /// Number of owned particles at the front of `particles`.
    nlocal: usize,
    /// Whether the communication layer replicates velocities onto ghosts.
    ghost_velocity: bool,
}

impl ParticleSystem {
    /// Creates a system in which every particle is owned locally.
    pub fn new(particles: Vec<Particle>) -> Self {
        let nlocal = particles.len();
        Self {
            particles,
            nlocal,
            ghost_velocity: true,
        }
    }

    /// Creates a system with `owned` particles followed by `ghosts`.
    ///
    /// # Arguments
    ///
    /// * `owned` - Particles owned by this process.
    /// * `ghosts` - Replicas of remotely owned particles.
    /// * `ghost_velocity` - Whether ghost velocities are kept current by the host.
    pub fn with_ghosts(owned: Vec<Particle>, ghosts: Vec<Particle>, ghost_velocity: bool) -> Self {
        let nlocal = owned.len();
        let mut particles = owned;
        particles.extend(ghosts);
        Self {
            particles,
            nlocal,
            ghost_velocity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Number of locally owned particles.
    #[inline]
    pub fn nlocal(&self) -> usize {
        self.nlocal
    }

    /// Number of ghost particles.
    #[inline]
    pub fn nghost(&self) -> usize {
        self.particles.len() - self.nlocal
    }

    #[inline]
    pub fn is_local(&self, index: usize) -> bool {
        index < self.nlocal
    }

    pub fn ghost_velocity(&self) -> bool {
        self.ghost_velocity
    }

    pub fn particle(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn particle_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Owned particles only.
    pub fn local_particles(&self) -> &[Particle] {
        &self.particles[..self.nlocal]
    }

    /// Returns the largest type id present, or 0 for an empty system.
    pub fn max_type(&self) -> usize {
        self.particles.iter().map(|p| p.type_id).max().unwrap_or(0)
    }

    /// Builds a map from tag to local index.
    ///
    /// If a tag appears more than once (an owned particle and its periodic image),
    /// the lowest index, which is the owned copy, wins.
    pub fn tag_index(&self) -> HashMap<ParticleTag, usize> {
        let mut map = HashMap::with_capacity(self.particles.len());
        for (index, particle) in self.particles.iter().enumerate() {
            map.entry(particle.tag).or_insert(index);
        }
        map
    }

    /// Zeroes force and torque accumulators of every particle, ghosts included.
    pub fn clear_accumulators(&mut self) {
        self.particles
            .iter_mut()
            .for_each(Particle::clear_accumulators);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn particle(tag: u64, x: f64) -> Particle {
        Particle::new(tag, Point3::new(x, 0.0, 0.0), 0.5, 1.0)
    }

    #[test]
    fn new_marks_all_particles_local() {
        let system = ParticleSystem::new(vec![particle(1, 0.0), particle(2, 1.0)]);
        assert_eq!(system.len(), 2);
        assert_eq!(system.nlocal(), 2);
        assert_eq!(system.nghost(), 0);
        assert!(system.ghost_velocity());
    }

    #[test]
    fn with_ghosts_appends_ghosts_after_owned_particles() {
        let system = ParticleSystem::with_ghosts(
            vec![particle(1, 0.0)],
            vec![particle(2, 1.0), particle(3, 2.0)],
            false,
        );
        assert_eq!(system.nlocal(), 1);
        assert_eq!(system.nghost(), 2);
        assert!(system.is_local(0));
        assert!(!system.is_local(1));
        assert_eq!(system.particle(2).unwrap().tag, ParticleTag(3));
        assert_eq!(system.local_particles().len(), 1);
    }

    #[test]
    fn tag_index_prefers_owned_copy_of_periodic_image() {
        let system = ParticleSystem::with_ghosts(
            vec![particle(1, 0.0), particle(2, 1.0)],
            vec![particle(1, 10.0)],
            true,
        );
        let map = system.tag_index();
        assert_eq!(map[&ParticleTag(1)], 0);
        assert_eq!(map[&ParticleTag(2)], 1);
    }

    #[test]
    fn max_type_returns_zero_for_empty_system() {
        assert_eq!(ParticleSystem::default().max_type(), 0);
    }

    #[test]
    fn clear_accumulators_resets_ghosts_too() {
        let mut system =
            ParticleSystem::with_ghosts(vec![particle(1, 0.0)], vec![particle(2, 1.0)], true);
        for p in system.particles_mut() {
            p.force.x = 5.0;
        }
        system.clear_accumulators();
        assert!(system.particles().iter().all(|p| p.force.x == 0.0));
    }
}
