use super::ids::ParticleTag;
use nalgebra::{Point3, Vector3};

/// A spherical particle as seen by the contact model.
///
/// Kinematic fields are written by the host integrator and only read here. The
/// `force` and `torque` accumulators are reset by the host each step and summed
/// into additively by the contact model.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Globally unique identifier, used to key bond identity.
    pub tag: ParticleTag,
    /// Particle type, `1..=ntypes`.
    pub type_id: usize,
    /// Group membership bitset. Compared against the configured freeze group bit.
    pub group_mask: u32,
    /// Center position.
    pub position: Point3<f64>,
    /// Translational velocity.
    pub velocity: Vector3<f64>,
    /// Angular velocity.
    pub angular_velocity: Vector3<f64>,
    /// Sphere radius; must be positive.
    pub radius: f64,
    /// Particle mass; must be positive.
    pub mass: f64,
    /// Force accumulator.
    pub force: Vector3<f64>,
    /// Torque accumulator.
    pub torque: Vector3<f64>,
}

impl Particle {
    /// Creates an at-rest particle of type 1 with empty accumulators.
    ///
    /// # Arguments
    ///
    /// * `tag` - The global identifier.
    /// * `position` - The center position.
    /// * `radius` - The sphere radius.
    /// * `mass` - The particle mass.
    pub fn new(tag: impl Into<ParticleTag>, position: Point3<f64>, radius: f64, mass: f64) -> Self {
        Self {
            tag: tag.into(),
            type_id: 1,
            group_mask: 0,
            position,
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            radius,
            mass,
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }

    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vector3<f64>) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_type(mut self, type_id: usize) -> Self {
        self.type_id = type_id;
        self
    }

    pub fn with_group_mask(mut self, group_mask: u32) -> Self {
        self.group_mask = group_mask;
        self
    }

    /// Returns `true` if the particle belongs to the group selected by `group_bit`.
    ///
    /// A zero `group_bit` means no such group exists, so nothing is a member.
    #[inline]
    pub fn in_group(&self, group_bit: u32) -> bool {
        self.group_mask & group_bit != 0
    }

    /// Zeroes the force and torque accumulators.
    pub fn clear_accumulators(&mut self) {
        self.force = Vector3::zeros();
        self.torque = Vector3::zeros();
    }
}
