use nalgebra::Vector3;
use std::ops::{Add, AddAssign, Mul};

/// Force and torques produced by one evaluated contact.
///
/// `force` acts on particle `i`; particle `j` receives `-force`. Torques are
/// per-particle because each is scaled by that particle's own radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairForce {
    pub force: Vector3<f64>,
    pub torque_i: Vector3<f64>,
    pub torque_j: Vector3<f64>,
}

impl PairForce {
    pub fn zero() -> Self {
        Self {
            force: Vector3::zeros(),
            torque_i: Vector3::zeros(),
            torque_j: Vector3::zeros(),
        }
    }
}

/// Symmetric pair virial `[xx, yy, zz, xy, xz, yz]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Virial(pub [f64; 6]);

impl Virial {
    /// Virial contribution of a pair force `force` acting along separation `del`.
    pub fn from_pair(del: &Vector3<f64>, force: &Vector3<f64>) -> Self {
        Self([
            del.x * force.x,
            del.y * force.y,
            del.z * force.z,
            del.x * force.y,
            del.x * force.z,
            del.y * force.z,
        ])
    }

    /// Trace of the virial tensor.
    #[inline]
    pub fn trace(&self) -> f64 {
        self.0[0] + self.0[1] + self.0[2]
    }
}

impl Add for Virial {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        let mut out = self;
        out += rhs;
        out
    }
}

impl AddAssign for Virial {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
    }
}

impl Mul<f64> for Virial {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0.map(|v| v * rhs))
    }
}
