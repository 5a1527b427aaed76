use nalgebra::Vector3;
use std::f64::consts::PI;

/// Largest center separation at which two particles bond during formation.
///
/// `radius_sum + (enlarge_factor - 1) * radius_min`; an enlarge factor of 1 bonds
/// only touching or overlapping pairs.
#[inline]
pub fn bond_formation_threshold(radius_sum: f64, radius_min: f64, enlarge_factor: f64) -> f64 {
    radius_sum + (enlarge_factor - 1.0) * radius_min
}

/// Stretch beyond the formation gap a bond survives before failing in tension.
///
/// `π · r_min · σ_t / kn`. Without a normal spring (`kn == 0`) there is no tensile
/// load path, so the bond never fails in tension.
#[inline]
pub fn tensile_failure_distance(radius_min: f64, tensile_strength: f64, kn: f64) -> f64 {
    if kn > 0.0 {
        PI * radius_min * tensile_strength / kn
    } else {
        f64::INFINITY
    }
}

/// Shear force a bond carries on top of Coulomb friction: `π · r_min · c`.
#[inline]
pub fn cohesive_shear_budget(radius_min: f64, cohesive_shear_strength: f64) -> f64 {
    PI * radius_min * cohesive_shear_strength
}

/// Effective mass of a contacting pair.
///
/// Harmonic combination `mi·mj / (mi + mj)`. A frozen particle acts as an
/// infinite-mass anchor, so the pair mass collapses to the mobile partner's.
/// When both are frozen the first particle's mass is used.
#[inline]
pub fn effective_mass(mass_i: f64, mass_j: f64, frozen_i: bool, frozen_j: bool) -> f64 {
    if frozen_j {
        mass_i
    } else if frozen_i {
        mass_j
    } else {
        mass_i * mass_j / (mass_i + mass_j)
    }
}

/// Scalar normal force per unit separation vector length.
///
/// The normal force on particle `i` is `del * ccel`, where `del = x_i - x_j`:
/// a linear spring on `stretch` plus viscous damping on the normal approach rate
/// `vnnr = v_rel · del`.
#[inline]
pub fn normal_force_scale(
    kn: f64,
    stretch: f64,
    distance: f64,
    effective_mass: f64,
    gamma_n: f64,
    vnnr: f64,
) -> f64 {
    let rsqinv = 1.0 / (distance * distance);
    let damp = effective_mass * gamma_n * vnnr * rsqinv;
    kn * stretch / distance - damp
}

/// Maximum tangential force before sliding (and shear failure of a bond).
///
/// Coulomb limit `μ·|ccel·r|`, plus the cohesive budget while a bond is intact.
#[inline]
pub fn friction_limit(mu: f64, normal_scale: f64, distance: f64, cohesive_budget: f64) -> f64 {
    mu * (normal_scale * distance).abs() + cohesive_budget
}

/// Removes the component of the shear displacement along the contact normal.
#[inline]
pub fn project_tangential(shear: &mut Vector3<f64>, del: &Vector3<f64>) {
    let rsq = del.norm_squared();
    if rsq > 0.0 {
        let rsht = shear.dot(del) / rsq;
        *shear -= del * rsht;
    }
}

/// Tangential spring-dashpot force: `-(kt·s + m·γt·v_t)`.
#[inline]
pub fn tangential_force(
    kt: f64,
    shear: &Vector3<f64>,
    effective_mass: f64,
    gamma_t: f64,
    sliding_velocity: &Vector3<f64>,
) -> Vector3<f64> {
    -(shear * kt + sliding_velocity * (effective_mass * gamma_t))
}

/// Projects an over-limit tangential state back onto the friction cone.
///
/// Scales the force by `limit / |force|` and updates the spring so that it
/// reproduces the scaled force together with the unchanged damping term. With a
/// vanishing spring stiffness the spring is scaled directly. Returns the scaled
/// force; a zero force or zero spring stretch yields zero force.
pub fn return_map(
    shear: &mut Vector3<f64>,
    force: &Vector3<f64>,
    limit: f64,
    kt: f64,
    damping_coefficient: f64,
    sliding_velocity: &Vector3<f64>,
    shear_magnitude: f64,
) -> Vector3<f64> {
    let magnitude = force.norm();
    if shear_magnitude == 0.0 || magnitude == 0.0 {
        return Vector3::zeros();
    }
    let ratio = limit / magnitude;
    if kt > 0.0 {
        let offset = sliding_velocity * (damping_coefficient / kt);
        *shear = (*shear + offset) * ratio - offset;
    } else {
        *shear *= ratio;
    }
    force * ratio
}
