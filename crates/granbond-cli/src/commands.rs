pub mod evaluate;
pub mod restart;
pub mod validate;

use granbond::core::forcefield::coefficients::TypeCoefficients;
use granbond::core::forcefield::params::MaterialParams;

/// Prints resolved material constants, one per line.
pub(crate) fn print_material(material: &MaterialParams) {
    println!("Material:");
    println!("  normal stiffness        {:>14.6e}", material.normal_stiffness());
    println!("  tangential stiffness    {:>14.6e}", material.tangential_stiffness());
    println!("  normal damping          {:>14.6e}", material.normal_damping());
    println!("  tangential damping      {:>14.6e}", material.tangential_damping());
    println!("  friction coefficient    {:>14.6}", material.friction_coefficient());
    println!(
        "  damping flag            {:>14}",
        if material.damping_enabled() { "on" } else { "off" }
    );
    println!("  tensile strength        {:>14.6e}", material.tensile_strength());
    println!("  cohesive shear strength {:>14.6e}", material.cohesive_shear_strength());
    println!("  enlarge factor          {:>14.6}", material.enlarge_factor());
}

pub(crate) fn print_coefficients(coefficients: &TypeCoefficients) {
    let unassigned = coefficients.unassigned_pairs();
    println!(
        "Type pairs: {} types, {} of {} pairs active",
        coefficients.ntypes(),
        coefficients.pairs().count() - unassigned.len(),
        coefficients.pairs().count()
    );
    for (i, j) in unassigned {
        println!("  inactive: {i} {j}");
    }
}
