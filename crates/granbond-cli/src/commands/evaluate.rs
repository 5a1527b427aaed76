use crate::cli::EvaluateArgs;
use crate::config::{AppConfig, RunOverrides, build_config};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use granbond::core::contact::bond::BreakCounts;
use granbond::core::contact::neighbor::{ListKind, NeighborList};
use granbond::core::io::snapshot::CsvSnapshot;
use granbond::core::io::traits::ParticleFile;
use granbond::core::models::system::ParticleSystem;
use granbond::engine::diagnostics::ContactDiagnostics;
use granbond::engine::progress::ProgressReporter;
use granbond::engine::rigid::RigidBodies;
use granbond::workflows::contact_model::CohesiveContactModel;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
struct ForceRecord {
    tag: u64,
    fx: f64,
    fy: f64,
    fz: f64,
    tx: f64,
    ty: f64,
    tz: f64,
}

#[derive(Debug, Serialize)]
struct ContactRecord {
    step: usize,
    owner: u64,
    partner: u64,
    slot: usize,
    bonded: bool,
    stretch: f64,
    tensile_failure_distance: f64,
    normal_force: f64,
    tangential_force: f64,
    friction_limit: f64,
    tensile_breaks: u32,
    shear_breaks: u32,
}

impl ContactRecord {
    fn new(step: usize, contact: &ContactDiagnostics) -> Self {
        Self {
            step,
            owner: contact.owner.0,
            partner: contact.partner.0,
            slot: contact.slot,
            bonded: contact.bonded,
            stretch: contact.stretch,
            tensile_failure_distance: contact.tensile_failure_distance,
            normal_force: contact.normal_force,
            tangential_force: contact.tangential_force,
            friction_limit: contact.friction_limit,
            tensile_breaks: contact.tensile_breaks,
            shear_breaks: contact.shear_breaks,
        }
    }
}

pub fn run(args: EvaluateArgs) -> Result<()> {
    info!("Loading particle snapshot from {:?}", &args.input);
    let (mut system, metadata) =
        CsvSnapshot::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;

    let overrides = RunOverrides {
        steps: args.steps,
        timestep: args.timestep,
        neighbor_list: args.list.map(ListKind::from),
        record_contacts: args.contacts.is_some(),
    };
    let AppConfig {
        engine,
        coefficients,
        steps,
        neighbor_list,
        neighbor_skin,
    } = build_config(&args.config, &overrides, Some(system.max_type()))?;
    if steps == 0 {
        return Err(CliError::Argument(
            "At least one evaluation step is required".to_string(),
        ));
    }

    let dt = engine.timestep;
    let reach_scale = engine.material.enlarge_factor().max(1.0);
    let mut model = CohesiveContactModel::new(engine, coefficients);
    if metadata.has_bodies() {
        let bodies = RigidBodies::from_labels(&system, &metadata.bodies)?;
        info!(bodies = bodies.body_count(), "Attaching rigid bodies.");
        model.attach_rigid_bodies(bodies);
    }
    model.init(&system)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Evaluating {} particles over {} step(s)...",
        system.nlocal(),
        steps
    );

    let mut neighbors = build_neighbors(&model, &system, neighbor_list, reach_scale, neighbor_skin);
    let formation = model.form_bonds(&system, &neighbors, &reporter)?;
    info!(
        candidate_pairs = formation.candidate_pairs,
        bonds_formed = formation.bonds_formed,
        "Bond formation complete."
    );

    progress_handler.begin_steps(steps as u64);
    let mut contact_records = Vec::new();
    let mut broken = BreakCounts::default();
    let mut intact = formation.bonds_formed;

    for step in 0..steps {
        if step > 0 {
            advance_positions(&mut system, dt);
            neighbors = build_neighbors(&model, &system, neighbor_list, reach_scale, neighbor_skin);
        }
        system.clear_accumulators();

        let report = model.compute(&mut system, &neighbors, &reporter)?;
        broken.tensile += report.broken.tensile;
        broken.shear += report.broken.shear;
        intact = report.intact_bonds;
        debug!(
            step,
            evaluated = report.evaluated,
            loaded = report.loaded,
            broken = report.broken.total(),
            "Step evaluated."
        );

        if args.contacts.is_some() {
            contact_records.extend(
                model
                    .contacts()
                    .iter()
                    .map(|contact| ContactRecord::new(step, contact)),
            );
        }
    }
    progress_handler.finish();

    if broken.total() > 0 {
        warn!(
            tensile = broken.tensile,
            shear = broken.shear,
            "Bonds failed during evaluation."
        );
    }

    info!("Writing forces to {:?}", &args.output);
    write_records(&args.output, force_records(&system))?;
    println!("✓ Forces written to: {}", args.output.display());

    if let Some(path) = &args.contacts {
        info!("Writing {} contact records to {:?}", contact_records.len(), path);
        write_records(path, contact_records)?;
        println!("✓ Contacts written to: {}", path.display());
    }

    if let Some(path) = &args.final_state {
        CsvSnapshot::write_to_path(&system, &metadata, path).map_err(|e| {
            CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            }
        })?;
        println!("✓ Final snapshot written to: {}", path.display());
    }

    println!(
        "Bonds: {} formed, {} intact, {} broken ({} tensile, {} shear).",
        formation.bonds_formed,
        intact,
        broken.total(),
        broken.tensile,
        broken.shear
    );
    debug!(bytes = model.memory_usage(), "Contact model memory usage.");
    Ok(())
}

/// Lists every pair whose centers are within the type-pair cutoff, widened by
/// the enlarge factor and the skin so bonded pairs stay listed while they stretch.
fn build_neighbors(
    model: &CohesiveContactModel,
    system: &ParticleSystem,
    kind: ListKind,
    reach_scale: f64,
    skin: f64,
) -> NeighborList {
    NeighborList::brute_force(system, kind, |a, b| {
        model.cutoff(a.type_id, b.type_id).unwrap_or(0.0) * reach_scale + skin
    })
}

/// Kinematic drift of the owned particles; forces are reported, not integrated.
fn advance_positions(system: &mut ParticleSystem, dt: f64) {
    for particle in system.particles_mut() {
        particle.position += particle.velocity * dt;
    }
}

fn force_records(system: &ParticleSystem) -> Vec<ForceRecord> {
    system
        .local_particles()
        .iter()
        .map(|p| ForceRecord {
            tag: p.tag.0,
            fx: p.force.x,
            fy: p.force.y,
            fz: p.force.z,
            tx: p.torque.x,
            ty: p.torque.y,
            tz: p.torque.z,
        })
        .collect()
}

fn write_records<T: Serialize>(path: &Path, records: impl IntoIterator<Item = T>) -> Result<()> {
    let to_error = |e: csv::Error| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    };
    let mut writer = csv::Writer::from_path(path).map_err(to_error)?;
    for record in records {
        writer.serialize(record).map_err(to_error)?;
    }
    writer.flush()?;
    Ok(())
}
