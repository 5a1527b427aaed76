use crate::core::contact::bond::{BondKey, BondStateTable, FailureMode};
use crate::core::contact::history::ContactHistoryStore;
use crate::core::contact::neighbor::{ListKind, NeighborList, neighbor_index};
use crate::core::forcefield::coefficients::{RadiusExtents, TypeCoefficients};
use crate::core::forcefield::term::Virial;
use crate::core::models::system::ParticleSystem;
use crate::engine::config::{EngineConfig, EngineConfigBuilder, check_timestep};
use crate::engine::diagnostics::ContactDiagnostics;
use crate::engine::error::EngineError;
use crate::engine::formation;
use crate::engine::kernel::{ContactForceKernel, ContactOutcome, PairEvaluation};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::restart::RestartSettings;
use crate::engine::rigid::{GhostExchange, LocalImages, RigidBodies, RigidMassResolver};
use crate::engine::state::{FormationReport, StepReport};
use itertools::Itertools;
use std::io::Write;
use tracing::{debug, info, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of one neighbor slot, gathered before any shared state is touched.
struct SlotResult {
    i: usize,
    j: usize,
    key: BondKey,
    evaluation: PairEvaluation,
    diagnostics: Option<ContactDiagnostics>,
}

/// The cohesive breakable-bond contact model.
///
/// Owns the state that persists across steps: the bond table (keyed by particle
/// tag for the whole run) and the contact history (aligned with the current
/// neighbor list). The host drives it in three phases: [`init`](Self::init) once
/// the particle set is known, [`form_bonds`](Self::form_bonds) exactly once before
/// the step loop, then [`compute`](Self::compute) every step.
#[derive(Debug, Clone)]
pub struct CohesiveContactModel {
    config: EngineConfig,
    kernel: ContactForceKernel,
    coefficients: TypeCoefficients,
    bonds: BondStateTable,
    histories: ContactHistoryStore,
    rigid: Option<RigidMassResolver>,
    inserted_radii: Vec<(usize, f64)>,
    extents: Option<RadiusExtents>,
    formation: Option<FormationReport>,
    contacts: Vec<ContactDiagnostics>,
}

impl CohesiveContactModel {
    pub fn new(config: EngineConfig, coefficients: TypeCoefficients) -> Self {
        let kernel = ContactForceKernel::new(config.material, config.timestep, config.freeze_group_bit);
        Self {
            config,
            kernel,
            coefficients,
            bonds: BondStateTable::new(),
            histories: ContactHistoryStore::new(),
            rigid: None,
            inserted_radii: Vec::new(),
            extents: None,
            formation: None,
            contacts: Vec::new(),
        }
    }

    /// Rebuilds a model from persisted restart settings.
    pub fn from_restart(settings: RestartSettings, timestep: f64) -> Result<Self, EngineError> {
        let config = EngineConfigBuilder::new()
            .material(settings.material)
            .timestep(timestep)
            .build()?;
        Ok(Self::new(config, settings.coefficients))
    }

    /// Resolves effective masses of rigid-aggregate members through `bodies`.
    pub fn attach_rigid_bodies(&mut self, bodies: RigidBodies) {
        self.rigid = Some(RigidMassResolver::new(bodies));
    }

    /// Accounts for particles of `type_id` that a deposition process will add later.
    ///
    /// Takes effect at the next [`init`](Self::init).
    pub fn register_inserted_radius(&mut self, type_id: usize, radius: f64) {
        self.inserted_radii.push((type_id, radius));
    }

    /// Checks the particle set and derives the per-type-pair cutoffs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Precondition`] if a particle has a non-positive or
    /// non-finite radius or mass, a particle type exceeds the coefficient table,
    /// ghosts are present without replicated velocities, or a type pair has no
    /// coefficients.
    #[instrument(skip_all, name = "contact_model_init")]
    pub fn init(&mut self, system: &ParticleSystem) -> Result<(), EngineError> {
        if let Some(p) = system
            .particles()
            .iter()
            .find(|p| !(p.radius.is_finite() && p.radius > 0.0))
        {
            return Err(EngineError::Precondition(format!(
                "Particle {} has invalid radius {}",
                p.tag, p.radius
            )));
        }
        if let Some(p) = system
            .particles()
            .iter()
            .find(|p| !(p.mass.is_finite() && p.mass > 0.0))
        {
            return Err(EngineError::Precondition(format!(
                "Particle {} has invalid mass {}",
                p.tag, p.mass
            )));
        }
        if system.nghost() > 0 && !system.ghost_velocity() {
            return Err(EngineError::Precondition(
                "Cohesive contacts require ghost particles to carry velocities".to_string(),
            ));
        }

        let ntypes = self.coefficients.ntypes();
        if system.max_type() > ntypes {
            return Err(EngineError::Precondition(format!(
                "Particle type {} exceeds the {ntypes} types with coefficients",
                system.max_type()
            )));
        }
        let unassigned = self.coefficients.unassigned_pairs();
        if let Some((i, j)) = unassigned.first() {
            return Err(EngineError::Precondition(format!(
                "Coefficients are not set for type pair {i} {j} ({} pair(s) missing)",
                unassigned.len()
            )));
        }

        let extents = self.inserted_radii.iter().fold(
            RadiusExtents::from_system(system, ntypes, self.config.freeze_group_bit),
            |extents, &(type_id, radius)| extents.with_inserted_radius(type_id, radius),
        );
        self.extents = Some(extents);

        info!(
            particles = system.len(),
            ghosts = system.nghost(),
            ntypes,
            "Contact model initialized."
        );
        Ok(())
    }

    /// Contact cutoff for types `(i, j)`, available after [`init`](Self::init).
    pub fn cutoff(&self, i: usize, j: usize) -> Option<f64> {
        self.extents.as_ref().map(|e| e.cutoff(i, j))
    }

    /// Per-type radius extents, available after [`init`](Self::init).
    pub fn radius_extents(&self) -> Option<&RadiusExtents> {
        self.extents.as_ref()
    }

    fn ensure_initialized(&self) -> Result<(), EngineError> {
        if self.extents.is_none() {
            return Err(EngineError::Precondition(
                "The contact model must be initialized before use".to_string(),
            ));
        }
        Ok(())
    }

    /// Runs the one-shot bond formation pass.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::FormationAlreadyRun`] on any call after the first,
    /// and propagates neighbor-list validation failures.
    #[instrument(skip_all, name = "bond_formation")]
    pub fn form_bonds(
        &mut self,
        system: &ParticleSystem,
        neighbors: &NeighborList,
        reporter: &ProgressReporter,
    ) -> Result<FormationReport, EngineError> {
        self.ensure_initialized()?;
        if self.formation.is_some() {
            return Err(EngineError::FormationAlreadyRun);
        }
        self.histories.sync(system, neighbors)?;
        let report = formation::run(
            self.kernel.material(),
            system,
            neighbors,
            &mut self.bonds,
            &mut self.histories,
            reporter,
        );
        self.formation = Some(report);
        Ok(report)
    }

    pub fn has_formed_bonds(&self) -> bool {
        self.formation.is_some()
    }

    /// Evaluates every candidate pair and accumulates forces and torques.
    ///
    /// Ghosts must be periodic images of owned particles if rigid bodies are
    /// attached; use [`compute_with_exchange`](Self::compute_with_exchange) when
    /// they are owned by other processes.
    pub fn compute(
        &mut self,
        system: &mut ParticleSystem,
        neighbors: &NeighborList,
        reporter: &ProgressReporter,
    ) -> Result<StepReport, EngineError> {
        let mut images = if self.rigid.is_some() && system.nghost() > 0 {
            LocalImages::from_system(system)?
        } else {
            LocalImages::default()
        };
        self.compute_with_exchange(system, neighbors, &mut images, reporter)
    }

    /// Evaluates every candidate pair, forwarding rigid-body masses to ghosts
    /// through `exchange`.
    ///
    /// Bond failures are staged during the pass and committed after it, so the
    /// result does not depend on the order of rows or slots.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::FormationPending`] before [`form_bonds`](Self::form_bonds)
    /// has run, and [`EngineError::StoreMismatch`] if the list changed without being
    /// flagged as rebuilt.
    #[instrument(skip_all, name = "contact_compute")]
    pub fn compute_with_exchange(
        &mut self,
        system: &mut ParticleSystem,
        neighbors: &NeighborList,
        exchange: &mut dyn GhostExchange,
        reporter: &ProgressReporter,
    ) -> Result<StepReport, EngineError> {
        self.ensure_initialized()?;
        if self.formation.is_none() {
            return Err(EngineError::FormationPending);
        }

        if neighbors.is_rebuilt() {
            let stats = self.histories.sync(system, neighbors)?;
            debug!(
                carried = stats.carried,
                fresh = stats.fresh,
                dropped = stats.dropped,
                "Contact history realigned with rebuilt neighbor list."
            );
        } else if !self.histories.is_aligned(system, neighbors) {
            return Err(EngineError::StoreMismatch(format!(
                "{} history rows for {} neighbor rows; flag the list as rebuilt after changing it",
                self.histories.len(),
                neighbors.len()
            )));
        }

        if let Some(resolver) = self.rigid.as_mut() {
            if neighbors.is_rebuilt() || resolver.is_stale(system) {
                resolver.refresh(system, exchange)?;
            }
        }

        reporter.report(Progress::StepStart {
            pairs: neighbors.pair_count() as u64,
        });

        let results = self.evaluate_rows(system, neighbors);
        let report = self.accumulate(system, neighbors.kind(), results, reporter);

        debug!(
            evaluated = report.evaluated,
            loaded = report.loaded,
            degenerate = report.degenerate,
            tensile_breaks = report.broken.tensile,
            shear_breaks = report.broken.shear,
            intact_bonds = report.intact_bonds,
            "Contact forces computed."
        );
        reporter.report(Progress::StepFinish);
        Ok(report)
    }

    fn evaluate_rows(&mut self, system: &ParticleSystem, neighbors: &NeighborList) -> Vec<SlotResult> {
        let particles = system.particles();
        let kernel = &self.kernel;
        let bonds = &self.bonds;
        let coefficients = &self.coefficients;
        let rigid = self.rigid.as_ref();
        let record = self.config.record_contacts;

        let rows: Vec<(usize, &[u32])> = neighbors.rows().collect();
        let records = self.histories.rows_mut();

        #[cfg(not(feature = "parallel"))]
        let iterator = rows.iter().zip(records.iter_mut());

        #[cfg(feature = "parallel")]
        let iterator = rows.par_iter().zip(records.par_iter_mut());

        let per_row: Vec<Vec<SlotResult>> = iterator
            .map(|(&(i, raw), row_records)| {
                let pi = &particles[i];
                let mass_i = rigid.map_or(pi.mass, |r| r.mass(i, pi.mass));
                raw.iter()
                    .zip(row_records.iter_mut())
                    .enumerate()
                    .filter_map(|(slot, (&entry, history))| {
                        let j = neighbor_index(entry);
                        let pj = &particles[j];
                        if !coefficients.is_assigned(pi.type_id, pj.type_id) {
                            return None;
                        }
                        let mass_j = rigid.map_or(pj.mass, |r| r.mass(j, pj.mass));
                        let bond = bonds.view(pi.tag, pj.tag);
                        let evaluation = kernel.evaluate(pi, pj, mass_i, mass_j, bond, history);
                        let diagnostics = record.then(|| {
                            ContactDiagnostics::from_evaluation(
                                pi.tag,
                                pj.tag,
                                slot,
                                bond,
                                &evaluation,
                                history,
                            )
                        });
                        Some(SlotResult {
                            i,
                            j,
                            key: BondKey::new(pi.tag, pj.tag),
                            evaluation,
                            diagnostics,
                        })
                    })
                    .collect()
            })
            .collect();

        per_row.into_iter().flatten().collect()
    }

    fn accumulate(
        &mut self,
        system: &mut ParticleSystem,
        kind: ListKind,
        results: Vec<SlotResult>,
        reporter: &ProgressReporter,
    ) -> StepReport {
        let nlocal = system.nlocal();
        let newton_pair = self.config.newton_pair;
        let particles = system.particles_mut();

        let mut report = StepReport::default();
        let mut staged: Vec<(BondKey, FailureMode)> = Vec::new();
        self.contacts.clear();

        for slot in results {
            report.evaluated += 1;
            if let Some(mode) = slot.evaluation.failure {
                staged.push((slot.key, mode));
            }
            if let Some(diagnostics) = slot.diagnostics {
                self.contacts.push(diagnostics);
            }

            let force = match slot.evaluation.outcome {
                ContactOutcome::Ignored => continue,
                ContactOutcome::Degenerate => {
                    report.degenerate += 1;
                    continue;
                }
                ContactOutcome::Loaded(force) => force,
            };
            report.loaded += 1;

            particles[slot.i].force += force.force;
            particles[slot.i].torque += force.torque_i;

            let virial = Virial::from_pair(&slot.evaluation.del, &force.force);
            match kind {
                ListKind::Full => report.virial += virial * 0.5,
                ListKind::Half if newton_pair || slot.j < nlocal => {
                    particles[slot.j].force -= force.force;
                    particles[slot.j].torque += force.torque_j;
                    report.virial += virial;
                }
                ListKind::Half => report.virial += virial * 0.5,
            }
        }

        let failures: Vec<(BondKey, FailureMode)> =
            staged.into_iter().unique_by(|(key, _)| *key).collect();
        for (key, mode) in &failures {
            trace!(bond = %key, mode = %mode, "Bond failed.");
            reporter.report(Progress::BondBroken {
                key: *key,
                mode: *mode,
            });
        }
        report.broken = self.bonds.apply(failures);
        report.intact_bonds = self.bonds.intact_count();
        report
    }

    /// Replaces the timestep used to integrate tangential displacement.
    pub fn set_timestep(&mut self, dt: f64) -> Result<(), EngineError> {
        let dt = check_timestep(dt)?;
        self.kernel.set_timestep(dt);
        self.config.timestep = dt;
        Ok(())
    }

    pub fn restart_settings(&self) -> RestartSettings {
        RestartSettings::new(self.config.material, self.coefficients.clone())
    }

    pub fn write_restart(&self, writer: &mut impl Write) -> Result<(), EngineError> {
        self.restart_settings().write_to(writer)?;
        Ok(())
    }

    /// Diagnostics of the last compute, if recording is enabled.
    pub fn contacts(&self) -> &[ContactDiagnostics] {
        &self.contacts
    }

    pub fn bonds(&self) -> &BondStateTable {
        &self.bonds
    }

    pub fn histories(&self) -> &ContactHistoryStore {
        &self.histories
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn coefficients(&self) -> &TypeCoefficients {
        &self.coefficients
    }

    /// Approximate heap bytes held by the persistent stores.
    pub fn memory_usage(&self) -> usize {
        self.bonds.memory_usage()
            + self.histories.memory_usage()
            + self.rigid.as_ref().map_or(0, RigidMassResolver::memory_usage)
            + self.contacts.capacity() * std::mem::size_of::<ContactDiagnostics>()
    }
}
