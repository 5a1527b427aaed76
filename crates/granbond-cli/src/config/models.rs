use granbond::core::contact::neighbor::ListKind;
use granbond::core::forcefield::coefficients::TypeCoefficients;
use granbond::engine::config::EngineConfig;

/// Run settings given directly on the command line; they win over every other source.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunOverrides {
    pub steps: Option<usize>,
    pub timestep: Option<f64>,
    pub neighbor_list: Option<ListKind>,
    pub record_contacts: bool,
}

#[derive(Debug)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub coefficients: TypeCoefficients,
    pub steps: usize,
    pub neighbor_list: ListKind,
    pub neighbor_skin: f64,
}
