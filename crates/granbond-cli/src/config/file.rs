use crate::error::{CliError, Result};
use granbond::core::contact::neighbor::ListKind;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// `[material]` table; every field may also come from `--style` or `-S`.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileMaterialConfig {
    pub normal_stiffness: Option<f64>,
    pub tangential_stiffness: Option<f64>,
    pub normal_damping: Option<f64>,
    pub tangential_damping: Option<f64>,
    pub friction_coefficient: Option<f64>,
    pub damping: Option<i64>,
    pub tensile_strength: Option<f64>,
    pub cohesive_shear_strength: Option<f64>,
    pub enlarge_factor: Option<f64>,
}

/// `[simulation]` table.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSimulationConfig {
    pub timestep: Option<f64>,
    pub steps: Option<usize>,
    pub newton_pair: Option<bool>,
    pub freeze_group_bit: Option<u32>,
    pub record_contacts: Option<bool>,
    pub neighbor_list: Option<ListKind>,
    pub neighbor_skin: Option<f64>,
    pub ntypes: Option<usize>,
}

/// One `[[coefficients]]` entry: type bounds in asterisk notation.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileCoefficientRange {
    pub i: String,
    pub j: String,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub material: Option<FileMaterialConfig>,
    pub simulation: Option<FileSimulationConfig>,
    pub coefficients: Option<Vec<FileCoefficientRange>>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
