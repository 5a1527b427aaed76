use super::defaults::DefaultsConfig;
use super::file::{FileCoefficientRange, FileConfig, FileMaterialConfig, FileSimulationConfig};
use super::models::{AppConfig, RunOverrides};
use crate::cli::ConfigArgs;
use crate::error::{CliError, Result};
use crate::utils::parser::{parse_pair_style, parse_type_bounds};
use granbond::core::contact::neighbor::ListKind;
use granbond::core::forcefield::coefficients::TypeCoefficients;
use granbond::core::forcefield::params::MaterialSettings;
use granbond::engine::config::EngineConfigBuilder;
use granbond::engine::error::EngineError;
use std::str::FromStr;
use tracing::{debug, info};

/// Resolves the application configuration.
///
/// Precedence, highest first: `overrides`, `-S` values, `--style`, the config
/// file, built-in defaults. `ntypes_hint` is the largest type present in the
/// input; it is used when the file does not fix `ntypes` and must not exceed it
/// when it does.
pub fn build_config(
    args: &ConfigArgs,
    overrides: &RunOverrides,
    ntypes_hint: Option<usize>,
) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => {
            debug!("No configuration file given; using defaults and command-line values.");
            FileConfig::default()
        }
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let settings = match &args.style {
        Some(style) => {
            let mut settings =
                parse_pair_style(style).map_err(|e| CliError::Argument(e.to_string()))?;
            if let Some(material) = &file_config.material {
                overlay_set_material(&mut settings, material, &args.set_values);
            }
            settings
        }
        None => material_settings(file_config.material.take())?,
    };
    let material = settings.validate().map_err(EngineError::from)?;

    let simulation = file_config.simulation.take().unwrap_or_default();
    let ntypes = resolve_ntypes(&simulation, ntypes_hint, &defaults)?;
    let coefficients = build_coefficients(file_config.coefficients.as_deref(), ntypes)?;

    let engine = EngineConfigBuilder::new()
        .material(material)
        .timestep(
            overrides
                .timestep
                .or(simulation.timestep)
                .unwrap_or(defaults.timestep),
        )
        .newton_pair(simulation.newton_pair.unwrap_or(defaults.newton_pair))
        .freeze_group_bit(
            simulation
                .freeze_group_bit
                .unwrap_or(defaults.freeze_group_bit),
        )
        .record_contacts(
            overrides.record_contacts
                || simulation.record_contacts.unwrap_or(defaults.record_contacts),
        )
        .build()
        .map_err(EngineError::from)?;

    let neighbor_skin = simulation.neighbor_skin.unwrap_or(defaults.neighbor_skin);
    if !(neighbor_skin.is_finite() && neighbor_skin >= 0.0) {
        return Err(CliError::Config(format!(
            "simulation.neighbor-skin must be a finite value >= 0, got {neighbor_skin}"
        )));
    }

    let config = AppConfig {
        engine,
        coefficients,
        steps: overrides.steps.or(simulation.steps).unwrap_or(defaults.steps),
        neighbor_list: overrides
            .neighbor_list
            .or(simulation.neighbor_list)
            .unwrap_or(defaults.neighbor_list),
        neighbor_skin,
    };
    info!(
        ntypes,
        steps = config.steps,
        timestep = config.engine.timestep,
        "Configuration resolved."
    );
    Ok(config)
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| {
        CliError::Config(format!(
            "Missing material parameter `{key}`; set it in [material], with --style or with -S material.{key}=..."
        ))
    })
}

fn material_settings(material: Option<FileMaterialConfig>) -> Result<MaterialSettings> {
    let m = material.unwrap_or_default();
    Ok(MaterialSettings {
        normal_stiffness: required(m.normal_stiffness, "normal-stiffness")?,
        tangential_stiffness: m.tangential_stiffness,
        normal_damping: required(m.normal_damping, "normal-damping")?,
        tangential_damping: m.tangential_damping,
        friction_coefficient: required(m.friction_coefficient, "friction-coefficient")?,
        damping: required(m.damping, "damping")?,
        tensile_strength: required(m.tensile_strength, "tensile-strength")?,
        cohesive_shear_strength: required(m.cohesive_shear_strength, "cohesive-shear-strength")?,
        enlarge_factor: required(m.enlarge_factor, "enlarge-factor")?,
    })
}

/// `--style` replaces the file's [material] table, but explicit `-S material.*`
/// values still win over it.
fn overlay_set_material(
    settings: &mut MaterialSettings,
    material: &FileMaterialConfig,
    set_values: &[String],
) {
    let was_set = |field: &str| {
        set_values
            .iter()
            .filter_map(|kv| kv.split_once('='))
            .any(|(key, _)| key.trim() == format!("material.{field}"))
    };

    if was_set("normal-stiffness") {
        if let Some(v) = material.normal_stiffness {
            settings.normal_stiffness = v;
        }
    }
    if was_set("tangential-stiffness") {
        settings.tangential_stiffness = material.tangential_stiffness;
    }
    if was_set("normal-damping") {
        if let Some(v) = material.normal_damping {
            settings.normal_damping = v;
        }
    }
    if was_set("tangential-damping") {
        settings.tangential_damping = material.tangential_damping;
    }
    if was_set("friction-coefficient") {
        if let Some(v) = material.friction_coefficient {
            settings.friction_coefficient = v;
        }
    }
    if was_set("damping") {
        if let Some(v) = material.damping {
            settings.damping = v;
        }
    }
    if was_set("tensile-strength") {
        if let Some(v) = material.tensile_strength {
            settings.tensile_strength = v;
        }
    }
    if was_set("cohesive-shear-strength") {
        if let Some(v) = material.cohesive_shear_strength {
            settings.cohesive_shear_strength = v;
        }
    }
    if was_set("enlarge-factor") {
        if let Some(v) = material.enlarge_factor {
            settings.enlarge_factor = v;
        }
    }
}

fn resolve_ntypes(
    simulation: &FileSimulationConfig,
    hint: Option<usize>,
    defaults: &DefaultsConfig,
) -> Result<usize> {
    match (simulation.ntypes, hint) {
        (Some(0), _) => Err(CliError::Config(
            "simulation.ntypes must be at least 1".to_string(),
        )),
        (Some(n), Some(h)) if h > n => Err(CliError::Config(format!(
            "Input uses particle type {h} but simulation.ntypes is {n}"
        ))),
        (Some(n), _) => Ok(n),
        (None, Some(h)) => Ok(h.max(1)),
        (None, None) => Ok(defaults.ntypes),
    }
}

fn build_coefficients(
    ranges: Option<&[FileCoefficientRange]>,
    ntypes: usize,
) -> Result<TypeCoefficients> {
    let Some(ranges) = ranges else {
        return Ok(TypeCoefficients::all(ntypes));
    };

    let mut coefficients = TypeCoefficients::new(ntypes);
    for range in ranges {
        let i = parse_type_bounds(&range.i, ntypes).map_err(|e| CliError::Config(e.to_string()))?;
        let j = parse_type_bounds(&range.j, ntypes).map_err(|e| CliError::Config(e.to_string()))?;
        let count = coefficients
            .assign(i, j)
            .map_err(|e| CliError::Config(e.to_string()))?;
        debug!(i = %range.i, j = %range.j, count, "Activated type pairs.");
    }
    Ok(coefficients)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value '{value}' for key '{key}'")))
}

fn parse_list_kind(key: &str, value: &str) -> Result<ListKind> {
    match value.to_lowercase().as_str() {
        "half" => Ok(ListKind::Half),
        "full" => Ok(ListKind::Full),
        _ => Err(CliError::Config(format!(
            "Invalid value '{value}' for key '{key}'. Expected 'half' or 'full'."
        ))),
    }
}

fn parse_nullable(key: &str, value: &str) -> Result<Option<f64>> {
    if value.eq_ignore_ascii_case("null") {
        Ok(None)
    } else {
        parse_value(key, value).map(Some)
    }
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv in set_values {
        let mut parts = kv.splitn(2, '=');
        let key = parts.next().unwrap_or("").trim();
        let value = parts
            .next()
            .ok_or_else(|| CliError::Config(format!("Invalid --set format: '{kv}'. Expected KEY=VALUE.")))?
            .trim();

        debug!("Applying override: {} = {}", key, value);

        if let Some(field) = key.strip_prefix("material.") {
            let m = config.material.get_or_insert_with(FileMaterialConfig::default);
            match field {
                "normal-stiffness" => m.normal_stiffness = Some(parse_value(key, value)?),
                "tangential-stiffness" => m.tangential_stiffness = parse_nullable(key, value)?,
                "normal-damping" => m.normal_damping = Some(parse_value(key, value)?),
                "tangential-damping" => m.tangential_damping = parse_nullable(key, value)?,
                "friction-coefficient" => m.friction_coefficient = Some(parse_value(key, value)?),
                "damping" => m.damping = Some(parse_value(key, value)?),
                "tensile-strength" => m.tensile_strength = Some(parse_value(key, value)?),
                "cohesive-shear-strength" => {
                    m.cohesive_shear_strength = Some(parse_value(key, value)?)
                }
                "enlarge-factor" => m.enlarge_factor = Some(parse_value(key, value)?),
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{key}'"
                    )));
                }
            }
        } else if let Some(field) = key.strip_prefix("simulation.") {
            let s = config
                .simulation
                .get_or_insert_with(FileSimulationConfig::default);
            match field {
                "timestep" => s.timestep = Some(parse_value(key, value)?),
                "steps" => s.steps = Some(parse_value(key, value)?),
                "newton-pair" => s.newton_pair = Some(parse_value(key, value)?),
                "freeze-group-bit" => s.freeze_group_bit = Some(parse_value(key, value)?),
                "record-contacts" => s.record_contacts = Some(parse_value(key, value)?),
                "neighbor-list" => s.neighbor_list = Some(parse_list_kind(key, value)?),
                "neighbor-skin" => s.neighbor_skin = Some(parse_value(key, value)?),
                "ntypes" => s.ntypes = Some(parse_value(key, value)?),
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{key}'"
                    )));
                }
            }
        } else {
            return Err(CliError::Config(format!(
                "Unsupported configuration key for --set: '{key}'"
            )));
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const MATERIAL_TOML: &str = r#"
[material]
normal-stiffness = 200000.0
normal-damping = 40.0
friction-coefficient = 0.5
damping = 1
tensile-strength = 1000.0
cohesive-shear-strength = 2000.0
enlarge-factor = 1.1
"#;

    fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn args_for(path: Option<std::path::PathBuf>) -> ConfigArgs {
        ConfigArgs {
            config: path,
            ..Default::default()
        }
    }

    #[test]
    fn file_values_are_resolved_with_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), MATERIAL_TOML);

        let config = build_config(&args_for(Some(path)), &RunOverrides::default(), None).unwrap();

        assert_eq!(config.engine.material.normal_stiffness(), 2e5);
        assert!((config.engine.material.tangential_stiffness() - 2e5 * 2.0 / 7.0).abs() < 1e-6);
        assert_eq!(config.engine.material.tangential_damping(), 20.0);
        assert_eq!(config.engine.timestep, 1e-5);
        assert!(config.engine.newton_pair);
        assert_eq!(config.steps, 1);
        assert_eq!(config.neighbor_list, ListKind::Half);
        assert_eq!(config.coefficients.ntypes(), 1);
        assert!(config.coefficients.unassigned_pairs().is_empty());
    }

    #[test]
    fn precedence_is_overrides_then_set_values_then_file() {
        let dir = tempdir().unwrap();
        let content = format!(
            "{MATERIAL_TOML}\n[simulation]\ntimestep = 0.001\nsteps = 4\nneighbor-list = \"full\"\n"
        );
        let path = write_config(dir.path(), &content);
        let args = ConfigArgs {
            config: Some(path),
            style: None,
            set_values: vec![
                "simulation.steps=8".to_string(),
                "material.friction-coefficient=0.25".to_string(),
                "simulation.timestep=0.002".to_string(),
            ],
        };
        let overrides = RunOverrides {
            timestep: Some(0.003),
            ..Default::default()
        };

        let config = build_config(&args, &overrides, None).unwrap();

        assert_eq!(config.engine.timestep, 0.003);
        assert_eq!(config.steps, 8);
        assert_eq!(config.engine.material.friction_coefficient(), 0.25);
        assert_eq!(config.neighbor_list, ListKind::Full);
    }

    #[test]
    fn style_replaces_material_table_but_not_set_values() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), MATERIAL_TOML);
        let args = ConfigArgs {
            config: Some(path),
            style: Some("1e5 NULL 10 NULL 0.3 0 50 60 1.0".to_string()),
            set_values: vec!["material.enlarge-factor=1.5".to_string()],
        };

        let config = build_config(&args, &RunOverrides::default(), None).unwrap();
        let material = config.engine.material;

        assert_eq!(material.normal_stiffness(), 1e5);
        assert_eq!(material.friction_coefficient(), 0.3);
        assert!(!material.damping_enabled());
        assert_eq!(material.tangential_damping(), 0.0);
        assert_eq!(material.enlarge_factor(), 1.5);
    }

    #[test]
    fn missing_material_parameter_is_reported_by_name() {
        let err = build_config(&args_for(None), &RunOverrides::default(), None).unwrap_err();
        match err {
            CliError::Config(msg) => assert!(msg.contains("normal-stiffness")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_material_is_an_engine_error() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), MATERIAL_TOML);
        let args = ConfigArgs {
            config: Some(path),
            style: None,
            set_values: vec!["material.normal-stiffness=-1.0".to_string()],
        };

        let err = build_config(&args, &RunOverrides::default(), None).unwrap_err();
        assert!(matches!(err, CliError::Engine(EngineError::Config { .. })));
    }

    #[test]
    fn coefficient_ranges_activate_only_listed_pairs() {
        let dir = tempdir().unwrap();
        let content = format!(
            "{MATERIAL_TOML}\n[simulation]\nntypes = 3\n\n[[coefficients]]\ni = \"1\"\nj = \"*\"\n\n[[coefficients]]\ni = \"2*\"\nj = \"2\"\n"
        );
        let path = write_config(dir.path(), &content);

        let config = build_config(&args_for(Some(path)), &RunOverrides::default(), Some(2)).unwrap();

        assert_eq!(config.coefficients.ntypes(), 3);
        assert!(config.coefficients.is_assigned(1, 3));
        assert!(config.coefficients.is_assigned(2, 2));
        assert_eq!(config.coefficients.unassigned_pairs(), vec![(2, 3), (3, 3)]);
    }

    #[test]
    fn ntypes_follows_the_input_unless_fixed() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), MATERIAL_TOML);
        let config = build_config(&args_for(Some(path.clone())), &RunOverrides::default(), Some(4)).unwrap();
        assert_eq!(config.coefficients.ntypes(), 4);

        let args = ConfigArgs {
            config: Some(path),
            style: None,
            set_values: vec!["simulation.ntypes=2".to_string()],
        };
        let err = build_config(&args, &RunOverrides::default(), Some(4)).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn unsupported_and_malformed_set_values_are_rejected() {
        let bad_key = apply_set_values(FileConfig::default(), &["simulation.unknown=1".to_string()]);
        assert!(matches!(bad_key, Err(CliError::Config(msg)) if msg.contains("Unsupported")));

        let no_value = apply_set_values(FileConfig::default(), &["material.damping".to_string()]);
        assert!(matches!(no_value, Err(CliError::Config(msg)) if msg.contains("KEY=VALUE")));

        let bad_number = apply_set_values(FileConfig::default(), &["material.damping=yes".to_string()]);
        assert!(matches!(bad_number, Err(CliError::Config(msg)) if msg.contains("Invalid value")));
    }

    #[test]
    fn null_set_value_clears_a_tangential_term() {
        let dir = tempdir().unwrap();
        let content = MATERIAL_TOML.replace("damping = 1\n", "damping = 1\ntangential-damping = 5.0\n");
        let path = write_config(dir.path(), &content);
        let args = ConfigArgs {
            config: Some(path),
            style: None,
            set_values: vec!["material.tangential-damping=NULL".to_string()],
        };

        let config = build_config(&args, &RunOverrides::default(), None).unwrap();
        assert_eq!(config.engine.material.tangential_damping(), 20.0);
    }

    #[test]
    fn unknown_file_key_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[material]\nstiffness = 1.0\n");
        let err = build_config(&args_for(Some(path)), &RunOverrides::default(), None).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
    }
}
