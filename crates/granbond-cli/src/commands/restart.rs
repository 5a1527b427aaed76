use super::{print_coefficients, print_material};
use crate::cli::{RestartArgs, RestartCommands};
use crate::config::{RunOverrides, build_config};
use crate::error::Result;
use granbond::engine::restart::RestartSettings;
use granbond::workflows::contact_model::CohesiveContactModel;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::info;

pub fn run(args: RestartArgs) -> Result<()> {
    match args.command {
        RestartCommands::Write { config, output } => {
            let config = build_config(&config, &RunOverrides::default(), None)?;
            let model = CohesiveContactModel::new(config.engine, config.coefficients);

            info!("Writing restart settings to {:?}", &output);
            let mut writer = BufWriter::new(File::create(&output)?);
            model.write_restart(&mut writer)?;
            writer.flush()?;
            println!("✓ Restart settings written to: {}", output.display());
        }
        RestartCommands::Show { path } => {
            info!("Reading restart settings from {:?}", &path);
            let settings = RestartSettings::read_from_path(&path)?;
            print_material(&settings.material);
            print_coefficients(&settings.coefficients);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConfigArgs;
    use tempfile::tempdir;

    #[test]
    fn written_settings_can_be_read_back() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("state.bin");
        let config = ConfigArgs {
            config: None,
            style: Some("2e5 NULL 40 NULL 0.5 1 1e3 2e3 1.1".to_string()),
            set_values: vec!["simulation.ntypes=2".to_string()],
        };

        run(RestartArgs {
            command: RestartCommands::Write {
                config,
                output: output.clone(),
            },
        })
        .unwrap();

        let settings = RestartSettings::read_from_path(&output).unwrap();
        assert_eq!(settings.material.normal_stiffness(), 2e5);
        assert_eq!(settings.material.tangential_damping(), 20.0);
        assert_eq!(settings.coefficients.ntypes(), 2);
        assert!(settings.coefficients.unassigned_pairs().is_empty());

        run(RestartArgs {
            command: RestartCommands::Show { path: output },
        })
        .unwrap();
    }
}
