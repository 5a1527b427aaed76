use super::{print_coefficients, print_material};
use crate::cli::ValidateArgs;
use crate::config::{RunOverrides, build_config};
use crate::error::Result;
use granbond::core::contact::neighbor::ListKind;
use tracing::info;

pub fn run(args: ValidateArgs) -> Result<()> {
    info!("Resolving configuration for validation...");
    let config = build_config(&args.config, &RunOverrides::default(), None)?;

    print_material(&config.engine.material);
    println!("Simulation:");
    println!("  timestep                {:>14.6e}", config.engine.timestep);
    println!("  steps                   {:>14}", config.steps);
    println!("  newton pair             {:>14}", config.engine.newton_pair);
    println!("  freeze group bit        {:>14}", config.engine.freeze_group_bit);
    println!(
        "  neighbor list           {:>14}",
        match config.neighbor_list {
            ListKind::Half => "half",
            ListKind::Full => "full",
        }
    );
    println!("  neighbor skin           {:>14.6}", config.neighbor_skin);
    print_coefficients(&config.coefficients);
    Ok(())
}
