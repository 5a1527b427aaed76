//! Configuration assembly: TOML file, `--style`, `-S` overrides and defaults,
//! merged in that order of increasing precedence with direct CLI flags on top.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::build_config;
pub use models::{AppConfig, RunOverrides};
