use thiserror::Error;

use super::restart::RestartError;
use crate::core::contact::neighbor::NeighborError;
use crate::core::forcefield::params::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Bond formation has already run for this model")]
    FormationAlreadyRun,

    #[error("Bond formation must run before the first force evaluation")]
    FormationPending,

    #[error("Neighbor list is invalid: {source}")]
    Neighbor {
        #[from]
        source: NeighborError,
    },

    #[error("Contact history does not match the neighbor list: {0}")]
    StoreMismatch(String),

    #[error("Restart data error: {source}")]
    Restart {
        #[from]
        source: RestartError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
