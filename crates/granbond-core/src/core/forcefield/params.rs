use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Upper bound accepted for the Coulomb friction coefficient.
pub const MAX_FRICTION_COEFFICIENT: f64 = 10_000.0;
/// `kt = ratio * kn` when the tangential stiffness is left unset.
pub const DEFAULT_TANGENTIAL_STIFFNESS_RATIO: f64 = 2.0 / 7.0;
/// `γt = ratio * γn` when the tangential damping is left unset.
pub const DEFAULT_TANGENTIAL_DAMPING_RATIO: f64 = 0.5;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Parameter '{parameter}' = {value} is out of range (expected {constraint})")]
    OutOfRange {
        parameter: &'static str,
        value: f64,
        constraint: &'static str,
    },

    #[error("Expected {expected} arguments but found {found}")]
    WrongArgumentCount { expected: usize, found: usize },

    #[error("Invalid value for '{parameter}': '{value}'")]
    InvalidValue { parameter: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid material parameters in '{path}': {source}")]
    Invalid { path: String, source: ConfigError },
}

/// Unvalidated material constants as supplied by a configuration source.
///
/// `tangential_stiffness` and `tangential_damping` may be left unset, in which
/// case they default to `2/7·kn` and `0.5·γn`. `damping` is an integer flag so
/// that out-of-range values can be rejected rather than silently coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MaterialSettings {
    pub normal_stiffness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tangential_stiffness: Option<f64>,
    pub normal_damping: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tangential_damping: Option<f64>,
    pub friction_coefficient: f64,
    pub damping: i64,
    pub tensile_strength: f64,
    pub cohesive_shear_strength: f64,
    pub enlarge_factor: f64,
}

/// Validated material constants consumed by the force law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    kn: f64,
    kt: f64,
    gamma_n: f64,
    gamma_t: f64,
    mu: f64,
    damping_enabled: bool,
    tensile_strength: f64,
    cohesive_shear_strength: f64,
    enlarge_factor: f64,
}

impl MaterialSettings {
    /// Resolves defaults and checks every constant against its admissible range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for negative or non-finite constants, a
    /// friction coefficient above [`MAX_FRICTION_COEFFICIENT`], or a damping flag
    /// other than 0 or 1.
    pub fn validate(&self) -> Result<MaterialParams, ConfigError> {
        let kn = self.normal_stiffness;
        let kt = self
            .tangential_stiffness
            .unwrap_or(kn * DEFAULT_TANGENTIAL_STIFFNESS_RATIO);
        let gamma_n = self.normal_damping;
        let mut gamma_t = self
            .tangential_damping
            .unwrap_or(gamma_n * DEFAULT_TANGENTIAL_DAMPING_RATIO);

        let damping_enabled = match self.damping {
            0 => false,
            1 => true,
            other => {
                return Err(ConfigError::OutOfRange {
                    parameter: "damping",
                    value: other as f64,
                    constraint: "0 or 1",
                });
            }
        };
        if !damping_enabled {
            gamma_t = 0.0;
        }

        non_negative("normal-stiffness", kn)?;
        non_negative("tangential-stiffness", kt)?;
        non_negative("normal-damping", gamma_n)?;
        non_negative("tangential-damping", gamma_t)?;
        non_negative("friction-coefficient", self.friction_coefficient)?;
        if self.friction_coefficient > MAX_FRICTION_COEFFICIENT {
            return Err(ConfigError::OutOfRange {
                parameter: "friction-coefficient",
                value: self.friction_coefficient,
                constraint: "a value in [0, 10000]",
            });
        }
        non_negative("tensile-strength", self.tensile_strength)?;
        non_negative("cohesive-shear-strength", self.cohesive_shear_strength)?;
        non_negative("enlarge-factor", self.enlarge_factor)?;

        Ok(MaterialParams {
            kn,
            kt,
            gamma_n,
            gamma_t,
            mu: self.friction_coefficient,
            damping_enabled,
            tensile_strength: self.tensile_strength,
            cohesive_shear_strength: self.cohesive_shear_strength,
            enlarge_factor: self.enlarge_factor,
        })
    }
}

fn non_negative(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            parameter,
            value,
            constraint: "a finite value >= 0",
        })
    }
}

impl MaterialParams {
    /// Loads and validates material settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let settings: MaterialSettings =
            toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
                path: path_str.clone(),
                source: e,
            })?;
        settings.validate().map_err(|e| ParamLoadError::Invalid {
            path: path_str,
            source: e,
        })
    }

    /// Returns the fully resolved settings, with defaults made explicit.
    pub fn settings(&self) -> MaterialSettings {
        MaterialSettings {
            normal_stiffness: self.kn,
            tangential_stiffness: Some(self.kt),
            normal_damping: self.gamma_n,
            tangential_damping: Some(self.gamma_t),
            friction_coefficient: self.mu,
            damping: i64::from(self.damping_enabled),
            tensile_strength: self.tensile_strength,
            cohesive_shear_strength: self.cohesive_shear_strength,
            enlarge_factor: self.enlarge_factor,
        }
    }

    #[inline]
    pub fn normal_stiffness(&self) -> f64 {
        self.kn
    }

    #[inline]
    pub fn tangential_stiffness(&self) -> f64 {
        self.kt
    }

    #[inline]
    pub fn normal_damping(&self) -> f64 {
        self.gamma_n
    }

    /// Tangential damping; always zero when damping is disabled.
    #[inline]
    pub fn tangential_damping(&self) -> f64 {
        self.gamma_t
    }

    #[inline]
    pub fn friction_coefficient(&self) -> f64 {
        self.mu
    }

    #[inline]
    pub fn damping_enabled(&self) -> bool {
        self.damping_enabled
    }

    #[inline]
    pub fn tensile_strength(&self) -> f64 {
        self.tensile_strength
    }

    #[inline]
    pub fn cohesive_shear_strength(&self) -> f64 {
        self.cohesive_shear_strength
    }

    #[inline]
    pub fn enlarge_factor(&self) -> f64 {
        self.enlarge_factor
    }
}
