use crate::core::forcefield::params::{ConfigError, MaterialParams};

/// Validates a timestep for integrating tangential displacement.
pub(crate) fn check_timestep(dt: f64) -> Result<f64, ConfigError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(dt)
    } else {
        Err(ConfigError::OutOfRange {
            parameter: "timestep",
            value: dt,
            constraint: "a finite value > 0",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub material: MaterialParams,
    /// Timestep used to integrate the tangential displacement.
    pub timestep: f64,
    /// Whether forces on ghost partners of a half list are kept and sent back to
    /// their owner. When off, only owned particles receive force.
    pub newton_pair: bool,
    /// Group bit marking frozen (immovable) particles; 0 disables freezing.
    pub freeze_group_bit: u32,
    /// Whether per-contact diagnostics are collected during compute.
    pub record_contacts: bool,
}

#[derive(Default)]
pub struct EngineConfigBuilder {
    material: Option<MaterialParams>,
    timestep: Option<f64>,
    newton_pair: Option<bool>,
    freeze_group_bit: Option<u32>,
    record_contacts: Option<bool>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn material(mut self, material: MaterialParams) -> Self {
        self.material = Some(material);
        self
    }
    pub fn timestep(mut self, dt: f64) -> Self {
        self.timestep = Some(dt);
        self
    }
    pub fn newton_pair(mut self, enabled: bool) -> Self {
        self.newton_pair = Some(enabled);
        self
    }
    pub fn freeze_group_bit(mut self, bit: u32) -> Self {
        self.freeze_group_bit = Some(bit);
        self
    }
    pub fn record_contacts(mut self, enabled: bool) -> Self {
        self.record_contacts = Some(enabled);
        self
    }

    /// Assembles the configuration.
    ///
    /// `newton_pair` defaults to on, freezing and contact recording to off.
    ///
    /// # Errors
    ///
    /// Fails if the material or timestep is missing, or the timestep is not a
    /// finite positive number.
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let material = self
            .material
            .ok_or(ConfigError::MissingParameter("material"))?;
        let timestep = check_timestep(
            self.timestep
                .ok_or(ConfigError::MissingParameter("timestep"))?,
        )?;
        Ok(EngineConfig {
            material,
            timestep,
            newton_pair: self.newton_pair.unwrap_or(true),
            freeze_group_bit: self.freeze_group_bit.unwrap_or(0),
            record_contacts: self.record_contacts.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::MaterialSettings;

    fn material() -> MaterialParams {
        MaterialSettings {
            normal_stiffness: 1e5,
            tangential_stiffness: None,
            normal_damping: 10.0,
            tangential_damping: None,
            friction_coefficient: 0.5,
            damping: 1,
            tensile_strength: 1e3,
            cohesive_shear_strength: 1e3,
            enlarge_factor: 1.0,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn build_applies_defaults() {
        let config = EngineConfigBuilder::new()
            .material(material())
            .timestep(1e-4)
            .build()
            .unwrap();
        assert!(config.newton_pair);
        assert_eq!(config.freeze_group_bit, 0);
        assert!(!config.record_contacts);
        assert_eq!(config.timestep, 1e-4);
    }

    #[test]
    fn build_requires_material_and_timestep() {
        assert_eq!(
            EngineConfigBuilder::new().timestep(1e-4).build(),
            Err(ConfigError::MissingParameter("material"))
        );
        assert_eq!(
            EngineConfigBuilder::new().material(material()).build(),
            Err(ConfigError::MissingParameter("timestep"))
        );
    }

    #[test]
    fn build_rejects_non_positive_timestep() {
        for dt in [0.0, -1e-3, f64::NAN, f64::INFINITY] {
            let result = EngineConfigBuilder::new()
                .material(material())
                .timestep(dt)
                .build();
            assert!(matches!(
                result,
                Err(ConfigError::OutOfRange {
                    parameter: "timestep",
                    ..
                })
            ));
        }
    }

    #[test]
    fn build_keeps_explicit_settings() {
        let config = EngineConfigBuilder::new()
            .material(material())
            .timestep(1e-5)
            .newton_pair(false)
            .freeze_group_bit(0b100)
            .record_contacts(true)
            .build()
            .unwrap();
        assert!(!config.newton_pair);
        assert_eq!(config.freeze_group_bit, 0b100);
        assert!(config.record_contacts);
    }
}
