use crate::core::forcefield::coefficients::{CoefficientError, TypeCoefficients};
use crate::core::forcefield::params::{ConfigError, MaterialParams, MaterialSettings};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Bytes of the material block: eight `f64` values and one `i32` flag.
pub const SETTINGS_BYTES: usize = 8 * 8 + 4;

#[derive(Debug, Error)]
pub enum RestartError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Restart data ends after {found} bytes; expected {expected}")]
    Truncated { expected: usize, found: usize },
    #[error("Restart data holds {0} type-pair flags, which matches no type count")]
    FlagLayout(usize),
    #[error("Restart flag {value} at position {index} is neither 0 nor 1")]
    InvalidFlag { index: usize, value: i32 },
    #[error("Restart material parameters are invalid: {0}")]
    Invalid(#[from] ConfigError),
    #[error("Restart coefficients are invalid: {0}")]
    Coefficients(#[from] CoefficientError),
}

/// Everything the contact model persists across restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct RestartSettings {
    pub material: MaterialParams,
    pub coefficients: TypeCoefficients,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], RestartError> {
        let end = self.offset + N;
        let chunk = self
            .bytes
            .get(self.offset..end)
            .ok_or(RestartError::Truncated {
                expected: end,
                found: self.bytes.len(),
            })?;
        self.offset = end;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    fn f64(&mut self) -> Result<f64, RestartError> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    fn i32(&mut self) -> Result<i32, RestartError> {
        Ok(i32::from_le_bytes(self.take()?))
    }
}

impl RestartSettings {
    pub fn new(material: MaterialParams, coefficients: TypeCoefficients) -> Self {
        Self {
            material,
            coefficients,
        }
    }

    /// Serializes the settings.
    ///
    /// Layout, little-endian and without header: `kn, kt, γn, γt, μ` as `f64`,
    /// the damping flag as `i32`, `tensile strength, cohesive shear strength,
    /// enlarge factor` as `f64`, then one `i32` flag per type pair `(i, j ≥ i)` in
    /// row order.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), RestartError> {
        let m = &self.material;
        for value in [
            m.normal_stiffness(),
            m.tangential_stiffness(),
            m.normal_damping(),
            m.tangential_damping(),
            m.friction_coefficient(),
        ] {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.write_all(&i32::from(m.damping_enabled()).to_le_bytes())?;
        for value in [
            m.tensile_strength(),
            m.cohesive_shear_strength(),
            m.enlarge_factor(),
        ] {
            writer.write_all(&value.to_le_bytes())?;
        }
        for flag in self.coefficients.flags() {
            writer.write_all(&i32::from(flag).to_le_bytes())?;
        }
        Ok(())
    }

    /// Reads settings written for a system with `ntypes` particle types.
    pub fn read_from(reader: &mut impl Read, ntypes: usize) -> Result<Self, RestartError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let expected = SETTINGS_BYTES + 4 * ntypes * (ntypes + 1) / 2;
        if bytes.len() < expected {
            return Err(RestartError::Truncated {
                expected,
                found: bytes.len(),
            });
        }
        Self::decode(&bytes, ntypes)
    }

    /// Reads settings, inferring the type count from the number of flags.
    pub fn read_inferring_types(reader: &mut impl Read) -> Result<Self, RestartError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let flag_bytes = bytes.len().checked_sub(SETTINGS_BYTES).ok_or(RestartError::Truncated {
            expected: SETTINGS_BYTES,
            found: bytes.len(),
        })?;
        if flag_bytes % 4 != 0 {
            return Err(RestartError::FlagLayout(flag_bytes / 4));
        }
        let flags = flag_bytes / 4;
        let ntypes = (0..=flags)
            .find(|n| n * (n + 1) / 2 >= flags)
            .filter(|n| n * (n + 1) / 2 == flags)
            .ok_or(RestartError::FlagLayout(flags))?;
        Self::decode(&bytes, ntypes)
    }

    fn decode(bytes: &[u8], ntypes: usize) -> Result<Self, RestartError> {
        let mut cursor = Cursor { bytes, offset: 0 };
        let normal_stiffness = cursor.f64()?;
        let tangential_stiffness = cursor.f64()?;
        let normal_damping = cursor.f64()?;
        let tangential_damping = cursor.f64()?;
        let friction_coefficient = cursor.f64()?;
        let damping = cursor.i32()?;
        let tensile_strength = cursor.f64()?;
        let cohesive_shear_strength = cursor.f64()?;
        let enlarge_factor = cursor.f64()?;

        let material = MaterialSettings {
            normal_stiffness,
            tangential_stiffness: Some(tangential_stiffness),
            normal_damping,
            tangential_damping: Some(tangential_damping),
            friction_coefficient,
            damping: i64::from(damping),
            tensile_strength,
            cohesive_shear_strength,
            enlarge_factor,
        }
        .validate()?;

        let count = ntypes * (ntypes + 1) / 2;
        let flags = (0..count)
            .map(|index| match cursor.i32()? {
                0 => Ok(false),
                1 => Ok(true),
                value => Err(RestartError::InvalidFlag { index, value }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let coefficients = TypeCoefficients::from_flags(ntypes, &flags)?;

        Ok(Self {
            material,
            coefficients,
        })
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), RestartError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, RestartError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_inferring_types(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn settings() -> RestartSettings {
        let material = MaterialSettings {
            normal_stiffness: 2e5,
            tangential_stiffness: None,
            normal_damping: 40.0,
            tangential_damping: None,
            friction_coefficient: 0.3,
            damping: 1,
            tensile_strength: 5e2,
            cohesive_shear_strength: 7e2,
            enlarge_factor: 1.1,
        }
        .validate()
        .unwrap();
        let mut coefficients = TypeCoefficients::new(2);
        coefficients.assign(1..=1, 1..=2).unwrap();
        RestartSettings::new(material, coefficients)
    }

    fn encoded(settings: &RestartSettings) -> Vec<u8> {
        let mut bytes = Vec::new();
        settings.write_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn write_to_emits_fixed_layout() {
        let bytes = encoded(&settings());
        assert_eq!(bytes.len(), SETTINGS_BYTES + 3 * 4);
        assert_eq!(f64::from_le_bytes(bytes[0..8].try_into().unwrap()), 2e5);
        assert_eq!(i32::from_le_bytes(bytes[40..44].try_into().unwrap()), 1);
        assert_eq!(f64::from_le_bytes(bytes[60..68].try_into().unwrap()), 1.1);
        let flags: Vec<i32> = bytes[SETTINGS_BYTES..]
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(flags, vec![1, 1, 0]);
    }

    #[test]
    fn read_from_restores_resolved_defaults() {
        let original = settings();
        let restored = RestartSettings::read_from(&mut encoded(&original).as_slice(), 2).unwrap();
        assert_eq!(restored, original);
        assert_eq!(
            restored.material.tangential_stiffness(),
            2e5 * 2.0 / 7.0
        );
    }

    #[test]
    fn read_inferring_types_recovers_type_count() {
        let restored =
            RestartSettings::read_inferring_types(&mut encoded(&settings()).as_slice()).unwrap();
        assert_eq!(restored.coefficients.ntypes(), 2);
    }

    #[test]
    fn read_inferring_types_rejects_non_triangular_flag_count() {
        let mut bytes = encoded(&settings());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        assert!(matches!(
            RestartSettings::read_inferring_types(&mut bytes.as_slice()),
            Err(RestartError::FlagLayout(4))
        ));
    }

    #[test]
    fn read_from_reports_truncation() {
        let bytes = encoded(&settings());
        assert!(matches!(
            RestartSettings::read_from(&mut &bytes[..20], 2),
            Err(RestartError::Truncated { found: 20, .. })
        ));
    }

    #[test]
    fn read_from_validates_material() {
        let mut bytes = encoded(&settings());
        bytes[32..40].copy_from_slice(&(-1.0f64).to_le_bytes());
        assert!(matches!(
            RestartSettings::read_from(&mut bytes.as_slice(), 2),
            Err(RestartError::Invalid(ConfigError::OutOfRange {
                parameter: "friction-coefficient",
                ..
            }))
        ));
    }

    #[test]
    fn read_from_rejects_bad_flag_value() {
        let mut bytes = encoded(&settings());
        bytes[SETTINGS_BYTES..SETTINGS_BYTES + 4].copy_from_slice(&7i32.to_le_bytes());
        assert!(matches!(
            RestartSettings::read_from(&mut bytes.as_slice(), 2),
            Err(RestartError::InvalidFlag { index: 0, value: 7 })
        ));
    }

    #[test]
    fn file_round_trip_through_path() {
        let file = NamedTempFile::new().unwrap();
        settings().write_to_path(file.path()).unwrap();
        assert_eq!(RestartSettings::read_from_path(file.path()).unwrap(), settings());
    }
}
