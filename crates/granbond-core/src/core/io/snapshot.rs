use super::traits::ParticleFile;
use crate::core::models::particle::Particle;
use crate::core::models::system::ParticleSystem;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Inconsistent data: {0}")]
    Inconsistent(String),
    #[error("Snapshot contains no particle records")]
    Empty,
}

/// Per-particle data carried by a snapshot but not by [`Particle`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotMetadata {
    /// Rigid-body id of each particle, aligned with the system's particle order.
    pub bodies: Vec<Option<u64>>,
}

impl SnapshotMetadata {
    /// Whether any particle belongs to a rigid body.
    pub fn has_bodies(&self) -> bool {
        self.bodies.iter().any(Option::is_some)
    }
}

/// One CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ParticleRecord {
    tag: u64,
    #[serde(rename = "type")]
    type_id: usize,
    x: f64,
    y: f64,
    z: f64,
    #[serde(default)]
    vx: f64,
    #[serde(default)]
    vy: f64,
    #[serde(default)]
    vz: f64,
    #[serde(default)]
    wx: f64,
    #[serde(default)]
    wy: f64,
    #[serde(default)]
    wz: f64,
    radius: f64,
    mass: f64,
    #[serde(default)]
    group: u32,
    #[serde(default)]
    body: Option<u64>,
}

impl ParticleRecord {
    fn from_particle(particle: &Particle, body: Option<u64>) -> Self {
        Self {
            tag: particle.tag.0,
            type_id: particle.type_id,
            x: particle.position.x,
            y: particle.position.y,
            z: particle.position.z,
            vx: particle.velocity.x,
            vy: particle.velocity.y,
            vz: particle.velocity.z,
            wx: particle.angular_velocity.x,
            wy: particle.angular_velocity.y,
            wz: particle.angular_velocity.z,
            radius: particle.radius,
            mass: particle.mass,
            group: particle.group_mask,
            body,
        }
    }

    fn into_particle(self) -> (Particle, Option<u64>) {
        let particle = Particle::new(self.tag, Point3::new(self.x, self.y, self.z), self.radius, self.mass)
            .with_type(self.type_id)
            .with_group_mask(self.group)
            .with_velocity(Vector3::new(self.vx, self.vy, self.vz))
            .with_angular_velocity(Vector3::new(self.wx, self.wy, self.wz));
        (particle, self.body)
    }
}

/// CSV particle snapshot.
///
/// Columns: `tag,type,x,y,z,vx,vy,vz,wx,wy,wz,radius,mass,group,body`. Velocity
/// columns, `group` and `body` may be omitted; an empty `body` cell means the
/// particle is not part of a rigid body. Lines starting with `#` are ignored.
pub struct CsvSnapshot;

impl ParticleFile for CsvSnapshot {
    type Metadata = SnapshotMetadata;
    type Error = SnapshotError;

    fn read_from(reader: &mut impl BufRead) -> Result<(ParticleSystem, Self::Metadata), Self::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut particles = Vec::new();
        let mut bodies = Vec::new();
        let mut seen_tags = HashSet::new();

        for (row, result) in csv_reader.deserialize::<ParticleRecord>().enumerate() {
            let record = result?;
            if record.type_id == 0 {
                return Err(SnapshotError::Inconsistent(format!(
                    "Row {}: particle types start at 1",
                    row + 1
                )));
            }
            if !seen_tags.insert(record.tag) {
                return Err(SnapshotError::Inconsistent(format!(
                    "Row {}: duplicate tag {}",
                    row + 1,
                    record.tag
                )));
            }
            let (particle, body) = record.into_particle();
            particles.push(particle);
            bodies.push(body);
        }

        if particles.is_empty() {
            return Err(SnapshotError::Empty);
        }
        Ok((ParticleSystem::new(particles), SnapshotMetadata { bodies }))
    }

    fn write_to(
        system: &ParticleSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for (index, particle) in system.local_particles().iter().enumerate() {
            let body = metadata.bodies.get(index).copied().flatten();
            csv_writer.serialize(ParticleRecord::from_particle(particle, body))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::ParticleTag;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    const FULL: &str = "\
tag,type,x,y,z,vx,vy,vz,wx,wy,wz,radius,mass,group,body
1,1,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,1.0,4.0,0,
2,2,1.9,0.0,0.0,-0.5,0.0,0.0,0.0,0.0,1.0,1.0,4.0,1,7
";

    #[test]
    fn read_from_parses_all_columns() {
        let (system, meta) = CsvSnapshot::read_from(&mut Cursor::new(FULL)).unwrap();
        assert_eq!(system.len(), 2);
        let p = system.particle(1).unwrap();
        assert_eq!(p.tag, ParticleTag(2));
        assert_eq!(p.type_id, 2);
        assert_eq!(p.position, Point3::new(1.9, 0.0, 0.0));
        assert_eq!(p.velocity, Vector3::new(-0.5, 0.0, 0.0));
        assert_eq!(p.angular_velocity, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(p.group_mask, 1);
        assert_eq!(meta.bodies, vec![None, Some(7)]);
        assert!(meta.has_bodies());
    }

    #[test]
    fn read_from_accepts_minimal_columns_and_comments() {
        let input = "# two touching grains\ntag,type,x,y,z,radius,mass\n1,1,0,0,0,0.5,1\n2,1,1,0,0,0.5,1\n";
        let (system, meta) = CsvSnapshot::read_from(&mut Cursor::new(input)).unwrap();
        assert_eq!(system.len(), 2);
        assert_eq!(system.particle(0).unwrap().velocity, Vector3::zeros());
        assert!(!meta.has_bodies());
    }

    #[test]
    fn read_from_rejects_duplicate_tags() {
        let input = "tag,type,x,y,z,radius,mass\n1,1,0,0,0,0.5,1\n1,1,1,0,0,0.5,1\n";
        assert!(matches!(
            CsvSnapshot::read_from(&mut Cursor::new(input)),
            Err(SnapshotError::Inconsistent(_))
        ));
    }

    #[test]
    fn read_from_rejects_type_zero() {
        let input = "tag,type,x,y,z,radius,mass\n1,0,0,0,0,0.5,1\n";
        assert!(matches!(
            CsvSnapshot::read_from(&mut Cursor::new(input)),
            Err(SnapshotError::Inconsistent(_))
        ));
    }

    #[test]
    fn read_from_rejects_empty_table() {
        let input = "tag,type,x,y,z,radius,mass\n";
        assert!(matches!(
            CsvSnapshot::read_from(&mut Cursor::new(input)),
            Err(SnapshotError::Empty)
        ));
    }

    #[test]
    fn read_from_reports_malformed_numbers() {
        let input = "tag,type,x,y,z,radius,mass\n1,1,zero,0,0,0.5,1\n";
        assert!(matches!(
            CsvSnapshot::read_from(&mut Cursor::new(input)),
            Err(SnapshotError::Csv(_))
        ));
    }

    #[test]
    fn written_snapshot_reads_back_through_path() {
        let (system, meta) = CsvSnapshot::read_from(&mut Cursor::new(FULL)).unwrap();
        let file = NamedTempFile::new().unwrap();
        CsvSnapshot::write_to_path(&system, &meta, file.path()).unwrap();

        let (reread, reread_meta) = CsvSnapshot::read_from_path(file.path()).unwrap();
        assert_eq!(reread.particles(), system.particles());
        assert_eq!(reread_meta, meta);
    }
}
