use crate::core::models::system::ParticleSystem;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A particle snapshot format.
///
/// Snapshots hold owned particles only; ghosts are a property of the running
/// domain decomposition and are never persisted. Per-particle data that the
/// contact model does not keep on [`Particle`](crate::core::models::particle::Particle),
/// such as rigid-body labels, travels in `Metadata` aligned with particle order.
pub trait ParticleFile {
    type Metadata;

    type Error: Error + From<io::Error>;

    /// Parses a snapshot into a ghost-free [`ParticleSystem`].
    ///
    /// # Errors
    ///
    /// Malformed rows, duplicate tags and empty snapshots are rejected.
    fn read_from(reader: &mut impl BufRead) -> Result<(ParticleSystem, Self::Metadata), Self::Error>;

    /// Serializes `system.local_particles()` with their metadata.
    fn write_to(
        system: &ParticleSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<(ParticleSystem, Self::Metadata), Self::Error> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }

    /// Writes the snapshot to `path`, replacing any existing file.
    fn write_to_path<P: AsRef<Path>>(
        system: &ParticleSystem,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write_to(system, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
