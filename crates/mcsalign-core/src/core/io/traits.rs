use crate::core::models::molecule::Molecule;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing multi-record molecular files.
///
/// Small-molecule formats routinely hold many molecules per file, so every
/// reader yields a sequence of molecules in file order and every writer accepts
/// one. Implementors handle format-specific parsing and serialization.
pub trait MolecularFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads every molecule record from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if any record fails to parse or I/O fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Molecule>, Self::Error>;

    /// Writes a single molecule record to a writer.
    fn write_molecule(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Writes molecule records to a writer in the given order.
    fn write_to<'a>(
        molecules: impl IntoIterator<Item = &'a Molecule>,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for molecule in molecules {
            Self::write_molecule(molecule, writer)?;
        }
        Ok(())
    }

    /// Reads every molecule record from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Molecule>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes molecule records to a file path, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<'a, P: AsRef<Path>>(
        molecules: impl IntoIterator<Item = &'a Molecule>,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(molecules, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
