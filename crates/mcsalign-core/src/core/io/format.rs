use super::bgf::{BgfError, BgfFile};
use super::sdf::{SdfError, SdfFile};
use super::traits::MolecularFile;
use crate::core::models::molecule::Molecule;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Molecular file formats recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Sdf,
    Bgf,
}

impl FileFormat {
    /// Detects the format from a path's extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "sdf" | "sd" | "mol" => Some(Self::Sdf),
            "bgf" => Some(Self::Bgf),
            _ => None,
        }
    }

    /// Whether records in this format can carry three-dimensional coordinates.
    pub fn is_3d(self) -> bool {
        match self {
            Self::Sdf | Self::Bgf => true,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sdf => write!(f, "SDF"),
            Self::Bgf => write!(f, "BGF"),
        }
    }
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("Unrecognized molecular file format for '{}'", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Sdf(#[from] SdfError),
    #[error("{0}")]
    Bgf(#[from] BgfError),
}

impl IoError {
    /// Write-side conversion: any I/O failure while creating or filling the
    /// file is reported against the path.
    fn from_sdf(path: &Path, error: SdfError) -> Self {
        match error {
            SdfError::Io(source) => Self::Open {
                path: path.to_path_buf(),
                source,
            },
            other => Self::Sdf(other),
        }
    }

    fn from_bgf(path: &Path, error: BgfError) -> Self {
        match error {
            BgfError::Io(source) => Self::Open {
                path: path.to_path_buf(),
                source,
            },
            other => Self::Bgf(other),
        }
    }

    /// Returns `true` if the error came from the filesystem rather than the file contents.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Reads every molecule in `path`, choosing the codec by extension.
///
/// Only a failure to open the file is an [`IoError::Open`]; unreadable
/// content, including invalid UTF-8, is a codec error.
pub fn read_molecules(path: &Path) -> Result<Vec<Molecule>, IoError> {
    let format = FileFormat::from_path(path)
        .ok_or_else(|| IoError::UnsupportedFormat(path.to_path_buf()))?;
    let file = File::open(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    match format {
        FileFormat::Sdf => Ok(SdfFile::read_from(&mut reader)?),
        FileFormat::Bgf => Ok(BgfFile::read_from(&mut reader)?),
    }
}

/// Writes molecules to `path` in input order, choosing the codec by extension.
pub fn write_molecules<'a>(
    path: &Path,
    molecules: impl IntoIterator<Item = &'a Molecule>,
) -> Result<(), IoError> {
    match FileFormat::from_path(path) {
        Some(FileFormat::Sdf) => {
            SdfFile::write_to_path(molecules, path).map_err(|e| IoError::from_sdf(path, e))
        }
        Some(FileFormat::Bgf) => {
            BgfFile::write_to_path(molecules, path).map_err(|e| IoError::from_bgf(path, e))
        }
        None => Err(IoError::UnsupportedFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;
    use nalgebra::Point3;
    use tempfile::tempdir;

    fn water() -> Molecule {
        let mut mol = Molecule::new("water");
        let o = mol.add_atom(Atom::new("O", Element::OXYGEN, Point3::new(0.0, 0.0, 0.1)));
        let h1 = mol.add_atom(Atom::new("H1", Element::HYDROGEN, Point3::new(0.76, 0.59, 0.0)));
        let h2 = mol.add_atom(Atom::new("H2", Element::HYDROGEN, Point3::new(-0.76, 0.59, 0.0)));
        mol.add_bond(o, h1, BondOrder::Single).unwrap();
        mol.add_bond(o, h2, BondOrder::Single).unwrap();
        mol
    }

    #[test]
    fn format_detection_uses_extension_case_insensitively() {
        assert_eq!(FileFormat::from_path(Path::new("a.sdf")), Some(FileFormat::Sdf));
        assert_eq!(FileFormat::from_path(Path::new("a.MOL")), Some(FileFormat::Sdf));
        assert_eq!(FileFormat::from_path(Path::new("dir/a.sd")), Some(FileFormat::Sdf));
        assert_eq!(FileFormat::from_path(Path::new("a.Bgf")), Some(FileFormat::Bgf));
        assert_eq!(FileFormat::from_path(Path::new("a.smi")), None);
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
        assert!(FileFormat::Sdf.is_3d());
        assert!(FileFormat::Bgf.is_3d());
    }

    #[test]
    fn write_then_read_dispatches_by_extension() {
        let dir = tempdir().unwrap();
        for name in ["out.sdf", "out.bgf"] {
            let path = dir.path().join(name);
            write_molecules(&path, [&water()]).unwrap();
            let mols = read_molecules(&path).unwrap();
            assert_eq!(mols.len(), 1, "{name}");
            assert_eq!(mols[0].atom_count(), 3, "{name}");
            assert_eq!(mols[0].bond_count(), 2, "{name}");
            assert!(mols[0].is_3d(), "{name}");
        }
    }

    #[test]
    fn missing_file_is_an_open_failure() {
        let dir = tempdir().unwrap();
        let error = read_molecules(&dir.path().join("absent.sdf")).unwrap_err();
        assert!(error.is_open_failure());
    }

    #[test]
    fn undecodable_content_is_a_parse_failure() {
        let dir = tempdir().unwrap();
        for name in ["bad.sdf", "bad.bgf"] {
            let path = dir.path().join(name);
            std::fs::write(&path, [b'B', b'I', 0xff, 0xfe, b'\n']).unwrap();
            let error = read_molecules(&path).unwrap_err();
            assert!(!error.is_open_failure(), "{name}: {error}");
            assert!(matches!(error, IoError::Sdf(_) | IoError::Bgf(_)), "{name}");
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ligand.xyz");
        assert!(matches!(read_molecules(&path), Err(IoError::UnsupportedFormat(_))));
        assert!(matches!(
            write_molecules(&path, [&water()]),
            Err(IoError::UnsupportedFormat(_))
        ));
    }
}
