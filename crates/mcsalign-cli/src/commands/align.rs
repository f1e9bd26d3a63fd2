use crate::cli::Cli;
use crate::config::PartialAlignConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use mcsalign::{
    core::io::format::{FileFormat, IoError, read_molecules, write_molecules},
    core::models::molecule::Molecule,
    engine::{error::AlignError, progress::ProgressReporter},
    workflows,
};
use std::path::Path;
use tracing::{info, warn};

/// Summary of a finished alignment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignSummary {
    pub candidates: usize,
    pub aligned_candidates: usize,
    pub placements: usize,
}

pub fn run(args: &Cli, progress: &CliProgressHandler) -> Result<AlignSummary> {
    check_format(&args.reference)?;
    check_format(&args.candidates)?;
    check_format(&args.output)?;

    let partial_config = match &args.config {
        Some(path) => PartialAlignConfig::from_file(path)?,
        None => PartialAlignConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(args)?;

    info!("Loading reference structure from {:?}", &args.reference);
    let reference = load_reference(&args.reference)?;

    info!("Loading candidate structures from {:?}", &args.candidates);
    let candidates =
        read_molecules(&args.candidates).map_err(|e| AlignError::from_io(&args.candidates, e))?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    info!("Invoking the core alignment workflow...");
    let results = workflows::align::run(reference, &candidates, &config, &reporter)?;

    let summary = AlignSummary {
        candidates: candidates.len(),
        aligned_candidates: results.iter().filter(|r| !r.is_empty()).count(),
        placements: results.iter().map(Vec::len).sum(),
    };

    info!(
        placements = summary.placements,
        "Writing aligned structures to {:?}", &args.output
    );
    write_molecules(
        &args.output,
        results.iter().flatten().map(|result| &result.molecule),
    )
    .map_err(|e| AlignError::from_io(&args.output, e))?;

    Ok(summary)
}

/// Rejects paths whose extension is not a known three-dimensional format.
fn check_format(path: &Path) -> Result<FileFormat> {
    let format = FileFormat::from_path(path)
        .ok_or_else(|| CliError::Io(IoError::UnsupportedFormat(path.to_path_buf())))?;
    if !format.is_3d() {
        return Err(CliError::Argument(format!(
            "{} files cannot hold 3D coordinates: {}",
            format,
            path.display()
        )));
    }
    Ok(format)
}

/// Reads the first record of the reference file, which must carry 3D coordinates.
fn load_reference(path: &Path) -> Result<Molecule> {
    let molecules = read_molecules(path).map_err(|e| AlignError::from_io(path, e))?;
    if molecules.len() > 1 {
        warn!(
            records = molecules.len(),
            "Reference file has several records; only the first is used."
        );
    }
    let reference = molecules.into_iter().next().ok_or_else(|| {
        CliError::Argument(format!(
            "Reference file contains no molecules: {}",
            path.display()
        ))
    })?;
    if !reference.is_3d() {
        return Err(AlignError::Missing3DCoordinates {
            title: reference.title().to_string(),
        }
        .into());
    }
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use mcsalign::core::models::atom::Atom;
    use mcsalign::core::models::element::Element;
    use mcsalign::core::models::molecule::Dimension;
    use mcsalign::core::models::topology::BondOrder;
    use nalgebra::Point3;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    fn amide() -> Molecule {
        let mut mol = Molecule::new("amide");
        let atoms = [
            ("O1", Element::OXYGEN, Point3::new(-0.6, 1.0, 0.0)),
            ("C1", Element::CARBON, Point3::new(0.0, 0.0, 0.0)),
            ("CM", Element::CARBON, Point3::new(-0.8, -1.2, 0.1)),
            ("N1", Element::NITROGEN, Point3::new(1.3, 0.0, 0.0)),
            ("C2", Element::CARBON, Point3::new(1.9, 1.2, 0.3)),
            ("C3", Element::CARBON, Point3::new(3.4, 1.3, 0.2)),
            ("S1", Element::SULFUR, Point3::new(4.1, 2.9, 0.6)),
        ];
        for (name, element, position) in atoms {
            mol.add_atom(Atom::new(name, element, position));
        }
        for (a, b, order) in [
            (0, 1, BondOrder::Double),
            (1, 2, BondOrder::Single),
            (1, 3, BondOrder::Single),
            (3, 4, BondOrder::Single),
            (4, 5, BondOrder::Single),
            (5, 6, BondOrder::Single),
        ] {
            mol.add_bond(a, b, order).unwrap();
        }
        mol
    }

    fn write(dir: &TempDir, name: &str, molecules: &[Molecule]) -> PathBuf {
        let path = dir.path().join(name);
        write_molecules(&path, molecules).unwrap();
        path
    }

    fn cli(reference: &Path, candidates: &Path, output: &Path) -> Cli {
        Cli::parse_from([
            PathBuf::from("mcsalign").as_path(),
            reference,
            candidates,
            output,
        ])
    }

    #[test]
    fn aligns_candidates_and_writes_every_placement() {
        let dir = tempdir().unwrap();
        let reference = write(&dir, "ref.sdf", &[amide()]);

        let mut shifted = amide();
        shifted.set_title("shifted");
        for atom in shifted.atoms_mut() {
            atom.position += nalgebra::Vector3::new(4.0, -2.0, 1.5);
        }
        let candidates = write(&dir, "cands.sdf", &[shifted]);
        let output = dir.path().join("aligned.bgf");

        let summary = run(
            &cli(&reference, &candidates, &output),
            &CliProgressHandler::hidden(),
        )
        .unwrap();

        assert_eq!(summary.candidates, 1);
        assert_eq!(summary.aligned_candidates, 1);
        assert_eq!(summary.placements, 1);

        let aligned = read_molecules(&output).unwrap();
        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].title(), "shifted");
        for (a, b) in aligned[0].atoms().iter().zip(amide().atoms()) {
            assert!((a.position - b.position).norm() < 1e-3);
        }
    }

    #[test]
    fn flat_candidates_are_skipped_without_failing() {
        let dir = tempdir().unwrap();
        let reference = write(&dir, "ref.sdf", &[amide()]);
        let mut flat = amide();
        flat.set_title("flat");
        flat.set_dimension(Dimension::Two);
        let candidates = write(&dir, "cands.sdf", &[flat, amide()]);
        let output = dir.path().join("aligned.sdf");

        let summary = run(
            &cli(&reference, &candidates, &output),
            &CliProgressHandler::hidden(),
        )
        .unwrap();

        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.aligned_candidates, 1);
        assert_eq!(read_molecules(&output).unwrap().len(), 1);
    }

    #[test]
    fn flat_reference_is_fatal() {
        let dir = tempdir().unwrap();
        let mut flat = amide();
        flat.set_dimension(Dimension::Two);
        let reference = write(&dir, "ref.sdf", &[flat]);
        let candidates = write(&dir, "cands.sdf", &[amide()]);

        let result = run(
            &cli(&reference, &candidates, &dir.path().join("out.sdf")),
            &CliProgressHandler::hidden(),
        );
        assert!(matches!(
            result,
            Err(CliError::Align(AlignError::Missing3DCoordinates { .. }))
        ));
    }

    #[test]
    fn missing_reference_file_is_an_open_failure() {
        let dir = tempdir().unwrap();
        let candidates = write(&dir, "cands.sdf", &[amide()]);

        let result = run(
            &cli(
                &dir.path().join("missing.sdf"),
                &candidates,
                &dir.path().join("out.sdf"),
            ),
            &CliProgressHandler::hidden(),
        );
        assert!(matches!(
            result,
            Err(CliError::Align(AlignError::FileOpen { .. }))
        ));
    }

    #[test]
    fn unknown_output_extension_is_rejected_before_reading() {
        let dir = tempdir().unwrap();
        let result = run(
            &cli(
                &dir.path().join("ref.sdf"),
                &dir.path().join("cands.sdf"),
                &dir.path().join("out.smi"),
            ),
            &CliProgressHandler::hidden(),
        );
        assert!(matches!(
            result,
            Err(CliError::Io(IoError::UnsupportedFormat(_)))
        ));
    }

    #[test]
    fn empty_reference_file_is_rejected() {
        let dir = tempdir().unwrap();
        let reference = dir.path().join("ref.sdf");
        std::fs::write(&reference, "").unwrap();
        let candidates = write(&dir, "cands.sdf", &[amide()]);

        let result = run(
            &cli(&reference, &candidates, &dir.path().join("out.sdf")),
            &CliProgressHandler::hidden(),
        );
        assert!(matches!(
            result,
            Err(CliError::Align(AlignError::Parse { .. }))
        ));
    }
}
