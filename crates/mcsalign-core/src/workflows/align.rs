use crate::core::models::molecule::Molecule;
use crate::core::query::mapping::Correspondence;
use crate::core::query::matcher::QueryMatch;
use crate::core::query::mcs::{CommonSubstructureSearch, McsSearcher};
use crate::core::utils::geometry::{RigidTransform, apply_rigid_transform};
use crate::engine::config::{AlignConfig, IncompleteMatchPolicy};
use crate::engine::correction::{TorsionCorrection, correct_torsion};
use crate::engine::error::AlignError;
use crate::engine::motif::MotifFinder;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::superposition::superpose;
use crate::engine::torsion::{Torsion, locate_torsion};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

/// The reference molecule with its motif match and torsion, computed once
/// and shared read-only by every candidate.
#[derive(Debug, Clone)]
pub struct ReferenceContext {
    molecule: Molecule,
    query_id: usize,
    motif: QueryMatch,
    torsion: Torsion,
}

impl ReferenceContext {
    /// Finds the motif in `reference` and measures its torsion.
    ///
    /// # Errors
    ///
    /// Any error here makes the whole run impossible: missing 3D coordinates,
    /// no motif match, an incomplete motif or degenerate torsion geometry.
    #[instrument(skip_all, name = "reference_preparation", fields(title = reference.title()))]
    pub fn prepare(reference: Molecule, config: &AlignConfig) -> Result<Self, AlignError> {
        if !reference.is_3d() {
            return Err(AlignError::Missing3DCoordinates {
                title: reference.title().to_string(),
            });
        }

        let finder = MotifFinder::new(&config.motif_queries);
        let (query_id, motif) = finder
            .find(&reference)
            .require(&reference, finder.query_count())?;
        let torsion = locate_torsion(&reference, &motif.positions)?;

        info!(
            query = query_id + 1,
            "Reference dihedral (deg): {:.2}",
            torsion.degrees()
        );
        Ok(Self {
            molecule: reference,
            query_id,
            motif,
            torsion,
        })
    }

    pub fn molecule(&self) -> &Molecule {
        &self.molecule
    }

    /// Index of the motif query that matched, in priority order.
    pub fn query_id(&self) -> usize {
        self.query_id
    }

    pub fn motif(&self) -> &QueryMatch {
        &self.motif
    }

    pub fn torsion(&self) -> &Torsion {
        &self.torsion
    }
}

/// One placement of a candidate, produced from one correspondence.
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    /// The corrected and superposed candidate, keeping its original title.
    pub molecule: Molecule,
    pub rmsd: f64,
    pub transform: RigidTransform,
    /// Reference atom → candidate atom.
    pub correspondence: Correspondence,
    /// `None` when the correspondence missed the torsion and was superposed
    /// uncorrected.
    pub torsion: Option<TorsionCorrection>,
}

/// Aligns one candidate against the reference, once per common-substructure
/// correspondence.
///
/// Correspondence-level failures are logged and skipped, so an empty vector
/// means no usable correspondence was found.
///
/// # Errors
///
/// Returns [`AlignError::Missing3DCoordinates`] for a candidate without 3D
/// coordinates, and propagates errors that are not recoverable.
#[instrument(skip_all, name = "candidate_alignment", fields(title = candidate.title()))]
pub fn align_candidate<S: CommonSubstructureSearch>(
    context: &ReferenceContext,
    candidate: &Molecule,
    config: &AlignConfig,
    searcher: &S,
) -> Result<Vec<AlignmentResult>, AlignError> {
    if !candidate.is_3d() {
        return Err(AlignError::Missing3DCoordinates {
            title: candidate.title().to_string(),
        });
    }

    let correspondences = searcher.correspondences(context.molecule(), candidate);
    debug!(count = correspondences.len(), "Common substructure correspondences found");

    let mut results = Vec::with_capacity(correspondences.len());
    for (index, correspondence) in correspondences.iter().enumerate() {
        match align_correspondence(context, candidate, correspondence, config) {
            Ok(result) => results.push(result),
            Err(e) if e.is_recoverable() => {
                warn!("Skipping correspondence {} of '{}': {}", index + 1, candidate.title(), e);
            }
            Err(e) => return Err(e),
        }
    }

    if results.is_empty() {
        info!("No usable correspondence for '{}'", candidate.title());
    }
    Ok(results)
}

fn align_correspondence(
    context: &ReferenceContext,
    candidate: &Molecule,
    correspondence: &Correspondence,
    config: &AlignConfig,
) -> Result<AlignmentResult, AlignError> {
    let mut fit = candidate.clone();

    let positions = context.motif().positions.project_through(correspondence);
    let torsion = match locate_torsion(&fit, &positions) {
        Ok(torsion) => Some(torsion),
        Err(AlignError::IncompleteMatch { missing })
            if config.incomplete_match_policy == IncompleteMatchPolicy::SuperposeUncorrected =>
        {
            debug!(?missing, "Superposing without torsion correction");
            None
        }
        Err(e) => return Err(e),
    };

    let correction = match torsion {
        Some(torsion) => {
            debug!("fitmol dihedral (deg): {:.2}", torsion.degrees());
            let correction = correct_torsion(
                &mut fit,
                &torsion,
                context.torsion().angle,
                config.torsion_tolerance,
            )?;
            if correction.was_applied() {
                debug!(
                    "After rotation, fitmol dihedral (deg): {:.2}",
                    correction.after.to_degrees()
                );
            }
            Some(correction)
        }
        None => None,
    };

    let reference_atoms: Vec<usize> = correspondence.pattern_atoms().collect();
    let candidate_atoms: Vec<usize> = correspondence.target_atoms().collect();
    let (Some(fixed), Some(mobile)) = (
        context.molecule().positions_of(&reference_atoms),
        fit.positions_of(&candidate_atoms),
    ) else {
        return Err(AlignError::DegenerateInput(
            "correspondence refers to atoms outside the molecules",
        ));
    };

    let superposition = superpose(&mobile, &fixed)?;
    apply_rigid_transform(&mut fit, &superposition.transform);
    debug!(rmsd = superposition.rmsd, atoms = correspondence.len(), "Superposed");

    Ok(AlignmentResult {
        molecule: fit,
        rmsd: superposition.rmsd,
        transform: superposition.transform,
        correspondence: correspondence.clone(),
        torsion: correction,
    })
}

/// Aligns every candidate, in parallel when the `parallel` feature is on.
///
/// The outer vector follows the order of `candidates`. Candidates that fail
/// with a recoverable error contribute an empty entry.
pub fn align_candidates<S: CommonSubstructureSearch>(
    context: &ReferenceContext,
    candidates: &[Molecule],
    config: &AlignConfig,
    searcher: &S,
    reporter: &ProgressReporter,
) -> Result<Vec<Vec<AlignmentResult>>, AlignError> {
    reporter.report(Progress::TaskStart {
        total_steps: candidates.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = candidates.iter();

    #[cfg(feature = "parallel")]
    let iterator = candidates.par_iter();

    let outcomes: Vec<Result<Vec<AlignmentResult>, AlignError>> = iterator
        .map(|candidate| {
            let outcome = match align_candidate(context, candidate, config, searcher) {
                Err(e) if e.is_recoverable() => {
                    warn!("{}", e);
                    Ok(Vec::new())
                }
                other => other,
            };
            if let Ok(results) = &outcome {
                reporter.report(Progress::CandidateAligned {
                    title: candidate.title().to_string(),
                    results: results.len(),
                });
            }
            reporter.report(Progress::TaskIncrement);
            outcome
        })
        .collect();

    reporter.report(Progress::TaskFinish);
    outcomes.into_iter().collect()
}

/// Runs a complete alignment: reference preparation, then every candidate.
#[instrument(skip_all, name = "alignment_workflow")]
pub fn run(
    reference: Molecule,
    candidates: &[Molecule],
    config: &AlignConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<Vec<AlignmentResult>>, AlignError> {
    reporter.report(Progress::PhaseStart {
        name: "Reference Preparation",
    });
    let context = ReferenceContext::prepare(reference, config)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Alignment" });
    let searcher = McsSearcher::new(config.mcs.clone());
    let results = align_candidates(&context, candidates, config, &searcher, reporter)?;
    reporter.report(Progress::PhaseFinish);

    let placements: usize = results.iter().map(Vec::len).sum();
    info!(
        candidates = candidates.len(),
        placements, "Alignment finished."
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::molecule::Dimension;
    use crate::core::models::topology::BondOrder;
    use crate::core::query::mapping::AtomPair;
    use crate::core::query::mcs::McsOptions;
    use crate::core::utils::geometry::rotate_subset;
    use crate::engine::config::AlignConfigBuilder;
    use crate::engine::torsion::measure;
    use nalgebra::{Point3, Rotation3, Unit, Vector3};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const O: usize = 0;
    const C: usize = 1;
    const N: usize = 3;
    const CR: usize = 4;

    /// O=C(CH3)-N-CH2-CH2-S with the N substituent roughly cis to the oxygen.
    fn reference() -> Molecule {
        let mut mol = Molecule::new("reference");
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

    /// Rebuilds `mol` with atom `i` of the result taken from `order[i]`.
    fn reorder(mol: &Molecule, order: &[usize]) -> Molecule {
        let mut out = Molecule::new(mol.title());
        let mut new_index = vec![0; order.len()];
        for (i, &old) in order.iter().enumerate() {
            new_index[old] = i;
            out.add_atom(mol.atoms()[old].clone());
        }
        for bond in mol.bonds() {
            out.add_bond(new_index[bond.atom1], new_index[bond.atom2], bond.order)
                .unwrap();
        }
        out
    }

    /// The reference flipped to a trans amide, shuffled and moved elsewhere.
    fn trans_candidate() -> Molecule {
        let mut mol = reference();
        mol.set_title("candidate");
        rotate_subset(&mut mol, C, N, &[4, 5, 6], std::f64::consts::PI).unwrap();
        let motion = RigidTransform::new(
            Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::new(0.3, 1.0, -0.4)), 2.0),
            Vector3::new(5.0, -7.0, 3.0),
        );
        apply_rigid_transform(&mut mol, &motion);
        reorder(&mol, &[6, 5, 4, 3, 2, 1, 0])
    }

    fn config() -> AlignConfig {
        AlignConfigBuilder::new().build().unwrap()
    }

    fn align(candidate: &Molecule, config: &AlignConfig) -> Vec<AlignmentResult> {
        let context = ReferenceContext::prepare(reference(), config).unwrap();
        align_candidate(&context, candidate, config, &McsSearcher::new(config.mcs.clone())).unwrap()
    }

    #[test]
    fn reference_context_measures_the_motif_torsion() {
        let context = ReferenceContext::prepare(reference(), &config()).unwrap();
        assert_eq!(context.query_id(), 0);
        assert_eq!(context.torsion().atoms.as_array(), [O, C, N, CR]);
        assert!(context.torsion().degrees().abs() < 30.0);
    }

    #[test]
    fn reference_without_motif_is_fatal() {
        let mut no_sulfur = reference();
        no_sulfur.atoms_mut()[6].element = Element::OXYGEN;
        let error = ReferenceContext::prepare(no_sulfur, &config()).unwrap_err();
        assert!(matches!(error, AlignError::MotifNotFound { .. }));
        assert!(!error.is_recoverable());
    }

    #[test]
    fn flat_reference_is_rejected() {
        let mut flat = reference();
        flat.set_dimension(Dimension::Two);
        assert!(matches!(
            ReferenceContext::prepare(flat, &config()),
            Err(AlignError::Missing3DCoordinates { .. })
        ));
    }

    #[test]
    fn trans_candidate_is_flipped_and_superposed_onto_the_reference() {
        let config = config();
        let reference = reference();
        let results = align(&trans_candidate(), &config);

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.molecule.title(), "candidate");
        assert_eq!(result.correspondence.len(), 7);

        let correction = result.torsion.unwrap();
        assert!(correction.was_applied());
        let reference_angle = measure(
            &reference,
            &crate::engine::torsion::TorsionAtoms { o: O, c: C, n: N, r: CR },
        )
        .unwrap();
        assert!((correction.after - reference_angle).abs() < 1e-6);
        assert!((correction.before - reference_angle).abs() > 3.0);

        assert!(result.rmsd < 1e-6, "rmsd = {}", result.rmsd);
        assert!((result.transform.determinant() - 1.0).abs() < 1e-9);
        for pair in result.correspondence.pairs() {
            let fitted = result.molecule.atoms()[pair.target].position;
            let expected = reference.atoms()[pair.pattern].position;
            assert!((fitted - expected).norm() < 1e-5);
        }
    }

    #[test]
    fn matching_torsion_is_not_rotated() {
        let config = config();
        let results = align(&reference(), &config);

        assert_eq!(results.len(), 1);
        let correction = results[0].torsion.unwrap();
        assert!(!correction.was_applied());
        assert!(results[0].rmsd < 1e-9);
    }

    #[test]
    fn mirror_image_is_superposed_with_a_proper_rotation() {
        let mut mirrored = reference();
        for atom in mirrored.atoms_mut() {
            atom.position.z = -atom.position.z;
        }

        let results = align(&mirrored, &config());

        assert_eq!(results.len(), 1);
        assert!((results[0].transform.determinant() - 1.0).abs() < 1e-9);
        assert!(results[0].torsion.unwrap().was_applied());
    }

    #[test]
    fn candidate_without_common_substructure_yields_nothing() {
        let mut tiny = Molecule::new("tiny");
        tiny.add_atom(Atom::new("C1", Element::CARBON, Point3::new(0.0, 0.0, 0.0)));
        tiny.add_atom(Atom::new("C2", Element::CARBON, Point3::new(1.5, 0.0, 0.3)));
        tiny.add_bond(0, 1, BondOrder::Single).unwrap();

        assert!(align(&tiny, &config()).is_empty());
    }

    /// The N substituent becomes an oxygen, so the common substructure
    /// (O, C, CH3, N) no longer covers torsion position 4.
    fn incomplete_candidate() -> Molecule {
        let mut mol = reference();
        mol.atoms_mut()[CR].element = Element::OXYGEN;
        mol
    }

    #[test]
    fn incomplete_matches_are_skipped_by_default() {
        assert!(align(&incomplete_candidate(), &config()).is_empty());
    }

    #[test]
    fn incomplete_matches_can_be_superposed_uncorrected() {
        let config = AlignConfigBuilder::new()
            .incomplete_match_policy(IncompleteMatchPolicy::SuperposeUncorrected)
            .build()
            .unwrap();

        let results = align(&incomplete_candidate(), &config);

        assert_eq!(results.len(), 1);
        assert!(results[0].torsion.is_none());
        assert_eq!(results[0].correspondence.len(), 4);
        assert!(results[0].rmsd < 1e-9);
    }

    #[test]
    fn ring_embedded_torsion_bonds_are_skipped() {
        let mut ring = trans_candidate();
        // Atoms were reversed: the sulfur is 0 and the methyl carbon is 4.
        ring.add_bond(0, 4, BondOrder::Single).unwrap();
        let config = AlignConfigBuilder::new()
            .mcs_options(McsOptions {
                complete_rings: false,
                ..McsOptions::default()
            })
            .build()
            .unwrap();
        assert!(align(&ring, &config).is_empty());
    }

    /// Hands out a fixed list of identity correspondences.
    struct FixedCorrespondences(Vec<Vec<usize>>);

    impl CommonSubstructureSearch for FixedCorrespondences {
        fn correspondences(&self, _: &Molecule, _: &Molecule) -> Vec<Correspondence> {
            self.0
                .iter()
                .map(|atoms| {
                    let pairs = atoms.iter().map(|&i| AtomPair::new(i, i)).collect();
                    Correspondence::new(pairs).unwrap()
                })
                .collect()
        }
    }

    #[test]
    fn correspondence_without_the_torsion_atoms_is_skipped_and_the_rest_aligned() {
        let config = config();
        let context = ReferenceContext::prepare(reference(), &config).unwrap();
        let searcher = FixedCorrespondences(vec![(0..4).collect(), (0..7).collect()]);

        let results = align_candidate(&context, &reference(), &config, &searcher).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].correspondence.len(), 7);
        assert!(results[0].correspondence.pairs().iter().any(|p| p.pattern == CR));
        assert!(results[0].torsion.is_some());
        assert!(results[0].rmsd < 1e-9);
    }

    #[test]
    fn batch_keeps_input_order_and_skips_flat_candidates() {
        let config = config();
        let context = ReferenceContext::prepare(reference(), &config).unwrap();
        let mut flat = trans_candidate();
        flat.set_dimension(Dimension::Two);
        flat.set_title("flat");
        let candidates = vec![trans_candidate(), flat, reference()];

        let increments = AtomicUsize::new(0);
        let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| {
            if event == Progress::TaskIncrement {
                increments.fetch_add(1, Ordering::SeqCst);
            }
        }));
        let results = align_candidates(
            &context,
            &candidates,
            &config,
            &McsSearcher::new(config.mcs.clone()),
            &reporter,
        )
        .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0][0].molecule.title(), "candidate");
        assert!(results[1].is_empty());
        assert_eq!(results[2][0].molecule.title(), "reference");
        assert_eq!(increments.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn run_prepares_the_reference_and_aligns_every_candidate() {
        let results = run(
            reference(),
            &[trans_candidate()],
            &config(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].len(), 1);
    }
}
