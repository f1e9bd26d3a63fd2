use super::error::AlignError;
use crate::core::models::molecule::Molecule;
use crate::core::query::mapping::MappedPositions;
use crate::core::utils::geometry::{GeometryError, dihedral};

/// Map positions of the O=C–N–R torsion atoms.
pub const TORSION_POSITIONS: [u32; 4] = [1, 2, 3, 4];

/// The four atoms defining the amide torsion O=C–N–R.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TorsionAtoms {
    pub o: usize,
    pub c: usize,
    pub n: usize,
    pub r: usize,
}

impl TorsionAtoms {
    pub fn as_array(&self) -> [usize; 4] {
        [self.o, self.c, self.n, self.r]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Torsion {
    pub atoms: TorsionAtoms,
    /// Signed angle in radians, in (−π, π].
    pub angle: f64,
}

impl Torsion {
    pub fn degrees(&self) -> f64 {
        self.angle.to_degrees()
    }
}

/// Resolves positions 1–4 to atoms of `molecule` and measures their torsion.
///
/// # Errors
///
/// - [`AlignError::IncompleteMatch`] if any of positions 1–4 is unmapped.
/// - [`AlignError::DegenerateGeometry`] if an atom is missing or the
///   geometry has no defined dihedral.
pub fn locate_torsion(
    molecule: &Molecule,
    positions: &MappedPositions,
) -> Result<Torsion, AlignError> {
    let missing = positions.missing(&TORSION_POSITIONS);
    if !missing.is_empty() {
        return Err(AlignError::IncompleteMatch { missing });
    }

    let [o, c, n, r] = TORSION_POSITIONS.map(|p| positions.get(p).unwrap_or(usize::MAX));
    let atoms = TorsionAtoms { o, c, n, r };
    let angle = measure(molecule, &atoms)?;
    Ok(Torsion { atoms, angle })
}

/// Measures the current torsion angle of `atoms` in `molecule`.
pub fn measure(molecule: &Molecule, atoms: &TorsionAtoms) -> Result<f64, AlignError> {
    let mut points = [nalgebra::Point3::origin(); 4];
    for (slot, index) in points.iter_mut().zip(atoms.as_array()) {
        *slot = molecule
            .position(index)
            .ok_or(GeometryError::AtomOutOfRange(index))?;
    }
    let [a, b, c, d] = points;
    Ok(dihedral(&a, &b, &c, &d)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use nalgebra::Point3;

    fn amide_fragment(r: Point3<f64>) -> Molecule {
        let mut mol = Molecule::new("fragment");
        mol.add_atom(Atom::new("O", Element::OXYGEN, Point3::new(-0.6, 1.0, 0.0)));
        mol.add_atom(Atom::new("C", Element::CARBON, Point3::new(0.0, 0.0, 0.0)));
        mol.add_atom(Atom::new("N", Element::NITROGEN, Point3::new(1.3, 0.0, 0.0)));
        mol.add_atom(Atom::new("R", Element::CARBON, r));
        mol
    }

    fn identity_positions(count: u32) -> MappedPositions {
        (1..=count).map(|p| (p, (p - 1) as usize)).collect()
    }

    #[test]
    fn cis_and_trans_torsions_are_measured() {
        let cis = amide_fragment(Point3::new(1.9, 1.2, 0.0));
        let trans = amide_fragment(Point3::new(1.9, -1.2, 0.0));

        let cis_torsion = locate_torsion(&cis, &identity_positions(4)).unwrap();
        let trans_torsion = locate_torsion(&trans, &identity_positions(4)).unwrap();

        assert!(cis_torsion.degrees().abs() < 1e-6);
        assert!((trans_torsion.degrees().abs() - 180.0).abs() < 1e-6);
        assert_eq!(cis_torsion.atoms, TorsionAtoms { o: 0, c: 1, n: 2, r: 3 });
    }

    #[test]
    fn missing_positions_are_reported() {
        let mol = amide_fragment(Point3::new(1.9, 1.2, 0.0));
        let result = locate_torsion(&mol, &identity_positions(3));
        match result {
            Err(AlignError::IncompleteMatch { missing }) => assert_eq!(missing, vec![4]),
            other => panic!("expected IncompleteMatch, got {other:?}"),
        }
    }

    #[test]
    fn colinear_atoms_are_degenerate() {
        // C, N and R on one line.
        let mol = amide_fragment(Point3::new(2.6, 0.0, 0.0));
        assert!(matches!(
            locate_torsion(&mol, &identity_positions(4)),
            Err(AlignError::DegenerateGeometry(GeometryError::Degenerate(_)))
        ));
    }

    #[test]
    fn out_of_range_atoms_are_rejected() {
        let mol = amide_fragment(Point3::new(1.9, 1.2, 0.0));
        let mut positions = identity_positions(4);
        positions.insert(4, 99);
        assert!(matches!(
            locate_torsion(&mol, &positions),
            Err(AlignError::DegenerateGeometry(GeometryError::AtomOutOfRange(99)))
        ));
    }
}
