use super::element::Element;
use nalgebra::Point3;

/// Represents an atom in a small-molecule structure.
///
/// The atom's identity is its index within the owning [`Molecule`](super::molecule::Molecule),
/// which is assigned when the atom is added and never changes afterwards. The position is
/// the only field the alignment pipeline mutates.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Zero-based index of this atom within its molecule.
    pub index: usize,
    /// The atom label as found in the input file (e.g., "C1", "O").
    pub name: String,
    /// The chemical element of the atom.
    pub element: Element,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// Force field atom type (e.g., "C_3", "N_R"); empty when the source format has none.
    pub force_field_type: String,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Partial atomic charge as carried by force-field formats.
    pub partial_charge: f64,
    /// Whether the atom takes part in an aromatic bond.
    pub aromatic: bool,
}

impl Atom {
    /// Creates a new `Atom` with neutral charges, no force field type and no aromaticity.
    ///
    /// The index is a placeholder until the atom is added to a molecule.
    ///
    /// # Arguments
    ///
    /// * `name` - The label of the atom.
    /// * `element` - The chemical element.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, element: Element, position: Point3<f64>) -> Self {
        Self {
            index: usize::MAX,
            name: name.to_string(),
            element,
            position,
            force_field_type: String::new(),
            formal_charge: 0,
            partial_charge: 0.0,
            aromatic: false,
        }
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element.is_hydrogen()
    }
}
