use super::atom::Atom;
use super::topology::{Bond, BondOrder};
use nalgebra::Point3;

/// Coordinate dimensionality declared by (or inferred from) an input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dimension {
    Two,
    #[default]
    Three,
}

/// Represents a single small molecule with its atoms, bonds, and title.
///
/// Atoms are stored in input order and addressed by index. A bond adjacency
/// cache is maintained alongside the bond list so that graph traversals used by
/// substructure matching and torsion correction stay linear in the number of
/// neighbors.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    /// The molecule title (first line of an SDF record, `DESCRP` in BGF).
    title: String,
    /// Atoms in input order; `atoms[i].index == i`.
    atoms: Vec<Atom>,
    /// List of all bonds in the molecule.
    bonds: Vec<Bond>,
    /// Cached adjacency list for bond connectivity, indexed by atom index.
    adjacency: Vec<Vec<usize>>,
    /// Whether the record carries real 3D coordinates.
    dimension: Dimension,
    /// Named data items carried with the record (SD tags), in input order.
    properties: Vec<(String, String)>,
}

impl Molecule {
    /// Creates a new, empty 3D molecule with the given title.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn set_dimension(&mut self, dimension: Dimension) {
        self.dimension = dimension;
    }

    pub fn is_3d(&self) -> bool {
        self.dimension == Dimension::Three
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets a named data item, replacing an existing value with the same name.
    pub fn set_property(&mut self, name: &str, value: &str) {
        match self.properties.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.properties.push((name.to_string(), value.to_string())),
        }
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Retrieves an immutable reference to an atom by its index.
    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    /// Retrieves a mutable reference to an atom by its index.
    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    /// Returns a slice of all bonds in the molecule.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Returns the position of the atom at `index`, if it exists.
    pub fn position(&self, index: usize) -> Option<Point3<f64>> {
        self.atoms.get(index).map(|a| a.position)
    }

    /// Adds an atom and returns its index.
    ///
    /// The atom's `index` field is overwritten with its position in the molecule.
    pub fn add_atom(&mut self, mut atom: Atom) -> usize {
        let index = self.atoms.len();
        atom.index = index;
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        index
    }

    /// Adds a bond between two atoms.
    ///
    /// This method is idempotent; adding an existing bond succeeds without
    /// creating a duplicate. Aromatic bonds mark both end atoms as aromatic.
    ///
    /// # Return
    ///
    /// Returns `None` if either atom does not exist or the bond is a self-loop.
    pub fn add_bond(&mut self, atom1: usize, atom2: usize, order: BondOrder) -> Option<()> {
        if atom1 >= self.atoms.len() || atom2 >= self.atoms.len() || atom1 == atom2 {
            return None;
        }
        if self.adjacency[atom1].contains(&atom2) {
            return Some(());
        }

        self.bonds.push(Bond::new(atom1, atom2, order));
        self.adjacency[atom1].push(atom2);
        self.adjacency[atom2].push(atom1);
        if order == BondOrder::Aromatic {
            self.atoms[atom1].aromatic = true;
            self.atoms[atom2].aromatic = true;
        }
        Some(())
    }

    /// Retrieves the bonded neighbors of an atom.
    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map_or(&[], |v| v.as_slice())
    }

    pub fn are_bonded(&self, atom1: usize, atom2: usize) -> bool {
        self.neighbors(atom1).contains(&atom2)
    }

    /// Finds the bond joining two atoms, in either direction.
    pub fn bond_between(&self, atom1: usize, atom2: usize) -> Option<&Bond> {
        if !self.are_bonded(atom1, atom2) {
            return None;
        }
        self.bonds
            .iter()
            .find(|b| b.contains(atom1) && b.other(atom1) == Some(atom2))
    }

    /// Iterates over the indices of all non-hydrogen atoms.
    pub fn heavy_atom_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.atoms
            .iter()
            .filter(|a| !a.is_hydrogen())
            .map(|a| a.index)
    }

    /// Collects the positions of the given atoms, in the given order.
    ///
    /// Returns `None` if any index is out of range.
    pub fn positions_of(&self, indices: &[usize]) -> Option<Vec<Point3<f64>>> {
        indices.iter().map(|&i| self.position(i)).collect()
    }

    /// Returns `true` if any atom has a non-zero z coordinate.
    pub fn has_nonplanar_coordinates(&self) -> bool {
        self.atoms.iter().any(|a| a.position.z.abs() > 1e-4)
    }
}
