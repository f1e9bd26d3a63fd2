use std::collections::BTreeMap;

/// One pattern atom paired with the target atom it maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomPair {
    pub pattern: usize,
    pub target: usize,
}

impl AtomPair {
    pub fn new(pattern: usize, target: usize) -> Self {
        Self { pattern, target }
    }
}

/// An injective mapping from pattern atoms to target atoms.
///
/// Pairs keep the order in which they were produced by the search; every
/// pattern atom and every target atom appears at most once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Correspondence {
    pairs: Vec<AtomPair>,
}

impl Correspondence {
    /// Builds a correspondence, returning `None` if the pairs are not injective.
    pub fn new(pairs: Vec<AtomPair>) -> Option<Self> {
        let mut patterns: Vec<usize> = pairs.iter().map(|p| p.pattern).collect();
        let mut targets: Vec<usize> = pairs.iter().map(|p| p.target).collect();
        patterns.sort_unstable();
        targets.sort_unstable();
        let injective = patterns.windows(2).all(|w| w[0] != w[1])
            && targets.windows(2).all(|w| w[0] != w[1]);
        injective.then_some(Self { pairs })
    }

    pub fn pairs(&self) -> &[AtomPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn target_of(&self, pattern: usize) -> Option<usize> {
        self.pairs
            .iter()
            .find(|p| p.pattern == pattern)
            .map(|p| p.target)
    }

    pub fn pattern_atoms(&self) -> impl Iterator<Item = usize> + '_ {
        self.pairs.iter().map(|p| p.pattern)
    }

    pub fn target_atoms(&self) -> impl Iterator<Item = usize> + '_ {
        self.pairs.iter().map(|p| p.target)
    }

    /// Returns the target atoms sorted, used to detect correspondences that
    /// cover the same atoms in a different order.
    pub fn target_set(&self) -> Vec<usize> {
        let mut set: Vec<usize> = self.target_atoms().collect();
        set.sort_unstable();
        set
    }
}

/// Atom-map positions of a query match: map index to target atom.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappedPositions {
    positions: BTreeMap<u32, usize>,
}

impl MappedPositions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, position: u32, atom: usize) {
        self.positions.insert(position, atom);
    }

    pub fn get(&self, position: u32) -> Option<usize> {
        self.positions.get(&position).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.positions.iter().map(|(&k, &v)| (k, v))
    }

    /// Lists the required positions that have no atom, in ascending order.
    pub fn missing(&self, required: &[u32]) -> Vec<u32> {
        let mut missing: Vec<u32> = required
            .iter()
            .copied()
            .filter(|p| !self.positions.contains_key(p))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }

    /// Re-expresses these positions in another molecule.
    ///
    /// Each position's atom is looked up as a pattern atom of `correspondence`
    /// and replaced by its target. Positions whose atom is not covered are
    /// dropped.
    pub fn project_through(&self, correspondence: &Correspondence) -> MappedPositions {
        let positions = self
            .positions
            .iter()
            .filter_map(|(&position, &atom)| {
                correspondence
                    .target_of(atom)
                    .map(|target| (position, target))
            })
            .collect();
        MappedPositions { positions }
    }
}

impl FromIterator<(u32, usize)> for MappedPositions {
    fn from_iter<I: IntoIterator<Item = (u32, usize)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(usize, usize)]) -> Vec<AtomPair> {
        raw.iter().map(|&(p, t)| AtomPair::new(p, t)).collect()
    }

    #[test]
    fn correspondence_rejects_non_injective_pairs() {
        assert!(Correspondence::new(pairs(&[(0, 1), (1, 2)])).is_some());
        assert!(Correspondence::new(pairs(&[(0, 1), (0, 2)])).is_none());
        assert!(Correspondence::new(pairs(&[(0, 1), (1, 1)])).is_none());
        assert!(Correspondence::new(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn correspondence_lookup_and_target_set() {
        let c = Correspondence::new(pairs(&[(3, 9), (1, 4), (2, 7)])).unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c.target_of(1), Some(4));
        assert_eq!(c.target_of(5), None);
        assert_eq!(c.target_set(), vec![4, 7, 9]);
        assert_eq!(c.pattern_atoms().collect::<Vec<_>>(), vec![3, 1, 2]);
    }

    #[test]
    fn missing_reports_absent_required_positions() {
        let positions: MappedPositions = [(1, 10), (2, 11), (4, 13)].into_iter().collect();
        assert_eq!(positions.missing(&[1, 2, 3, 4]), vec![3]);
        assert!(positions.missing(&[1, 2]).is_empty());
    }

    #[test]
    fn project_through_maps_reference_atoms_to_candidate_atoms() {
        let reference_positions: MappedPositions =
            [(1, 0), (2, 1), (3, 2), (4, 3), (5, 4)].into_iter().collect();
        let correspondence =
            Correspondence::new(pairs(&[(0, 20), (1, 21), (2, 22), (3, 25)])).unwrap();

        let projected = reference_positions.project_through(&correspondence);

        assert_eq!(projected.get(1), Some(20));
        assert_eq!(projected.get(4), Some(25));
        assert_eq!(projected.get(5), None, "reference atom 4 is not in the correspondence");
        assert_eq!(projected.len(), 4);
    }
}
