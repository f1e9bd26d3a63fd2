use super::mapping::{AtomPair, Correspondence, MappedPositions};
use super::pattern::PatternQuery;
use crate::core::models::molecule::Molecule;

/// A single embedding of a query in a molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    /// Query atom → molecule atom, in query atom order.
    pub correspondence: Correspondence,
    /// Atom-map index → molecule atom, for query atoms that carry a map index.
    pub positions: MappedPositions,
}

/// Finds embeddings of a pattern query in a molecule.
pub trait SubstructureSearch: Send + Sync {
    /// Returns every match in a deterministic order.
    fn search(&self, molecule: &Molecule, query: &PatternQuery) -> Vec<QueryMatch>;
}

/// VF2-style backtracking subgraph matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vf2Matcher {
    /// Drops matches that cover the same molecule atoms as an earlier match.
    pub unique: bool,
    /// Stops after this many matches.
    pub max_matches: Option<usize>,
}

impl Vf2Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn max_matches(mut self, max_matches: usize) -> Self {
        self.max_matches = Some(max_matches);
        self
    }
}

impl SubstructureSearch for Vf2Matcher {
    fn search(&self, molecule: &Molecule, query: &PatternQuery) -> Vec<QueryMatch> {
        if query.atom_count() == 0 || query.atom_count() > molecule.atom_count() {
            return Vec::new();
        }
        let mut state = Vf2State::new(molecule, query, *self);
        state.match_recursive(0);
        state.matches
    }
}

struct Vf2State<'a> {
    target: &'a Molecule,
    query: &'a PatternQuery,
    options: Vf2Matcher,
    core_query: Vec<Option<usize>>,
    core_target: Vec<Option<usize>>,
    seen_sets: Vec<Vec<usize>>,
    matches: Vec<QueryMatch>,
}

impl<'a> Vf2State<'a> {
    fn new(target: &'a Molecule, query: &'a PatternQuery, options: Vf2Matcher) -> Self {
        Self {
            target,
            query,
            options,
            core_query: vec![None; query.atom_count()],
            core_target: vec![None; target.atom_count()],
            seen_sets: Vec::new(),
            matches: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.options
            .max_matches
            .is_some_and(|max| self.matches.len() >= max)
    }

    fn match_recursive(&mut self, depth: usize) {
        if self.is_full() {
            return;
        }
        if depth == self.query.atom_count() {
            self.record_match();
            return;
        }

        let query_atom = depth;
        for target_atom in self.candidates(query_atom) {
            if !self.is_feasible(query_atom, target_atom) {
                continue;
            }
            self.core_query[query_atom] = Some(target_atom);
            self.core_target[target_atom] = Some(query_atom);

            self.match_recursive(depth + 1);

            self.core_query[query_atom] = None;
            self.core_target[target_atom] = None;

            if self.is_full() {
                return;
            }
        }
    }

    fn record_match(&mut self) {
        let pairs: Vec<AtomPair> = self
            .core_query
            .iter()
            .enumerate()
            .filter_map(|(q, t)| t.map(|t| AtomPair::new(q, t)))
            .collect();
        let Some(correspondence) = Correspondence::new(pairs) else {
            return;
        };

        if self.options.unique {
            let set = correspondence.target_set();
            if self.seen_sets.contains(&set) {
                return;
            }
            self.seen_sets.push(set);
        }

        let positions = self
            .query
            .atoms()
            .iter()
            .enumerate()
            .filter_map(|(q, atom)| Some((atom.map_index?, correspondence.target_of(q)?)))
            .collect();
        self.matches.push(QueryMatch {
            correspondence,
            positions,
        });
    }

    /// Restricts candidates to unmapped neighbors of the images of already
    /// mapped query neighbors; falls back to every unmapped atom.
    fn candidates(&self, query_atom: usize) -> Vec<usize> {
        let anchor = self
            .query
            .neighbors(query_atom)
            .iter()
            .find_map(|&(neighbor, _)| self.core_query[neighbor]);

        match anchor {
            Some(t_mapped) => self
                .target
                .neighbors(t_mapped)
                .iter()
                .copied()
                .filter(|&t| self.core_target[t].is_none())
                .collect(),
            None => (0..self.target.atom_count())
                .filter(|&t| self.core_target[t].is_none())
                .collect(),
        }
    }

    fn is_feasible(&self, query_atom: usize, target_atom: usize) -> bool {
        let Some(atom) = self.target.atom(target_atom) else {
            return false;
        };
        if !self.query.atoms()[query_atom].matches(atom) {
            return false;
        }

        self.query
            .neighbors(query_atom)
            .iter()
            .all(|&(q_neighbor, bond_index)| match self.core_query[q_neighbor] {
                Some(t_mapped) => self
                    .target
                    .bond_between(target_atom, t_mapped)
                    .is_some_and(|bond| self.query.bonds()[bond_index].query.matches(bond.order)),
                None => true,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;
    use nalgebra::Point3;

    /// O=C(C)-N-C-C-S with an extra methyl on the nitrogen.
    fn thioethyl_amide() -> Molecule {
        let mut mol = Molecule::new("thioethyl amide");
        let specs = [
            ("O1", Element::OXYGEN),
            ("C1", Element::CARBON),
            ("CM", Element::CARBON),
            ("N1", Element::NITROGEN),
            ("C2", Element::CARBON),
            ("C3", Element::CARBON),
            ("S1", Element::SULFUR),
            ("CN", Element::CARBON),
        ];
        for (i, (name, element)) in specs.into_iter().enumerate() {
            mol.add_atom(Atom::new(name, element, Point3::new(i as f64, 0.0, 0.0)));
        }
        mol.add_bond(0, 1, BondOrder::Double).unwrap();
        mol.add_bond(1, 2, BondOrder::Single).unwrap();
        mol.add_bond(1, 3, BondOrder::Single).unwrap();
        mol.add_bond(3, 4, BondOrder::Single).unwrap();
        mol.add_bond(4, 5, BondOrder::Single).unwrap();
        mol.add_bond(5, 6, BondOrder::Single).unwrap();
        mol.add_bond(3, 7, BondOrder::Single).unwrap();
        mol
    }

    #[test]
    fn finds_mapped_motif_positions() {
        let mol = thioethyl_amide();
        let query = PatternQuery::parse("[#8:1]=[#6:2]-[#7:3]-[#6:4]-[#6:5]-[#16:6]").unwrap();

        let matches = Vf2Matcher::new().search(&mol, &query);

        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.correspondence.len(), 6);
        let expected = [(1, 0), (2, 1), (3, 3), (4, 4), (5, 5), (6, 6)];
        for (position, atom) in expected {
            assert_eq!(m.positions.get(position), Some(atom), "position {position}");
        }
    }

    #[test]
    fn reverse_query_matches_same_atoms() {
        let mol = thioethyl_amide();
        let query = PatternQuery::parse("[#16:6]-[#6:5]-[#6:4]-[#7:3]-[#6:2]=[#8:1]").unwrap();
        let matches = Vf2Matcher::new().search(&mol, &query);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].positions.get(1), Some(0));
        assert_eq!(matches[0].positions.get(6), Some(6));
    }

    #[test]
    fn bond_orders_are_enforced() {
        let mol = thioethyl_amide();
        let query = PatternQuery::parse("O-C-N").unwrap();
        assert!(Vf2Matcher::new().search(&mol, &query).is_empty());
    }

    #[test]
    fn symmetric_matches_are_enumerated_and_uniquified() {
        let mol = thioethyl_amide();
        // N with two carbon neighbors besides the carbonyl: C2 and CN.
        let query = PatternQuery::parse("C-N-C").unwrap();

        let all = Vf2Matcher::new().search(&mol, &query);
        let unique = Vf2Matcher::new().unique(true).search(&mol, &query);

        assert_eq!(all.len(), 6);
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn max_matches_limits_enumeration() {
        let mol = thioethyl_amide();
        let query = PatternQuery::parse("C-N-C").unwrap();
        let limited = Vf2Matcher::new().max_matches(2).search(&mol, &query);
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn oversized_query_matches_nothing() {
        let mut mol = Molecule::new("methane");
        mol.add_atom(Atom::new("C", Element::CARBON, Point3::origin()));
        let query = PatternQuery::parse("CC").unwrap();
        assert!(Vf2Matcher::new().search(&mol, &query).is_empty());
    }
}
