use super::mapping::{AtomPair, Correspondence};
use crate::core::models::molecule::Molecule;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Finds common-substructure correspondences between two molecules.
pub trait CommonSubstructureSearch: Send + Sync {
    /// Returns correspondences whose pattern atoms are `reference` atoms and
    /// whose target atoms are `candidate` atoms.
    fn correspondences(&self, reference: &Molecule, candidate: &Molecule) -> Vec<Correspondence>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McsOptions {
    /// Smallest common substructure worth reporting.
    pub min_atoms: usize,
    /// Require matching aromaticity in addition to matching element.
    pub match_aromaticity: bool,
    /// Report only one correspondence per candidate atom set.
    pub unique: bool,
    pub max_matches: usize,
    /// Upper limit on explored search states; the best results found so far
    /// are returned once it is hit.
    pub max_search_nodes: usize,
    /// Leave reference hydrogens out of the search.
    pub suppress_hydrogens: bool,
    /// Reject correspondences that map a ring bond without mapping a whole
    /// ring containing it, in either molecule.
    pub complete_rings: bool,
}

impl Default for McsOptions {
    fn default() -> Self {
        Self {
            min_atoms: 3,
            match_aromaticity: true,
            unique: true,
            max_matches: 64,
            max_search_nodes: 2_000_000,
            suppress_hydrogens: true,
            complete_rings: true,
        }
    }
}

/// Exhaustive maximum common substructure search.
///
/// Substructures are connected and induced: two mapped reference atoms are
/// bonded exactly when their candidate images are bonded. Atoms match on
/// element (and aromaticity when enabled); bond orders are ignored. With
/// [`McsOptions::complete_rings`], a mapped ring bond needs one of its rings
/// mapped in full. Correspondences are ranked by atom count, then by mapped
/// bond count, and every correspondence of the best rank is reported.
#[derive(Debug, Clone, Default)]
pub struct McsSearcher {
    options: McsOptions,
}

impl McsSearcher {
    pub fn new(options: McsOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &McsOptions {
        &self.options
    }
}

impl CommonSubstructureSearch for McsSearcher {
    fn correspondences(&self, reference: &Molecule, candidate: &Molecule) -> Vec<Correspondence> {
        let mut state = McsState::new(reference, candidate, &self.options);
        state.run();

        if state.exhausted {
            warn!(
                "Common substructure search for '{}' stopped after {} states; results may not be maximal",
                candidate.title(),
                self.options.max_search_nodes
            );
        }
        debug!(
            "Common substructure of '{}' and '{}': {} atoms, {} bonds, {} correspondence(s), {} states",
            reference.title(),
            candidate.title(),
            state.best.0,
            state.best.1,
            state.results.len(),
            state.nodes
        );

        state
            .results
            .into_iter()
            .filter_map(Correspondence::new)
            .collect()
    }
}

type AtomKey = (u8, bool);

struct McsState<'a> {
    reference: &'a Molecule,
    candidate: &'a Molecule,
    options: &'a McsOptions,
    ref_allowed: Vec<bool>,
    ref_to_fit: Vec<Option<usize>>,
    fit_to_ref: Vec<Option<usize>>,
    excluded: Vec<bool>,
    /// Reference atoms in the order they were mapped.
    mapped: Vec<usize>,
    reference_rings: Option<RingMembership>,
    candidate_rings: Option<RingMembership>,
    /// Atom and bond count of the best correspondences so far.
    best: (usize, usize),
    results: Vec<Vec<AtomPair>>,
    seen_sets: HashSet<Vec<usize>>,
    nodes: usize,
    exhausted: bool,
}

impl<'a> McsState<'a> {
    fn new(reference: &'a Molecule, candidate: &'a Molecule, options: &'a McsOptions) -> Self {
        let ref_allowed = reference
            .atoms()
            .iter()
            .map(|a| !(options.suppress_hydrogens && a.is_hydrogen()))
            .collect();
        Self {
            reference,
            candidate,
            options,
            ref_allowed,
            ref_to_fit: vec![None; reference.atom_count()],
            fit_to_ref: vec![None; candidate.atom_count()],
            excluded: vec![false; reference.atom_count()],
            mapped: Vec::new(),
            reference_rings: options
                .complete_rings
                .then(|| RingMembership::perceive(reference)),
            candidate_rings: options
                .complete_rings
                .then(|| RingMembership::perceive(candidate)),
            best: (0, 0),
            results: Vec::new(),
            seen_sets: HashSet::new(),
            nodes: 0,
            exhausted: false,
        }
    }

    fn key_of(&self, molecule: &Molecule, atom: usize) -> AtomKey {
        molecule.atom(atom).map_or((0, false), |a| {
            (
                a.element.atomic_number(),
                self.options.match_aromaticity && a.aromatic,
            )
        })
    }

    fn compatible(&self, r: usize, f: usize) -> bool {
        self.ref_allowed[r] && self.key_of(self.reference, r) == self.key_of(self.candidate, f)
    }

    fn run(&mut self) {
        for r0 in 0..self.reference.atom_count() {
            if !self.ref_allowed[r0] {
                continue;
            }
            // Each connected mapping is enumerated from its lowest reference atom only.
            for r in 0..r0 {
                self.excluded[r] = true;
            }
            for f0 in 0..self.candidate.atom_count() {
                if !self.compatible(r0, f0) {
                    continue;
                }
                self.map(r0, f0);
                self.extend();
                self.unmap(r0, f0);
                if self.exhausted {
                    return;
                }
            }
        }
    }

    fn map(&mut self, r: usize, f: usize) {
        self.ref_to_fit[r] = Some(f);
        self.fit_to_ref[f] = Some(r);
        self.mapped.push(r);
    }

    fn unmap(&mut self, r: usize, f: usize) {
        self.ref_to_fit[r] = None;
        self.fit_to_ref[f] = None;
        self.mapped.pop();
    }

    fn is_open(&self, r: usize) -> bool {
        self.ref_allowed[r] && !self.excluded[r] && self.ref_to_fit[r].is_none()
    }

    fn extend(&mut self) {
        self.nodes += 1;
        if self.nodes > self.options.max_search_nodes {
            self.exhausted = true;
            return;
        }

        // Equal-size branches stay open: they may still win on bond count.
        let bound = self.upper_bound();
        if bound < self.best.0.max(self.options.min_atoms) {
            return;
        }

        let Some(r) = self.next_frontier_atom() else {
            self.record();
            return;
        };

        for f in self.fit_options(r) {
            self.map(r, f);
            self.extend();
            self.unmap(r, f);
            if self.exhausted {
                return;
            }
        }

        self.excluded[r] = true;
        self.extend();
        self.excluded[r] = false;
    }

    fn next_frontier_atom(&self) -> Option<usize> {
        self.mapped
            .iter()
            .flat_map(|&m| self.reference.neighbors(m).iter().copied())
            .filter(|&r| self.is_open(r))
            .min()
    }

    fn fit_options(&self, r: usize) -> Vec<usize> {
        let Some(anchor) = self
            .reference
            .neighbors(r)
            .iter()
            .find_map(|&n| self.ref_to_fit[n])
        else {
            return Vec::new();
        };

        self.candidate
            .neighbors(anchor)
            .iter()
            .copied()
            .filter(|&f| self.fit_to_ref[f].is_none() && self.compatible(r, f))
            .filter(|&f| {
                self.mapped.iter().all(|&rm| {
                    self.ref_to_fit[rm].is_some_and(|fm| {
                        self.reference.are_bonded(r, rm) == self.candidate.are_bonded(f, fm)
                    })
                })
            })
            .collect()
    }

    /// Mapped size plus, per atom kind, the smaller of the reference and
    /// candidate atoms still reachable from the mapped region.
    fn upper_bound(&self) -> usize {
        let reference_reachable = bfs_counts(
            self.reference,
            self.mapped.iter().copied(),
            |r| self.is_open(r),
            |r| self.key_of(self.reference, r),
        );
        let candidate_reachable = bfs_counts(
            self.candidate,
            self.mapped.iter().filter_map(|&r| self.ref_to_fit[r]),
            |f| self.fit_to_ref[f].is_none(),
            |f| self.key_of(self.candidate, f),
        );

        self.mapped.len()
            + reference_reachable
                .iter()
                .map(|(key, &n)| n.min(candidate_reachable.get(key).copied().unwrap_or(0)))
                .sum::<usize>()
    }

    fn mapped_bonds(&self) -> usize {
        self.reference
            .bonds()
            .iter()
            .filter(|b| self.ref_to_fit[b.atom1].is_some() && self.ref_to_fit[b.atom2].is_some())
            .count()
    }

    fn rings_complete(&self) -> bool {
        let reference_ok = self
            .reference_rings
            .as_ref()
            .is_none_or(|rings| rings.is_complete(|r| self.ref_to_fit[r].is_some()));
        let candidate_ok = self
            .candidate_rings
            .as_ref()
            .is_none_or(|rings| rings.is_complete(|f| self.fit_to_ref[f].is_some()));
        reference_ok && candidate_ok
    }

    fn record(&mut self) {
        let size = self.mapped.len();
        if size < self.options.min_atoms || size < self.best.0 || !self.rings_complete() {
            return;
        }
        let score = (size, self.mapped_bonds());
        if score < self.best {
            return;
        }
        if score > self.best {
            self.best = score;
            self.results.clear();
            self.seen_sets.clear();
        }
        if self.results.len() >= self.options.max_matches {
            return;
        }

        let mut pairs: Vec<AtomPair> = self
            .mapped
            .iter()
            .filter_map(|&r| self.ref_to_fit[r].map(|f| AtomPair::new(r, f)))
            .collect();
        pairs.sort_unstable();

        if self.options.unique {
            let mut set: Vec<usize> = pairs.iter().map(|p| p.target).collect();
            set.sort_unstable();
            if !self.seen_sets.insert(set) {
                return;
            }
        }
        self.results.push(pairs);
    }
}

/// Smallest cycle through every ring bond of a molecule.
struct RingMembership {
    /// Atoms of each distinct ring.
    rings: Vec<Vec<usize>>,
    /// Ring bond (lower index first) to the rings containing it.
    bonds: HashMap<(usize, usize), Vec<usize>>,
}

impl RingMembership {
    fn perceive(molecule: &Molecule) -> Self {
        let mut cycles: Vec<Vec<usize>> = Vec::new();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        for bond in molecule.bonds() {
            let Some(cycle) = shortest_cycle(molecule, bond.atom1, bond.atom2) else {
                continue;
            };
            let mut key = cycle.clone();
            key.sort_unstable();
            if seen.insert(key) {
                cycles.push(cycle);
            }
        }

        let mut bonds: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (id, cycle) in cycles.iter().enumerate() {
            for (i, &a) in cycle.iter().enumerate() {
                let b = cycle[(i + 1) % cycle.len()];
                bonds.entry((a.min(b), a.max(b))).or_default().push(id);
            }
        }
        Self {
            rings: cycles,
            bonds,
        }
    }

    /// `true` when every ring bond with both ends mapped lies in a fully mapped ring.
    fn is_complete(&self, mapped: impl Fn(usize) -> bool) -> bool {
        self.bonds.iter().all(|(&(a, b), rings)| {
            !(mapped(a) && mapped(b))
                || rings
                    .iter()
                    .any(|&id| self.rings[id].iter().all(|&atom| mapped(atom)))
        })
    }
}

/// Shortest path from `start` to `end` that avoids their direct bond, as an
/// ordered atom cycle beginning at `start`.
fn shortest_cycle(molecule: &Molecule, start: usize, end: usize) -> Option<Vec<usize>> {
    let mut parent: Vec<Option<usize>> = vec![None; molecule.atom_count()];
    let mut visited = vec![false; molecule.atom_count()];
    let mut queue = VecDeque::from([start]);
    visited[start] = true;

    while let Some(atom) = queue.pop_front() {
        for &next in molecule.neighbors(atom) {
            if visited[next] || (atom == start && next == end) {
                continue;
            }
            visited[next] = true;
            parent[next] = Some(atom);
            if next == end {
                let mut cycle = vec![end];
                let mut current = end;
                while let Some(p) = parent[current] {
                    cycle.push(p);
                    current = p;
                }
                cycle.reverse();
                return Some(cycle);
            }
            queue.push_back(next);
        }
    }
    None
}

fn bfs_counts(
    molecule: &Molecule,
    roots: impl Iterator<Item = usize>,
    open: impl Fn(usize) -> bool,
    key: impl Fn(usize) -> AtomKey,
) -> HashMap<AtomKey, usize> {
    let mut visited = vec![false; molecule.atom_count()];
    let mut queue: VecDeque<usize> = VecDeque::new();
    for root in roots {
        visited[root] = true;
        queue.push_back(root);
    }

    let mut counts = HashMap::new();
    while let Some(atom) = queue.pop_front() {
        for &next in molecule.neighbors(atom) {
            if visited[next] || !open(next) {
                continue;
            }
            visited[next] = true;
            *counts.entry(key(next)).or_insert(0) += 1;
            queue.push_back(next);
        }
    }
    counts
}
