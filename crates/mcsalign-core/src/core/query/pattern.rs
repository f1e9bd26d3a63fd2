use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::topology::BondOrder;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryParseError {
    #[error("Pattern is empty")]
    Empty,
    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
    #[error("Unexpected end of pattern inside {0}")]
    UnexpectedEnd(&'static str),
    #[error("Unknown element '{symbol}' at position {position}")]
    UnknownElement { symbol: String, position: usize },
    #[error("Unbalanced branch parenthesis at position {0}")]
    UnbalancedBranch(usize),
    #[error("Bond at position {0} has no preceding atom")]
    DanglingBond(usize),
    #[error("Ring closure {0} is never closed")]
    UnclosedRing(u16),
    #[error("Ring closure {0} duplicates an existing bond")]
    DuplicateRingBond(u16),
    #[error("Atom-map index {0} is used more than once")]
    DuplicateMapIndex(u32),
}

/// Constraints a pattern atom places on a target atom.
///
/// `None` fields match anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtomQuery {
    pub atomic_number: Option<u8>,
    pub aromatic: Option<bool>,
    pub map_index: Option<u32>,
}

impl AtomQuery {
    pub fn matches(&self, atom: &Atom) -> bool {
        self.atomic_number
            .is_none_or(|z| atom.element.atomic_number() == z)
            && self.aromatic.is_none_or(|a| atom.aromatic == a)
    }
}

/// Constraint on the order of a target bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondQuery {
    Single,
    Double,
    Triple,
    Aromatic,
    Any,
    /// The implicit bond between adjacent atoms written without a bond symbol.
    SingleOrAromatic,
}

impl BondQuery {
    pub fn matches(self, order: BondOrder) -> bool {
        match self {
            Self::Single => order == BondOrder::Single,
            Self::Double => order == BondOrder::Double,
            Self::Triple => order == BondOrder::Triple,
            Self::Aromatic => order == BondOrder::Aromatic,
            Self::Any => true,
            Self::SingleOrAromatic => matches!(order, BondOrder::Single | BondOrder::Aromatic),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryBond {
    pub atom1: usize,
    pub atom2: usize,
    pub query: BondQuery,
}

/// A parsed substructure query.
///
/// The accepted language is a linear SMARTS subset: bracket atoms built from
/// `#n`, element symbols, `a`, `A`, `*` and a trailing `:map`; organic-subset
/// atoms (lowercase for aromatic); the bonds `- = # : ~`; branches; and ring
/// closure digits (`1`..`9`, `%nn`).
#[derive(Debug, Clone, PartialEq)]
pub struct PatternQuery {
    source: String,
    atoms: Vec<AtomQuery>,
    bonds: Vec<QueryBond>,
    /// `(neighbor, bond index)` per atom.
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl PatternQuery {
    pub fn parse(source: &str) -> Result<Self, QueryParseError> {
        let (atoms, bonds) = Parser::new(source).run()?;

        let mut seen = BTreeMap::new();
        for atom in &atoms {
            if let Some(map) = atom.map_index {
                if seen.insert(map, ()).is_some() {
                    return Err(QueryParseError::DuplicateMapIndex(map));
                }
            }
        }

        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (i, bond) in bonds.iter().enumerate() {
            adjacency[bond.atom1].push((bond.atom2, i));
            adjacency[bond.atom2].push((bond.atom1, i));
        }

        Ok(Self {
            source: source.to_string(),
            atoms,
            bonds,
            adjacency,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn atoms(&self) -> &[AtomQuery] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[QueryBond] {
        &self.bonds
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn neighbors(&self, atom: usize) -> &[(usize, usize)] {
        self.adjacency.get(atom).map_or(&[], |v| v.as_slice())
    }

    /// Finds the pattern atom carrying the given atom-map index.
    pub fn atom_with_map_index(&self, map_index: u32) -> Option<usize> {
        self.atoms
            .iter()
            .position(|a| a.map_index == Some(map_index))
    }
}

impl FromStr for PatternQuery {
    type Err = QueryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PatternQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    atoms: Vec<AtomQuery>,
    bonds: Vec<QueryBond>,
    branch_stack: Vec<(usize, usize)>,
    prev_atom: Option<usize>,
    pending_bond: Option<(BondQuery, usize)>,
    ring_closures: BTreeMap<u16, (usize, Option<BondQuery>)>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            input: source.trim().as_bytes(),
            pos: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
            branch_stack: Vec::new(),
            prev_atom: None,
            pending_bond: None,
            ring_closures: BTreeMap::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn unexpected(&self, ch: u8, position: usize) -> QueryParseError {
        QueryParseError::UnexpectedChar {
            ch: ch as char,
            position,
        }
    }

    fn run(mut self) -> Result<(Vec<AtomQuery>, Vec<QueryBond>), QueryParseError> {
        if self.input.is_empty() {
            return Err(QueryParseError::Empty);
        }

        while let Some(ch) = self.peek() {
            let start = self.pos;
            match ch {
                b'(' => {
                    self.advance();
                    let prev = self.prev_atom.ok_or(QueryParseError::UnbalancedBranch(start))?;
                    self.branch_stack.push((prev, start));
                }
                b')' => {
                    self.advance();
                    let (prev, _) = self
                        .branch_stack
                        .pop()
                        .ok_or(QueryParseError::UnbalancedBranch(start))?;
                    if let Some((_, at)) = self.pending_bond {
                        return Err(QueryParseError::DanglingBond(at));
                    }
                    self.prev_atom = Some(prev);
                }
                b'-' | b'=' | b'#' | b':' | b'~' => {
                    self.advance();
                    if self.prev_atom.is_none() || self.pending_bond.is_some() {
                        return Err(QueryParseError::DanglingBond(start));
                    }
                    let query = match ch {
                        b'-' => BondQuery::Single,
                        b'=' => BondQuery::Double,
                        b'#' => BondQuery::Triple,
                        b':' => BondQuery::Aromatic,
                        _ => BondQuery::Any,
                    };
                    self.pending_bond = Some((query, start));
                }
                b'0'..=b'9' => {
                    self.advance();
                    self.ring_closure((ch - b'0') as u16, start)?;
                }
                b'%' => {
                    self.advance();
                    let (Some(d1), Some(d2)) = (self.advance(), self.advance()) else {
                        return Err(QueryParseError::UnexpectedEnd("ring closure"));
                    };
                    if !d1.is_ascii_digit() {
                        return Err(self.unexpected(d1, start + 1));
                    }
                    if !d2.is_ascii_digit() {
                        return Err(self.unexpected(d2, start + 2));
                    }
                    let number = (d1 - b'0') as u16 * 10 + (d2 - b'0') as u16;
                    self.ring_closure(number, start)?;
                }
                b'[' => {
                    let atom = self.bracket_atom()?;
                    self.push_atom(atom);
                }
                b'*' => {
                    self.advance();
                    self.push_atom(AtomQuery::default());
                }
                _ => {
                    let atom = self.organic_atom()?;
                    self.push_atom(atom);
                }
            }
        }

        if let Some(&(_, at)) = self.branch_stack.last() {
            return Err(QueryParseError::UnbalancedBranch(at));
        }
        if let Some((_, at)) = self.pending_bond {
            return Err(QueryParseError::DanglingBond(at));
        }
        if let Some((&ring, _)) = self.ring_closures.iter().next() {
            return Err(QueryParseError::UnclosedRing(ring));
        }
        Ok((self.atoms, self.bonds))
    }

    fn push_atom(&mut self, atom: AtomQuery) {
        let index = self.atoms.len();
        self.atoms.push(atom);
        if let Some(prev) = self.prev_atom {
            let query = self
                .pending_bond
                .take()
                .map_or(BondQuery::SingleOrAromatic, |(q, _)| q);
            self.bonds.push(QueryBond {
                atom1: prev,
                atom2: index,
                query,
            });
        }
        self.prev_atom = Some(index);
    }

    fn ring_closure(&mut self, number: u16, position: usize) -> Result<(), QueryParseError> {
        let current = self.prev_atom.ok_or(QueryParseError::DanglingBond(position))?;
        let pending = self.pending_bond.take().map(|(q, _)| q);

        match self.ring_closures.remove(&number) {
            Some((open_atom, open_bond)) => {
                let exists = self.bonds.iter().any(|b| {
                    (b.atom1 == open_atom && b.atom2 == current)
                        || (b.atom1 == current && b.atom2 == open_atom)
                });
                if open_atom == current || exists {
                    return Err(QueryParseError::DuplicateRingBond(number));
                }
                self.bonds.push(QueryBond {
                    atom1: open_atom,
                    atom2: current,
                    query: pending.or(open_bond).unwrap_or(BondQuery::SingleOrAromatic),
                });
            }
            None => {
                self.ring_closures.insert(number, (current, pending));
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<AtomQuery, QueryParseError> {
        let start = self.pos;
        let Some(ch) = self.advance() else {
            return Err(QueryParseError::UnexpectedEnd("atom"));
        };

        let (symbol, aromatic) = match ch {
            b'C' if self.peek() == Some(b'l') => ("Cl", false),
            b'B' if self.peek() == Some(b'r') => ("Br", false),
            b'B' | b'C' | b'N' | b'O' | b'P' | b'S' | b'F' | b'I' => {
                return element_query(&(ch as char).to_string(), Some(false), start);
            }
            b'b' | b'c' | b'n' | b'o' | b'p' | b's' => {
                return element_query(&(ch as char).to_string(), Some(true), start);
            }
            _ => return Err(self.unexpected(ch, start)),
        };
        self.advance();
        element_query(symbol, Some(aromatic), start)
    }

    fn bracket_atom(&mut self) -> Result<AtomQuery, QueryParseError> {
        self.advance();
        let mut atom = AtomQuery::default();

        loop {
            let start = self.pos;
            let Some(ch) = self.advance() else {
                return Err(QueryParseError::UnexpectedEnd("bracket atom"));
            };
            match ch {
                b']' => return Ok(atom),
                b'&' => {}
                b'*' => {}
                b'#' => {
                    let n = self.number("atomic number")?;
                    let z = u8::try_from(n)
                        .ok()
                        .filter(|&z| Element::from_atomic_number(z).is_some());
                    atom.atomic_number = Some(z.ok_or_else(|| QueryParseError::UnknownElement {
                        symbol: format!("#{n}"),
                        position: start,
                    })?);
                }
                b':' => {
                    atom.map_index = Some(self.number("atom-map index")?);
                    if self.peek() != Some(b']') {
                        return match self.peek() {
                            Some(c) => Err(self.unexpected(c, self.pos)),
                            None => Err(QueryParseError::UnexpectedEnd("bracket atom")),
                        };
                    }
                }
                b'a' if !self.peek().is_some_and(|c| c.is_ascii_lowercase()) => {
                    atom.aromatic = Some(true);
                }
                b'A' if !self.peek().is_some_and(|c| c.is_ascii_lowercase()) => {
                    atom.aromatic = Some(false);
                }
                b'A'..=b'Z' => {
                    let mut symbol = (ch as char).to_string();
                    if let Some(next) = self.peek().filter(u8::is_ascii_lowercase) {
                        let two = format!("{}{}", ch as char, next as char);
                        if Element::from_symbol(&two).is_some() {
                            self.advance();
                            symbol = two;
                        }
                    }
                    let q = element_query(&symbol, Some(false), start)?;
                    atom.atomic_number = q.atomic_number;
                    atom.aromatic = q.aromatic;
                }
                b'b' | b'c' | b'n' | b'o' | b'p' | b's' => {
                    let q = element_query(&(ch as char).to_string(), Some(true), start)?;
                    atom.atomic_number = q.atomic_number;
                    atom.aromatic = q.aromatic;
                }
                _ => return Err(self.unexpected(ch, start)),
            }
        }
    }

    fn number(&mut self, context: &'static str) -> Result<u32, QueryParseError> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(d) = self.peek().filter(u8::is_ascii_digit) {
            self.advance();
            value = value.saturating_mul(10).saturating_add((d - b'0') as u32);
        }
        if self.pos == start {
            return match self.peek() {
                Some(c) => Err(self.unexpected(c, start)),
                None => Err(QueryParseError::UnexpectedEnd(context)),
            };
        }
        Ok(value)
    }
}

fn element_query(
    symbol: &str,
    aromatic: Option<bool>,
    position: usize,
) -> Result<AtomQuery, QueryParseError> {
    let element = Element::from_symbol(symbol).ok_or_else(|| QueryParseError::UnknownElement {
        symbol: symbol.to_string(),
        position,
    })?;
    Ok(AtomQuery {
        atomic_number: Some(element.atomic_number()),
        aromatic,
        map_index: None,
    })
}
