use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static SYMBOL_TO_ATOMIC_NUMBER: Map<&'static str, u8> = phf_map! {
    "H" => 1, "He" => 2, "Li" => 3, "Be" => 4, "B" => 5, "C" => 6, "N" => 7, "O" => 8,
    "F" => 9, "Ne" => 10, "Na" => 11, "Mg" => 12, "Al" => 13, "Si" => 14, "P" => 15,
    "S" => 16, "Cl" => 17, "Ar" => 18, "K" => 19, "Ca" => 20, "Sc" => 21, "Ti" => 22,
    "V" => 23, "Cr" => 24, "Mn" => 25, "Fe" => 26, "Co" => 27, "Ni" => 28, "Cu" => 29,
    "Zn" => 30, "Ga" => 31, "Ge" => 32, "As" => 33, "Se" => 34, "Br" => 35, "Kr" => 36,
    "Rb" => 37, "Sr" => 38, "Y" => 39, "Zr" => 40, "Nb" => 41, "Mo" => 42, "Tc" => 43,
    "Ru" => 44, "Rh" => 45, "Pd" => 46, "Ag" => 47, "Cd" => 48, "In" => 49, "Sn" => 50,
    "Sb" => 51, "Te" => 52, "I" => 53, "Xe" => 54,
};

const SYMBOLS: [&str; 55] = [
    "*", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe",
];

/// A chemical element identified by its atomic number.
///
/// Atomic number zero is reserved for dummy or unknown atoms (`*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Element(u8);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element symbol '{0}'")]
pub struct ParseElementError(pub String);

impl Element {
    pub const UNKNOWN: Element = Element(0);
    pub const HYDROGEN: Element = Element(1);
    pub const CARBON: Element = Element(6);
    pub const NITROGEN: Element = Element(7);
    pub const OXYGEN: Element = Element(8);
    pub const SULFUR: Element = Element(16);

    pub fn from_atomic_number(atomic_number: u8) -> Option<Self> {
        ((atomic_number as usize) < SYMBOLS.len()).then_some(Self(atomic_number))
    }

    pub fn atomic_number(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        SYMBOLS[self.0 as usize]
    }

    pub fn is_hydrogen(self) -> bool {
        self.0 == 1
    }

    /// Looks up a symbol, accepting any capitalization (`CL`, `cl`, `Cl`).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim();
        if let Some(&z) = SYMBOL_TO_ATOMIC_NUMBER.get(symbol) {
            return Some(Self(z));
        }
        let mut chars = symbol.chars();
        let first = chars.next()?;
        let normalized: String = first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect();
        SYMBOL_TO_ATOMIC_NUMBER.get(normalized.as_str()).map(|&z| Self(z))
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s).ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_symbol_resolves_common_elements() {
        assert_eq!(Element::from_symbol("C"), Some(Element::CARBON));
        assert_eq!(Element::from_symbol("N"), Some(Element::NITROGEN));
        assert_eq!(Element::from_symbol("S"), Some(Element::SULFUR));
        assert_eq!(Element::from_symbol("Cl").unwrap().atomic_number(), 17);
    }

    #[test]
    fn from_symbol_is_case_insensitive() {
        assert_eq!(Element::from_symbol("CL").unwrap().atomic_number(), 17);
        assert_eq!(Element::from_symbol("br").unwrap().atomic_number(), 35);
        assert_eq!(Element::from_symbol(" o ").unwrap(), Element::OXYGEN);
    }

    #[test]
    fn from_symbol_rejects_unknown_symbols() {
        assert!(Element::from_symbol("Xx").is_none());
        assert!(Element::from_symbol("").is_none());
        assert!("Qq".parse::<Element>().is_err());
    }

    #[test]
    fn symbol_and_atomic_number_are_consistent() {
        for z in 1..=54u8 {
            let element = Element::from_atomic_number(z).unwrap();
            assert_eq!(Element::from_symbol(element.symbol()), Some(element));
        }
        assert!(Element::from_atomic_number(200).is_none());
    }

    #[test]
    fn display_prints_symbol() {
        assert_eq!(Element::OXYGEN.to_string(), "O");
        assert_eq!(Element::UNKNOWN.to_string(), "*");
    }
}
