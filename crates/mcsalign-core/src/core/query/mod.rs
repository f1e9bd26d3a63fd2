//! Substructure queries and graph matching.
//!
//! - [`pattern`] parses the SMARTS subset used to describe motifs.
//! - [`matcher`] embeds a parsed pattern in a molecule (VF2 backtracking).
//! - [`mcs`] enumerates maximum common substructures between two molecules.
//! - [`mapping`] holds the atom correspondences all of them produce.

pub mod mapping;
pub mod matcher;
pub mod mcs;
pub mod pattern;
