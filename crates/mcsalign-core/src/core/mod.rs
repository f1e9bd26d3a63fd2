//! # Core Module
//!
//! Stateless building blocks for ligand alignment: the molecular data model,
//! file I/O, substructure queries and the geometry kernels that everything
//! else is built from.
//!
//! - **Molecular Representation** ([`models`]) - Atoms, bonds, elements and molecules
//! - **File I/O** ([`io`]) - SDF and BGF readers and writers, format detection
//! - **Queries** ([`query`]) - Pattern parsing, VF2 matching and common substructure search
//! - **Geometry** ([`utils::geometry`]) - Dihedrals, rigid transforms and subset rotations

pub mod io;
pub mod models;
pub mod query;
pub mod utils;
