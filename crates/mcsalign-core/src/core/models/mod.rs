//! # Core Models Module
//!
//! This module contains the data structures used to represent small molecules
//! in MCSAlign.
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atom representation with coordinates and element
//! - [`element`] - Chemical elements and the symbol table
//! - [`molecule`] - A complete molecule with atoms, bonds and a bond adjacency cache
//! - [`topology`] - Bonds and bond orders
//!
//! ## Usage
//!
//! ```ignore
//! use mcsalign::core::models::{atom::Atom, element::Element, molecule::Molecule};
//!
//! let mut mol = Molecule::new("acetamide");
//! let c = mol.add_atom(Atom::new("C1", Element::CARBON, Point3::new(0.0, 0.0, 0.0)));
//! let o = mol.add_atom(Atom::new("O1", Element::OXYGEN, Point3::new(1.2, 0.0, 0.0)));
//! mol.add_bond(c, o, BondOrder::Double);
//! ```

pub mod atom;
pub mod element;
pub mod molecule;
pub mod topology;
