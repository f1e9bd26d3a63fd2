//! # MCSAlign Core Library
//!
//! Aligns candidate ligands onto a reference structure through their maximum
//! common substructure, after rotating a designated amide torsion (O=C–N–R) of
//! each candidate to the value it has in the reference.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers throughout:
//!
//! - **[`core`]: The Foundation.** Stateless molecule models, SDF/BGF I/O, the
//!   pattern query language with its matchers, and the geometry kernels.
//!
//! - **[`engine`]: The Alignment Steps.** Motif search, torsion location and
//!   correction, Kabsch superposition, configuration and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Runs a reference against a batch of
//!   candidates and returns every placement in input order.

pub mod core;
pub mod engine;
pub mod workflows;
