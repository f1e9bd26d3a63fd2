//! # Workflows Module
//!
//! High-level entry points that tie the [`crate::core`] and [`crate::engine`]
//! layers together.
//!
//! - **Alignment Workflow** ([`align`]) - Reference preparation, per-candidate
//!   torsion correction and superposition, batch processing in input order.

pub mod align;
