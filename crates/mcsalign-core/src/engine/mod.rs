//! # Engine Module
//!
//! The alignment steps that sit between the stateless [`crate::core`] layer and
//! the [`crate::workflows`] entry points.
//!
//! - **Configuration** ([`config`]) - Motif queries, torsion tolerance and search options
//! - **Motif Search** ([`motif`]) - Priority-ordered query matching on the reference
//! - **Torsion Handling** ([`torsion`], [`correction`]) - Locating, measuring and rotating
//!   the amide torsion
//! - **Superposition** ([`superposition`]) - Kabsch fitting with reflection correction
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Alignment errors and their recoverability

pub mod config;
pub mod correction;
pub mod error;
pub mod motif;
pub mod progress;
pub mod superposition;
pub mod torsion;
