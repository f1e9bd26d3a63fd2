//! Provides input/output functionality for small-molecule file formats.
//!
//! Every codec implements [`traits::MolecularFile`] and yields all records of a
//! file in order. [`format`] picks a codec from the file extension so callers can
//! work with paths alone.

pub mod bgf;
pub mod format;
pub mod sdf;
pub mod traits;
