use std::path::PathBuf;
use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::format::IoError;
use crate::core::query::pattern::QueryParseError;
use crate::core::utils::geometry::GeometryError;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("Unable to open '{}': {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to read molecules from '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("'{title}' doesn't have 3D coordinates")]
    Missing3DCoordinates { title: String },

    #[error("No torsion motif found in '{title}' ({queries} queries tried)")]
    MotifNotFound { title: String, queries: usize },

    #[error("Match does not cover mapped torsion positions {missing:?}")]
    IncompleteMatch { missing: Vec<u32> },

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(#[from] GeometryError),

    #[error("Superposition input is degenerate: {0}")]
    DegenerateInput(&'static str),

    #[error("RMS overlay failure: {0}")]
    OverlayFailure(String),

    #[error("Bond between atoms {c} and {n} is part of a ring and cannot be rotated")]
    UnsupportedRingBond { c: usize, n: usize },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid motif query: {0}")]
    Query(#[from] QueryParseError),
}

impl AlignError {
    /// Classifies an I/O failure on `path` as an open failure or a parse failure.
    pub fn from_io(path: impl Into<PathBuf>, error: IoError) -> Self {
        let path = path.into();
        match error {
            IoError::Open { source, .. } => Self::FileOpen { path, source },
            other => Self::Parse {
                path,
                source: other,
            },
        }
    }

    /// Returns `true` if the error only invalidates a single candidate or
    /// correspondence, so a batch can log it and move on.
    ///
    /// Errors raised while preparing the reference are fatal regardless.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Missing3DCoordinates { .. }
                | Self::IncompleteMatch { .. }
                | Self::DegenerateGeometry(_)
                | Self::DegenerateInput(_)
                | Self::OverlayFailure(_)
                | Self::UnsupportedRingBond { .. }
        )
    }
}
