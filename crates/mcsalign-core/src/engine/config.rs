use crate::core::query::mcs::McsOptions;
use crate::core::query::pattern::{PatternQuery, QueryParseError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Amide-adjacent thioether motif, written from the carbonyl oxygen outwards.
pub const FORWARD_MOTIF_QUERY: &str = "[#8:1]=[#6:2]-[#7:3]-[#6:4]-[#6:5]-[#16:6]";
/// The same motif written from the sulfur inwards.
pub const REVERSE_MOTIF_QUERY: &str = "[#16:6]-[#6:5]-[#6:4]-[#7:3]-[#6:2]=[#8:1]";
pub const DEFAULT_TORSION_TOLERANCE_DEGREES: f64 = 1.0;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
    #[error("Invalid motif query '{query}': {source}")]
    InvalidQuery {
        query: String,
        #[source]
        source: QueryParseError,
    },
}

/// What to do with a correspondence that does not cover the torsion atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IncompleteMatchPolicy {
    /// Drop the correspondence.
    #[default]
    Skip,
    /// Superpose without correcting the torsion.
    SuperposeUncorrected,
}

impl FromStr for IncompleteMatchPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "superpose-uncorrected" => Ok(Self::SuperposeUncorrected),
            other => Err(ConfigError::InvalidParameter {
                parameter: "incomplete_match_policy",
                reason: format!("unknown policy '{other}'"),
            }),
        }
    }
}

impl fmt::Display for IncompleteMatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::SuperposeUncorrected => write!(f, "superpose-uncorrected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignConfig {
    /// Motif queries in priority order; never empty.
    pub motif_queries: Vec<PatternQuery>,
    /// Torsion differences at or below this many radians are left alone.
    pub torsion_tolerance: f64,
    pub incomplete_match_policy: IncompleteMatchPolicy,
    pub mcs: McsOptions,
}

#[derive(Default)]
pub struct AlignConfigBuilder {
    motif_queries: Option<Vec<String>>,
    torsion_tolerance_degrees: Option<f64>,
    incomplete_match_policy: Option<IncompleteMatchPolicy>,
    mcs: Option<McsOptions>,
}

impl AlignConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn motif_queries<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.motif_queries = Some(queries.into_iter().map(Into::into).collect());
        self
    }
    pub fn torsion_tolerance_degrees(mut self, degrees: f64) -> Self {
        self.torsion_tolerance_degrees = Some(degrees);
        self
    }
    pub fn incomplete_match_policy(mut self, policy: IncompleteMatchPolicy) -> Self {
        self.incomplete_match_policy = Some(policy);
        self
    }
    pub fn mcs_options(mut self, options: McsOptions) -> Self {
        self.mcs = Some(options);
        self
    }

    pub fn build(self) -> Result<AlignConfig, ConfigError> {
        let sources = self.motif_queries.unwrap_or_else(|| {
            vec![FORWARD_MOTIF_QUERY.to_string(), REVERSE_MOTIF_QUERY.to_string()]
        });
        if sources.is_empty() {
            return Err(ConfigError::InvalidParameter {
                parameter: "motif_queries",
                reason: "at least one query is required".into(),
            });
        }
        let motif_queries = sources
            .into_iter()
            .map(|query| {
                PatternQuery::parse(&query)
                    .map_err(|source| ConfigError::InvalidQuery { query, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tolerance = self
            .torsion_tolerance_degrees
            .unwrap_or(DEFAULT_TORSION_TOLERANCE_DEGREES);
        if !tolerance.is_finite() || !(0.0..=180.0).contains(&tolerance) {
            return Err(ConfigError::InvalidParameter {
                parameter: "torsion_tolerance",
                reason: format!("{tolerance} is not between 0 and 180 degrees"),
            });
        }

        let mcs = self.mcs.unwrap_or_default();
        if mcs.min_atoms < 3 {
            return Err(ConfigError::InvalidParameter {
                parameter: "min_atoms",
                reason: "a superposition needs at least 3 atoms".into(),
            });
        }
        if mcs.max_matches == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "max_matches",
                reason: "must be at least 1".into(),
            });
        }

        Ok(AlignConfig {
            motif_queries,
            torsion_tolerance: tolerance.to_radians(),
            incomplete_match_policy: self.incomplete_match_policy.unwrap_or_default(),
            mcs,
        })
    }
}
