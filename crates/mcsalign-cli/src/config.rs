use crate::cli::Cli;
use crate::error::{CliError, Result};
use mcsalign::core::query::mcs::McsOptions;
use mcsalign::engine::config::{AlignConfig, AlignConfigBuilder, IncompleteMatchPolicy};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialMotifConfig {
    queries: Option<Vec<String>>,
    /// Degrees.
    torsion_tolerance: Option<f64>,
    incomplete_match: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSearchConfig {
    min_atoms: Option<usize>,
    match_aromaticity: Option<bool>,
    unique: Option<bool>,
    max_matches: Option<usize>,
    max_search_nodes: Option<usize>,
    suppress_hydrogens: Option<bool>,
    complete_rings: Option<bool>,
}

/// Alignment settings as written in a TOML configuration file.
///
/// Every field is optional; missing values fall back to the library defaults
/// and command-line overrides win over the file.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialAlignConfig {
    motif: Option<PartialMotifConfig>,
    search: Option<PartialSearchConfig>,
}

impl PartialAlignConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::ConfigFile {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Self::from_toml(&content).map_err(|e| CliError::ConfigFile {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn merge_with_cli(self, args: &Cli) -> Result<AlignConfig> {
        let motif = self.motif.unwrap_or_default();
        let search = self.search.unwrap_or_default();

        let mut builder = AlignConfigBuilder::new();
        if let Some(queries) = motif.queries {
            builder = builder.motif_queries(queries);
        }
        if let Some(tolerance) = args.tolerance.or(motif.torsion_tolerance) {
            builder = builder.torsion_tolerance_degrees(tolerance);
        }

        let policy = match (args.incomplete_match, motif.incomplete_match) {
            (Some(policy), _) => Some(policy),
            (None, Some(text)) => Some(text.parse::<IncompleteMatchPolicy>()?),
            (None, None) => None,
        };
        if let Some(policy) = policy {
            builder = builder.incomplete_match_policy(policy);
        }

        builder = builder.mcs_options(Self::merge_search(search, args));
        Ok(builder.build()?)
    }

    fn merge_search(file: PartialSearchConfig, args: &Cli) -> McsOptions {
        let defaults = McsOptions::default();
        let suppress_hydrogens = if args.keep_hydrogens {
            false
        } else {
            file.suppress_hydrogens.unwrap_or(defaults.suppress_hydrogens)
        };
        McsOptions {
            min_atoms: file.min_atoms.unwrap_or(defaults.min_atoms),
            match_aromaticity: file.match_aromaticity.unwrap_or(defaults.match_aromaticity),
            unique: file.unique.unwrap_or(defaults.unique),
            max_matches: args
                .max_matches
                .or(file.max_matches)
                .unwrap_or(defaults.max_matches),
            max_search_nodes: file.max_search_nodes.unwrap_or(defaults.max_search_nodes),
            suppress_hydrogens,
            complete_rings: file.complete_rings.unwrap_or(defaults.complete_rings),
        }
    }
}
