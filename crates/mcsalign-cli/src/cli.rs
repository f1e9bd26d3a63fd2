use clap::Parser;
use mcsalign::engine::config::IncompleteMatchPolicy;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "MCSAlign - Align candidate ligands onto a reference through their maximum common substructure, after matching the amide torsion of the reference.",
    help_template = HELP_TEMPLATE,
)]
pub struct Cli {
    /// Reference structure with 3D coordinates (SDF or BGF). Only the first record is used.
    #[arg(value_name = "REFERENCE")]
    pub reference: PathBuf,

    /// Candidate structures with 3D coordinates (SDF or BGF).
    #[arg(value_name = "CANDIDATES")]
    pub candidates: PathBuf,

    /// Output file receiving every aligned placement. The format follows the extension.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the torsion tolerance in degrees.
    #[arg(long, value_name = "DEGREES")]
    pub tolerance: Option<f64>,

    /// What to do with a correspondence that misses the torsion atoms.
    #[arg(long = "incomplete-match", value_name = "POLICY")]
    pub incomplete_match: Option<IncompleteMatchPolicy>,

    /// Override the maximum number of correspondences tried per candidate.
    #[arg(long, value_name = "INT")]
    pub max_matches: Option<usize>,

    /// Keep reference hydrogens in the common substructure search.
    #[arg(long)]
    pub keep_hydrogens: bool,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, value_name = "NUM")]
    pub threads: Option<usize>,
}
