use std::path::PathBuf;

pub const DEFAULT_PACKAGE: &str = "snowflake-connector-python-nightly";
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Parameters of one pruning run.
#[derive(Clone, Debug)]
pub struct PruneControl {
    pub package: String,
    /// How many of the oldest releases to act on.
    pub number: usize,
    pub dry_run: bool,
    /// `.env` style file applied to the environment before credentials are read.
    pub env_file: PathBuf,
}
