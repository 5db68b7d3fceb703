use std::path::PathBuf;
use thiserror::Error;

/// Conditions that make a whole scan meaningless.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Repository root does not exist: {0}")]
    RootNotFound(PathBuf),
    #[error("Repository root is not a directory: {0}")]
    RootNotADirectory(PathBuf),
}

/// Invalid flag combinations, reported before any scanning begins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Options -w/--whitelist and -b/--blacklist are mutually exclusive.")]
    ConflictingModes,
    #[error(
        "Pattern refinement flags (-i/--include and -e/--exclude) require mode flags (-w/--whitelist or -b/--blacklist)."
    )]
    RefinementWithoutMode,
}
