use crate::app::models::{BehaviorOverrides, Mode};
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "llmd",
    author,
    version,
    about = "Generate LLM context from a repository",
    long_about = "Scans a repository and writes a single markdown file containing the \
                  selected files, filtered by .gitignore, an optional llm.md \
                  configuration and the flags below."
)]
pub struct Cli {
    /// Repository to scan. Pattern flags take every following value, so give
    /// PATH before them or end the pattern list with `--`
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Output markdown file [default: ./llm-context.md]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Use whitelist mode with these patterns (ignores llm.md)
    #[arg(short = 'w', long, num_args = 1.., action = ArgAction::Append, value_name = "PATTERN")]
    pub whitelist: Vec<String>,

    /// Use blacklist mode with these patterns (ignores llm.md)
    #[arg(short = 'b', long, num_args = 1.., action = ArgAction::Append, value_name = "PATTERN")]
    pub blacklist: Vec<String>,

    /// Force-include files matching these patterns (requires -w or -b)
    #[arg(short = 'i', long, num_args = 1.., action = ArgAction::Append, value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Exclude files matching these patterns (requires -w or -b)
    #[arg(short = 'e', long, num_args = 1.., action = ArgAction::Append, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Include files matched by .gitignore
    #[arg(long, overrides_with = "exclude_gitignore")]
    pub include_gitignore: bool,

    /// Exclude files matched by .gitignore [default]
    #[arg(long, overrides_with = "include_gitignore")]
    pub exclude_gitignore: bool,

    /// Same as --include-gitignore
    #[arg(long)]
    pub no_gitignore: bool,

    /// Include hidden files and directories
    #[arg(long, overrides_with = "exclude_hidden")]
    pub include_hidden: bool,

    /// Exclude hidden files and directories [default]
    #[arg(long, overrides_with = "include_hidden")]
    pub exclude_hidden: bool,

    /// Same as --include-hidden
    #[arg(long)]
    pub with_hidden: bool,

    /// Include binary files
    #[arg(long, overrides_with = "exclude_binary")]
    pub include_binary: bool,

    /// Exclude binary files [default]
    #[arg(long, overrides_with = "include_binary")]
    pub exclude_binary: bool,

    /// Same as --include-binary
    #[arg(long)]
    pub with_binary: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the files that would be included instead of writing output
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// The command-line mode, if a mode flag was given.
    pub fn mode(&self) -> Option<(Mode, Vec<String>)> {
        if !self.whitelist.is_empty() {
            Some((Mode::Whitelist, self.whitelist.clone()))
        } else if !self.blacklist.is_empty() {
            Some((Mode::Blacklist, self.blacklist.clone()))
        } else {
            None
        }
    }

    /// The last pattern value when PATH was left at its default and that value
    /// names an existing directory: most likely a PATH swallowed by a pattern
    /// flag.
    pub fn swallowed_path(&self) -> Option<&str> {
        if self.path != Path::new(".") {
            return None;
        }
        [&self.whitelist, &self.blacklist, &self.include, &self.exclude]
            .into_iter()
            .filter_map(|patterns| patterns.last())
            .map(String::as_str)
            .find(|value| Path::new(value).is_dir())
    }

    pub fn behavior_overrides(&self) -> BehaviorOverrides {
        BehaviorOverrides {
            respect_gitignore: pick(
                self.include_gitignore || self.no_gitignore,
                self.exclude_gitignore,
            )
            .map(|include| !include),
            include_hidden: pick(self.include_hidden || self.with_hidden, self.exclude_hidden),
            include_binary: pick(self.include_binary || self.with_binary, self.exclude_binary),
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Error
        } else if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

// The include form (or its alias) wins when both forms are present.
fn pick(include: bool, exclude: bool) -> Option<bool> {
    if include {
        Some(true)
    } else if exclude {
        Some(false)
    } else {
        None
    }
}
