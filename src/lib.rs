//! Selects the files of a repository that belong in an LLM context document.
//!
//! The pipeline is: [`app::config`] resolves the rules from `llm.md` and the
//! command line, [`app::scanner::Scanner`] walks the tree and applies them, and
//! [`app::formatter::OutputGenerator`] renders the result.

pub mod app;

pub use app::config::validate_flags;
pub use app::error::{ScanError, UsageError};
pub use app::gitignore::GitignoreRules;
pub use app::models::{Behavior, BehaviorOverrides, Configuration, Dialect, Mode, SectionKind};
pub use app::patterns::PatternSet;
pub use app::scanner::Scanner;
