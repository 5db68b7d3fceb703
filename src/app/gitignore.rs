use crate::app::patterns::{relative_posix, PatternSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Rules loaded from the repository's top-level `.gitignore`.
#[derive(Debug, Clone)]
pub struct GitignoreRules {
    root: PathBuf,
    patterns: Option<PatternSet>,
}

impl GitignoreRules {
    /// Loads `<root>/.gitignore`. A missing or unreadable file, or one with
    /// nothing but comments and blank lines, yields rules that ignore nothing.
    pub fn load(root: &Path) -> Self {
        let gitignore_path = root.join(".gitignore");
        let patterns = match fs::read_to_string(&gitignore_path) {
            Ok(content) => Self::compile(&content),
            Err(err) => {
                if gitignore_path.exists() {
                    log::warn!("Failed to read {}: {}", gitignore_path.display(), err);
                }
                None
            }
        };

        if let Some(set) = &patterns {
            log::debug!("Loaded {} .gitignore patterns", set.len());
        }

        Self {
            root: root.to_path_buf(),
            patterns,
        }
    }

    /// Builds rules from in-memory `.gitignore` content.
    pub fn from_content(root: &Path, content: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            patterns: Self::compile(content),
        }
    }

    fn compile(content: &str) -> Option<PatternSet> {
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(PatternSet::compile(&lines))
        }
    }

    pub fn has_rules(&self) -> bool {
        self.patterns.is_some()
    }

    /// Whether `path` (absolute, under the root) is gitignored. Paths outside
    /// the root are reported as ignored.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(patterns) = &self.patterns else {
            return false;
        };
        match relative_posix(path, &self.root) {
            Some(relative) => patterns.matches(&relative),
            None => true,
        }
    }

    /// Same as [`is_ignored`](Self::is_ignored) for an already root-relative path.
    pub fn is_ignored_relative(&self, relative_path: &str) -> bool {
        self.patterns
            .as_ref()
            .is_some_and(|patterns| patterns.matches(relative_path))
    }
}
