use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// An ordered collection of gitignore-style patterns, compiled once and
/// queried many times against repository-relative paths.
#[derive(Debug, Clone)]
pub struct PatternSet {
    matcher: Gitignore,
}

impl PatternSet {
    /// Compiles `patterns`. Invalid patterns are logged and skipped so that a
    /// malformed line degrades to "doesn't match" instead of failing the scan.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut builder = GitignoreBuilder::new(".");
        for raw in patterns {
            let pattern = raw.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            if let Err(err) = builder.add_line(None, pattern) {
                log::warn!("Skipping invalid pattern '{}': {}", pattern, err);
            }
        }

        let matcher = builder.build().unwrap_or_else(|err| {
            log::warn!("Failed to compile pattern set: {}", err);
            Gitignore::empty()
        });

        Self { matcher }
    }

    pub fn empty() -> Self {
        Self {
            matcher: Gitignore::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.matcher.len()
    }

    /// Matches a repository-relative file path. A directory-only pattern
    /// (`build/`) matches every file beneath that directory.
    pub fn matches(&self, relative_path: &str) -> bool {
        if self.matcher.is_empty() {
            return false;
        }
        let normalized = to_posix(relative_path);
        if normalized.is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(Path::new(&normalized), false)
            .is_ignore()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Forward-slash form of a relative path with any `./` or `/` prefix removed.
pub fn to_posix(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    loop {
        if let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        } else if let Some(rest) = normalized.strip_prefix('/') {
            normalized = rest.to_string();
        } else {
            break;
        }
    }
    normalized
}

/// Root-relative POSIX path of `path`, or `None` when it lies outside `root`.
pub fn relative_posix(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    Some(to_posix(&relative.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = PatternSet::compile::<&str>(&[]);
        assert!(set.is_empty());
        assert!(!set.matches("main.py"));
        assert!(!set.matches("src/deep/file.rs"));
    }

    #[test]
    fn test_basename_pattern_matches_at_any_depth() {
        let set = PatternSet::compile(&["*.py"]);
        assert!(set.matches("main.py"));
        assert!(set.matches("src/module.py"));
        assert!(set.matches("a/b/c/d.py"));
        assert!(!set.matches("main.rs"));
    }

    #[test]
    fn test_slash_anchors_pattern_to_root() {
        let set = PatternSet::compile(&["docs/*.md"]);
        assert!(set.matches("docs/index.md"));
        assert!(!set.matches("other/docs/index.md"));
        assert!(!set.matches("docs/nested/index.md"));
    }

    #[test]
    fn test_double_star_crosses_segments() {
        let set = PatternSet::compile(&[".github/**", "**/utils.py"]);
        assert!(set.matches(".github/workflows/test.yml"));
        assert!(set.matches("utils.py"));
        assert!(set.matches("src/pkg/utils.py"));
        assert!(!set.matches("src/pkg/other.py"));
    }

    #[test]
    fn test_directory_pattern_matches_contents() {
        let set = PatternSet::compile(&["src/", "node_modules/"]);
        assert!(set.matches("src/module.py"));
        assert!(set.matches("src/a/b.py"));
        assert!(set.matches("vendor/node_modules/package.json"));
        assert!(!set.matches("src"));
        assert!(!set.matches("main.py"));
    }

    #[test]
    fn test_separator_independent() {
        let set = PatternSet::compile(&["build/*.js"]);
        assert!(set.matches("build/output.js"));
        assert!(set.matches("build\\output.js"));
        assert!(set.matches("./build/output.js"));
    }

    #[test]
    fn test_negation_reincludes() {
        let set = PatternSet::compile(&["*.log", "!keep.log"]);
        assert!(set.matches("debug.log"));
        assert!(!set.matches("keep.log"));
    }

    #[test]
    fn test_blank_and_comment_lines_compile_to_nothing() {
        let set = PatternSet::compile(&["", "   ", "# comment"]);
        assert!(!set.matches("comment"));
        assert!(!set.matches("anything.txt"));
    }

    #[test]
    fn test_relative_posix_outside_root() {
        let root = PathBuf::from("/repo");
        assert_eq!(
            relative_posix(&root.join("src").join("a.rs"), &root).as_deref(),
            Some("src/a.rs")
        );
        assert_eq!(relative_posix(Path::new("/elsewhere/a.rs"), &root), None);
    }
}
