use crate::app::error::ScanError;
use crate::app::filters::{is_hidden, BinaryDetector};
use crate::app::gitignore::GitignoreRules;
use crate::app::models::{Behavior, Configuration, Dialect, Mode, SectionKind};
use crate::app::patterns::{to_posix, PatternSet};
use ignore::{DirEntry, WalkBuilder};
use pathdiff::diff_paths;
use std::path::{Path, PathBuf};

pub struct Scanner {
    root: PathBuf,
    gitignore: GitignoreRules,
    config: Configuration,
    verbose: bool,
    binary: BinaryDetector,
}

/// Rule set compiled once per scan.
enum Plan {
    Legacy {
        only: Option<PatternSet>,
        include: Option<PatternSet>,
        exclude: PatternSet,
    },
    Sequential {
        seed: bool,
        sections: Vec<(SectionKind, PatternSet)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Include(&'static str),
    Exclude(&'static str),
}

struct Candidate<'a> {
    path: &'a Path,
    relative: &'a Path,
    posix: &'a str,
}

impl Scanner {
    pub fn new(
        root: PathBuf,
        gitignore: GitignoreRules,
        config: Configuration,
        verbose: bool,
    ) -> Self {
        Self {
            root,
            gitignore,
            config,
            verbose,
            binary: BinaryDetector::new(),
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Walks the repository and returns the selected files, sorted by their
    /// root-relative path. Per-file errors exclude that file; only a missing
    /// or non-directory root fails the scan.
    pub fn scan(&self) -> Result<Vec<PathBuf>, ScanError> {
        if !self.root.exists() {
            return Err(ScanError::RootNotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ScanError::RootNotADirectory(self.root.clone()));
        }

        let behavior = self.config.behavior();
        let plan = self.compile_plan();
        log::debug!(
            "Scanning {} ({:?} dialect, {:?})",
            self.root.display(),
            self.config.dialect(),
            behavior
        );

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != ".git")
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut selected: Vec<(String, PathBuf)> = Vec::new();
        for result in walker {
            match result {
                Ok(entry) => {
                    if let Some(found) = self.process_entry(&entry, &plan, behavior) {
                        selected.push(found);
                    }
                }
                Err(err) => log::warn!("Error walking entry: {}", err),
            }
        }

        selected.sort_by(|a, b| a.0.cmp(&b.0));
        log::debug!("Selected {} files", selected.len());
        Ok(selected.into_iter().map(|(_, path)| path).collect())
    }

    fn compile_plan(&self) -> Plan {
        match self.config.dialect() {
            Dialect::ModeBased => {
                let seed = self.config.mode() == Some(Mode::Blacklist);
                let sections = self
                    .config
                    .sections()
                    .iter()
                    .cloned()
                    .chain(self.config.refinement_sections())
                    .filter(|section| section.kind != SectionKind::Options)
                    .map(|section| (section.kind, PatternSet::compile(&section.patterns)))
                    .collect();
                Plan::Sequential { seed, sections }
            }
            Dialect::Legacy | Dialect::Absent => {
                let include = self.config.include_patterns();
                Plan::Legacy {
                    only: self
                        .config
                        .has_only_patterns()
                        .then(|| PatternSet::compile(self.config.only_patterns())),
                    include: (!include.is_empty()).then(|| PatternSet::compile(include)),
                    exclude: PatternSet::compile(&self.config.exclude_patterns()),
                }
            }
        }
    }

    // Symlinks are never followed, so link targets outside the root stay out.
    fn process_entry(
        &self,
        entry: &DirEntry,
        plan: &Plan,
        behavior: Behavior,
    ) -> Option<(String, PathBuf)> {
        let path = entry.path();
        if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_file()) {
            if entry.path_is_symlink() {
                log::debug!("Skipping symlink: {}", path.display());
            }
            return None;
        }

        let relative = diff_paths(path, &self.root)?;
        let posix = to_posix(&relative.to_string_lossy());
        let candidate = Candidate {
            path,
            relative: &relative,
            posix: &posix,
        };

        let decision = match plan {
            Plan::Legacy {
                only,
                include,
                exclude,
            } => self.decide_legacy(&candidate, behavior, only.as_ref(), include.as_ref(), exclude),
            Plan::Sequential { seed, sections } => {
                self.decide_sequential(&candidate, behavior, *seed, sections)
            }
        };

        match decision {
            Decision::Include(reason) => {
                self.report(format_args!("+ {} ({})", posix, reason));
                Some((posix, path.to_path_buf()))
            }
            Decision::Exclude(reason) => {
                self.report(format_args!("- {} ({})", posix, reason));
                None
            }
        }
    }

    fn report(&self, message: std::fmt::Arguments<'_>) {
        if self.verbose {
            log::info!("{}", message);
        } else {
            log::trace!("{}", message);
        }
    }

    /// ONLY decides alone when present. Otherwise a file survives unless a
    /// built-in exclusion or EXCLUDE pattern hits it, and INCLUDE rescues it
    /// from any of those.
    fn decide_legacy(
        &self,
        candidate: &Candidate<'_>,
        behavior: Behavior,
        only: Option<&PatternSet>,
        include: Option<&PatternSet>,
        exclude: &PatternSet,
    ) -> Decision {
        if let Some(only) = only {
            return if only.matches(candidate.posix) {
                Decision::Include("ONLY pattern")
            } else {
                Decision::Exclude("no ONLY match")
            };
        }

        let excluded = self
            .builtin_exclusion(candidate, behavior)
            .or_else(|| exclude.matches(candidate.posix).then_some("EXCLUDE pattern"));

        match excluded {
            None => Decision::Include("default"),
            Some(_) if include.is_some_and(|set| set.matches(candidate.posix)) => {
                Decision::Include("rescued by INCLUDE")
            }
            Some(reason) => Decision::Exclude(reason),
        }
    }

    /// Sections apply in order and the last matching one wins. Built-in
    /// exclusions act as an implicit EXCLUDE before every section, so only an
    /// INCLUDE section can lift them.
    fn decide_sequential(
        &self,
        candidate: &Candidate<'_>,
        behavior: Behavior,
        seed: bool,
        sections: &[(SectionKind, PatternSet)],
    ) -> Decision {
        let mut included = seed;
        let mut rescued = false;
        let mut decided_by = None;

        for (kind, set) in sections {
            if !set.matches(candidate.posix) {
                continue;
            }
            decided_by = Some(*kind);
            match kind {
                SectionKind::Whitelist => included = true,
                SectionKind::Blacklist | SectionKind::Exclude => {
                    included = false;
                    rescued = false;
                }
                SectionKind::Include => {
                    included = true;
                    rescued = true;
                }
                SectionKind::Options => {}
            }
        }

        let reason = decided_by.map_or("no matching section", |kind| kind.as_str());
        if !included {
            return Decision::Exclude(reason);
        }
        if rescued {
            return Decision::Include(reason);
        }
        match self.builtin_exclusion(candidate, behavior) {
            Some(builtin) => Decision::Exclude(builtin),
            None => Decision::Include(reason),
        }
    }

    // Cheapest tests first; binary sniffing reads the file.
    fn builtin_exclusion(
        &self,
        candidate: &Candidate<'_>,
        behavior: Behavior,
    ) -> Option<&'static str> {
        if behavior.respect_gitignore && self.gitignore.is_ignored_relative(candidate.posix) {
            return Some("gitignored");
        }
        if !behavior.include_hidden && is_hidden(candidate.relative) {
            return Some("hidden");
        }
        if !behavior.include_binary && self.binary.is_binary(candidate.path) {
            return Some("binary");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::BehaviorOverrides;
    use std::fs;
    use tempfile::tempdir;

    fn write_file(root: &Path, relative: &str, contents: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn relative_names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| to_posix(&f.strip_prefix(root).unwrap().to_string_lossy()))
            .collect()
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("missing");
        let scanner = Scanner::new(
            root.clone(),
            GitignoreRules::load(&root),
            Configuration::builder().build(),
            false,
        );
        assert!(matches!(scanner.scan(), Err(ScanError::RootNotFound(_))));
    }

    #[test]
    fn test_file_root_is_an_error() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "file.txt", b"text");
        let root = dir.path().join("file.txt");
        let scanner = Scanner::new(
            root.clone(),
            GitignoreRules::load(dir.path()),
            Configuration::builder().build(),
            false,
        );
        assert!(matches!(scanner.scan(), Err(ScanError::RootNotADirectory(_))));
    }

    #[test]
    fn test_git_directory_never_traversed() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_file(root, ".git/config", b"[core]");
        write_file(root, "main.py", b"print('main')");

        let config = Configuration::builder()
            .default_mode(Mode::Blacklist)
            .overrides(BehaviorOverrides {
                include_hidden: Some(true),
                ..Default::default()
            })
            .build();
        let scanner = Scanner::new(root.to_path_buf(), GitignoreRules::load(root), config, false);
        let files = scanner.scan().unwrap();
        assert_eq!(relative_names(root, &files), vec!["main.py"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let outside = tempdir().unwrap();
        write_file(outside.path(), "secret.txt", b"outside content");

        let dir = tempdir().unwrap();
        let root = dir.path();
        write_file(root, "main.py", b"print('main')");
        write_file(root, "inner/real.txt", b"inside");
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), root.join("link.txt"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("linked_dir")).unwrap();

        let scanner = Scanner::new(
            root.to_path_buf(),
            GitignoreRules::load(root),
            Configuration::builder().default_mode(Mode::Blacklist).build(),
            false,
        );
        let files = scanner.scan().unwrap();
        assert_eq!(relative_names(root, &files), vec!["inner/real.txt", "main.py"]);
    }

    #[test]
    fn test_section_kind_decides_reason() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_file(root, "a.py", b"pass");
        let config = Configuration::builder()
            .cli_mode(Mode::Whitelist, vec!["*.py".into()])
            .cli_exclude(vec!["a.py".into()])
            .build();
        let scanner = Scanner::new(root.to_path_buf(), GitignoreRules::load(root), config, false);
        let plan = scanner.compile_plan();
        let Plan::Sequential { seed, sections } = &plan else {
            panic!("mode-based rules compile to a sequential plan");
        };
        let path = root.join("a.py");
        let candidate = Candidate {
            path: &path,
            relative: Path::new("a.py"),
            posix: "a.py",
        };
        assert_eq!(
            scanner.decide_sequential(&candidate, Behavior::default(), *seed, sections),
            Decision::Exclude("EXCLUDE")
        );
    }

    #[test]
    fn test_results_sorted_by_relative_path() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for name in ["b.txt", "a/z.txt", "a.txt", "c/d/e.txt"] {
            write_file(root, name, b"text");
        }
        let scanner = Scanner::new(
            root.to_path_buf(),
            GitignoreRules::load(root),
            Configuration::builder().default_mode(Mode::Blacklist).build(),
            true,
        );
        let files = scanner.scan().unwrap();
        assert_eq!(
            relative_names(root, &files),
            vec!["a.txt", "a/z.txt", "b.txt", "c/d/e.txt"]
        );
        assert!(files.iter().all(|f| f.starts_with(root)));
    }
}
