use crate::app::error::UsageError;
use crate::app::models::{
    Behavior, BehaviorOverrides, CliPatterns, Configuration, Dialect, LegacyPatterns, Mode,
    ModeConfig, OptionValue, Options, Rules, Section, SectionKind, OUTPUT,
};
use crate::app::patterns::{relative_posix, PatternSet};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Conventional name of the repository-local configuration file.
pub const CONFIG_FILENAME: &str = "llm.md";

/// Replaces the user configuration directory when set.
pub const CONFIG_DIR_ENV: &str = "LLMD_CONFIG_DIR";

fn is_content(line: &str) -> bool {
    !line.is_empty() && !line.starts_with('#')
}

/// Parses `llm.md` content. The first content line decides the dialect: a
/// `WHITELIST:`/`BLACKLIST:` declaration selects the mode-based format,
/// anything else falls back to the legacy section format.
pub fn parse_config(content: &str) -> Rules {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();

    let first = lines
        .iter()
        .enumerate()
        .find(|(_, line)| is_content(line));

    if let Some((idx, line)) = first {
        if let Some(mode) = Mode::from_declaration(line) {
            log::debug!("Detected mode-based configuration ({})", mode);
            return Rules::ModeBased(parse_mode_sections(mode, &lines[idx + 1..]));
        }
    }

    log::debug!("Using legacy ONLY/INCLUDE/EXCLUDE configuration format");
    Rules::Legacy(parse_legacy(&lines))
}

fn parse_mode_sections(mode: Mode, lines: &[&str]) -> ModeConfig {
    let mode_kind = SectionKind::from(mode);
    let mut sections = Vec::new();
    let mut options = Options::new();
    let mut current = Section::new(mode_kind);

    for line in lines.iter().copied().filter(|l| is_content(l)) {
        if let Some(kind) = SectionKind::from_header(line) {
            push_section(&mut sections, current, mode_kind);
            current = Section::new(kind);
            continue;
        }

        if current.kind == SectionKind::Options {
            parse_option_line(line, &mut options);
        } else {
            current.patterns.push(line.to_string());
        }
    }
    push_section(&mut sections, current, mode_kind);

    let implicit_patterns = sections
        .first()
        .filter(|s| s.kind == mode_kind)
        .map(|s| s.patterns.clone())
        .unwrap_or_default();

    ModeConfig {
        mode,
        sections,
        implicit_patterns,
        options,
    }
}

// Empty INCLUDE/EXCLUDE sections carry no rules and are dropped; the mode
// section and OPTIONS sections are always kept.
fn push_section(sections: &mut Vec<Section>, section: Section, mode_kind: SectionKind) {
    if !section.patterns.is_empty()
        || section.kind == mode_kind
        || section.kind == SectionKind::Options
    {
        sections.push(section);
    }
}

fn parse_option_line(line: &str, options: &mut Options) {
    let Some((key, value)) = line.split_once(':') else {
        log::debug!("Ignoring OPTIONS line without a colon: {}", line);
        return;
    };
    let key = key.trim();
    if key.is_empty() {
        log::debug!("Ignoring OPTIONS line with an empty key: {}", line);
        return;
    }
    options.insert(key.to_string(), OptionValue::coerce(value));
}

#[derive(Clone, Copy)]
enum LegacyTarget {
    Only,
    Include,
    Exclude,
}

fn parse_legacy(lines: &[&str]) -> LegacyPatterns {
    let mut patterns = LegacyPatterns::default();
    let mut target = None;

    for line in lines.iter().copied().filter(|l| is_content(l)) {
        match line.to_uppercase().as_str() {
            "ONLY:" => target = Some(LegacyTarget::Only),
            "INCLUDE:" => target = Some(LegacyTarget::Include),
            "EXCLUDE:" | "NOT INCLUDE:" => target = Some(LegacyTarget::Exclude),
            _ => match target {
                Some(LegacyTarget::Only) => patterns.only.push(line.to_string()),
                Some(LegacyTarget::Include) => patterns.include.push(line.to_string()),
                Some(LegacyTarget::Exclude) => patterns.exclude.push(line.to_string()),
                None => log::trace!("Discarding text before first section: {}", line),
            },
        }
    }

    patterns
}

/// Collects the inputs of one invocation and resolves them into a
/// [`Configuration`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    file: Option<PathBuf>,
    cli: CliPatterns,
    cli_mode: Option<(Mode, Vec<String>)>,
    overrides: BehaviorOverrides,
    user_defaults: BehaviorOverrides,
    default_mode: Option<Mode>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the `llm.md` file; a nonexistent path counts as no file.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn cli_include(mut self, patterns: Vec<String>) -> Self {
        self.cli.include = patterns;
        self
    }

    pub fn cli_exclude(mut self, patterns: Vec<String>) -> Self {
        self.cli.exclude = patterns;
        self
    }

    pub fn cli_only(mut self, patterns: Vec<String>) -> Self {
        self.cli.only = patterns;
        self
    }

    /// A command-line mode. When set the config file is never read.
    pub fn cli_mode(mut self, mode: Mode, patterns: Vec<String>) -> Self {
        self.cli_mode = Some((mode, patterns));
        self
    }

    pub fn overrides(mut self, overrides: BehaviorOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn user_defaults(mut self, defaults: BehaviorOverrides) -> Self {
        self.user_defaults = defaults;
        self
    }

    /// Mode synthesized when there is neither a config file nor a CLI mode.
    pub fn default_mode(mut self, mode: Mode) -> Self {
        self.default_mode = Some(mode);
        self
    }

    pub fn build(self) -> Configuration {
        let rules = match self.cli_mode {
            Some((mode, patterns)) => {
                log::debug!("Using CLI {} mode; repository configuration ignored", mode);
                let mut config = ModeConfig::with_patterns(mode, patterns);
                config.options = self.overrides.to_options();
                Rules::ModeBased(config)
            }
            None => match self.file.as_deref().and_then(read_config_file) {
                Some(content) => parse_config(&content),
                None => match self.default_mode {
                    Some(mode) => {
                        log::debug!("No configuration file; defaulting to {} mode", mode);
                        Rules::ModeBased(ModeConfig::bare(mode))
                    }
                    None => Rules::Absent,
                },
            },
        };

        Configuration {
            rules,
            cli: self.cli,
            overrides: self.overrides,
            user_defaults: self.user_defaults,
        }
    }
}

fn read_config_file(path: &Path) -> Option<String> {
    if !path.exists() {
        log::debug!("Configuration file not found: {}", path.display());
        return None;
    }
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) => {
            log::warn!("Failed to read {}: {}", path.display(), err);
            None
        }
    }
}

impl Configuration {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Parses `path` with no CLI input.
    pub fn parse(path: impl Into<PathBuf>) -> Self {
        ConfigBuilder::new().file(path).build()
    }

    pub fn dialect(&self) -> Dialect {
        match self.rules {
            Rules::Absent => Dialect::Absent,
            Rules::Legacy(_) => Dialect::Legacy,
            Rules::ModeBased(_) => Dialect::ModeBased,
        }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn mode(&self) -> Option<Mode> {
        match &self.rules {
            Rules::ModeBased(config) => Some(config.mode),
            _ => None,
        }
    }

    /// Sections in file order; empty unless mode-based.
    pub fn sections(&self) -> &[Section] {
        match &self.rules {
            Rules::ModeBased(config) => config.sections.as_slice(),
            _ => &[],
        }
    }

    pub fn options(&self) -> Options {
        match &self.rules {
            Rules::ModeBased(config) => config.options.clone(),
            _ => Options::new(),
        }
    }

    pub fn implicit_patterns(&self) -> &[String] {
        match &self.rules {
            Rules::ModeBased(config) => config.implicit_patterns.as_slice(),
            _ => &[],
        }
    }

    pub fn cli_patterns(&self) -> &CliPatterns {
        &self.cli
    }

    /// Output path requested by the `output` option, if it is a string.
    pub fn output_option(&self) -> Option<&str> {
        match &self.rules {
            Rules::ModeBased(config) => config.options.get(OUTPUT).and_then(OptionValue::as_str),
            _ => None,
        }
    }

    /// Built-in exclusion switches: CLI overrides, then `OPTIONS:`, then user
    /// defaults, then hard-coded defaults.
    pub fn behavior(&self) -> Behavior {
        let file = match &self.rules {
            Rules::ModeBased(config) => BehaviorOverrides::from_options(&config.options),
            _ => BehaviorOverrides::default(),
        };
        let base = self.user_defaults.apply(Behavior::default());
        self.overrides.apply(file.apply(base))
    }

    /// CLI refinements applied after the configured sections: excludes
    /// first, then includes.
    pub fn refinement_sections(&self) -> Vec<Section> {
        let mut sections = Vec::new();
        if !self.cli.exclude.is_empty() {
            sections.push(Section::with_patterns(
                SectionKind::Exclude,
                self.cli.exclude.clone(),
            ));
        }
        if !self.cli.include.is_empty() {
            sections.push(Section::with_patterns(
                SectionKind::Include,
                self.cli.include.clone(),
            ));
        }
        sections
    }

    fn legacy(&self) -> Option<&LegacyPatterns> {
        match &self.rules {
            Rules::Legacy(patterns) => Some(patterns),
            _ => None,
        }
    }

    /// CLI ONLY patterns when given, otherwise the file's.
    pub fn only_patterns(&self) -> &[String] {
        if !self.cli.only.is_empty() {
            return self.cli.only.as_slice();
        }
        self.legacy().map(|file| file.only.as_slice()).unwrap_or_default()
    }

    /// CLI INCLUDE patterns when given, otherwise the file's.
    pub fn include_patterns(&self) -> &[String] {
        if !self.cli.include.is_empty() {
            return self.cli.include.as_slice();
        }
        self.legacy().map(|file| file.include.as_slice()).unwrap_or_default()
    }

    /// CLI excludes followed by file excludes; the two are additive.
    pub fn exclude_patterns(&self) -> Vec<String> {
        let mut patterns = self.cli.exclude.clone();
        if let Some(file) = self.legacy() {
            patterns.extend(file.exclude.iter().cloned());
        }
        patterns
    }

    pub fn has_only_patterns(&self) -> bool {
        !self.only_patterns().is_empty()
    }

    pub fn has_include_patterns(&self) -> bool {
        !self.include_patterns().is_empty()
    }

    /// True when no include patterns exist, otherwise whether `path` matches
    /// one. Paths outside `root` never match.
    pub fn should_include(&self, path: &Path, root: &Path) -> bool {
        let patterns = self.include_patterns();
        if patterns.is_empty() {
            return true;
        }
        match relative_posix(path, root) {
            Some(relative) => PatternSet::compile(patterns).matches(&relative),
            None => false,
        }
    }

    /// Paths outside `root` are always excluded.
    pub fn should_exclude(&self, path: &Path, root: &Path) -> bool {
        let patterns = self.exclude_patterns();
        if patterns.is_empty() {
            return false;
        }
        match relative_posix(path, root) {
            Some(relative) => PatternSet::compile(&patterns).matches(&relative),
            None => true,
        }
    }

    pub fn matches_only(&self, path: &Path, root: &Path) -> bool {
        let patterns = self.only_patterns();
        if patterns.is_empty() {
            return false;
        }
        match relative_posix(path, root) {
            Some(relative) => PatternSet::compile(patterns).matches(&relative),
            None => false,
        }
    }
}

/// Checks flag combinations before any configuration is built: the two mode
/// flags exclude each other, and refinements need a mode.
pub fn validate_flags(
    whitelist: &[String],
    blacklist: &[String],
    include: &[String],
    exclude: &[String],
) -> std::result::Result<(), UsageError> {
    let has_whitelist = !whitelist.is_empty();
    let has_blacklist = !blacklist.is_empty();

    if has_whitelist && has_blacklist {
        return Err(UsageError::ConflictingModes);
    }
    if (!include.is_empty() || !exclude.is_empty()) && !has_whitelist && !has_blacklist {
        return Err(UsageError::RefinementWithoutMode);
    }
    Ok(())
}

/// Per-user defaults from `<config dir>/llmd/config.toml`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UserDefaults {
    pub output: Option<PathBuf>,
    pub respect_gitignore: Option<bool>,
    pub include_hidden: Option<bool>,
    pub include_binary: Option<bool>,
}

impl UserDefaults {
    pub fn behavior(&self) -> BehaviorOverrides {
        BehaviorOverrides {
            respect_gitignore: self.respect_gitignore,
            include_hidden: self.include_hidden,
            include_binary: self.include_binary,
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    let dir = match env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir()?.join("llmd"),
    };
    Some(dir.join("config.toml"))
}

pub fn load_user_defaults() -> Result<UserDefaults> {
    match user_config_path() {
        Some(path) => load_user_defaults_from(&path),
        None => Ok(UserDefaults::default()),
    }
}

pub fn load_user_defaults_from(path: &Path) -> Result<UserDefaults> {
    if !path.exists() {
        return Ok(UserDefaults::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read user config at {}", path.display()))?;

    let parsed: UserDefaults = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(parsed)
}
