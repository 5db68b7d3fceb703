use std::collections::HashMap;
use std::fmt;

/// Baseline of the mode-based dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Start empty; files must be added.
    Whitelist,
    /// Start with everything; files are removed.
    Blacklist,
}

impl Mode {
    /// Parses a mode declaration line such as `WHITELIST:` (case-insensitive).
    pub fn from_declaration(line: &str) -> Option<Self> {
        match line.trim().to_uppercase().as_str() {
            "WHITELIST:" => Some(Mode::Whitelist),
            "BLACKLIST:" => Some(Mode::Blacklist),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Whitelist => "WHITELIST",
            Mode::Blacklist => "BLACKLIST",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Whitelist,
    Blacklist,
    Include,
    Exclude,
    Options,
}

impl SectionKind {
    /// Parses one of the headers that may follow a mode declaration.
    pub fn from_header(line: &str) -> Option<Self> {
        match line.trim().to_uppercase().as_str() {
            "EXCLUDE:" => Some(SectionKind::Exclude),
            "INCLUDE:" => Some(SectionKind::Include),
            "OPTIONS:" => Some(SectionKind::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Whitelist => "WHITELIST",
            SectionKind::Blacklist => "BLACKLIST",
            SectionKind::Include => "INCLUDE",
            SectionKind::Exclude => "EXCLUDE",
            SectionKind::Options => "OPTIONS",
        }
    }
}

impl From<Mode> for SectionKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Whitelist => SectionKind::Whitelist,
            Mode::Blacklist => SectionKind::Blacklist,
        }
    }
}

/// One header occurrence of a mode-based config, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub patterns: Vec<String>,
}

impl Section {
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            patterns: Vec::new(),
        }
    }

    pub fn with_patterns(kind: SectionKind, patterns: Vec<String>) -> Self {
        Self { kind, patterns }
    }
}

/// A typed `OPTIONS:` value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl OptionValue {
    /// Coerces a raw value: boolean, then integer, then float, else the
    /// trimmed string.
    pub fn coerce(raw: &str) -> Self {
        let value = raw.trim();
        if value.eq_ignore_ascii_case("true") {
            return OptionValue::Bool(true);
        }
        if value.eq_ignore_ascii_case("false") {
            return OptionValue::Bool(false);
        }
        if let Ok(int) = value.parse::<i64>() {
            return OptionValue::Int(int);
        }
        if let Ok(float) = value.parse::<f64>() {
            return OptionValue::Float(float);
        }
        OptionValue::Str(value.to_string())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Float(x) => write!(f, "{}", x),
            OptionValue::Str(s) => f.write_str(s),
        }
    }
}

pub type Options = HashMap<String, OptionValue>;

pub const RESPECT_GITIGNORE: &str = "respect_gitignore";
pub const INCLUDE_HIDDEN: &str = "include_hidden";
pub const INCLUDE_BINARY: &str = "include_binary";
pub const OUTPUT: &str = "output";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Legacy,
    ModeBased,
    Absent,
}

/// Pattern lists of the legacy `ONLY:`/`INCLUDE:`/`EXCLUDE:` format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyPatterns {
    pub only: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// A parsed mode-based config.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeConfig {
    pub mode: Mode,
    pub sections: Vec<Section>,
    /// Patterns directly under the mode declaration.
    pub implicit_patterns: Vec<String>,
    pub options: Options,
}

impl ModeConfig {
    /// A config with a single, empty section of the mode's type.
    pub fn bare(mode: Mode) -> Self {
        Self::with_patterns(mode, Vec::new())
    }

    pub fn with_patterns(mode: Mode, patterns: Vec<String>) -> Self {
        Self {
            mode,
            sections: vec![Section::with_patterns(mode.into(), patterns.clone())],
            implicit_patterns: patterns,
            options: Options::new(),
        }
    }
}

/// The rule set selected from the config file, or its absence.
#[derive(Debug, Clone, PartialEq)]
pub enum Rules {
    Absent,
    Legacy(LegacyPatterns),
    ModeBased(ModeConfig),
}

/// Patterns supplied on the command line, layered over any dialect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliPatterns {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub only: Vec<String>,
}

/// Effective built-in exclusion switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Behavior {
    pub respect_gitignore: bool,
    pub include_hidden: bool,
    pub include_binary: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            include_hidden: false,
            include_binary: false,
        }
    }
}

/// Partial [`Behavior`]; unset fields defer to a lower layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BehaviorOverrides {
    pub respect_gitignore: Option<bool>,
    pub include_hidden: Option<bool>,
    pub include_binary: Option<bool>,
}

impl BehaviorOverrides {
    pub fn is_empty(&self) -> bool {
        self.respect_gitignore.is_none()
            && self.include_hidden.is_none()
            && self.include_binary.is_none()
    }

    pub fn apply(&self, base: Behavior) -> Behavior {
        Behavior {
            respect_gitignore: self.respect_gitignore.unwrap_or(base.respect_gitignore),
            include_hidden: self.include_hidden.unwrap_or(base.include_hidden),
            include_binary: self.include_binary.unwrap_or(base.include_binary),
        }
    }

    /// Reads the behavior keys of an `OPTIONS:` map. Non-boolean values are
    /// ignored.
    pub fn from_options(options: &Options) -> Self {
        let read = |key: &str| match options.get(key) {
            Some(value) => {
                let flag = value.as_bool();
                if flag.is_none() {
                    log::warn!(
                        "Ignoring option '{}': expected true or false, got '{}'",
                        key,
                        value
                    );
                }
                flag
            }
            None => None,
        };

        Self {
            respect_gitignore: read(RESPECT_GITIGNORE),
            include_hidden: read(INCLUDE_HIDDEN),
            include_binary: read(INCLUDE_BINARY),
        }
    }

    pub fn to_options(&self) -> Options {
        let mut options = Options::new();
        let fields = [
            (RESPECT_GITIGNORE, self.respect_gitignore),
            (INCLUDE_HIDDEN, self.include_hidden),
            (INCLUDE_BINARY, self.include_binary),
        ];
        for (key, value) in fields {
            if let Some(flag) = value {
                options.insert(key.to_string(), OptionValue::Bool(flag));
            }
        }
        options
    }
}

/// The resolved, read-only rule set for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub(crate) rules: Rules,
    pub(crate) cli: CliPatterns,
    pub(crate) overrides: BehaviorOverrides,
    pub(crate) user_defaults: BehaviorOverrides,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_coercion_order() {
        assert_eq!(OptionValue::coerce("true"), OptionValue::Bool(true));
        assert_eq!(OptionValue::coerce("FALSE"), OptionValue::Bool(false));
        assert_eq!(OptionValue::coerce("42"), OptionValue::Int(42));
        assert_eq!(OptionValue::coerce("-7"), OptionValue::Int(-7));
        assert_eq!(
            OptionValue::coerce("3.14"),
            OptionValue::Float("3.14".parse().unwrap())
        );
        assert_eq!(OptionValue::coerce("0.5"), OptionValue::Float(0.5));
        assert_eq!(
            OptionValue::coerce("  hello world "),
            OptionValue::Str("hello world".to_string())
        );
        assert_eq!(
            OptionValue::coerce("my-context.md"),
            OptionValue::Str("my-context.md".to_string())
        );
    }

    #[test]
    fn test_mode_declaration_is_case_insensitive() {
        assert_eq!(Mode::from_declaration("whitelist:"), Some(Mode::Whitelist));
        assert_eq!(Mode::from_declaration("  BlackList:  "), Some(Mode::Blacklist));
        assert_eq!(Mode::from_declaration("WHITELIST"), None);
        assert_eq!(Mode::from_declaration("ONLY:"), None);
    }

    #[test]
    fn test_section_headers() {
        assert_eq!(SectionKind::from_header("exclude:"), Some(SectionKind::Exclude));
        assert_eq!(SectionKind::from_header("Include:"), Some(SectionKind::Include));
        assert_eq!(SectionKind::from_header("OPTIONS:"), Some(SectionKind::Options));
        assert_eq!(SectionKind::from_header("WHITELIST:"), None);
        assert_eq!(SectionKind::from_header("NOT INCLUDE:"), None);
    }

    #[test]
    fn test_overrides_layering() {
        let file = BehaviorOverrides {
            include_hidden: Some(true),
            ..Default::default()
        };
        let cli = BehaviorOverrides {
            include_hidden: Some(false),
            include_binary: Some(true),
            ..Default::default()
        };
        let resolved = cli.apply(file.apply(Behavior::default()));
        assert_eq!(
            resolved,
            Behavior {
                respect_gitignore: true,
                include_hidden: false,
                include_binary: true,
            }
        );
    }

    #[test]
    fn test_non_boolean_behavior_option_ignored() {
        let mut options = Options::new();
        options.insert(INCLUDE_HIDDEN.to_string(), OptionValue::Str("yes".into()));
        options.insert(RESPECT_GITIGNORE.to_string(), OptionValue::Bool(false));
        let overrides = BehaviorOverrides::from_options(&options);
        assert_eq!(overrides.include_hidden, None);
        assert_eq!(overrides.respect_gitignore, Some(false));
    }
}
