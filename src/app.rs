pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod formatter;
pub mod gitignore;
pub mod models;
pub mod patterns;
pub mod scanner;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use self::cli::Cli;
use self::config::{load_user_defaults, validate_flags, UserDefaults, CONFIG_FILENAME};
use self::formatter::OutputGenerator;
use self::gitignore::GitignoreRules;
use self::models::{Configuration, Mode};
use self::scanner::Scanner;

pub const DEFAULT_OUTPUT: &str = "llm-context.md";

/// Parses the command line, installs the logger and runs one invocation.
pub fn run() -> Result<()> {
    let args = Cli::parse();
    init_logger(args.log_level());
    execute(&args)
}

fn init_logger(level: log::LevelFilter) {
    // RUST_LOG, when set, takes precedence over the flag-derived level.
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

/// Runs one invocation with already-parsed arguments.
pub fn execute(args: &Cli) -> Result<()> {
    validate_flags(&args.whitelist, &args.blacklist, &args.include, &args.exclude)?;
    if let Some(value) = args.swallowed_path() {
        log::warn!(
            "'{}' was read as a pattern, not as PATH; scanning the current directory. \
             Put PATH before the pattern flags or end the patterns with --",
            value
        );
    }

    let user_defaults = load_user_defaults().unwrap_or_else(|err| {
        log::warn!("Ignoring user defaults: {:#}", err);
        UserDefaults::default()
    });

    let root = args.path.canonicalize().unwrap_or_else(|_| args.path.clone());
    log::info!("Scanning repository: {}", root.display());

    let config = build_configuration(args, &root, &user_defaults);
    let gitignore = GitignoreRules::load(&root);
    if gitignore.has_rules() {
        log::debug!("Loaded .gitignore from {}", root.display());
    }

    let scanner = Scanner::new(root.clone(), gitignore, config, args.verbose);
    let files = scanner.scan()?;

    if files.is_empty() {
        log::warn!("No files found matching the criteria.");
        return Ok(());
    }
    log::info!("Found {} files", files.len());

    if args.dry_run {
        print!("{}", OutputGenerator::dry_run_report(&files, &root));
        return Ok(());
    }

    let document = OutputGenerator::generate(&files, &root);
    let output = output_path(args, scanner.config(), &user_defaults);
    write_document(&output, &document)?;

    log::info!("Generated context file: {}", output.display());
    if args.verbose {
        log::info!("Total characters: {}", document.chars().count());
    }

    Ok(())
}

fn build_configuration(args: &Cli, root: &Path, user_defaults: &UserDefaults) -> Configuration {
    let builder = Configuration::builder()
        .cli_include(args.include.clone())
        .cli_exclude(args.exclude.clone())
        .overrides(args.behavior_overrides())
        .user_defaults(user_defaults.behavior());

    if let Some((mode, patterns)) = args.mode() {
        log::info!("Using CLI {} mode", mode);
        return builder.cli_mode(mode, patterns).build();
    }

    let file = root.join(CONFIG_FILENAME);
    let found = file.is_file();
    let config = builder
        .file(&file)
        .default_mode(Mode::Blacklist)
        .build();

    match (found, config.mode()) {
        (false, Some(mode)) => {
            log::info!("No {} found; using default {} mode", CONFIG_FILENAME, mode)
        }
        (false, None) => log::info!("No {} found", CONFIG_FILENAME),
        (true, Some(mode)) => log::info!("Using {} ({} mode)", file.display(), mode),
        (true, None) => log::info!("Using {} (legacy format)", file.display()),
    }

    config
}

/// `-o`, then the `output` option, then the user default, then
/// `./llm-context.md`.
fn output_path(args: &Cli, config: &Configuration, user_defaults: &UserDefaults) -> PathBuf {
    args.output
        .clone()
        .or_else(|| config.output_option().map(PathBuf::from))
        .or_else(|| user_defaults.output.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

fn write_document(path: &Path, document: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, document)
        .with_context(|| format!("Failed to write output file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::Dialect;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("llmd").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_output_path_precedence() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            "BLACKLIST:\n*.log\n\nOPTIONS:\noutput: from-options.md\n",
        )
        .unwrap();
        let config = Configuration::builder()
            .file(dir.path().join(CONFIG_FILENAME))
            .build();
        let defaults = UserDefaults {
            output: Some(PathBuf::from("from-user.md")),
            ..Default::default()
        };

        assert_eq!(
            output_path(&parse(&["-o", "explicit.md"]), &config, &defaults),
            PathBuf::from("explicit.md")
        );
        assert_eq!(
            output_path(&parse(&[]), &config, &defaults),
            PathBuf::from("from-options.md")
        );

        let bare = Configuration::builder().default_mode(Mode::Blacklist).build();
        assert_eq!(
            output_path(&parse(&[]), &bare, &defaults),
            PathBuf::from("from-user.md")
        );
        assert_eq!(
            output_path(&parse(&[]), &bare, &UserDefaults::default()),
            PathBuf::from(DEFAULT_OUTPUT)
        );
    }

    #[test]
    fn test_cli_mode_ignores_config_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "WHITELIST:\n*.md\n").unwrap();

        let args = parse(&["-b", "*.log"]);
        let config = build_configuration(&args, dir.path(), &UserDefaults::default());
        assert_eq!(config.mode(), Some(Mode::Blacklist));
        assert_eq!(config.implicit_patterns(), ["*.log".to_string()]);
    }

    #[test]
    fn test_missing_config_defaults_to_blacklist() {
        let dir = tempdir().unwrap();
        let config = build_configuration(&parse(&[]), dir.path(), &UserDefaults::default());
        assert_eq!(config.dialect(), Dialect::ModeBased);
        assert_eq!(config.mode(), Some(Mode::Blacklist));
        assert_eq!(config.sections().len(), 1);
        assert!(config.sections()[0].patterns.is_empty());
    }

    #[test]
    fn test_write_document_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("context.md");
        write_document(&path, "# doc\n").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "# doc\n");
    }
}
