use crate::app::patterns::to_posix;
use std::fs;
use std::path::Path;

pub struct OutputGenerator;

impl OutputGenerator {
    /// Renders the context document: a title, a table of contents and one
    /// fenced block per file.
    pub fn generate(files: &[impl AsRef<Path>], root: &Path) -> String {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());

        let relative: Vec<String> = files
            .iter()
            .map(|file| relative_display(file.as_ref(), root))
            .collect();

        let mut out = format!("# LLM Context: {}\n\n", name);
        out.push_str(&Self::generate_toc(&relative));
        out.push_str(&Self::generate_content(files, &relative));
        out
    }

    pub fn generate_toc(relative_paths: &[String]) -> String {
        let mut toc = String::from("## Table of Contents\n\n");
        for (i, rel) in relative_paths.iter().enumerate() {
            toc.push_str(&format!("{}. [{}](#{})\n", i + 1, rel, anchor(rel)));
        }
        toc.push('\n');
        toc
    }

    fn generate_content(files: &[impl AsRef<Path>], relative_paths: &[String]) -> String {
        let mut blocks = Vec::new();

        for (file, rel) in files.iter().zip(relative_paths) {
            let path = file.as_ref();
            match fs::read_to_string(path) {
                Ok(content) => {
                    let fence = fence_for(&content);
                    let body = content.strip_suffix('\n').unwrap_or(&content);
                    blocks.push(format!(
                        "## {}\n\n{}{}\n{}\n{}",
                        rel,
                        fence,
                        language_for(path),
                        body,
                        fence
                    ));
                }
                Err(e) => {
                    log::warn!("Failed to read {}: {}", path.display(), e);
                    blocks.push(format!("## {}\n\n*Error reading file: {}*", rel, e));
                }
            }
        }

        let mut content = blocks.join("\n\n");
        if !content.is_empty() {
            content.push('\n');
        }
        content
    }

    /// One `+path` line per file, relative to the root.
    pub fn dry_run_report(files: &[impl AsRef<Path>], root: &Path) -> String {
        files
            .iter()
            .map(|file| format!("+{}\n", relative_display(file.as_ref(), root)))
            .collect()
    }
}

fn relative_display(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    to_posix(&relative.to_string_lossy())
}

/// GitHub-style heading anchor.
fn anchor(heading: &str) -> String {
    heading
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

// Longer than any backtick run in the content.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

fn language_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" => "typescript",
        "tsx" => "tsx",
        "jsx" => "jsx",
        "go" => "go",
        "java" => "java",
        "kt" => "kotlin",
        "rb" => "ruby",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "sh" | "bash" => "bash",
        "md" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "html" => "html",
        "css" => "css",
        "sql" => "sql",
        _ => "",
    }
}
