use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path};

/// Bytes inspected when sniffing file content.
const SNIFF_LEN: usize = 8192;

const BINARY_EXTENSIONS: &[&str] = &[
    // Images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "icns", "webp", "tif", "tiff", "psd",
    // Archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "zst",
    // Compiled objects and executables
    "exe", "dll", "so", "dylib", "o", "a", "obj", "lib", "class", "jar", "pyc", "pyo",
    "wasm", "bin",
    // Documents and media
    "pdf", "mp3", "mp4", "m4a", "avi", "mov", "mkv", "wav", "flac", "ogg", "webm",
    // Fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // Databases
    "db", "sqlite", "sqlite3",
];

/// True when any component of a root-relative path starts with `.`.
pub fn is_hidden(relative_path: &Path) -> bool {
    relative_path.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Decides whether a file is binary from its extension and, failing that,
/// its leading bytes.
#[derive(Debug, Clone)]
pub struct BinaryDetector {
    extensions: GlobSet,
}

impl BinaryDetector {
    pub fn new() -> Self {
        let mut builder = GlobSetBuilder::new();
        for ext in BINARY_EXTENSIONS {
            match GlobBuilder::new(&format!("*.{}", ext))
                .case_insensitive(true)
                .build()
            {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => log::warn!("Invalid binary extension glob '{}': {}", ext, err),
            }
        }
        let extensions = builder.build().unwrap_or_else(|err| {
            log::warn!("Failed to build binary extension set: {}", err);
            GlobSet::empty()
        });
        Self { extensions }
    }

    pub fn has_binary_extension(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.extensions.is_match(Path::new(name)))
    }

    /// Unreadable files count as binary.
    pub fn is_binary(&self, path: &Path) -> bool {
        // A denylisted extension is binary even when the content would decode
        // as text; sniffing only decides for other extensions.
        if self.has_binary_extension(path) {
            return true;
        }

        let mut buffer = Vec::with_capacity(SNIFF_LEN);
        let read = File::open(path)
            .and_then(|file| file.take(SNIFF_LEN as u64).read_to_end(&mut buffer));
        if let Err(err) = read {
            log::debug!("Treating unreadable file as binary: {} ({})", path.display(), err);
            return true;
        }

        looks_binary(&buffer)
    }
}

impl Default for BinaryDetector {
    fn default() -> Self {
        Self::new()
    }
}

// A sample cut mid-character is still text; only a hard decode error counts.
fn looks_binary(sample: &[u8]) -> bool {
    if sample.contains(&0) {
        return true;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => false,
        Err(err) => err.error_len().is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_hidden_components() {
        assert!(is_hidden(Path::new(".hidden_file")));
        assert!(is_hidden(Path::new(".github/workflows/test.yml")));
        assert!(is_hidden(Path::new("src/.hidden_module.py")));
        assert!(!is_hidden(Path::new("src/module.py")));
        assert!(!is_hidden(Path::new("./src/module.py")));
    }

    #[test]
    fn test_binary_extension_case_insensitive() {
        let detector = BinaryDetector::new();
        assert!(detector.has_binary_extension(Path::new("image.png")));
        assert!(detector.has_binary_extension(Path::new("assets/Logo.PNG")));
        assert!(detector.has_binary_extension(Path::new("archive.zip")));
        assert!(!detector.has_binary_extension(Path::new("main.py")));
        assert!(!detector.has_binary_extension(Path::new("png")));
    }

    #[test]
    fn test_content_sniffing() {
        let dir = tempdir().unwrap();
        let detector = BinaryDetector::new();

        let text = dir.path().join("notes.txt");
        fs::write(&text, "plain text\n").unwrap();
        assert!(!detector.is_binary(&text));

        let empty = dir.path().join("empty");
        fs::write(&empty, "").unwrap();
        assert!(!detector.is_binary(&empty));

        let nul = dir.path().join("data.dat");
        fs::write(&nul, b"abc\0def").unwrap();
        assert!(detector.is_binary(&nul));

        let invalid = dir.path().join("blob");
        fs::write(&invalid, [0xff, 0xd8, 0xff, 0xe0]).unwrap();
        assert!(detector.is_binary(&invalid));
    }

    #[test]
    fn test_denylisted_extension_wins_over_text_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("image.png");
        fs::write(&path, "Content of image.png").unwrap();
        assert!(BinaryDetector::new().is_binary(&path));
    }

    #[test]
    fn test_unreadable_file_is_binary() {
        let dir = tempdir().unwrap();
        assert!(BinaryDetector::new().is_binary(&dir.path().join("missing.txt")));
    }

    #[test]
    fn test_truncated_multibyte_sample_is_text() {
        let mut sample = "a".repeat(SNIFF_LEN - 1).into_bytes();
        sample.push(0xc3);
        assert!(!looks_binary(&sample));
        assert!(looks_binary(&[0x61, 0xc3, 0x28]));
    }
}
