//! Recovering a unit's package and public type name from raw source text.
//!
//! This is a line scanner, not a parser. It tolerates anything it does not
//! understand and always produces a best-effort answer.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

/// One compilable source file's worth of declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Dotted package name; empty for the default package.
    pub namespace: String,
    pub type_name: String,
}

impl SourceUnit {
    pub fn new(namespace: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            type_name: type_name.into(),
        }
    }

    /// `com.acme.Foo`, or just `Foo` in the default package.
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.type_name.clone()
        } else {
            format!("{}.{}", self.namespace, self.type_name)
        }
    }

    /// `com/acme/Foo.java`, relative to a source root.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.namespace.split('.').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(format!("{}.java", self.type_name));
        path
    }
}

fn package_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^package\s+([A-Za-z0-9_.]*)").expect("valid regex"))
}

fn exported_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\bpublic\s+(?:(?:abstract|final|static|sealed|non-sealed|strictfp)\s+)*(?:class|interface|enum|record)\s+([A-Za-z0-9_]+)",
        )
        .expect("valid regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    InBlockComment,
}

/// Scan `text` for `package a.b;` and the first public type declaration.
///
/// Scanning stops at the first public type. Block comments are only
/// recognized where they open a line; an unterminated one ends the scan.
/// Without a public type, `fallback_name` becomes the type name.
pub fn extract_unit_name(text: &str, fallback_name: &str) -> SourceUnit {
    let mut namespace = String::new();
    let mut state = ScanState::Code;

    for raw in text.lines() {
        let mut line = raw.trim();

        if state == ScanState::InBlockComment {
            match line.find("*/") {
                Some(end) => {
                    line = line[end + 2..].trim();
                    state = ScanState::Code;
                }
                None => continue,
            }
        }

        while line.starts_with("/*") {
            match line[2..].find("*/") {
                Some(end) => line = line[end + 4..].trim(),
                None => {
                    state = ScanState::InBlockComment;
                    break;
                }
            }
        }
        if state == ScanState::InBlockComment || line.is_empty() || line.starts_with("//") {
            continue;
        }

        if let Some(caps) = package_re().captures(line) {
            namespace = caps[1].trim_end_matches('.').to_string();
        }
        if let Some(caps) = exported_type_re().captures(line) {
            return SourceUnit::new(namespace, &caps[1]);
        }
    }

    if state == ScanState::InBlockComment {
        tracing::debug!(target: "solo.project", "unterminated block comment; stopped scanning");
    }
    SourceUnit::new(namespace, fallback_name)
}

/// [`extract_unit_name`] for a file on disk, falling back to the file stem.
pub fn extract_unit_name_from_file(path: &Path) -> std::io::Result<SourceUnit> {
    let text = std::fs::read_to_string(path)?;
    Ok(extract_unit_name(&text, &file_stem(path)))
}

/// The file name up to its last `.java`-style extension; empty for `.java`.
pub(crate) fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(dot) => name[..dot].to_string(),
        None => name,
    }
}
