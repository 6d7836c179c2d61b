pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Manifest lines may not exceed 72 bytes (including the line break is not
/// counted); longer values continue on lines starting with a single space.
const MAX_LINE_BYTES: usize = 72;

/// The main section of a JAR manifest.
///
/// Per-entry sections are ignored when parsing and never written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Vec<(String, String)>,
}

impl Manifest {
    /// A manifest with `Manifest-Version: 1.0` and `Created-By: solo`.
    pub fn with_defaults() -> Self {
        let mut manifest = Self::default();
        manifest.insert("Manifest-Version", "1.0");
        manifest.insert("Created-By", "solo");
        manifest
    }

    pub fn parse(text: &str) -> Self {
        let mut main: Vec<(String, String)> = Vec::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            let line = line.trim_end_matches('\r');

            // The first empty line terminates the main attributes section.
            if line.is_empty() {
                break;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(rest);
                }
                continue;
            }

            if let Some(attr) = current.take() {
                main.push(attr);
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            current = Some((key.trim().to_owned(), value.trim_start().to_owned()));
        }
        if let Some(attr) = current {
            main.push(attr);
        }

        for (_, value) in &mut main {
            let trimmed = value.trim_end().len();
            value.truncate(trimmed);
        }
        Self { main }
    }

    /// Case-insensitive lookup of a main attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.main
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set `key`, replacing an existing value while keeping its position.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.main.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some((_, existing)) => *existing = value,
            None => self.main.push((key.to_owned(), value)),
        }
    }

    /// Elements of the `Class-Path` attribute, split on runs of spaces.
    pub fn class_path(&self) -> Vec<&str> {
        self.get("Class-Path")
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn main_class(&self) -> Option<&str> {
        self.get("Main-Class").filter(|name| !name.is_empty())
    }

    /// Serialize with CRLF line endings and 72-byte line wrapping.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (key, value) in &self.main {
            let line = format!("{key}: {value}");
            let mut rest = line.as_str();
            let mut first = true;
            while !rest.is_empty() {
                let budget = if first { MAX_LINE_BYTES } else { MAX_LINE_BYTES - 1 };
                let cut = floor_char_boundary(rest, budget);
                if !first {
                    out.push(b' ');
                }
                out.extend_from_slice(rest[..cut].as_bytes());
                out.extend_from_slice(b"\r\n");
                rest = &rest[cut..];
                first = false;
            }
        }
        out.extend_from_slice(b"\r\n");
        out
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
