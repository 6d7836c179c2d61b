use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use zip::write::SimpleFileOptions;
use walkdir::WalkDir;
use zip::ZipWriter;

use crate::manifest::{Manifest, MANIFEST_PATH};

/// Writes a JAR file entry by entry.
///
/// Only file entries are written (no directory entries). The manifest is
/// always the first entry; adding the same name twice keeps the first one.
pub struct JarWriter {
    path: PathBuf,
    zip: ZipWriter<File>,
    options: SimpleFileOptions,
    written: HashSet<String>,
}

impl JarWriter {
    pub fn create(path: impl Into<PathBuf>, manifest: &Manifest) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = File::create(&path)
            .with_context(|| format!("failed to create archive {}", path.display()))?;
        let mut writer = Self {
            path,
            zip: ZipWriter::new(file),
            options: SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated),
            written: HashSet::new(),
        };
        writer.add_bytes(MANIFEST_PATH, &manifest.to_bytes())?;
        Ok(writer)
    }

    pub fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        if !self.written.insert(name.to_owned()) {
            return Ok(());
        }
        self.zip
            .start_file(name, self.options)
            .with_context(|| format!("failed to add {name} to {}", self.path.display()))?;
        self.zip
            .write_all(bytes)
            .with_context(|| format!("failed to write {name} to {}", self.path.display()))?;
        Ok(())
    }

    pub fn add_file(&mut self, name: &str, source: &Path) -> anyhow::Result<()> {
        let bytes = std::fs::read(source)
            .with_context(|| format!("failed to read {}", source.display()))?;
        self.add_bytes(name, &bytes)
    }

    /// Add every file below `dir`, named by its `/`-separated path relative to
    /// `dir` and prefixed with `prefix`. Symlinked directories are followed.
    pub fn add_tree(&mut self, prefix: &str, dir: &Path) -> anyhow::Result<()> {
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let mut name = prefix.to_owned();
            for (idx, component) in relative.components().enumerate() {
                if idx > 0 {
                    name.push('/');
                }
                name.push_str(&component.as_os_str().to_string_lossy());
            }
            self.add_file(&name, entry.path())?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> anyhow::Result<PathBuf> {
        self.zip
            .finish()
            .with_context(|| format!("failed to finish archive {}", self.path.display()))?;
        Ok(self.path)
    }
}
