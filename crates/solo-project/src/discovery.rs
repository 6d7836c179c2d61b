//! Faking descriptors for everything visible on the process classpath.
//!
//! Each file-backed search entry becomes a [`DependencyRecord`] registered
//! with the build environment, so a synthesized descriptor can depend on it
//! by coordinate. Booter jars (an otherwise empty jar whose manifest
//! `Class-Path` lists the real classpath) are replaced by the entries they
//! list, one level deep.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use solo_archive::Archive;
use solo_build::{ArtifactIdRegistry, BuildEnvironment, Coordinate};
use solo_config::{DiscoveryConfig, ProjectConfig};
use url::Url;

use crate::error::{Result, SynthError};

/// A fake coordinate standing in for one classpath entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    pub coordinate: Coordinate,
    pub path: PathBuf,
}

/// One level of the search chain: the entries a single loader exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLink {
    pub name: String,
    pub entries: Vec<Url>,
}

impl SearchLink {
    pub fn new(name: impl Into<String>, entries: Vec<Url>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// A link over local paths. Paths that cannot be expressed as `file:`
    /// URLs are dropped with a warning.
    pub fn from_paths<P: AsRef<Path>>(name: impl Into<String>, paths: impl IntoIterator<Item = P>) -> Self {
        let entries = paths
            .into_iter()
            .filter_map(|path| {
                let path = path.as_ref();
                let url = path_to_url(path);
                if url.is_none() {
                    tracing::warn!(
                        target: "solo.discovery",
                        path = %path.display(),
                        "ignoring classpath entry that is not a valid file path"
                    );
                }
                url
            })
            .collect();
        Self::new(name, entries)
    }
}

/// Search links ordered from the innermost loader outwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchChain {
    links: Vec<SearchLink>,
}

impl SearchChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `link` as the next-outer level.
    pub fn push(&mut self, link: SearchLink) {
        self.links.push(link);
    }

    pub fn links(&self) -> &[SearchLink] {
        &self.links
    }

    /// The chain this process exposes: `extra` and the configured classpath
    /// form the innermost link; `CLASSPATH` (unless disabled) the outer one.
    pub fn from_process(config: &DiscoveryConfig, extra: &[PathBuf]) -> Self {
        let mut chain = Self::new();
        let configured: Vec<&PathBuf> = extra.iter().chain(&config.classpath).collect();
        if !configured.is_empty() {
            chain.push(SearchLink::from_paths("configured", configured));
        }
        if config.inherit_env_classpath {
            if let Some(value) = std::env::var_os("CLASSPATH").filter(|v| !v.is_empty()) {
                let paths: Vec<PathBuf> = std::env::split_paths(&value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect();
                chain.push(SearchLink::from_paths("CLASSPATH", paths));
            }
        }
        chain
    }
}

/// `file:` URL for `path`, made absolute against the working directory.
/// Directories get a trailing slash so relative references resolve inside
/// them.
pub fn path_to_url(path: &Path) -> Option<Url> {
    let absolute = std::path::absolute(path).ok()?;
    if absolute.is_dir() {
        Url::from_directory_path(&absolute).ok()
    } else {
        Url::from_file_path(&absolute).ok()
    }
}

/// Derive an artifact id from `file_name` and allocate it in `registry`.
///
/// The prefix is the name up to its first `.`; a name starting with `.`
/// uses `dependency`, a name without one is used whole. Collisions within
/// `group_id` get a `-N` suffix.
pub fn fake_artifact_id(registry: &ArtifactIdRegistry, group_id: &str, file_name: &str) -> String {
    let prefix = match file_name.find('.') {
        None if file_name.is_empty() => "dependency",
        None => file_name,
        Some(0) => "dependency",
        Some(dot) => &file_name[..dot],
    };
    registry.allocate(group_id, prefix)
}

#[derive(Debug)]
pub struct DependencyDiscovery<'a> {
    env: &'a BuildEnvironment,
    group_id: &'a str,
    version: &'a str,
    booter_patterns: Vec<Regex>,
}

impl<'a> DependencyDiscovery<'a> {
    pub fn new(
        env: &'a BuildEnvironment,
        project: &'a ProjectConfig,
        discovery: &DiscoveryConfig,
    ) -> Result<Self> {
        let booter_patterns = discovery
            .booter_patterns
            .iter()
            .map(|pattern| {
                // Booter patterns must match the whole URL.
                Regex::new(&format!("^(?:{pattern})$")).map_err(|err| SynthError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            env,
            group_id: &project.group_id,
            version: &project.dependency_version,
            booter_patterns,
        })
    }

    /// Fake one dependency per unique file-backed entry in `chain`, in chain
    /// order. Non-`file:` entries are ignored; unreadable booter manifests
    /// are logged and skipped.
    pub fn discover(&self, chain: &SearchChain) -> Vec<DependencyRecord> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for link in chain.links() {
            tracing::trace!(
                target: "solo.discovery",
                link = %link.name,
                entries = link.entries.len(),
                "scanning search link"
            );
            for url in &link.entries {
                if url.scheme() != "file" {
                    continue;
                }
                let Ok(path) = url.to_file_path() else {
                    tracing::warn!(target: "solo.discovery", url = %url, "not a local file URL");
                    continue;
                };
                if self.is_booter(url) {
                    self.expand_booter(&path, url, &mut seen, &mut out);
                    continue;
                }
                self.push_fake(path, &mut seen, &mut out);
            }
        }
        tracing::debug!(
            target: "solo.discovery",
            dependencies = out.len(),
            "discovered classpath dependencies"
        );
        out
    }

    fn is_booter(&self, url: &Url) -> bool {
        self.booter_patterns
            .iter()
            .any(|pattern| pattern.is_match(url.as_str()))
    }

    fn expand_booter(
        &self,
        jar: &Path,
        url: &Url,
        seen: &mut HashSet<PathBuf>,
        out: &mut Vec<DependencyRecord>,
    ) {
        let manifest = match Archive::new(jar).manifest() {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                tracing::debug!(target: "solo.discovery", jar = %jar.display(), "booter jar has no manifest");
                return;
            }
            Err(err) => {
                tracing::warn!(
                    target: "solo.discovery",
                    jar = %jar.display(),
                    error = %format!("{err:#}"),
                    "failed to read booter manifest; skipping"
                );
                return;
            }
        };

        for element in manifest.class_path() {
            let resolved = match url.join(element) {
                Ok(resolved) => resolved,
                Err(err) => {
                    tracing::warn!(
                        target: "solo.discovery",
                        jar = %jar.display(),
                        element,
                        error = %err,
                        "invalid Class-Path element"
                    );
                    continue;
                }
            };
            match resolved.to_file_path() {
                Ok(path) if resolved.scheme() == "file" => self.push_fake(path, seen, out),
                _ => tracing::warn!(
                    target: "solo.discovery",
                    jar = %jar.display(),
                    element,
                    "Class-Path element is not a local file"
                ),
            }
        }
    }

    fn push_fake(&self, path: PathBuf, seen: &mut HashSet<PathBuf>, out: &mut Vec<DependencyRecord>) {
        if !seen.insert(path.clone()) {
            return;
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let artifact_id = fake_artifact_id(self.env.registry(), self.group_id, &file_name);
        let coordinate = Coordinate::new(self.group_id, artifact_id, self.version);
        self.env.register_fake_descriptor(&path, coordinate.clone());
        out.push(DependencyRecord { coordinate, path });
    }
}
