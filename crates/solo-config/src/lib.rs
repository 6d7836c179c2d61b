//! Configuration for the solo toolchain (`solo.toml`) and tracing setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::ReentrantMutex;
use thiserror::Error;

mod logging;

pub use logging::{init_tracing, LoggingConfig};

/// Group id used for synthesized descriptors and faked dependencies.
pub const DEFAULT_GROUP_ID: &str = "org.scijava.scripting.java";
/// Version used for the synthesized project descriptor.
pub const DEFAULT_VERSION: &str = "1.0.0-SNAPSHOT";
/// Version used for faked dependency coordinates.
pub const DEFAULT_DEPENDENCY_VERSION: &str = "1.0.0";
/// Classpath jar convention used by `maven-surefire-plugin` forked test JVMs.
pub const SUREFIRE_BOOTER_PATTERN: &str = r".*/target/surefire/surefirebooter[0-9]*\.jar";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_dependency_version")]
    pub dependency_version: String,
    /// Unit name used when raw source text declares no public type.
    #[serde(default = "default_fallback_unit_name")]
    pub fallback_unit_name: String,
    /// Write a `pom.xml` next to a loose file that already sits under
    /// `<root>/src/main/java`, so later invocations reuse it.
    #[serde(default = "default_true")]
    pub graduate_conventional_layouts: bool,
}

fn default_group_id() -> String {
    DEFAULT_GROUP_ID.to_owned()
}

fn default_version() -> String {
    DEFAULT_VERSION.to_owned()
}

fn default_dependency_version() -> String {
    DEFAULT_DEPENDENCY_VERSION.to_owned()
}

fn default_fallback_unit_name() -> String {
    "Script".to_owned()
}

fn default_true() -> bool {
    true
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            group_id: default_group_id(),
            version: default_version(),
            dependency_version: default_dependency_version(),
            fallback_unit_name: default_fallback_unit_name(),
            graduate_conventional_layouts: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Explicit search entries, consulted before anything inherited from the
    /// environment.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    /// Treat the `CLASSPATH` environment variable as the outer search link.
    #[serde(default = "default_true")]
    pub inherit_env_classpath: bool,
    /// Regexes (matched against the entry URL) identifying indirection
    /// archives whose manifest `Class-Path` lists the real entries.
    #[serde(default = "default_booter_patterns")]
    pub booter_patterns: Vec<String>,
}

fn default_booter_patterns() -> Vec<String> {
    vec![SUREFIRE_BOOTER_PATTERN.to_owned()]
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            classpath: Vec::new(),
            inherit_env_classpath: true,
            booter_patterns: default_booter_patterns(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Path to `javac`. When unset, `$JAVA_HOME/bin/javac` is preferred,
    /// falling back to `javac` on `PATH`.
    #[serde(default)]
    pub javac: Option<PathBuf>,
    #[serde(default = "default_javac_args")]
    pub javac_args: Vec<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_javac_args() -> Vec<String> {
    vec!["-encoding".into(), "UTF-8".into()]
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            javac: None,
            javac_args: default_javac_args(),
            timeout_ms: None,
        }
    }
}

impl BuildConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn javac_path(&self) -> PathBuf {
        if let Some(javac) = &self.javac {
            return javac.clone();
        }
        std::env::var_os("JAVA_HOME")
            .map(PathBuf::from)
            .map(|home| home.join("bin").join(javac_executable_name()))
            .filter(|path| path.is_file())
            .unwrap_or_else(|| PathBuf::from("javac"))
    }
}

fn javac_executable_name() -> &'static str {
    if cfg!(windows) {
        "javac.exe"
    } else {
        "javac"
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoloConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid booter pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` includes a source snippet; keep just the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl SoloConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: SoloConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for pattern in &self.discovery.booter_patterns {
            regex::Regex::new(pattern).map_err(|err| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: err.to_string(),
            })?;
        }

        let project = &self.project;
        for (key, value) in [
            ("project.group_id", &project.group_id),
            ("project.version", &project.version),
            ("project.dependency_version", &project.dependency_version),
            ("project.fallback_unit_name", &project.fallback_unit_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("`{key}` must not be empty")));
            }
        }

        if self.build.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "`build.timeout_ms` must be >= 1".to_owned(),
            ));
        }
        Ok(())
    }
}

pub const SOLO_CONFIG_ENV_VAR: &str = "SOLO_CONFIG_PATH";

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

fn config_env_lock() -> &'static ReentrantMutex<()> {
    CONFIG_ENV_LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Run `f` while holding the config environment lock.
///
/// Tests that temporarily set [`SOLO_CONFIG_ENV_VAR`] must wrap the mutation and
/// the discovery in this helper; the environment is process-global.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Discover the config file for a working directory.
///
/// Search order:
/// 1) `SOLO_CONFIG_PATH` (absolute or relative to `root`)
/// 2) `solo.toml` in `root`
/// 3) `.solo.toml` in `root`
/// 4) `.solo/config.toml` in `root`
pub fn discover_config_path(root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(SOLO_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["solo.toml", ".solo.toml", ".solo/config.toml"]
        .into_iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the config for `root`; returns [`SoloConfig::default`] and `None` when
/// no config file exists.
pub fn load_for_root(root: &Path) -> Result<(SoloConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(root) else {
        return Ok((SoloConfig::default(), None));
    };

    let config = SoloConfig::load_from_path(&path)?;
    tracing::debug!(target: "solo.config", path = %path.display(), "loaded config");
    Ok((config, Some(path)))
}
