//! A minimal Maven-style build engine.
//!
//! It understands just enough of a `pom.xml` to compile a single-module
//! project with `javac`, resolve dependencies that were registered as faked
//! descriptors (plain classpath entries), and assemble a JAR. Remote
//! repositories, plugins, and test execution are not supported.

mod command;
mod env;
mod package;
mod pom;
mod project;
mod registry;

pub use command::{CommandOutput, CommandRunner, DefaultCommandRunner};
pub use env::{BuildEnvironment, EngineConfig, Resolved};
pub use pom::{PomModel, JAR_PLUGIN_ARTIFACT_ID};
pub use project::Project;
pub use registry::ArtifactIdRegistry;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "{tool} command `{command}` failed with exit code {code:?}\nstdout:\n{stdout}\nstderr:\n{stderr}"
    )]
    CommandFailed {
        tool: &'static str,
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid descriptor {origin}: {message}")]
    Descriptor { origin: String, message: String },

    #[error("unresolved dependency {0}")]
    UnresolvedDependency(Coordinate),

    #[error("dependency cycle through {0}")]
    DependencyCycle(Coordinate),

    #[error("failed to assemble {path}: {message}")]
    Package { path: PathBuf, message: String },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// `groupId:artifactId:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// What a single [`Project::build`] call should do beyond compiling main
/// sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Also compile `src/test/java` into `target/test-classes`. Tests are
    /// never executed.
    pub compile_tests: bool,
    /// Assemble the project JAR after compiling.
    pub package: bool,
    /// Include `pom.xml` and the main sources in the JAR.
    pub include_sources: bool,
}

impl BuildOptions {
    pub fn compile() -> Self {
        Self::default()
    }

    pub fn package(include_sources: bool) -> Self {
        Self {
            compile_tests: false,
            package: true,
            include_sources,
        }
    }
}
