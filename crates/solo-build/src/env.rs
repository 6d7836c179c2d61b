use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::pom::PomModel;
use crate::project::Project;
use crate::registry::ArtifactIdRegistry;
use crate::{BuildError, CommandRunner, Coordinate, DefaultCommandRunner, Result};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the `javac` executable.
    pub javac: PathBuf,
    /// Extra arguments passed to every `javac` invocation.
    pub javac_args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            javac: PathBuf::from("javac"),
            javac_args: vec!["-encoding".into(), "UTF-8".into()],
            timeout: None,
        }
    }
}

/// A dependency as the engine resolved it.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// A faked descriptor: the coordinate is backed by a jar or directory.
    Fake(PathBuf),
    Project(Arc<Project>),
}

#[derive(Debug, Default)]
struct Known {
    projects: HashMap<Coordinate, Arc<Project>>,
    by_path: HashMap<PathBuf, Arc<Project>>,
    fakes: HashMap<Coordinate, PathBuf>,
}

/// One build session: every parsed descriptor, every faked dependency, and the
/// artifact-id registry that keeps their ids unique.
///
/// Shared by reference between concurrent synthesis requests; all state is
/// behind locks.
#[derive(Debug)]
pub struct BuildEnvironment {
    config: EngineConfig,
    runner: Arc<dyn CommandRunner>,
    registry: Arc<ArtifactIdRegistry>,
    known: Mutex<Known>,
}

impl BuildEnvironment {
    pub fn new(config: EngineConfig) -> Self {
        let runner = DefaultCommandRunner {
            timeout: config.timeout,
        };
        Self::with_runner(config, Arc::new(runner))
    }

    pub fn with_runner(config: EngineConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
            registry: Arc::new(ArtifactIdRegistry::new()),
            known: Mutex::new(Known::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn registry(&self) -> &Arc<ArtifactIdRegistry> {
        &self.registry
    }

    /// Parse a `pom.xml` on disk. Parsing the same file twice returns the
    /// cached project.
    pub fn parse_descriptor(&self, path: &Path) -> Result<Arc<Project>> {
        let path = std::path::absolute(path).map_err(|err| BuildError::io(path, err))?;
        if let Some(project) = self.known.lock().by_path.get(&path) {
            return Ok(project.clone());
        }

        let bytes = std::fs::read(&path).map_err(|err| BuildError::io(&path, err))?;
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let model = PomModel::parse(&String::from_utf8_lossy(&bytes), &path.display().to_string())?;
        let project = Arc::new(Project::new(model, directory, Some(path.clone()), bytes));
        self.register_project(project.clone());
        self.known.lock().by_path.insert(path, project.clone());
        Ok(project)
    }

    /// Parse an in-memory descriptor whose project lives in `base_directory`.
    pub fn parse_descriptor_bytes(&self, bytes: &[u8], base_directory: &Path) -> Result<Arc<Project>> {
        let origin = format!("<in-memory descriptor for {}>", base_directory.display());
        let model = PomModel::parse(&String::from_utf8_lossy(bytes), &origin)?;
        let project = Arc::new(Project::new(
            model,
            base_directory.to_path_buf(),
            None,
            bytes.to_vec(),
        ));
        self.register_project(project.clone());
        Ok(project)
    }

    fn register_project(&self, project: Arc<Project>) {
        let coordinate = project.coordinate().clone();
        self.registry
            .reserve(&coordinate.group_id, &coordinate.artifact_id);
        tracing::debug!(
            target: "solo.build",
            coordinate = %coordinate,
            directory = %project.directory().display(),
            "registered project"
        );
        self.known.lock().projects.insert(coordinate, project);
    }

    pub fn has_project(&self, group_id: &str, artifact_id: &str) -> bool {
        self.registry.contains(group_id, artifact_id)
    }

    /// Make `coordinate` resolvable, backed by the jar or directory at `path`.
    pub fn register_fake_descriptor(&self, path: &Path, coordinate: Coordinate) {
        self.registry
            .reserve(&coordinate.group_id, &coordinate.artifact_id);
        tracing::trace!(
            target: "solo.build",
            coordinate = %coordinate,
            path = %path.display(),
            "registered fake descriptor"
        );
        self.known.lock().fakes.insert(coordinate, path.to_path_buf());
    }

    /// Resolve a dependency. An empty version matches any version of the
    /// same `groupId:artifactId`.
    pub fn resolve(&self, coordinate: &Coordinate) -> Option<Resolved> {
        let known = self.known.lock();
        if let Some(path) = known.fakes.get(coordinate) {
            return Some(Resolved::Fake(path.clone()));
        }
        if let Some(project) = known.projects.get(coordinate) {
            return Some(Resolved::Project(project.clone()));
        }
        if !coordinate.version.is_empty() {
            return None;
        }

        let same_artifact = |c: &Coordinate| {
            c.group_id == coordinate.group_id && c.artifact_id == coordinate.artifact_id
        };
        known
            .fakes
            .iter()
            .find(|(c, _)| same_artifact(c))
            .map(|(_, path)| Resolved::Fake(path.clone()))
            .or_else(|| {
                known
                    .projects
                    .iter()
                    .find(|(c, _)| same_artifact(c))
                    .map(|(_, project)| Resolved::Project(project.clone()))
            })
    }

    pub fn fake_count(&self) -> usize {
        self.known.lock().fakes.len()
    }
}
