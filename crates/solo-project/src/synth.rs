//! Turning an input into a built project, one session per request.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use solo_build::{BuildEnvironment, BuildOptions, Coordinate, Project};
use solo_config::{DiscoveryConfig, ProjectConfig};

use crate::descriptor::{conventional_project_root, DescriptorFactory, Persistence, DESCRIPTOR_FILE_NAME};
use crate::discovery::{DependencyDiscovery, DependencyRecord, SearchChain};
use crate::error::{Result, SynthError};
use crate::session::{ErrorSink, PendingCleanup, SynthesisSession};
use crate::unit::{extract_unit_name, file_stem, SourceUnit};

/// What to build: a file on disk, or source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    File(PathBuf),
    Text {
        text: String,
        /// The name the text was loaded under. When that file exists it is
        /// used instead of the text.
        file_name: Option<PathBuf>,
    },
}

impl SourceInput {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SourceInput::File(path.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        SourceInput::Text {
            text: text.into(),
            file_name: None,
        }
    }

    pub fn named_text(text: impl Into<String>, file_name: impl Into<PathBuf>) -> Self {
        SourceInput::Text {
            text: text.into(),
            file_name: Some(file_name.into()),
        }
    }

    /// Human-readable origin for messages.
    pub fn origin(&self) -> String {
        match self {
            SourceInput::File(path) => path.display().to_string(),
            SourceInput::Text {
                file_name: Some(name),
                ..
            } => name.display().to_string(),
            SourceInput::Text { .. } => "<source text>".to_string(),
        }
    }
}

/// How the project for an input was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthState {
    /// The input named a `pom.xml`.
    ExistingDescriptor,
    /// The input is a source file under `src/main/java` of a project.
    ExistingUnitInProject,
    /// A descriptor was synthesized for the unit.
    LooseUnit,
}

/// A project ready for the build engine.
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub state: SynthState,
    pub project: Arc<Project>,
    /// The unit's qualified name, when the input was a unit.
    pub unit_name: Option<String>,
    /// `None` unless a descriptor was synthesized.
    pub persistence: Option<Persistence>,
    pub dependencies: Vec<DependencyRecord>,
}

/// The result of a successful build.
#[derive(Debug, Clone)]
pub struct Built {
    pub state: SynthState,
    pub project: Arc<Project>,
    pub entry_point: String,
    pub classpath: Vec<PathBuf>,
}

/// Turns loose source files into buildable projects.
///
/// Each request runs in its own [`SynthesisSession`]; the build environment,
/// and with it the artifact-id registry, is shared by every request made
/// through one synthesizer. The search chain is discovered once, by the
/// first request, so each classpath entry keeps a single coordinate.
#[derive(Debug)]
pub struct ProjectSynthesizer {
    env: Arc<BuildEnvironment>,
    project: ProjectConfig,
    discovery: DiscoveryConfig,
    chain: SearchChain,
    discovered: Mutex<Option<Vec<DependencyRecord>>>,
    pending: Arc<PendingCleanup>,
    write_descriptors: bool,
}

impl ProjectSynthesizer {
    pub fn new(
        env: Arc<BuildEnvironment>,
        project: ProjectConfig,
        discovery: DiscoveryConfig,
        chain: SearchChain,
    ) -> Self {
        Self {
            env,
            project,
            discovery,
            chain,
            discovered: Mutex::new(None),
            pending: PendingCleanup::global(),
            write_descriptors: true,
        }
    }

    #[must_use]
    pub fn with_pending_cleanup(mut self, pending: Arc<PendingCleanup>) -> Self {
        self.pending = pending;
        self
    }

    /// Whether synthesized descriptors are written next to the temporary
    /// source tree (the default) or only passed in memory.
    #[must_use]
    pub fn write_descriptors(mut self, write: bool) -> Self {
        self.write_descriptors = write;
        self
    }

    pub fn env(&self) -> &Arc<BuildEnvironment> {
        &self.env
    }

    /// Build `input` and report its entry point and effective classpath.
    ///
    /// Paths inside a temporary project are gone once this returns; use
    /// [`ProjectSynthesizer::synthesize_with`] to act on them first.
    pub fn synthesize(&self, input: &SourceInput, sink: Option<&mut dyn Write>) -> Result<Option<Built>> {
        self.synthesize_with(input, sink, Built::clone)
    }

    /// Build `input` and run `f` on the result before the session's
    /// temporary directory is removed.
    pub fn synthesize_with<R>(
        &self,
        input: &SourceInput,
        sink: Option<&mut dyn Write>,
        f: impl FnOnce(&Built) -> R,
    ) -> Result<Option<R>> {
        self.run(sink, |session| {
            let synthesized = self.prepare(session, input, false)?;
            let project = synthesized.project;
            project.build(&self.env, BuildOptions::compile())?;

            let entry_point = synthesized
                .unit_name
                .or_else(|| project.entry_point().map(str::to_string))
                .ok_or_else(|| SynthError::NoEntryPoint {
                    origin: input.origin(),
                })?;
            let classpath = project.effective_classpath(&self.env, false)?;
            let built = Built {
                state: synthesized.state,
                project,
                entry_point,
                classpath,
            };
            Ok(f(&built))
        })
    }

    /// Compile `input` without packaging it.
    pub fn compile(&self, input: &SourceInput, sink: Option<&mut dyn Write>) -> Result<Option<Coordinate>> {
        self.run(sink, |session| {
            let synthesized = self.prepare(session, input, false)?;
            synthesized.project.build(&self.env, BuildOptions::compile())?;
            Ok(synthesized.project.coordinate().clone())
        })
    }

    /// Build `input` into a JAR. The JAR is copied to `output` when given,
    /// and the path of the final JAR is returned.
    pub fn assemble_package(
        &self,
        input: &SourceInput,
        include_sources: bool,
        output: Option<&Path>,
        sink: Option<&mut dyn Write>,
    ) -> Result<Option<PathBuf>> {
        self.run(sink, |session| {
            let synthesized = self.prepare(session, input, false)?;
            let project = synthesized.project;
            project.build(&self.env, BuildOptions::package(include_sources))?;

            let target = project.target();
            let Some(output) = output.filter(|output| *output != target) else {
                return Ok(target);
            };
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|err| SynthError::io(parent, err))?;
            }
            std::fs::copy(&target, output).map_err(|err| SynthError::io(output, err))?;
            tracing::info!(target: "solo.project", jar = %output.display(), "wrote package");
            Ok(output.to_path_buf())
        })
    }

    /// The descriptor that building `input` would use. Nothing is written
    /// to disk.
    pub fn descriptor_for(&self, input: &SourceInput) -> Result<Vec<u8>> {
        let mut session = SynthesisSession::new(None, self.pending.clone());
        let result = self
            .prepare(&mut session, input, true)
            .map(|synthesized| synthesized.project.descriptor_bytes().to_vec());
        session.close();
        result
    }

    fn run<R>(
        &self,
        sink: Option<&mut dyn Write>,
        op: impl FnOnce(&mut SynthesisSession<'_>) -> Result<R>,
    ) -> Result<Option<R>> {
        let mut session = SynthesisSession::new(sink.map(ErrorSink::new), self.pending.clone());
        let outcome = match op(&mut session) {
            Ok(value) => Ok(Some(value)),
            Err(err) => session.fail(err),
        };
        session.close();
        outcome
    }

    /// Pick the state for `input` and obtain its project. `preview` keeps
    /// everything off disk except the session's temporary directory.
    fn prepare(
        &self,
        session: &mut SynthesisSession<'_>,
        input: &SourceInput,
        preview: bool,
    ) -> Result<Synthesized> {
        match input {
            SourceInput::Text {
                file_name: Some(name),
                ..
            } if name.is_file() => self.prepare_file(session, name, preview),
            SourceInput::File(path) => self.prepare_file(session, path, preview),
            SourceInput::Text { text, file_name } => {
                let fallback = file_name
                    .as_deref()
                    .map(file_stem)
                    .filter(|stem| !stem.is_empty())
                    .unwrap_or_else(|| self.project.fallback_unit_name.clone());
                let unit = extract_unit_name(text, &fallback);
                self.prepare_loose(session, text, &unit, None, preview)
            }
        }
    }

    fn prepare_file(
        &self,
        session: &mut SynthesisSession<'_>,
        path: &Path,
        preview: bool,
    ) -> Result<Synthesized> {
        if path.file_name().is_some_and(|name| name == DESCRIPTOR_FILE_NAME) {
            let dependencies = self.discover()?;
            let project = self.env.parse_descriptor(path)?;
            tracing::info!(target: "solo.project", pom = %path.display(), "using existing descriptor");
            return Ok(Synthesized {
                state: SynthState::ExistingDescriptor,
                project,
                unit_name: None,
                persistence: None,
                dependencies,
            });
        }
        if path.extension().map_or(true, |ext| ext != "java") {
            return Err(SynthError::UnsupportedSource {
                path: path.to_path_buf(),
            });
        }

        let text = std::fs::read_to_string(path).map_err(|err| SynthError::io(path, err))?;
        let unit = extract_unit_name(&text, &file_stem(path));
        if unit.type_name.is_empty() {
            return Err(SynthError::UnnamedUnit {
                origin: path.display().to_string(),
            });
        }

        let absolute = std::path::absolute(path).map_err(|err| SynthError::io(path, err))?;
        let source_root = source_root_of(&absolute, &unit)?;

        if let Some(root) = conventional_project_root(source_root) {
            let pom = root.join(DESCRIPTOR_FILE_NAME);
            if pom.is_file() {
                let dependencies = self.discover()?;
                let project = self.env.parse_descriptor(&pom)?;
                tracing::info!(
                    target: "solo.project",
                    unit = %unit.qualified_name(),
                    pom = %pom.display(),
                    "unit belongs to an existing project"
                );
                return Ok(Synthesized {
                    state: SynthState::ExistingUnitInProject,
                    project,
                    unit_name: Some(unit.qualified_name()),
                    persistence: None,
                    dependencies,
                });
            }
            if !preview && self.project.graduate_conventional_layouts {
                return self.prepare_loose(session, &text, &unit, Some(source_root), preview);
            }
        }

        self.prepare_loose(session, &text, &unit, None, preview)
    }

    /// Synthesize a descriptor for `unit`. With `in_place`, the unit already
    /// sits in that `src/main/java` root and the descriptor graduates to the
    /// project root; otherwise the unit is copied into a temporary project.
    fn prepare_loose(
        &self,
        session: &mut SynthesisSession<'_>,
        text: &str,
        unit: &SourceUnit,
        in_place: Option<&Path>,
        preview: bool,
    ) -> Result<Synthesized> {
        let (directory, write_to_disk) = match in_place {
            Some(source_root) => (source_root.to_path_buf(), false),
            None => {
                let directory = session.create_temp_dir()?.to_path_buf();
                let source = directory
                    .join("src")
                    .join("main")
                    .join("java")
                    .join(unit.relative_path());
                if let Some(parent) = source.parent() {
                    std::fs::create_dir_all(parent).map_err(|err| SynthError::io(parent, err))?;
                }
                std::fs::write(&source, text).map_err(|err| SynthError::io(&source, err))?;
                (directory, self.write_descriptors && !preview)
            }
        };

        // Discovery allocates first on every path, so a graduated descriptor
        // names the same ids a fresh environment will assign.
        let dependencies = self.discover()?;
        let artifact_id = self
            .env
            .registry()
            .allocate(&self.project.group_id, &unit.type_name);
        let unit_name = unit.qualified_name();

        let synthesized = DescriptorFactory::new(&self.env, &self.project).synthesize(
            &directory,
            &artifact_id,
            Some(&unit_name),
            &dependencies,
            write_to_disk,
        )?;
        tracing::info!(
            target: "solo.project",
            unit = %unit_name,
            artifact_id = %artifact_id,
            dependencies = dependencies.len(),
            persistence = ?synthesized.persistence,
            "synthesized descriptor"
        );

        Ok(Synthesized {
            state: SynthState::LooseUnit,
            project: synthesized.project,
            unit_name: Some(unit_name),
            persistence: Some(synthesized.persistence),
            dependencies,
        })
    }

    /// The faked dependencies for the search chain, discovered on first use.
    fn discover(&self) -> Result<Vec<DependencyRecord>> {
        let mut discovered = self.discovered.lock();
        if let Some(records) = discovered.as_ref() {
            return Ok(records.clone());
        }
        let discovery = DependencyDiscovery::new(&self.env, &self.project, &self.discovery)?;
        Ok(discovered.insert(discovery.discover(&self.chain)).clone())
    }
}

/// The directory `path` must live in for `unit`'s package, i.e. `path`
/// minus its trailing `<package path>/<Type>.java`.
fn source_root_of<'p>(path: &'p Path, unit: &SourceUnit) -> Result<&'p Path> {
    let expected = unit.relative_path();
    let depth = expected.components().count();
    if path.ends_with(&expected) {
        return Ok(path.ancestors().nth(depth).unwrap_or(Path::new("")));
    }

    let mut located: Vec<String> = path
        .components()
        .rev()
        .take(depth)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    located.reverse();
    let located = located.join(".");
    let located = located.strip_suffix(".java").unwrap_or(&located).to_string();
    Err(SynthError::InconsistentPath {
        path: path.to_path_buf(),
        expected: located,
        actual: unit.qualified_name(),
    })
}
