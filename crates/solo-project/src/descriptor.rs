//! Synthesizing `pom.xml` documents and handing them to the build engine.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use solo_build::{BuildEnvironment, Coordinate, Project, JAR_PLUGIN_ARTIFACT_ID};
use solo_config::ProjectConfig;

use crate::discovery::DependencyRecord;
use crate::error::{DescriptorError, Result};

const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const POM_SCHEMA_LOCATION: &str =
    "http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd";

pub const DESCRIPTOR_FILE_NAME: &str = "pom.xml";

/// The content of a synthesized descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub coordinate: Coordinate,
    /// Emitted as the jar plugin's `mainClass` when present.
    pub entry_point: Option<String>,
    pub dependencies: Vec<Coordinate>,
}

impl ProjectDescriptor {
    /// Render as an indented UTF-8 `pom.xml`.
    pub fn to_xml(&self) -> std::result::Result<Vec<u8>, DescriptorError> {
        let mut pom = PomWriter::new();
        pom.declaration()?;
        pom.start_with_attributes(
            "project",
            &[
                ("xmlns", POM_NAMESPACE),
                ("xmlns:xsi", XSI_NAMESPACE),
                ("xsi:schemaLocation", POM_SCHEMA_LOCATION),
            ],
        )?;
        pom.coordinate(&self.coordinate)?;

        match &self.entry_point {
            Some(main_class) => {
                pom.start("build")?;
                pom.start("plugins")?;
                pom.start("plugin")?;
                pom.text_element("artifactId", JAR_PLUGIN_ARTIFACT_ID)?;
                pom.start("configuration")?;
                pom.start("archive")?;
                pom.start("manifest")?;
                pom.text_element("mainClass", main_class)?;
                for name in ["manifest", "archive", "configuration", "plugin", "plugins", "build"] {
                    pom.end(name)?;
                }
            }
            None => pom.empty("build")?,
        }

        if self.dependencies.is_empty() {
            pom.empty("dependencies")?;
        } else {
            pom.start("dependencies")?;
            for dependency in &self.dependencies {
                pom.start("dependency")?;
                pom.coordinate(dependency)?;
                pom.end("dependency")?;
            }
            pom.end("dependencies")?;
        }

        pom.end("project")?;
        Ok(pom.finish())
    }
}

struct PomWriter {
    writer: Writer<Vec<u8>>,
}

impl PomWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 4),
        }
    }

    fn write(&mut self, event: Event<'_>) -> std::result::Result<(), DescriptorError> {
        self.writer
            .write_event(event)
            .map_err(|err| DescriptorError::Xml(err.to_string()))
    }

    fn declaration(&mut self) -> std::result::Result<(), DescriptorError> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))
    }

    fn start(&mut self, name: &str) -> std::result::Result<(), DescriptorError> {
        self.write(Event::Start(BytesStart::new(name)))
    }

    fn start_with_attributes(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
    ) -> std::result::Result<(), DescriptorError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.write(Event::Start(start))
    }

    fn empty(&mut self, name: &str) -> std::result::Result<(), DescriptorError> {
        self.write(Event::Empty(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> std::result::Result<(), DescriptorError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> std::result::Result<(), DescriptorError> {
        self.start(name)?;
        self.write(Event::CData(BytesCData::new(text)))?;
        self.end(name)
    }

    fn coordinate(&mut self, coordinate: &Coordinate) -> std::result::Result<(), DescriptorError> {
        self.text_element("groupId", &coordinate.group_id)?;
        self.text_element("artifactId", &coordinate.artifact_id)?;
        self.text_element("version", &coordinate.version)
    }

    fn finish(self) -> Vec<u8> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        bytes
    }
}

/// Where a synthesized descriptor ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    /// Written to the root of a conventional layout; later requests find it
    /// and reuse the project instead of synthesizing a new one.
    Graduated(PathBuf),
    /// Written next to the synthesized source tree.
    Written(PathBuf),
    /// Handed to the build engine without touching disk.
    InMemory,
}

#[derive(Debug, Clone)]
pub struct SynthesizedDescriptor {
    pub descriptor: ProjectDescriptor,
    pub bytes: Vec<u8>,
    pub project: Arc<Project>,
    pub persistence: Persistence,
}

/// If `directory` is the `src/main/java` source root of some project,
/// return that project's root.
pub fn conventional_project_root(directory: &Path) -> Option<&Path> {
    if !directory.ends_with(Path::new("src").join("main").join("java")) {
        return None;
    }
    directory.ancestors().nth(3)
}

/// Builds descriptors under one group/version and decides how they reach
/// the build engine.
#[derive(Debug)]
pub struct DescriptorFactory<'a> {
    env: &'a BuildEnvironment,
    config: &'a ProjectConfig,
}

impl<'a> DescriptorFactory<'a> {
    pub fn new(env: &'a BuildEnvironment, config: &'a ProjectConfig) -> Self {
        Self { env, config }
    }

    pub fn describe(
        &self,
        artifact_id: &str,
        entry_point: Option<&str>,
        dependencies: &[DependencyRecord],
    ) -> ProjectDescriptor {
        ProjectDescriptor {
            coordinate: Coordinate::new(&self.config.group_id, artifact_id, &self.config.version),
            entry_point: entry_point.filter(|e| !e.is_empty()).map(str::to_string),
            dependencies: dependencies.iter().map(|d| d.coordinate.clone()).collect(),
        }
    }

    /// Serialize a descriptor for the project in `directory` and parse it.
    ///
    /// When `directory` is a `src/main/java` root whose project has no
    /// `pom.xml` yet (and graduation is enabled), the descriptor is written
    /// at the project root and parsed from there. Otherwise it is written to
    /// `directory/pom.xml` if `write_to_disk`, and parsed from memory.
    pub fn synthesize(
        &self,
        directory: &Path,
        artifact_id: &str,
        entry_point: Option<&str>,
        dependencies: &[DependencyRecord],
        write_to_disk: bool,
    ) -> Result<SynthesizedDescriptor> {
        let descriptor = self.describe(artifact_id, entry_point, dependencies);
        let bytes = descriptor.to_xml()?;

        if self.config.graduate_conventional_layouts {
            if let Some(root) = conventional_project_root(directory) {
                let pom = root.join(DESCRIPTOR_FILE_NAME);
                if write_new(&pom, &bytes)? {
                    tracing::info!(
                        target: "solo.project",
                        pom = %pom.display(),
                        "graduated loose unit into a project"
                    );
                    let project = self.env.parse_descriptor(&pom)?;
                    return Ok(SynthesizedDescriptor {
                        descriptor,
                        bytes,
                        project,
                        persistence: Persistence::Graduated(pom),
                    });
                }
            }
        }

        let persistence = if write_to_disk {
            let pom = directory.join(DESCRIPTOR_FILE_NAME);
            std::fs::write(&pom, &bytes)
                .map_err(|source| DescriptorError::Write { path: pom.clone(), source })?;
            tracing::debug!(target: "solo.project", pom = %pom.display(), "wrote descriptor");
            Persistence::Written(pom)
        } else {
            Persistence::InMemory
        };

        let project = self.env.parse_descriptor_bytes(&bytes, directory)?;
        Ok(SynthesizedDescriptor {
            descriptor,
            bytes,
            project,
            persistence,
        })
    }
}

/// Create `path` with `bytes` unless it already exists.
fn write_new(path: &Path, bytes: &[u8]) -> std::result::Result<bool, DescriptorError> {
    let write_err = |source| DescriptorError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(write_err(err)),
    };
    fill_or_remove(path, file, bytes).map_err(write_err)?;
    Ok(true)
}

/// Write `bytes` to the freshly created `path`. A partial descriptor would be
/// picked up as an existing project, so it is removed on failure.
fn fill_or_remove(path: &Path, mut out: impl Write, bytes: &[u8]) -> std::io::Result<()> {
    let Err(err) = out.write_all(bytes).and_then(|()| out.flush()) else {
        return Ok(());
    };
    drop(out);
    if let Err(remove_err) = std::fs::remove_file(path) {
        tracing::warn!(
            target: "solo.project",
            path = %path.display(),
            error = %remove_err,
            "failed to remove partially written descriptor"
        );
    }
    Err(err)
}
