use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::command::format_command;
use crate::env::{BuildEnvironment, Resolved};
use crate::package;
use crate::pom::{PomDependency, PomModel};
use crate::{BuildError, BuildOptions, Coordinate, Result};

/// A parsed project descriptor rooted at a directory.
#[derive(Debug)]
pub struct Project {
    model: PomModel,
    directory: PathBuf,
    descriptor_path: Option<PathBuf>,
    descriptor: Vec<u8>,
}

impl Project {
    pub(crate) fn new(
        model: PomModel,
        directory: PathBuf,
        descriptor_path: Option<PathBuf>,
        descriptor: Vec<u8>,
    ) -> Self {
        Self {
            model,
            directory,
            descriptor_path,
            descriptor,
        }
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.model.coordinate
    }

    /// The class named by the jar plugin's manifest configuration, if any.
    pub fn entry_point(&self) -> Option<&str> {
        self.model.entry_point.as_deref()
    }

    pub fn dependencies(&self) -> &[PomDependency] {
        &self.model.dependencies
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `None` when the descriptor was handed over in memory.
    pub fn descriptor_path(&self) -> Option<&Path> {
        self.descriptor_path.as_deref()
    }

    pub fn descriptor_bytes(&self) -> &[u8] {
        &self.descriptor
    }

    pub fn source_dir(&self) -> PathBuf {
        self.directory.join("src").join("main").join("java")
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.directory.join("src").join("main").join("resources")
    }

    pub fn test_source_dir(&self) -> PathBuf {
        self.directory.join("src").join("test").join("java")
    }

    /// Directory receiving compiled main classes.
    pub fn build_output(&self) -> PathBuf {
        self.directory.join("target").join("classes")
    }

    pub fn test_build_output(&self) -> PathBuf {
        self.directory.join("target").join("test-classes")
    }

    /// The JAR written when packaging.
    pub fn target(&self) -> PathBuf {
        let coordinate = self.coordinate();
        self.directory.join("target").join(format!(
            "{}-{}.jar",
            coordinate.artifact_id, coordinate.version
        ))
    }

    pub fn build(&self, env: &BuildEnvironment, options: BuildOptions) -> Result<()> {
        let mut visiting = Vec::new();
        self.build_inner(env, options, &mut visiting)
    }

    fn build_inner(
        &self,
        env: &BuildEnvironment,
        options: BuildOptions,
        visiting: &mut Vec<Coordinate>,
    ) -> Result<()> {
        if visiting.contains(self.coordinate()) {
            return Err(BuildError::DependencyCycle(self.coordinate().clone()));
        }
        visiting.push(self.coordinate().clone());

        for dependency in self.dependencies() {
            if dependency.is_test_scoped() && !options.compile_tests {
                continue;
            }
            if let Resolved::Project(project) = resolve(env, &dependency.coordinate)? {
                project.build_inner(env, BuildOptions::compile(), visiting)?;
            }
        }

        tracing::info!(target: "solo.build", coordinate = %self.coordinate(), "building");
        let classpath = self.effective_classpath(env, false)?;
        self.compile_tree(env, &self.source_dir(), &self.build_output(), &classpath)?;
        copy_resources(&self.resources_dir(), &self.build_output())?;

        if options.compile_tests {
            let classpath = self.effective_classpath(env, true)?;
            self.compile_tree(
                env,
                &self.test_source_dir(),
                &self.test_build_output(),
                &classpath,
            )?;
        }

        if options.package {
            let jar = package::assemble(self, options.include_sources)?;
            tracing::info!(target: "solo.build", jar = %jar.display(), "packaged");
        }

        visiting.pop();
        Ok(())
    }

    /// Output directory first, then every dependency's backing path (or
    /// output directory, for real projects) depth-first, without duplicates.
    pub fn effective_classpath(
        &self,
        env: &BuildEnvironment,
        include_test_scope: bool,
    ) -> Result<Vec<PathBuf>> {
        let mut out = vec![self.build_output()];
        if include_test_scope {
            out.push(self.test_build_output());
        }
        let mut seen_projects = HashSet::new();
        seen_projects.insert(self.coordinate().clone());
        self.collect_dependency_paths(env, include_test_scope, &mut seen_projects, &mut out)?;

        let mut seen = HashSet::new();
        out.retain(|p| seen.insert(p.clone()));
        Ok(out)
    }

    fn collect_dependency_paths(
        &self,
        env: &BuildEnvironment,
        include_test_scope: bool,
        seen_projects: &mut HashSet<Coordinate>,
        out: &mut Vec<PathBuf>,
    ) -> Result<()> {
        for dependency in self.dependencies() {
            if dependency.is_test_scoped() && !include_test_scope {
                continue;
            }
            match resolve(env, &dependency.coordinate)? {
                Resolved::Fake(path) => out.push(path),
                Resolved::Project(project) => {
                    if !seen_projects.insert(project.coordinate().clone()) {
                        continue;
                    }
                    out.push(project.build_output());
                    project.collect_dependency_paths(env, false, seen_projects, out)?;
                }
            }
        }
        Ok(())
    }

    fn compile_tree(
        &self,
        env: &BuildEnvironment,
        sources_dir: &Path,
        output_dir: &Path,
        classpath: &[PathBuf],
    ) -> Result<()> {
        let sources = collect_java_sources(sources_dir);
        if sources.is_empty() {
            tracing::debug!(
                target: "solo.build",
                dir = %sources_dir.display(),
                "no sources to compile"
            );
            return Ok(());
        }

        std::fs::create_dir_all(output_dir).map_err(|err| BuildError::io(output_dir, err))?;

        let config = env.config();
        let mut args = vec![
            "-d".to_string(),
            output_dir.to_string_lossy().to_string(),
            "-cp".to_string(),
            join_classpath(classpath),
        ];
        args.extend(config.javac_args.iter().cloned());
        args.extend(sources.iter().map(|p| p.to_string_lossy().to_string()));

        let command = format_command(&config.javac, &args);
        tracing::debug!(target: "solo.build", command = %command, "running javac");
        let output = env
            .runner()
            .run(&self.directory, &config.javac, &args)
            .map_err(|source| BuildError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(BuildError::CommandFailed {
                tool: "javac",
                command,
                code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

fn resolve(env: &BuildEnvironment, coordinate: &Coordinate) -> Result<Resolved> {
    env.resolve(coordinate)
        .ok_or_else(|| BuildError::UnresolvedDependency(coordinate.clone()))
}

fn collect_java_sources(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut out: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "java"))
        .collect();
    out.sort();
    out
}

fn copy_resources(resources_dir: &Path, output_dir: &Path) -> Result<()> {
    if !resources_dir.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(resources_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(resources_dir) else {
            continue;
        };
        let dest = output_dir.join(relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|err| BuildError::io(parent, err))?;
        }
        std::fs::copy(entry.path(), &dest).map_err(|err| BuildError::io(&dest, err))?;
    }
    Ok(())
}

fn join_classpath(entries: &[PathBuf]) -> String {
    let separator = if cfg!(windows) { ";" } else { ":" };
    entries
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(separator)
}
