use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use solo_archive::{JarWriter, Manifest};
use solo_build::{BuildEnvironment, CommandOutput, CommandRunner, EngineConfig};
use solo_config::{DiscoveryConfig, ProjectConfig};
use solo_project::{PendingCleanup, ProjectSynthesizer, SearchChain};

/// Stands in for `javac`: writes one `.class` per source below the `-d`
/// directory, or fails with the configured stderr.
#[derive(Debug, Default)]
pub struct FakeJavac {
    invocations: Mutex<Vec<Vec<String>>>,
    fail_with: Option<String>,
}

impl FakeJavac {
    pub fn failing(stderr: &str) -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            fail_with: Some(stderr.to_string()),
        }
    }

    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().unwrap().clone()
    }

    /// The `-d` directory of every invocation.
    pub fn output_dirs(&self) -> Vec<PathBuf> {
        self.invocations()
            .iter()
            .map(|args| PathBuf::from(arg_after(args, "-d")))
            .collect()
    }
}

pub fn arg_after<'a>(args: &'a [String], flag: &str) -> &'a str {
    let idx = args.iter().position(|a| a == flag).unwrap();
    &args[idx + 1]
}

impl CommandRunner for FakeJavac {
    fn run(&self, _cwd: &Path, _program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        self.invocations.lock().unwrap().push(args.to_vec());
        if let Some(stderr) = &self.fail_with {
            return Ok(CommandOutput {
                status: exit_status(1),
                stdout: String::new(),
                stderr: stderr.clone(),
            });
        }

        let out = PathBuf::from(arg_after(args, "-d"));
        for source in args.iter().filter(|a| a.ends_with(".java")) {
            let normalized = source.replace('\\', "/");
            let relative = ["/src/main/java/", "/src/test/java/"]
                .iter()
                .find_map(|root| normalized.split_once(root).map(|(_, rel)| rel.to_string()))
                .unwrap();
            let class = out.join(relative.trim_end_matches(".java").to_string() + ".class");
            std::fs::create_dir_all(class.parent().unwrap())?;
            std::fs::write(class, b"\xca\xfe\xba\xbe")?;
        }
        Ok(CommandOutput {
            status: exit_status(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

fn exit_status(code: i32) -> ExitStatus {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code as u32)
    }
}

pub fn env_with(javac: &Arc<FakeJavac>) -> Arc<BuildEnvironment> {
    Arc::new(BuildEnvironment::with_runner(
        EngineConfig::default(),
        javac.clone(),
    ))
}

/// A synthesizer over `chain` with its own pending-cleanup list.
pub fn synthesizer(javac: &Arc<FakeJavac>, chain: SearchChain) -> ProjectSynthesizer {
    ProjectSynthesizer::new(
        env_with(javac),
        ProjectConfig::default(),
        DiscoveryConfig::default(),
        chain,
    )
    .with_pending_cleanup(Arc::new(PendingCleanup::new()))
}

/// The project directory a fake `javac` run compiled into
/// (`<dir>/target/classes`).
pub fn project_dir_of(output_dir: &Path) -> PathBuf {
    output_dir
        .parent()
        .and_then(Path::parent)
        .unwrap()
        .to_path_buf()
}

/// Write an otherwise empty jar whose manifest lists `class_path`.
pub fn write_booter_jar(path: &Path, class_path: &[&str]) {
    let mut manifest = Manifest::with_defaults();
    manifest.insert("Class-Path", class_path.join(" "));
    JarWriter::create(path, &manifest).unwrap().finish().unwrap();
}

pub const DUMMY: &str = "public class Dummy { public static void main(String[] a){} }";

pub fn sorted_entries(jar: &Path) -> Vec<String> {
    let mut names = solo_archive::Archive::new(jar).entry_names().unwrap();
    names.sort();
    names
}
