use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use solo_build::{BuildEnvironment, Coordinate, EngineConfig};
use solo_config::SoloConfig;
use solo_project::{
    extract_unit_name, PendingCleanup, ProjectSynthesizer, SearchChain, SourceInput,
    DESCRIPTOR_FILE_NAME,
};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "solo",
    version,
    about = "Build a single Java source file as if it were a Maven project"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Extra classpath entries, searched before `CLASSPATH`
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    classpath: Vec<PathBuf>,
    /// Emit JSON suitable for scripting
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a source file (or a `pom.xml`) without packaging it
    Compile(InputArgs),
    /// Build, then print the entry point and effective classpath
    Classpath(InputArgs),
    /// Build a JAR
    Jar(JarArgs),
    /// Print the descriptor a build would use, without building
    Pom(InputArgs),
}

#[derive(Args)]
struct InputArgs {
    /// A `.java` file, a `pom.xml`, or `-` to read source text from stdin
    input: PathBuf,
}

#[derive(Args)]
struct JarArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Also package `pom.xml` and the sources
    #[arg(long)]
    sources: bool,
    /// Where to write the JAR (defaults to `<Type>.jar` in the working
    /// directory; a `pom.xml` input keeps its project's target)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    PendingCleanup::global().flush();
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir().context("failed to determine the working directory")?;
    let (config, config_path) = solo_config::load_for_root(&cwd)?;
    solo_config::init_tracing(&config.logging);
    if let Some(path) = &config_path {
        tracing::debug!(target: "solo.cli", config = %path.display(), "using config");
    }

    let synth = synthesizer(&config, &cli.classpath);
    let mut sink = io::stderr();

    match cli.command {
        Command::Compile(args) => {
            let input = read_input(&args.input)?;
            let Some(coordinate) = synth.compile(&input, Some(&mut sink))? else {
                return Ok(1);
            };
            if cli.json {
                print_json(&CompileOutput { coordinate })?;
            } else {
                println!("compiled {coordinate}");
            }
            Ok(0)
        }
        Command::Classpath(args) => {
            let input = read_input(&args.input)?;
            let Some(built) = synth.synthesize(&input, Some(&mut sink))? else {
                return Ok(1);
            };
            let output = ClasspathOutput {
                entry_point: built.entry_point,
                classpath: built.classpath,
            };
            if cli.json {
                print_json(&output)?;
            } else {
                println!("entry point: {}", output.entry_point);
                for entry in &output.classpath {
                    println!("{}", entry.display());
                }
            }
            Ok(0)
        }
        Command::Jar(args) => {
            let input = read_input(&args.input.input)?;
            let output = match args.output {
                Some(output) => Some(output),
                None => default_jar_path(&cwd, &input, &config),
            };
            let Some(jar) =
                synth.assemble_package(&input, args.sources, output.as_deref(), Some(&mut sink))?
            else {
                return Ok(1);
            };
            if cli.json {
                print_json(&JarOutput { jar })?;
            } else {
                println!("wrote {}", jar.display());
            }
            Ok(0)
        }
        Command::Pom(args) => {
            let input = read_input(&args.input)?;
            let descriptor = synth.descriptor_for(&input)?;
            if cli.json {
                print_json(&PomOutput {
                    pom: String::from_utf8_lossy(&descriptor).into_owned(),
                })?;
            } else {
                io::stdout()
                    .write_all(&descriptor)
                    .context("failed to write descriptor")?;
            }
            Ok(0)
        }
    }
}

fn synthesizer(config: &SoloConfig, extra_classpath: &[PathBuf]) -> ProjectSynthesizer {
    let engine = EngineConfig {
        javac: config.build.javac_path(),
        javac_args: config.build.javac_args.clone(),
        timeout: config.build.timeout(),
    };
    let env = Arc::new(BuildEnvironment::new(engine));
    let chain = SearchChain::from_process(&config.discovery, extra_classpath);
    ProjectSynthesizer::new(
        env,
        config.project.clone(),
        config.discovery.clone(),
        chain,
    )
}

fn read_input(path: &Path) -> Result<SourceInput> {
    if path.as_os_str() != "-" {
        return Ok(SourceInput::file(path));
    }
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("failed to read source text from stdin")?;
    Ok(SourceInput::text(text))
}

/// A loose unit's JAR would vanish with its temporary project, so it is
/// copied out by default.
fn default_jar_path(cwd: &Path, input: &SourceInput, config: &SoloConfig) -> Option<PathBuf> {
    let name = match input {
        SourceInput::File(path) if path.file_name().is_some_and(|n| n == DESCRIPTOR_FILE_NAME) => {
            return None;
        }
        SourceInput::File(path) => path.file_stem()?.to_string_lossy().into_owned(),
        SourceInput::Text { text, .. } => {
            extract_unit_name(text, &config.project.fallback_unit_name).type_name
        }
    };
    Some(cwd.join(format!("{name}.jar")))
}

#[derive(Serialize)]
struct CompileOutput {
    coordinate: Coordinate,
}

#[derive(Serialize)]
struct ClasspathOutput {
    entry_point: String,
    classpath: Vec<PathBuf>,
}

#[derive(Serialize)]
struct JarOutput {
    jar: PathBuf,
}

#[derive(Serialize)]
struct PomOutput {
    pom: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
