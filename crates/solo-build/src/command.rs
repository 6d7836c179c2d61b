//! Running the compiler as a child process.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a finished tool invocation exited and what it printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external tools (`javac`). Tests substitute a fake implementation.
pub trait CommandRunner: Send + Sync + std::fmt::Debug {
    fn run(&self, cwd: &Path, program: &Path, args: &[String]) -> io::Result<CommandOutput>;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultCommandRunner {
    /// Kill the tool once it has run this long. Only the direct child is
    /// killed, not processes it spawned.
    pub timeout: Option<Duration>,
}

impl CommandRunner for DefaultCommandRunner {
    fn run(&self, cwd: &Path, program: &Path, args: &[String]) -> io::Result<CommandOutput> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let waited = self.wait(&mut child);
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        match waited {
            Ok(status) => Ok(CommandOutput {
                status,
                stdout,
                stderr,
            }),
            Err(err) => Err(with_captured_output(err, &stdout, &stderr)),
        }
    }
}

impl DefaultCommandRunner {
    fn wait(&self, child: &mut Child) -> io::Result<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return child.wait();
        };
        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
                Ok(None) => {
                    kill(child);
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("timed out after {timeout:?}"),
                    ));
                }
                Err(err) => {
                    kill(child);
                    return Err(err);
                }
            }
        }
    }
}

fn kill(child: &mut Child) {
    if let Err(err) = child.kill() {
        tracing::debug!(target: "solo.build", error = %err, "failed to kill child process");
    }
    let _ = child.wait();
}

/// Read a child's pipe to the end on its own thread so neither pipe can
/// fill up and stall the child.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// A killed compiler's partial diagnostics are still worth showing.
fn with_captured_output(err: io::Error, stdout: &str, stderr: &str) -> io::Error {
    let mut message = err.to_string();
    for (label, text) in [("stdout", stdout), ("stderr", stderr)] {
        if !text.is_empty() {
            message.push_str(&format!("\n{label}:\n{text}"));
        }
    }
    io::Error::new(err.kind(), message)
}

/// Render a command line for logs and error messages. Arguments containing
/// whitespace are quoted.
pub(crate) fn format_command(program: &Path, args: &[String]) -> String {
    let mut out = quote(&program.to_string_lossy());
    for arg in args {
        out.push(' ');
        out.push_str(&quote(arg));
    }
    out
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("'{arg}'")
    } else {
        arg.to_owned()
    }
}
