//! External program capabilities.
//!
//! Every call spawns a fresh process. A call fails when the program cannot be
//! started, exits non-zero, exceeds its timeout (the child is killed) or
//! writes nothing to stdout.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::fortune::{ArtRenderer, TextSource};

/// Runs a program with no input and returns its stdout.
#[derive(Debug, Clone)]
pub struct CommandTextSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

/// Runs a program with the text on stdin and returns its stdout.
#[derive(Debug, Clone)]
pub struct CommandArtRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTextSource {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

impl CommandArtRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

impl TextSource for CommandTextSource {
    async fn next(&self) -> Result<Vec<u8>> {
        run_program(&self.program, &self.args, None, self.timeout).await
    }
}

impl ArtRenderer for CommandArtRenderer {
    async fn render(&self, text: &[u8]) -> Result<Vec<u8>> {
        run_program(&self.program, &self.args, Some(text), self.timeout).await
    }
}

async fn run_program(
    program: &str,
    args: &[String],
    input: Option<&[u8]>,
    limit: Duration,
) -> Result<Vec<u8>> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {}", program))?;

    let stdin = child.stdin.take();

    // Feed stdin while collecting output so a chatty child cannot block on a full pipe.
    let feed = async move {
        if let (Some(mut stdin), Some(text)) = (stdin, input) {
            stdin.write_all(text).await?;
            stdin.shutdown().await?;
        }
        Ok::<_, std::io::Error>(())
    };

    let (fed, output) = timeout(limit, async { tokio::join!(feed, child.wait_with_output()) })
        .await
        .with_context(|| format!("{} timed out after {:?}", program, limit))?;

    let output = output.with_context(|| format!("failed to collect output of {}", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{} exited with {}: {}", program, output.status, stderr.trim());
    }

    // A program that exits successfully without reading stdin is not an error.
    if let Err(e) = fed {
        if e.kind() != ErrorKind::BrokenPipe {
            return Err(e).with_context(|| format!("failed to write input to {}", program));
        }
    }

    if output.stdout.iter().all(u8::is_ascii_whitespace) {
        bail!("{} produced no output", program);
    }

    Ok(output.stdout)
}

/// Resolves `program` the way a shell would: paths are checked directly,
/// bare names are searched for in `PATH`.
pub fn locate_program(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return is_executable_file(path).then(|| path.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable_file(candidate))
}

fn is_executable_file(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && has_exec_bit(&meta),
        Err(_) => false,
    }
}

#[cfg(unix)]
fn has_exec_bit(meta: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_exec_bit(_meta: &Metadata) -> bool {
    true
}
