//! External disassembler integration
//!
//! Extracted `.dxbc` files are handed to DXDecompilerCmd, a .NET tool.
//! The executable is looked up in the known build-output locations and,
//! when absent, fetched and built on demand. Invocation is per artifact
//! with a bounded timeout; a failing artifact never stops the batch.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Upstream repository for the disassembler
pub const DXDECOMPILER_REPO: &str = "https://github.com/spacehamster/DXDecompiler.git";

/// Framework-target subdirectories to probe, newest first
const TARGET_FRAMEWORKS: [&str; 3] = ["net9.0", "net8.0", "net6.0"];

/// Default per-invocation timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from disassembler discovery, build, and invocation
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("Fetching DXDecompiler failed: {0}")]
    FetchFailed(String),

    #[error("Building DXDecompiler failed: {0}")]
    BuildFailed(String),

    #[error("Disassembler exited with status {status}: {stderr}")]
    InvocationFailed { status: String, stderr: String },

    #[error("Disassembler timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Aggregate outcome of a disassembly batch
#[derive(Debug, Default)]
pub struct RunReport {
    /// Assembly files written, in input order
    pub succeeded: Vec<PathBuf>,
    /// Artifacts whose invocation failed, with the reason
    pub failed: Vec<(PathBuf, ToolError)>,
}

/// Handle to a located DXDecompilerCmd executable
#[derive(Debug, Clone)]
pub struct Disassembler {
    exe: PathBuf,
    timeout: Duration,
}

/// Candidate executable locations under a tools directory,
/// most specific first: framework-target subdirectories before the bare
/// bin directory, Release before Debug.
fn candidates(tools_dir: &Path) -> Vec<PathBuf> {
    let bin = tools_dir
        .join("DXDecompiler")
        .join("src")
        .join("DXDecompilerCmd")
        .join("bin");

    let mut paths = Vec::new();
    for config in ["Release", "Debug"] {
        for tfm in TARGET_FRAMEWORKS {
            paths.push(bin.join(config).join(tfm).join("DXDecompilerCmd.exe"));
        }
    }
    for config in ["Release", "Debug"] {
        paths.push(bin.join(config).join("DXDecompilerCmd.exe"));
    }
    paths
}

fn run_checked(command: &mut Command, describe: &str) -> Result<(), String> {
    match command.output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => Err(format!(
            "{} exited with {}: {}",
            describe,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )),
        Err(e) => Err(format!("{} could not run: {}", describe, e)),
    }
}

impl Disassembler {
    /// Wrap an already-located executable
    pub fn new<P: Into<PathBuf>>(exe: P) -> Self {
        Self {
            exe: exe.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-invocation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the wrapped executable
    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// Search the known build-output locations for the executable
    pub fn locate(tools_dir: &Path) -> Option<Self> {
        candidates(tools_dir)
            .into_iter()
            .find(|c| c.exists())
            .map(Self::new)
    }

    /// Locate the executable, cloning and building DXDecompiler if needed
    pub fn ensure_available(tools_dir: &Path) -> Result<Self, ToolError> {
        if let Some(found) = Self::locate(tools_dir) {
            return Ok(found);
        }

        let repo = tools_dir.join("DXDecompiler");
        if !repo.join("src").join("DXDecompiler.sln").exists() {
            std::fs::create_dir_all(tools_dir)?;
            run_checked(
                Command::new("git")
                    .arg("clone")
                    .arg("--depth")
                    .arg("1")
                    .arg(DXDECOMPILER_REPO)
                    .arg(&repo),
                "git clone",
            )
            .map_err(ToolError::FetchFailed)?;
        }

        let csproj = repo
            .join("src")
            .join("DXDecompilerCmd")
            .join("DXDecompilerCmd.csproj");
        if !csproj.exists() {
            return Err(ToolError::BuildFailed(format!(
                "project not found: {}",
                csproj.display()
            )));
        }

        run_checked(
            Command::new("dotnet")
                .arg("build")
                .arg(&csproj)
                .arg("-c")
                .arg("Release"),
            "dotnet build",
        )
        .map_err(ToolError::BuildFailed)?;

        Self::locate(tools_dir).ok_or_else(|| {
            ToolError::BuildFailed("DXDecompilerCmd.exe not found after build".to_string())
        })
    }

    /// Disassemble one `.dxbc` file to assembly text
    ///
    /// Invokes `DXDecompilerCmd -a <input> -O <output>` and waits up to the
    /// configured timeout; a child still running at the deadline is killed.
    pub fn run(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        use std::io::Read;

        let mut child = Command::new(&self.exe)
            .arg("-a")
            .arg(input)
            .arg("-O")
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain stderr on its own thread; a tool that writes more than the
        // pipe buffer holds would otherwise block and never exit.
        let mut stderr_reader = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                let stderr = stderr_reader
                    .take()
                    .and_then(|handle| handle.join().ok())
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                if status.success() {
                    return Ok(());
                }
                return Err(ToolError::InvocationFailed {
                    status: status.to_string(),
                    stderr,
                });
            }

            if Instant::now() >= deadline {
                child.kill()?;
                child.wait()?;
                if let Some(handle) = stderr_reader.take() {
                    let _ = handle.join();
                }
                return Err(ToolError::Timeout(self.timeout));
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Disassemble a batch of `.dxbc` artifacts, one `.asm` next to each
    ///
    /// Failures are collected per artifact and never stop the batch.
    pub fn disassemble_all(&self, paths: &[PathBuf]) -> RunReport {
        let mut report = RunReport::default();
        for path in paths {
            let asm = asm_path(path);
            match self.run(path, &asm) {
                Ok(()) => report.succeeded.push(asm),
                Err(error) => report.failed.push((path.clone(), error)),
            }
        }
        report
    }
}

/// Sibling `.asm` path for a `.dxbc` artifact
pub fn asm_path(dxbc: &Path) -> PathBuf {
    dxbc.with_extension("asm")
}
