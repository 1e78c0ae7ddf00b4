//! External process execution

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use fuseml_core::{Error, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

/// One external command to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Text written to the process' standard input
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Command line for logs and error messages
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Runs external commands
///
/// Exit code zero is success and yields standard output. Any other exit
/// code is an `Error::ToolInvocation` carrying stdout and stderr combined.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<String>;
}

/// Runs commands as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    kubeconfig: Option<String>,
}

impl ProcessRunner {
    /// `kubeconfig` is exported as `KUBECONFIG` to every child when set
    pub fn new(kubeconfig: Option<String>) -> Self {
        Self { kubeconfig }
    }

    fn resolve_program(program: &str) -> Result<PathBuf> {
        if program.contains(std::path::MAIN_SEPARATOR) {
            return Ok(PathBuf::from(program));
        }
        which::which(program).map_err(|_| Error::not_found("executable", program))
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<String> {
        let program = Self::resolve_program(&invocation.program)?;
        debug!("Running: {}", invocation.command_line());

        let mut cmd = Command::new(&program);
        cmd.args(&invocation.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        if let Some(kubeconfig) = &self.kubeconfig {
            cmd.env("KUBECONFIG", kubeconfig);
        }

        let mut child = cmd.spawn()?;
        // Feed stdin while the output is drained
        let writer = match (child.stdin.take(), &invocation.stdin) {
            (Some(mut stdin), Some(input)) => {
                let input = input.clone();
                Some(tokio::spawn(async move {
                    stdin.write_all(input.as_bytes()).await?;
                    stdin.shutdown().await
                }))
            }
            _ => None,
        };
        let output = child.wait_with_output().await?;
        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) => debug!("Writing stdin of {} failed: {}", invocation.program, e),
                Err(e) => debug!("Stdin writer of {} aborted: {}", invocation.program, e),
                Ok(Ok(())) => {}
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        trace!("Output of {}: {}", invocation.program, stdout);

        if output.status.success() {
            if !stderr.is_empty() {
                debug!("{} stderr: {}", invocation.program, stderr.trim_end());
            }
            return Ok(stdout);
        }

        let mut combined = stdout;
        if !stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }
        Err(Error::tool_invocation(invocation.command_line(), combined))
    }
}
