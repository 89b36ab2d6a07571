//! External command execution
//!
//! Every `hg`/`git` call goes through a [`CommandRunner`]. Failures are
//! classified here, once, into a [`Condition`] so callers can recognise
//! benign outcomes without looking at the tool's wording themselves.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// Known failure conditions reported by the external tool
///
/// Detection keys off message fragments printed by Mercurial. Those strings
/// are not a stable interface; a Mercurial release that rewords them will
/// turn these into plain failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// `hg remove --after` refused to remove a file that is still on disk
    StillExists,
    /// `hg merge`/`hg commit` found no other head to merge
    NothingToMerge,
    /// The merge target is an ancestor of the working directory
    WorkingDirectoryAncestor,
    /// The source repository does not exist
    NotFound,
}

const CONDITION_PATTERNS: &[(&str, Condition)] = &[
    ("still exists", Condition::StillExists),
    ("nothing to merge", Condition::NothingToMerge),
    (
        "merging with a working directory ancestor",
        Condition::WorkingDirectoryAncestor,
    ),
    ("not found", Condition::NotFound),
];

impl Condition {
    /// Classify the output of a failed command
    pub fn classify(output: &str) -> Option<Self> {
        CONDITION_PATTERNS
            .iter()
            .find(|(pattern, _)| output.contains(pattern))
            .map(|(_, condition)| *condition)
    }
}

/// A single external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute
    pub program: String,
    /// Arguments, in order
    pub args: Vec<OsString>,
    /// Working directory, inherited when `None`
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    /// Start building an invocation of `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in the given directory
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// The first argument, usually the subcommand
    pub fn subcommand(&self) -> Option<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy())
            .find(|a| !a.starts_with('-') && !a.contains('='))
            .map(|a| a.into_owned())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        if let Some(sub) = self.subcommand() {
            write!(f, " {}", sub)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Whether the command exited with status zero
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a failed output into an [`Error::Command`], classifying it
    pub fn into_result(self, invocation: &Invocation) -> Result<CommandOutput> {
        if self.success() {
            return Ok(self);
        }

        // Warnings and aborts can land on either stream.
        let message = match (self.stderr.trim(), self.stdout.trim()) {
            ("", out) => out.to_string(),
            (err, "") => err.to_string(),
            (err, out) => format!("{}\n{}", err, out),
        };

        Err(Error::Command {
            command: invocation.to_string(),
            condition: Condition::classify(&message),
            message,
        })
    }
}

/// Executes external commands
#[async_trait]
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Run a command to completion and capture its output
    ///
    /// Implementations return `Ok` for any command that ran, whatever its
    /// exit status; use [`CommandOutput::into_result`] to check it.
    async fn output(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Run a command and fail unless it exits successfully
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.output(invocation).await?.into_result(invocation)
    }
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// Create a runner without a timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill commands that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!(
            program = %invocation.program,
            args = ?invocation.args,
            cwd = ?invocation.cwd,
            "Running command"
        );

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref cwd) = invocation.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &invocation.envs {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Command {
                    command: invocation.to_string(),
                    message: format!("executable '{}' not found in PATH", invocation.program),
                    condition: None,
                }
            } else {
                Error::Io(e)
            }
        })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| Error::Command {
                    command: invocation.to_string(),
                    message: format!("timed out after {:?}", limit),
                    condition: None,
                })??,
            None => child.wait_with_output().await?,
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_conditions() {
        assert_eq!(
            Condition::classify("not removing foo/a.txt: file still exists"),
            Some(Condition::StillExists)
        );
        assert_eq!(
            Condition::classify("abort: nothing to merge"),
            Some(Condition::NothingToMerge)
        );
        assert_eq!(
            Condition::classify("abort: merging with a working directory ancestor has no effect"),
            Some(Condition::WorkingDirectoryAncestor)
        );
        assert_eq!(
            Condition::classify("abort: repository /tmp/nope not found"),
            Some(Condition::NotFound)
        );
        assert_eq!(Condition::classify("abort: no username supplied"), None);
    }

    #[test]
    fn test_into_result_classifies_failure() {
        let invocation = Invocation::new("hg").arg("remove").arg("--after");
        let output = CommandOutput {
            stdout: String::new(),
            stderr: "not removing repoA/README: file still exists\n".to_string(),
            code: Some(1),
        };

        let err = output.into_result(&invocation).unwrap_err();
        match err {
            Error::Command {
                command,
                message,
                condition,
            } => {
                assert_eq!(command, "hg remove");
                assert_eq!(message, "not removing repoA/README: file still exists");
                assert_eq!(condition, Some(Condition::StillExists));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_into_result_passes_success() {
        let invocation = Invocation::new("hg").arg("add");
        let output = CommandOutput {
            stdout: "adding a\n".to_string(),
            stderr: String::new(),
            code: Some(0),
        };
        assert_eq!(output.into_result(&invocation).unwrap().stdout, "adding a\n");
    }

    #[test]
    fn test_display_skips_global_options() {
        let invocation = Invocation::new("hg")
            .args(["--config", "ui.username=bot"])
            .arg("commit");
        assert_eq!(invocation.subcommand().as_deref(), Some("commit"));
        assert_eq!(invocation.to_string(), "hg commit");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let runner = SystemRunner::new();
        let output = runner
            .run(&Invocation::new("sh").args(["-c", "echo hello"]))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_reports_failure() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&Invocation::new("sh").args(["-c", "echo 'abort: nothing to merge' >&2; exit 255"]))
            .await
            .unwrap_err();
        assert_eq!(err.condition(), Some(Condition::NothingToMerge));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_timeout() {
        let runner = SystemRunner::new().with_timeout(Some(Duration::from_millis(100)));
        let err = runner
            .run(&Invocation::new("sh").args(["-c", "sleep 5"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&Invocation::new("hgmerge-definitely-not-installed"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found in PATH"));
    }
}
