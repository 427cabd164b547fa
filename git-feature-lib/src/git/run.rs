use std::collections::HashMap;
use std::convert::TryInto;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use eyre::Context;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::util::{ExitCode, EyreExitOr};

/// Path to the `git` executable on disk to be executed.
#[derive(Clone)]
pub struct GitRunInfo {
    /// The path to the Git executable on disk.
    pub path_to_git: PathBuf,

    /// The working directory that the Git executable should be run in.
    pub working_directory: PathBuf,

    /// The environment variables that should be passed to the Git process.
    pub env: HashMap<OsString, OsString>,
}

impl std::fmt::Debug for GitRunInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<GitRunInfo path_to_git={:?} working_directory={:?} env=not shown>",
            self.path_to_git, self.working_directory
        )
    }
}

/// Options for invoking Git.
pub struct GitRunOpts {
    /// If set, a non-zero exit code will be treated as an error.
    pub treat_git_failure_as_error: bool,
}

impl Default for GitRunOpts {
    fn default() -> Self {
        Self {
            treat_git_failure_as_error: true,
        }
    }
}

/// The result of invoking Git.
#[must_use]
pub struct GitRunResult {
    /// The exit code of the process.
    pub exit_code: ExitCode,

    /// The stdout contents written by the invocation.
    pub stdout: Vec<u8>,

    /// The stderr contents written by the invocation.
    pub stderr: Vec<u8>,
}

impl std::fmt::Debug for GitRunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<GitRunResult exit_code={:?} stdout={:?} stderr={:?}>",
            self.exit_code,
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr),
        )
    }
}

impl GitRunResult {
    /// Decode stdout as UTF-8, without the trailing newline.
    pub fn stdout_trimmed(&self) -> eyre::Result<String> {
        let stdout = std::str::from_utf8(&self.stdout).wrap_err("Decoding Git stdout")?;
        Ok(stdout.trim().to_string())
    }
}

impl GitRunInfo {
    fn make_command(&self, args: &[&OsStr]) -> Command {
        let GitRunInfo {
            path_to_git,
            working_directory,
            env,
        } = self;

        let mut command = Command::new(path_to_git);
        command.current_dir(working_directory);
        command.args(args);
        command.env_clear();
        command.envs(env.iter());
        command
    }

    fn run_direct_inner(&self, args: &[&OsStr]) -> EyreExitOr<()> {
        let mut command = self.make_command(args);
        let mut child = command.spawn().wrap_err("Spawning Git subprocess")?;
        let exit_status = child
            .wait()
            .wrap_err("Waiting for Git subprocess to complete")?;

        let exit_code: ExitCode = exit_status
            .try_into()
            .wrap_err("Converting exit code from i32 to isize")?;
        debug!(?exit_code, "Git subprocess finished");
        if exit_code.is_success() {
            Ok(Ok(()))
        } else {
            Ok(Err(exit_code))
        }
    }

    /// Run Git in a subprocess attached to our own stdin, stdout and stderr.
    ///
    /// This is suitable for commands which affect the working copy or talk to
    /// a remote: the user sees their progress output and can answer any
    /// credential prompts.
    ///
    /// `args` contains the list of arguments to pass to Git, not including the Git
    /// executable itself.
    ///
    /// Returns the exit code of Git (non-zero signifies error).
    #[instrument]
    #[must_use = "The return code for `GitRunInfo::run_direct` must be checked"]
    pub fn run_direct<S: AsRef<OsStr> + std::fmt::Debug>(&self, args: &[S]) -> EyreExitOr<()> {
        self.run_direct_inner(args.iter().map(AsRef::as_ref).collect_vec().as_slice())
    }

    fn run_silent_inner(&self, args: &[&str], opts: GitRunOpts) -> eyre::Result<GitRunResult> {
        let GitRunOpts {
            treat_git_failure_as_error,
        } = opts;

        let mut command = self.make_command(
            args.iter()
                .map(|arg| OsStr::new(*arg))
                .collect_vec()
                .as_slice(),
        );
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let output = command
            .output()
            .wrap_err("Spawning Git subprocess")?;
        let exit_code: ExitCode = output
            .status
            .try_into()
            .wrap_err("Converting exit code from i32 to isize")?;
        let result = GitRunResult {
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        };
        debug!(?args, ?result, "Ran Git silently");
        if treat_git_failure_as_error && !exit_code.is_success() {
            eyre::bail!(
                "Git subprocess failed:\nArgs: {:?}\nResult: {:?}",
                &args,
                result
            );
        }
        Ok(result)
    }

    /// Run Git silently (don't display output to the user).
    ///
    /// Returns the captured output of the Git invocation.
    #[instrument(skip(opts))]
    pub fn run_silent<S: AsRef<str> + std::fmt::Debug>(
        &self,
        args: &[S],
        opts: GitRunOpts,
    ) -> eyre::Result<GitRunResult> {
        self.run_silent_inner(
            args.iter().map(AsRef::as_ref).collect_vec().as_slice(),
            opts,
        )
    }
}
