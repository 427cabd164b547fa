//! Testing utilities.
//!
//! This is inside `src` rather than `tests` since both this crate's tests and
//! the `git-feature` binary's tests use it.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::process::Command;

use eyre::Context;
use itertools::Itertools;
use once_cell::sync::OnceCell;
use tempfile::TempDir;
use tracing::instrument;

use crate::core::config::env_vars::{get_git_exec_path, get_path_to_git};
use crate::git::{GitRunInfo, RemotePolicy};

const DUMMY_NAME: &str = "Testy McTestface";
const DUMMY_EMAIL: &str = "test@example.com";
const DUMMY_DATE: &str = "Wed 29 Oct 12:34:56 2020 PDT";

/// Wrapper around the Git executable, for testing.
#[derive(Clone, Debug)]
pub struct Git {
    /// The path to the repository on disk. The directory itself must exist,
    /// although it might not have a `.git` folder in it. (Use `Git::init_repo`
    /// to initialize it.)
    pub repo_path: PathBuf,

    /// The path to the Git executable on disk.
    pub path_to_git: PathBuf,

    /// The `GIT_EXEC_PATH` environment variable value to use for testing, if
    /// any.
    pub git_exec_path: Option<PathBuf>,
}

/// Options for `Git::run_with_options`.
#[derive(Debug, Default)]
pub struct GitRunOptions {
    /// The timestamp of the command. Mostly useful for `git commit`. This should
    /// be a number like 0, 1, 2, 3...
    pub time: isize,

    /// The exit code that the process should return.
    pub expected_exit_code: i32,

    /// Additional environment variables to start the process with.
    pub env: HashMap<String, String>,
}

impl Git {
    /// Constructor.
    pub fn new(path_to_git: PathBuf, repo_path: PathBuf, git_exec_path: Option<PathBuf>) -> Self {
        Git {
            repo_path,
            path_to_git,
            git_exec_path,
        }
    }

    /// Replace dynamic strings in the output, for testing purposes.
    pub fn preprocess_output(&self, output: String) -> eyre::Result<String> {
        // NB: tests which run on Windows are unlikely to succeed due to this
        // `canonicalize` call.
        let repo_path = std::fs::canonicalize(&self.repo_path)?;
        let repo_path = repo_path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Could not convert repo path to string"))?;
        Ok(output.replace(repo_path, "<repo-path>"))
    }

    /// Get the environment variables needed to run git in the test environment.
    pub fn get_base_env(&self, time: isize) -> Vec<(OsString, OsString)> {
        // Required for determinism, as these values will be baked into the commit
        // hash.
        let date: OsString = format!("{DUMMY_DATE} -{time:0>2}").into();

        // ":" is understood by `git` to skip editing.
        let git_editor = OsString::from(":");

        let mut envs = vec![
            ("GIT_CONFIG_NOSYSTEM", OsString::from("1")),
            ("GIT_AUTHOR_DATE", date.clone()),
            ("GIT_COMMITTER_DATE", date),
            ("GIT_EDITOR", git_editor),
            ("GIT_TERMINAL_PROMPT", OsString::from("0")),
            ("PATH", std::env::var_os("PATH").unwrap_or_default()),
        ];
        if let Some(git_exec_path) = &self.git_exec_path {
            envs.push(("GIT_EXEC_PATH", git_exec_path.as_os_str().into()));
        }

        envs.into_iter()
            .map(|(key, value)| (OsString::from(key), value))
            .collect()
    }

    fn run_program_inner(
        &self,
        program: &Path,
        args: &[&str],
        options: &GitRunOptions,
    ) -> eyre::Result<(String, String)> {
        let GitRunOptions {
            time,
            expected_exit_code,
            env,
        } = options;

        let env: BTreeMap<_, _> = self
            .get_base_env(*time)
            .into_iter()
            .chain(
                env.iter()
                    .map(|(k, v)| (OsString::from(k), OsString::from(v))),
            )
            .collect();
        let result = Command::new(program)
            .current_dir(&self.repo_path)
            .args(args)
            .env_clear()
            .envs(&env)
            .output()
            .wrap_err_with(|| {
                format!(
                    "Running {:?}
                    Args: {:?}
                    Env: <not shown>",
                    program, &args
                )
            })?;

        let exit_code = result
            .status
            .code()
            .ok_or_else(|| eyre::eyre!("Process {program:?} was terminated by a signal"))?;
        if exit_code != *expected_exit_code {
            eyre::bail!(
                "Command {:?} {:?} exited with unexpected code {} (expected {})
stdout:
{}
stderr:
{}",
                program,
                &args,
                exit_code,
                expected_exit_code,
                &String::from_utf8_lossy(&result.stdout),
                &String::from_utf8_lossy(&result.stderr),
            )
        }
        let stdout = String::from_utf8(result.stdout)?;
        let stdout = self.preprocess_output(stdout)?;
        let stderr = String::from_utf8(result.stderr)?;
        let stderr = self.preprocess_output(stderr)?;
        Ok((stdout, stderr))
    }

    /// Run a Git command.
    pub fn run_with_options<S: AsRef<str> + std::fmt::Debug>(
        &self,
        args: &[S],
        options: &GitRunOptions,
    ) -> eyre::Result<(String, String)> {
        self.run_program_inner(
            &self.path_to_git,
            args.iter().map(|arg| arg.as_ref()).collect_vec().as_slice(),
            options,
        )
    }

    /// Run a Git command.
    pub fn run<S: AsRef<str> + std::fmt::Debug>(
        &self,
        args: &[S],
    ) -> eyre::Result<(String, String)> {
        self.run_with_options(args, &Default::default())
    }

    /// Run the `git-feature` executable built by Cargo in this repository.
    ///
    /// Only works from the tests of the `git-feature` package, since Cargo
    /// doesn't build binaries of other packages for integration tests.
    #[instrument]
    pub fn feature_with_options(
        &self,
        args: &[&str],
        options: &GitRunOptions,
    ) -> eyre::Result<(String, String)> {
        let program = assert_cmd::cargo::cargo_bin("git-feature");
        let mut env = options.env.clone();
        env.entry("TEST_GIT".to_string()).or_insert_with(|| {
            self.path_to_git.to_string_lossy().into_owned()
        });
        let options = GitRunOptions {
            env,
            ..*options
        };
        self.run_program_inner(&program, args, &options)
    }

    /// Convenience method to call `feature_with_options` with the default
    /// options.
    pub fn feature(&self, args: &[&str]) -> eyre::Result<(String, String)> {
        self.feature_with_options(args, &Default::default())
    }

    /// Set up a Git repo in the directory with an initial commit on `master`.
    #[instrument]
    pub fn init_repo(&self) -> eyre::Result<()> {
        self.run(&["-c", "init.defaultBranch=master", "init"])?;
        self.run(&["config", "user.name", DUMMY_NAME])?;
        self.run(&["config", "user.email", DUMMY_EMAIL])?;

        // Disable warnings of the following form on Windows:
        //
        // ```
        // warning: LF will be replaced by CRLF in initial.txt.
        // The file will have its original line endings in your working directory
        // ```
        self.run(&["config", "core.autocrlf", "false"])?;

        self.commit_file("initial", 0)?;
        Ok(())
    }

    /// Set up a bare Git repo in the directory, suitable for pushing to.
    pub fn init_bare_repo(&self) -> eyre::Result<()> {
        self.run(&["-c", "init.defaultBranch=master", "init", "--bare"])?;
        Ok(())
    }

    /// Write the provided contents to the provided file in the repository root.
    pub fn write_file(&self, name: &str, contents: &str) -> eyre::Result<()> {
        let path = self.repo_path.join(format!("{name}.txt"));
        std::fs::write(&path, contents)?;
        Ok(())
    }

    /// Commit a file with given contents and message. The `time` argument is
    /// used to set the commit timestamp, which is factored into the commit
    /// hash.
    #[instrument]
    pub fn commit_file_with_contents(
        &self,
        name: &str,
        time: isize,
        contents: &str,
    ) -> eyre::Result<()> {
        self.write_file(name, contents)?;
        self.run(&["add", "."])?;
        self.run_with_options(
            &["commit", "-m", &format!("create {name}.txt")],
            &GitRunOptions {
                time,
                ..Default::default()
            },
        )?;
        Ok(())
    }

    /// Commit a file with default contents. The `time` argument is used to set
    /// the commit timestamp, which is factored into the commit hash.
    pub fn commit_file(&self, name: &str, time: isize) -> eyre::Result<()> {
        self.commit_file_with_contents(name, time, &format!("{name} contents\n"))
    }

    /// Get a `GitRunInfo` which runs Git in this repository with the test
    /// environment.
    pub fn get_git_run_info(&self) -> GitRunInfo {
        GitRunInfo {
            path_to_git: self.path_to_git.clone(),
            working_directory: self.repo_path.clone(),
            env: self.get_base_env(0).into_iter().collect(),
        }
    }
}

/// Wrapper around a `Git` instance which cleans up the repository once dropped.
pub struct GitWrapper {
    _repo_dir: TempDir,
    git: Git,
}

impl Deref for GitWrapper {
    type Target = Git;

    fn deref(&self) -> &Self::Target {
        &self.git
    }
}

static COLOR_EYRE_INSTALL: OnceCell<()> = OnceCell::new();

/// Create a temporary directory for testing and a `Git` instance to use with it.
pub fn make_git() -> eyre::Result<GitWrapper> {
    COLOR_EYRE_INSTALL.get_or_try_init(color_eyre::install)?;

    let repo_dir = tempfile::tempdir()?;
    let path_to_git = get_path_to_git()?;
    let git_exec_path = get_git_exec_path();
    let git = Git::new(path_to_git, repo_dir.path().to_path_buf(), git_exec_path);
    Ok(GitWrapper {
        _repo_dir: repo_dir,
        git,
    })
}

/// Represents a working repository and a bare repository acting as its
/// `origin`. Both directories are cleaned up once this value is dropped.
pub struct GitWrapperWithRemoteRepo {
    /// Guard to clean up the containing temporary directory. Make sure to bind
    /// this to a local variable not named `_`.
    pub temp_dir: TempDir,

    /// The bare repository standing in for the remote.
    pub remote_repo: Git,

    /// The working repository, with `origin` pointing to `remote_repo`.
    pub local_repo: Git,
}

/// Create a [`GitWrapperWithRemoteRepo`]. Both repositories are initialized,
/// and `master` has been pushed to the remote.
pub fn make_git_with_remote_repo() -> eyre::Result<GitWrapperWithRemoteRepo> {
    COLOR_EYRE_INSTALL.get_or_try_init(color_eyre::install)?;

    let path_to_git = get_path_to_git()?;
    let git_exec_path = get_git_exec_path();
    let temp_dir = tempfile::tempdir()?;

    let remote_repo_path = temp_dir.path().join("remote.git");
    std::fs::create_dir_all(&remote_repo_path)?;
    let remote_repo = Git::new(
        path_to_git.clone(),
        remote_repo_path.clone(),
        git_exec_path.clone(),
    );
    remote_repo.init_bare_repo()?;

    let local_repo_path = temp_dir.path().join("local");
    std::fs::create_dir_all(&local_repo_path)?;
    let local_repo = Git::new(path_to_git, local_repo_path, git_exec_path);
    local_repo.init_repo()?;

    let remote_url = remote_repo_path
        .to_str()
        .ok_or_else(|| eyre::eyre!("Could not convert remote path to string"))?;
    local_repo.run(&["remote", "add", "origin", remote_url])?;
    local_repo.run(&["push", "--quiet", "origin", "master"])?;

    Ok(GitWrapperWithRemoteRepo {
        temp_dir,
        remote_repo,
        local_repo,
    })
}

/// Represents the repositories of a fork-based workflow: an official
/// repository, a fork of it, and a working repository with the official
/// repository as `upstream` and the fork as `origin`. Everything lives in
/// local directories, so [`GitWrapperWithForkSetup::remote_policy`] must be
/// used to accept their URLs.
pub struct GitWrapperWithForkSetup {
    /// Guard to clean up the containing temporary directory. Make sure to bind
    /// this to a local variable not named `_`.
    pub temp_dir: TempDir,

    /// The bare repository standing in for the official repository.
    pub upstream_repo: Git,

    /// The bare repository standing in for the contributor's fork.
    pub origin_repo: Git,

    /// The working repository.
    pub local_repo: Git,
}

impl GitWrapperWithForkSetup {
    fn url_prefix(&self, dir_name: &str) -> eyre::Result<String> {
        let path = self.temp_dir.path().join(dir_name);
        let path = path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Could not convert path to string: {path:?}"))?;
        Ok(format!("{path}/"))
    }

    /// A policy accepting this setup's official repository and fork.
    pub fn remote_policy(&self) -> eyre::Result<RemotePolicy> {
        RemotePolicy::new(&[self.url_prefix("official")?])?
            .with_fork_url_prefixes(&[self.url_prefix("forks")?])
    }
}

/// Create a [`GitWrapperWithForkSetup`]. The working repository has an
/// initial commit on `master`, which has been pushed to both remotes.
pub fn make_git_with_fork_setup() -> eyre::Result<GitWrapperWithForkSetup> {
    COLOR_EYRE_INSTALL.get_or_try_init(color_eyre::install)?;

    let path_to_git = get_path_to_git()?;
    let git_exec_path = get_git_exec_path();
    let temp_dir = tempfile::tempdir()?;

    let make_repo = |path: PathBuf| -> eyre::Result<Git> {
        std::fs::create_dir_all(&path)?;
        Ok(Git::new(path_to_git.clone(), path, git_exec_path.clone()))
    };
    let upstream_repo = make_repo(temp_dir.path().join("official").join("onnx.git"))?;
    upstream_repo.init_bare_repo()?;
    let origin_repo = make_repo(
        temp_dir
            .path()
            .join("forks")
            .join("someone")
            .join("onnx.git"),
    )?;
    origin_repo.init_bare_repo()?;
    let local_repo = make_repo(temp_dir.path().join("local"))?;
    local_repo.init_repo()?;

    for (name, repo) in [("upstream", &upstream_repo), ("origin", &origin_repo)] {
        let url = repo
            .repo_path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Could not convert remote path to string"))?;
        local_repo.run(&["remote", "add", name, url])?;
        local_repo.run(&["push", "--quiet", name, "master"])?;
    }

    Ok(GitWrapperWithForkSetup {
        temp_dir,
        upstream_repo,
        origin_repo,
        local_repo,
    })
}
