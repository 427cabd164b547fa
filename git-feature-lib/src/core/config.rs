//! Accesses repo-specific configuration.

use eyre::Context;
use tracing::instrument;

use crate::git::{GitRunInfo, GitRunOpts};

/// Config key holding the name of the main branch on `upstream`.
pub const MAIN_BRANCH_CONFIG_KEY: &str = "feature.mainBranch";

/// Main branch name used when nothing is configured.
pub const DEFAULT_MAIN_BRANCH_NAME: &str = "master";

/// Get the name of the branch on `upstream` which features are based on.
///
/// Reads `feature.mainBranch`, and falls back to `master`.
#[instrument]
pub fn get_main_branch_name(git_run_info: &GitRunInfo) -> eyre::Result<String> {
    let result = git_run_info
        .run_silent(
            &["config", "--get", MAIN_BRANCH_CONFIG_KEY],
            GitRunOpts {
                treat_git_failure_as_error: false,
            },
        )
        .context("Reading feature.mainBranch")?;
    // `git config --get` exits with 1 if the key is unset.
    if !result.exit_code.is_success() {
        return Ok(DEFAULT_MAIN_BRANCH_NAME.to_string());
    }
    let branch_name = result.stdout_trimmed()?;
    if branch_name.is_empty() {
        Ok(DEFAULT_MAIN_BRANCH_NAME.to_string())
    } else {
        Ok(branch_name)
    }
}

/// Environment variables which affect the functioning of `git-feature`.
pub mod env_vars {
    use std::path::PathBuf;

    use tracing::instrument;

    use crate::util::get_from_path;

    /// Path to the Git executable to shell out to as a subprocess when
    /// appropriate. This may be set during tests.
    pub const TEST_GIT: &str = "TEST_GIT";

    /// "Path to wherever your core Git programs are installed". You can find
    /// the default value by running `git --exec-path`.
    ///
    /// See <https://git-scm.com/docs/git#Documentation/git.txt---exec-pathltpathgt>.
    pub const TEST_GIT_EXEC_PATH: &str = "TEST_GIT_EXEC_PATH";

    /// Get the path to the Git executable, preferring `TEST_GIT` over the
    /// `git` found on `PATH`.
    #[instrument]
    pub fn get_path_to_git() -> eyre::Result<PathBuf> {
        if let Some(path_to_git) = std::env::var_os(TEST_GIT) {
            return Ok(PathBuf::from(path_to_git));
        }
        let exe_name = if cfg!(target_os = "windows") {
            "git.exe"
        } else {
            "git"
        };
        get_from_path(exe_name).ok_or_else(|| {
            eyre::eyre!(
                "No path to Git executable was set and `{0}` is not on PATH. \
Try running as: `{1}=$(which git) cargo test ...`",
                exe_name,
                TEST_GIT,
            )
        })
    }

    /// Get the `GIT_EXEC_PATH` to use, if `TEST_GIT_EXEC_PATH` is set.
    #[instrument]
    pub fn get_git_exec_path() -> Option<PathBuf> {
        std::env::var_os(TEST_GIT_EXEC_PATH).map(PathBuf::from)
    }
}
