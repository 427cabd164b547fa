use tracing::{debug, instrument};

use crate::git::{GitRunInfo, GitRunOpts};

/// Questions about branches that a workflow may need answered before it
/// decides which commands to run.
pub trait BranchQuery {
    /// The name of the branch currently checked out, or `HEAD` if it is
    /// detached. `None` if it can't be determined, such as in a repository
    /// without commits.
    fn current_branch(&self) -> eyre::Result<Option<String>>;

    /// Whether a local branch with this name exists.
    fn has_local_branch(&self, branch_name: &str) -> eyre::Result<bool>;

    /// Whether the given remote has a branch with this name.
    fn has_remote_branch(&self, remote_name: &str, branch_name: &str) -> eyre::Result<bool>;
}

impl BranchQuery for GitRunInfo {
    #[instrument]
    fn current_branch(&self) -> eyre::Result<Option<String>> {
        let result = self.run_silent(
            &["rev-parse", "--abbrev-ref", "HEAD"],
            GitRunOpts {
                treat_git_failure_as_error: false,
            },
        )?;
        if !result.exit_code.is_success() {
            debug!(?result, "Could not determine current branch");
            return Ok(None);
        }
        Ok(Some(result.stdout_trimmed()?))
    }

    #[instrument]
    fn has_local_branch(&self, branch_name: &str) -> eyre::Result<bool> {
        let reference_name = format!("refs/heads/{branch_name}");
        let result = self.run_silent(
            &["rev-parse", "--verify", "--quiet", &reference_name],
            GitRunOpts {
                treat_git_failure_as_error: false,
            },
        )?;
        Ok(result.exit_code.is_success())
    }

    #[instrument]
    fn has_remote_branch(&self, remote_name: &str, branch_name: &str) -> eyre::Result<bool> {
        // A bare branch name would also match `refs/heads/*/<branch_name>`.
        let reference_name = format!("refs/heads/{branch_name}");
        let result = self.run_silent(
            &["ls-remote", "--heads", remote_name, &reference_name],
            GitRunOpts::default(),
        )?;
        Ok(!result.stdout_trimmed()?.is_empty())
    }
}
