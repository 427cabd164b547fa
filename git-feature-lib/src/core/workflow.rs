//! The four feature-branch workflows.
//!
//! Each workflow is a fixed list of Git commands, except for `remove`, which
//! first asks the repository which of the branch's copies actually exist.
//! Building a workflow never runs a command that changes the repository; see
//! [`crate::core::sequencer`] for that.

use std::fmt::Display;

use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::git::{BranchQuery, ORIGIN_REMOTE, UPSTREAM_REMOTE};

/// One invocation of `git`, as the list of arguments following `git` itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GitCommand {
    args: Vec<String>,
}

impl GitCommand {
    /// Constructor.
    pub fn new<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The arguments to pass to `git`.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Display for GitCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "git {}", self.args.iter().join(" "))
    }
}

/// The actions which can be carried out on a feature branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Start a new feature branch from upstream's main branch.
    Create,

    /// Rebase an existing feature branch onto upstream's main branch.
    Rebase,

    /// Push a feature branch to `origin`.
    Push,

    /// Delete a feature branch locally and from `origin`.
    Remove,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Rebase => write!(f, "rebase"),
            Action::Push => write!(f, "push"),
            Action::Remove => write!(f, "remove"),
        }
    }
}

/// Repository settings which the workflows depend on.
#[derive(Clone, Debug)]
pub struct WorkflowSettings {
    /// The branch on `upstream` that features start from and rebase onto.
    pub main_branch_name: String,
}

impl WorkflowSettings {
    fn upstream_main_branch(&self) -> String {
        format!("{UPSTREAM_REMOTE}/{}", self.main_branch_name)
    }
}

/// An ordered list of commands carrying out an [`Action`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workflow {
    /// Headline shown to the user before anything runs.
    pub description: String,

    /// The commands, in the order they must be run.
    pub commands: Vec<GitCommand>,
}

/// A workflow which can't be carried out with the repository as it is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// There is nothing to remove.
    #[error("Branch '{branch_name}' not found, neither in local repository nor in 'origin' remote")]
    BranchNotFound {
        /// The feature branch which was asked for.
        branch_name: String,
    },
}

/// The headline announcing `action`, which is known before any branch has been
/// inspected.
pub fn describe_action(
    action: Action,
    feature_name: &str,
    settings: &WorkflowSettings,
) -> String {
    match action {
        Action::Create => format!("Creating feature {feature_name}"),
        Action::Rebase => format!(
            "Rebasing feature {feature_name} on top of {}",
            settings.upstream_main_branch()
        ),
        Action::Push => format!("Pushing feature {feature_name} to {ORIGIN_REMOTE}"),
        Action::Remove => format!("Removing feature {feature_name}"),
    }
}

fn submodule_update() -> GitCommand {
    GitCommand::new(["submodule", "update", "--init", "--recursive"])
}

fn push_set_upstream(feature_name: &str) -> GitCommand {
    GitCommand::new(["push", "--set-upstream", ORIGIN_REMOTE, feature_name])
}

/// Create `feature_name` from upstream's main branch and publish it.
pub fn create_feature(feature_name: &str, settings: &WorkflowSettings) -> Workflow {
    let upstream_main_branch = settings.upstream_main_branch();
    Workflow {
        description: describe_action(Action::Create, feature_name, settings),
        commands: vec![
            GitCommand::new(["fetch", UPSTREAM_REMOTE]),
            GitCommand::new([
                "checkout",
                "-b",
                feature_name,
                upstream_main_branch.as_str(),
                "--no-track",
            ]),
            submodule_update(),
            push_set_upstream(feature_name),
        ],
    }
}

/// Rebase `feature_name` onto the latest upstream main branch.
pub fn rebase_feature(feature_name: &str, settings: &WorkflowSettings) -> Workflow {
    let upstream_main_branch = settings.upstream_main_branch();
    Workflow {
        description: describe_action(Action::Rebase, feature_name, settings),
        commands: vec![
            GitCommand::new(["fetch", UPSTREAM_REMOTE]),
            GitCommand::new(["checkout", feature_name]),
            GitCommand::new(["rebase", upstream_main_branch.as_str()]),
            submodule_update(),
        ],
    }
}

/// Push `feature_name` to `origin`, e.g. to open a pull request from it.
pub fn push_feature(feature_name: &str, settings: &WorkflowSettings) -> Workflow {
    Workflow {
        description: describe_action(Action::Push, feature_name, settings),
        commands: vec![push_set_upstream(feature_name)],
    }
}

/// Delete whichever copies of `feature_name` exist, locally and on `origin`.
///
/// If `feature_name` is checked out, the working copy is first moved to the
/// upstream main branch so that the local branch can be deleted.
#[instrument(skip(branch_query))]
pub fn remove_feature(
    feature_name: &str,
    settings: &WorkflowSettings,
    branch_query: &dyn BranchQuery,
) -> eyre::Result<Result<Workflow, WorkflowError>> {
    let mut commands = Vec::new();

    let current_branch = branch_query.current_branch()?;
    if current_branch.as_deref() == Some(feature_name) {
        commands.push(GitCommand::new([
            "checkout".to_string(),
            settings.upstream_main_branch(),
        ]));
    }

    let has_local_branch = branch_query.has_local_branch(feature_name)?;
    if has_local_branch {
        commands.push(GitCommand::new(["branch", "-d", feature_name]));
    }

    let has_remote_branch = branch_query.has_remote_branch(ORIGIN_REMOTE, feature_name)?;
    if has_remote_branch {
        commands.push(GitCommand::new([
            "push".to_string(),
            ORIGIN_REMOTE.to_string(),
            format!(":{feature_name}"),
        ]));
    }

    debug!(
        ?current_branch,
        has_local_branch, has_remote_branch, "Inspected branch to remove"
    );
    if commands.is_empty() {
        return Ok(Err(WorkflowError::BranchNotFound {
            branch_name: feature_name.to_string(),
        }));
    }

    Ok(Ok(Workflow {
        description: describe_action(Action::Remove, feature_name, settings),
        commands,
    }))
}

/// Build the workflow which carries out `action` on `feature_name`.
pub fn build_workflow(
    action: Action,
    feature_name: &str,
    settings: &WorkflowSettings,
    branch_query: &dyn BranchQuery,
) -> eyre::Result<Result<Workflow, WorkflowError>> {
    let workflow = match action {
        Action::Create => create_feature(feature_name, settings),
        Action::Rebase => rebase_feature(feature_name, settings),
        Action::Push => push_feature(feature_name, settings),
        Action::Remove => return remove_feature(feature_name, settings, branch_query),
    };
    Ok(Ok(workflow))
}
