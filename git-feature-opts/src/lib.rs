//! The command-line options for `git-feature`.

#![warn(missing_docs)]
#![warn(
    clippy::all,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro
)]
#![allow(clippy::too_many_arguments)]

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use lib::core::workflow::Action;

/// Usage examples shown at the end of `--help`.
const EXAMPLES: &str = "\
Examples:
  $> git-feature create myfeature   # Creates and checks out new feature 'myfeature'
  $> git-feature rebase myfeature   # Rebases 'myfeature' on top of current upstream/master
  $> git-feature push myfeature     # Pushes 'myfeature' to origin for creation of a pull request
  $> git-feature remove myfeature   # Removes 'myfeature' from local and 'origin' remote";

/// Whether to display terminal colors.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ColorSetting {
    /// Automatically determine whether to display colors from the terminal and environment variables.
    /// This is the default behavior.
    Auto,
    /// Always display terminal colors.
    Always,
    /// Never display terminal colors.
    Never,
}

/// What to do with the feature branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FeatureAction {
    /// Create and check out a new feature branch based on upstream/master, and
    /// push it to origin.
    Create,

    /// Rebase the feature branch on top of the current upstream/master.
    Rebase,

    /// Push the feature branch to origin, e.g. to open a pull request.
    Push,

    /// Remove the feature branch locally and from origin.
    Remove,
}

impl From<FeatureAction> for Action {
    fn from(action: FeatureAction) -> Self {
        match action {
            FeatureAction::Create => Action::Create,
            FeatureAction::Rebase => Action::Rebase,
            FeatureAction::Push => Action::Push,
            FeatureAction::Remove => Action::Remove,
        }
    }
}

/// Global arguments.
#[derive(Debug, Parser)]
pub struct GlobalArgs {
    /// Change to the given directory before executing the rest of the program.
    /// (The option is called `-C` for symmetry with Git.)
    #[clap(value_parser, short = 'C', global = true)]
    pub working_directory: Option<PathBuf>,

    /// Flag to force enable or disable terminal colors.
    #[clap(value_parser, long = "color", value_enum, global = true)]
    pub color: Option<ColorSetting>,
}

/// Options which only affect how the workflow is carried out.
#[derive(Args, Debug, Default)]
pub struct RunOptions {
    /// Only print the commands that would be run, without running them.
    #[clap(action, long = "dry-run")]
    pub dry_run: bool,
}

/// Create, rebase and delete git feature branches.
#[derive(Debug, Parser)]
#[clap(name = "git-feature", version = env!("CARGO_PKG_VERSION"), after_help = EXAMPLES)]
pub struct Opts {
    /// Global arguments.
    #[clap(flatten)]
    pub global_args: GlobalArgs,

    /// Options for running the workflow.
    #[clap(flatten)]
    pub run_options: RunOptions,

    /// The action to carry out.
    #[clap(value_enum)]
    pub action: FeatureAction,

    /// The name of the feature branch.
    #[clap(value_parser)]
    pub feature_name: String,
}
