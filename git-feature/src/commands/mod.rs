//! Sub-commands of `git-feature`.

mod feature;

pub use feature::{run_feature_action, FeatureRequest};

use git_feature_invoke::CommandContext;
use git_feature_opts::Opts;
use lib::git::RemotePolicy;
use lib::util::EyreExitOr;

/// Entry point for the `git-feature` executable.
pub fn command_main(ctx: CommandContext, opts: Opts) -> EyreExitOr<()> {
    let CommandContext {
        effects,
        git_run_info,
    } = ctx;
    let Opts {
        global_args: _,
        run_options,
        action,
        feature_name,
    } = opts;

    run_feature_action(
        &effects,
        &git_run_info,
        &RemotePolicy::default(),
        &FeatureRequest {
            action: action.into(),
            feature_name,
            dry_run: run_options.dry_run,
        },
    )
}
