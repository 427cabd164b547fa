use std::fmt::Write;

use tracing::{info, instrument};

use lib::core::config::get_main_branch_name;
use lib::core::effects::Effects;
use lib::core::formatting::SEPARATOR;
use lib::core::sequencer::{print_plan, run_command_sequence, SequenceOutcome};
use lib::core::workflow::{
    build_workflow, describe_action, Action, WorkflowSettings,
};
use lib::git::{read_remotes, GitRunInfo, RemotePolicy};
use lib::util::{ExitCode, EyreExitOr};

/// What the user asked for.
#[derive(Clone, Debug)]
pub struct FeatureRequest {
    /// The action to carry out.
    pub action: Action,

    /// The feature branch to carry it out on.
    pub feature_name: String,

    /// Print the commands instead of running them.
    pub dry_run: bool,
}

fn print_error(effects: &Effects, message: &str) -> eyre::Result<()> {
    writeln!(
        effects.get_output_stream(),
        "{}",
        effects
            .get_glyphs()
            .render_error(&format!("Error: {message}"))
    )?;
    Ok(())
}

fn print_banner(effects: &Effects, description: &str) -> eyre::Result<()> {
    let mut output = effects.get_output_stream();
    writeln!(output, "{SEPARATOR}")?;
    writeln!(output, "{description}")?;
    writeln!(output, "{SEPARATOR}")?;
    Ok(())
}

/// Check the remotes, then build and run the workflow for `request`.
///
/// Nothing which changes the repository is run unless the remotes are set up
/// as `policy` requires.
#[instrument(skip(policy))]
pub fn run_feature_action(
    effects: &Effects,
    git_run_info: &GitRunInfo,
    policy: &RemotePolicy,
    request: &FeatureRequest,
) -> EyreExitOr<()> {
    let FeatureRequest {
        action,
        feature_name,
        dry_run,
    } = request;

    let remotes = read_remotes(git_run_info)?;
    if let Err(err) = policy.validate(&remotes) {
        print_error(effects, &err.to_string())?;
        return Ok(Err(ExitCode(1)));
    }

    let settings = WorkflowSettings {
        main_branch_name: get_main_branch_name(git_run_info)?,
    };
    print_banner(effects, &describe_action(*action, feature_name, &settings))?;
    let workflow = match build_workflow(*action, feature_name, &settings, git_run_info)? {
        Ok(workflow) => workflow,
        Err(err) => {
            print_error(effects, &err.to_string())?;
            return Ok(Err(ExitCode(1)));
        }
    };

    if *dry_run {
        print_plan(effects, &workflow.commands)?;
        return Ok(Ok(()));
    }

    match run_command_sequence(effects, git_run_info, &workflow.commands)? {
        SequenceOutcome::Done => Ok(Ok(())),
        SequenceOutcome::Failed { index, exit_code } => {
            info!(%action, index, ?exit_code, "Workflow stopped");
            Ok(Err(ExitCode(1)))
        }
    }
}
