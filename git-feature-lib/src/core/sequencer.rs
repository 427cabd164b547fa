//! Runs the commands of a workflow one after another.
//!
//! The first command to fail stops the sequence. Nothing is retried or rolled
//! back: the user is told which command failed and which commands are left,
//! so that they can fix the problem (e.g. a merge conflict) and finish the
//! workflow by hand.

use std::fmt::Write;

use tracing::{debug, instrument};

use crate::core::effects::Effects;
use crate::core::formatting::{COMMAND_PROMPT, COMMENT_MARKER, SEPARATOR};
use crate::core::workflow::GitCommand;
use crate::git::GitRunInfo;
use crate::util::{ExitCode, EyreExitOr};

/// Something which can execute a [`GitCommand`].
pub trait CommandRunner {
    /// Run the command to completion. Returns the exit code if it was
    /// non-zero.
    fn run_command(&self, command: &GitCommand) -> EyreExitOr<()>;
}

impl CommandRunner for GitRunInfo {
    fn run_command(&self, command: &GitCommand) -> EyreExitOr<()> {
        self.run_direct(command.args())
    }
}

/// How a command sequence ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Every command succeeded.
    Done,

    /// The command at `index` failed, and no later command was run.
    Failed {
        /// Position of the failed command in the sequence.
        index: usize,

        /// What the failed command exited with.
        exit_code: ExitCode,
    },
}

/// Print the commands which are about to be run.
pub fn print_plan(effects: &Effects, commands: &[GitCommand]) -> eyre::Result<()> {
    writeln!(
        effects.get_output_stream(),
        "{COMMENT_MARKER} Will run command sequence:"
    )?;
    for command in commands {
        writeln!(
            effects.get_output_stream(),
            "{COMMENT_MARKER} {COMMAND_PROMPT} {command}"
        )?;
    }
    writeln!(effects.get_output_stream())?;
    Ok(())
}

fn print_failure(effects: &Effects, commands: &[GitCommand], index: usize) -> eyre::Result<()> {
    let glyphs = effects.get_glyphs();
    let mut output = effects.get_output_stream();
    writeln!(output)?;
    writeln!(output, "{SEPARATOR}")?;
    writeln!(output, "{}", glyphs.render_failure("This command failed:"))?;
    writeln!(output, "{COMMAND_PROMPT} {}", commands[index])?;
    writeln!(output)?;
    let remaining_commands = &commands[index + 1..];
    if remaining_commands.is_empty() {
        writeln!(
            output,
            "Please fix it and rerun it, then the action is finished."
        )?;
    } else {
        writeln!(
            output,
            "Please fix, rerun it, and then, to finish the action, run:"
        )?;
        for command in remaining_commands {
            writeln!(output, "{COMMAND_PROMPT} {command}")?;
        }
    }
    writeln!(output, "{SEPARATOR}")?;
    Ok(())
}

/// Print the plan, then run `commands` in order until one fails.
#[instrument(skip(runner))]
pub fn run_command_sequence(
    effects: &Effects,
    runner: &dyn CommandRunner,
    commands: &[GitCommand],
) -> eyre::Result<SequenceOutcome> {
    print_plan(effects, commands)?;
    writeln!(effects.get_output_stream(), "{SEPARATOR}")?;
    writeln!(effects.get_output_stream(), "Off we go...")?;
    writeln!(effects.get_output_stream(), "{SEPARATOR}")?;

    for (index, command) in commands.iter().enumerate() {
        let prompt = format!("{COMMAND_PROMPT} {command}");
        writeln!(
            effects.get_output_stream(),
            "{}",
            effects.get_glyphs().render_command(&prompt)
        )?;
        debug!(index, %command, "Running command");
        match runner.run_command(command)? {
            Ok(()) => {
                writeln!(effects.get_output_stream())?;
            }
            Err(exit_code) => {
                debug!(index, ?exit_code, "Command failed");
                print_failure(effects, commands, index)?;
                return Ok(SequenceOutcome::Failed { index, exit_code });
            }
        }
    }

    Ok(SequenceOutcome::Done)
}
