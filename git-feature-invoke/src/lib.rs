//! Process setup shared by every `git-feature` entry point: global arguments,
//! working directory, terminal colors, logging and exit codes.

#![warn(missing_docs)]
#![warn(
    clippy::all,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro
)]
#![allow(clippy::too_many_arguments, clippy::blocks_in_conditions)]

use std::any::Any;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::SystemTime;

use clap::{CommandFactory, FromArgMatches, Parser};
use eyre::Context;
use git_feature_opts::{ColorSetting, GlobalArgs};
use lib::core::config::env_vars::{get_git_exec_path, get_path_to_git};
use lib::core::effects::Effects;
use lib::core::formatting::Glyphs;
use lib::git::GitRunInfo;
use lib::util::{ExitCode, EyreExitOr};
use tracing::instrument;
use tracing::level_filters::LevelFilter;
use tracing_chrome::ChromeLayerBuilder;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Shared context for all commands.
#[derive(Clone, Debug)]
pub struct CommandContext {
    /// The `Effects` to use.
    pub effects: Effects,

    /// Information about the Git executable currently being used.
    pub git_run_info: GitRunInfo,
}

/// Environment variable counting how many `git-feature` processes are running
/// inside each other, so that nested processes write separate profiles.
const NESTING_LEVEL_KEY: &str = "RUST_LOGGING_NESTING_LEVEL";

#[must_use = "This function returns a guard object to flush traces. Dropping it immediately is probably incorrect. Make sure that the returned value lives until tracing has finished."]
#[instrument]
fn install_tracing(effects: Effects) -> eyre::Result<impl Drop> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse(
            std::env::var(EnvFilter::DEFAULT_ENV)
                // Only first-party logs unless asked otherwise.
                .unwrap_or_else(|_| "git_feature=warn,feature=warn".to_string()),
        )?;
    let fmt_layer = tracing_fmt::layer().with_writer(move || effects.clone().get_error_stream());

    let (profile_layer, flush_guard): (_, Box<dyn Any>) = {
        let nesting_level = match std::env::var(NESTING_LEVEL_KEY) {
            Ok(nesting_level) => nesting_level.parse::<usize>().unwrap_or_default(),
            Err(_) => 0,
        };
        std::env::set_var(NESTING_LEVEL_KEY, (nesting_level + 1).to_string());

        let should_include_function_args = match std::env::var("RUST_PROFILE_INCLUDE_ARGS") {
            Ok(value) if !value.is_empty() => true,
            Ok(_) | Err(_) => false,
        };

        let filename = match std::env::var("RUST_PROFILE") {
            Ok(value) if value == "1" || value == "true" => Some(format!(
                "trace-{}.json-{}",
                SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)?
                    .as_secs(),
                nesting_level,
            )),
            Ok(value) if !value.is_empty() => Some(format!("{value}-{nesting_level}")),
            Ok(_) | Err(_) => None,
        };

        match filename {
            Some(filename) => {
                let (layer, flush_guard) = ChromeLayerBuilder::new()
                    .file(filename)
                    .include_args(should_include_function_args)
                    .build();
                (Some(layer), Box::new(flush_guard))
            }
            None => {
                struct TrivialDrop;
                (None, Box::new(TrivialDrop))
            }
        }
    };

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(fmt_layer.with_filter(env_filter))
        .with(profile_layer)
        .try_init()?;

    Ok(flush_guard)
}

fn make_git_run_info() -> eyre::Result<GitRunInfo> {
    let path_to_git = get_path_to_git().unwrap_or_else(|_| PathBuf::from("git"));
    let mut env: HashMap<OsString, OsString> = std::env::vars_os().collect();
    if let Some(git_exec_path) = get_git_exec_path() {
        env.entry("GIT_EXEC_PATH".into())
            .or_insert_with(|| git_exec_path.into());
    }
    Ok(GitRunInfo {
        path_to_git,
        working_directory: std::env::current_dir()
            .wrap_err("Getting the current working directory")?,
        env,
    })
}

fn exit_code_to_i32(exit_code: ExitCode) -> eyre::Result<i32> {
    let ExitCode(exit_code) = exit_code;
    let exit_code: i32 = exit_code
        .try_into()
        .wrap_err_with(|| format!("Exit code out of range: {exit_code}"))?;
    Ok(exit_code)
}

/// Wrapper function for `main` to ensure that `Drop` is called for local
/// variables, since `std::process::exit` will skip them. You probably want to
/// call `invoke_subcommand_main` instead.
#[instrument(skip(f))]
pub fn do_main_and_drop_locals<T: Parser>(
    f: impl Fn(CommandContext, T) -> EyreExitOr<()>,
    args: Vec<OsString>,
) -> eyre::Result<i32> {
    let command_args = T::parse_from(&args);
    let matches = GlobalArgs::command()
        .ignore_errors(true)
        .get_matches_from(&args);
    let GlobalArgs {
        working_directory,
        color,
    } = GlobalArgs::from_arg_matches(&matches)
        .map_err(|err| eyre::eyre!("Could not parse global arguments: {err}"))?;

    if let Some(working_directory) = working_directory {
        std::env::set_current_dir(&working_directory).wrap_err_with(|| {
            format!(
                "Could not set working directory to: {:?}",
                &working_directory
            )
        })?;
    }
    let git_run_info = make_git_run_info()?;

    let glyphs = match color {
        Some(ColorSetting::Always) => Glyphs::pretty(),
        Some(ColorSetting::Never) => Glyphs::text(),
        Some(ColorSetting::Auto) | None => Glyphs::detect(),
    };
    let effects = Effects::new(glyphs);
    let _tracing_guard = install_tracing(effects.clone());

    let ctx = CommandContext {
        effects,
        git_run_info,
    };
    match f(ctx, command_args)? {
        Ok(()) => Ok(0),
        Err(exit_code) => exit_code_to_i32(exit_code),
    }
}

/// Invoke the provided command main function. This should be used in the
/// `main.rs` file of the executable. For example:
///
/// ```ignore
/// fn main() {
///     git_feature_invoke::invoke_subcommand_main(git_feature::commands::command_main)
/// }
/// ```
#[instrument(skip(f))]
pub fn invoke_subcommand_main<T: Parser>(f: impl Fn(CommandContext, T) -> EyreExitOr<()>) {
    // Install panic handler.
    color_eyre::install().expect("Could not install panic handler");
    let args = std::env::args_os().collect();
    let exit_code = do_main_and_drop_locals(f, args).expect("A fatal error occurred");
    std::process::exit(exit_code);
}
