use std::sync::{Arc, Mutex};

use git_feature::commands::{run_feature_action, FeatureRequest};
use lib::core::effects::Effects;
use lib::core::formatting::Glyphs;
use lib::core::workflow::Action;
use lib::testing::{
    make_git, make_git_with_fork_setup, GitRunOptions, GitWrapperWithForkSetup,
};
use lib::util::ExitCode;

fn run_action(
    setup: &GitWrapperWithForkSetup,
    action: Action,
    feature_name: &str,
    dry_run: bool,
) -> eyre::Result<(Result<(), ExitCode>, String)> {
    let stdout = Arc::new(Mutex::new(Vec::new()));
    let stderr = Arc::new(Mutex::new(Vec::new()));
    let effects = Effects::new_from_buffer_for_test(Glyphs::text(), &stdout, &stderr);
    let result = run_feature_action(
        &effects,
        &setup.local_repo.get_git_run_info(),
        &setup.remote_policy()?,
        &FeatureRequest {
            action,
            feature_name: feature_name.to_string(),
            dry_run,
        },
    )?;
    let stdout = String::from_utf8(stdout.lock().unwrap().clone())?;
    Ok((result, stdout))
}

fn branches(repo: &lib::testing::Git) -> eyre::Result<String> {
    let (stdout, _stderr) =
        repo.run(&["for-each-ref", "--format=%(refname:short)", "refs/heads/"])?;
    Ok(stdout)
}

#[test]
fn test_create_feature() -> eyre::Result<()> {
    let setup = make_git_with_fork_setup()?;

    let (result, stdout) = run_action(&setup, Action::Create, "myfeature", false)?;
    assert_eq!(result, Ok(()));
    insta::assert_snapshot!(stdout, @r###"
    -----------------------------------------------------------
    Creating feature myfeature
    -----------------------------------------------------------
    # Will run command sequence:
    # $> git fetch upstream
    # $> git checkout -b myfeature upstream/master --no-track
    # $> git submodule update --init --recursive
    # $> git push --set-upstream origin myfeature

    -----------------------------------------------------------
    Off we go...
    -----------------------------------------------------------
    $> git fetch upstream

    $> git checkout -b myfeature upstream/master --no-track

    $> git submodule update --init --recursive

    $> git push --set-upstream origin myfeature

    "###);

    let (current_branch, _stderr) = setup
        .local_repo
        .run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
    assert_eq!(current_branch, "myfeature\n");
    insta::assert_snapshot!(branches(&setup.origin_repo)?, @r###"
    master
    myfeature
    "###);
    insta::assert_snapshot!(branches(&setup.upstream_repo)?, @"master
");
    Ok(())
}

#[test]
fn test_dry_run_changes_nothing() -> eyre::Result<()> {
    let setup = make_git_with_fork_setup()?;

    let (result, stdout) = run_action(&setup, Action::Create, "myfeature", true)?;
    assert_eq!(result, Ok(()));
    insta::assert_snapshot!(stdout, @r###"
    -----------------------------------------------------------
    Creating feature myfeature
    -----------------------------------------------------------
    # Will run command sequence:
    # $> git fetch upstream
    # $> git checkout -b myfeature upstream/master --no-track
    # $> git submodule update --init --recursive
    # $> git push --set-upstream origin myfeature

    "###);
    insta::assert_snapshot!(branches(&setup.local_repo)?, @"master
");
    insta::assert_snapshot!(branches(&setup.origin_repo)?, @"master
");
    Ok(())
}

#[test]
fn test_rebase_feature() -> eyre::Result<()> {
    let setup = make_git_with_fork_setup()?;
    let local_repo = &setup.local_repo;

    let (result, _stdout) = run_action(&setup, Action::Create, "myfeature", false)?;
    assert_eq!(result, Ok(()));
    local_repo.commit_file("feature", 1)?;

    local_repo.run(&["checkout", "--quiet", "master"])?;
    local_repo.commit_file("upstream", 2)?;
    local_repo.run(&["push", "--quiet", "upstream", "master"])?;

    let (result, stdout) = run_action(&setup, Action::Rebase, "myfeature", false)?;
    assert_eq!(result, Ok(()));
    assert!(stdout.starts_with(
        "\
-----------------------------------------------------------
Rebasing feature myfeature on top of upstream/master
-----------------------------------------------------------
"
    ));

    let (log, _stderr) = local_repo.run(&["log", "--format=%s", "myfeature"])?;
    insta::assert_snapshot!(log, @r###"
    create feature.txt
    create upstream.txt
    create initial.txt
    "###);
    Ok(())
}

#[test]
fn test_push_feature() -> eyre::Result<()> {
    let setup = make_git_with_fork_setup()?;
    let local_repo = &setup.local_repo;
    local_repo.run(&["checkout", "--quiet", "-b", "myfeature"])?;
    local_repo.commit_file("feature", 1)?;

    let (result, stdout) = run_action(&setup, Action::Push, "myfeature", false)?;
    assert_eq!(result, Ok(()));
    insta::assert_snapshot!(stdout, @r###"
    -----------------------------------------------------------
    Pushing feature myfeature to origin
    -----------------------------------------------------------
    # Will run command sequence:
    # $> git push --set-upstream origin myfeature

    -----------------------------------------------------------
    Off we go...
    -----------------------------------------------------------
    $> git push --set-upstream origin myfeature

    "###);

    let (log, _stderr) = setup
        .origin_repo
        .run(&["log", "--format=%s", "myfeature"])?;
    insta::assert_snapshot!(log, @r###"
    create feature.txt
    create initial.txt
    "###);
    Ok(())
}

#[test]
fn test_remove_checked_out_feature() -> eyre::Result<()> {
    let setup = make_git_with_fork_setup()?;

    let (result, _stdout) = run_action(&setup, Action::Create, "myfeature", false)?;
    assert_eq!(result, Ok(()));

    let (result, stdout) = run_action(&setup, Action::Remove, "myfeature", false)?;
    assert_eq!(result, Ok(()));
    insta::assert_snapshot!(stdout, @r###"
    -----------------------------------------------------------
    Removing feature myfeature
    -----------------------------------------------------------
    # Will run command sequence:
    # $> git checkout upstream/master
    # $> git branch -d myfeature
    # $> git push origin :myfeature

    -----------------------------------------------------------
    Off we go...
    -----------------------------------------------------------
    $> git checkout upstream/master

    $> git branch -d myfeature

    $> git push origin :myfeature

    "###);
    insta::assert_snapshot!(branches(&setup.local_repo)?, @"master
");
    insta::assert_snapshot!(branches(&setup.origin_repo)?, @"master
");
    Ok(())
}

#[test]
fn test_remove_missing_feature() -> eyre::Result<()> {
    let setup = make_git_with_fork_setup()?;

    let (result, stdout) = run_action(&setup, Action::Remove, "nosuchfeature", false)?;
    assert_eq!(result, Err(ExitCode(1)));
    insta::assert_snapshot!(stdout, @r###"
    -----------------------------------------------------------
    Removing feature nosuchfeature
    -----------------------------------------------------------
    Error: Branch 'nosuchfeature' not found, neither in local repository nor in 'origin' remote
    "###);
    Ok(())
}

#[test]
fn test_failed_command_stops_workflow() -> eyre::Result<()> {
    let setup = make_git_with_fork_setup()?;

    let (result, stdout) = run_action(&setup, Action::Rebase, "nosuchfeature", false)?;
    assert_eq!(result, Err(ExitCode(1)));
    insta::assert_snapshot!(stdout, @r###"
    -----------------------------------------------------------
    Rebasing feature nosuchfeature on top of upstream/master
    -----------------------------------------------------------
    # Will run command sequence:
    # $> git fetch upstream
    # $> git checkout nosuchfeature
    # $> git rebase upstream/master
    # $> git submodule update --init --recursive

    -----------------------------------------------------------
    Off we go...
    -----------------------------------------------------------
    $> git fetch upstream

    $> git checkout nosuchfeature

    -----------------------------------------------------------
    This command failed:
    $> git checkout nosuchfeature

    Please fix, rerun it, and then, to finish the action, run:
    $> git rebase upstream/master
    $> git submodule update --init --recursive
    -----------------------------------------------------------
    "###);

    let (current_branch, _stderr) = setup
        .local_repo
        .run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
    assert_eq!(current_branch, "master\n");
    Ok(())
}

#[test]
fn test_main_branch_from_config() -> eyre::Result<()> {
    let setup = make_git_with_fork_setup()?;
    setup
        .local_repo
        .run(&["config", "feature.mainBranch", "main"])?;

    let (result, stdout) = run_action(&setup, Action::Rebase, "myfeature", true)?;
    assert_eq!(result, Ok(()));
    assert!(stdout.contains("Rebasing feature myfeature on top of upstream/main\n"));
    assert!(stdout.contains("# $> git rebase upstream/main\n"));
    Ok(())
}

#[test]
fn test_origin_outside_forks() -> eyre::Result<()> {
    let setup = make_git_with_fork_setup()?;
    let local_repo = &setup.local_repo;
    let upstream_url = setup
        .upstream_repo
        .repo_path
        .to_str()
        .ok_or_else(|| eyre::eyre!("Could not convert path to string"))?
        .to_string();
    local_repo.run(&["remote", "set-url", "origin", &upstream_url])?;

    let (result, stdout) = run_action(&setup, Action::Create, "myfeature", false)?;
    assert_eq!(result, Err(ExitCode(1)));
    insta::assert_snapshot!(stdout, @"Error: Remote repository 'origin' not setup correctly (fetch)
");
    insta::assert_snapshot!(branches(local_repo)?, @"master
");
    Ok(())
}

#[test]
fn test_binary_rejects_repo_without_remotes() -> eyre::Result<()> {
    let git = make_git()?;
    git.init_repo()?;

    let (stdout, _stderr) = git.feature_with_options(
        &["create", "myfeature"],
        &GitRunOptions {
            expected_exit_code: 1,
            ..Default::default()
        },
    )?;
    insta::assert_snapshot!(stdout, @"Error: Remote repository 'upstream' not setup correctly (fetch)
");

    let (stdout, _stderr) = git.feature_with_options(
        &["--dry-run", "remove", "myfeature"],
        &GitRunOptions {
            expected_exit_code: 1,
            ..Default::default()
        },
    )?;
    insta::assert_snapshot!(stdout, @"Error: Remote repository 'upstream' not setup correctly (fetch)
");
    Ok(())
}

#[test]
fn test_binary_rejects_github_upstream_fork() -> eyre::Result<()> {
    let git = make_git()?;
    git.init_repo()?;
    for (name, url) in [
        ("origin", "git@github.com:someone/onnx.git"),
        ("upstream", "https://github.com/someone-else/onnx.git"),
    ] {
        git.run(&["remote", "add", name, url])?;
    }

    let (stdout, _stderr) = git.feature_with_options(
        &["push", "myfeature"],
        &GitRunOptions {
            expected_exit_code: 1,
            ..Default::default()
        },
    )?;
    insta::assert_snapshot!(stdout, @"Error: Remote repository 'upstream' not setup correctly (fetch)
");
    Ok(())
}

#[test]
fn test_binary_rejects_official_origin() -> eyre::Result<()> {
    let git = make_git()?;
    git.init_repo()?;
    for (name, url) in [
        ("origin", "git@github.com:onnx/onnx.git"),
        ("upstream", "https://github.com/onnx/onnx.git"),
    ] {
        git.run(&["remote", "add", name, url])?;
    }

    let (stdout, _stderr) = git.feature_with_options(
        &["push", "myfeature"],
        &GitRunOptions {
            expected_exit_code: 1,
            ..Default::default()
        },
    )?;
    insta::assert_snapshot!(stdout, @"Error: Remote repository 'origin' points to official repository. Please point it to your own fork.
");
    Ok(())
}

#[test]
fn test_binary_usage_errors() -> eyre::Result<()> {
    let git = make_git()?;
    git.init_repo()?;

    let (stdout, stderr) = git.feature_with_options(
        &["merge", "myfeature"],
        &GitRunOptions {
            expected_exit_code: 2,
            ..Default::default()
        },
    )?;
    assert_eq!(stdout, "");
    assert!(stderr.contains("invalid value 'merge'"));

    let (_stdout, stderr) = git.feature_with_options(
        &["create"],
        &GitRunOptions {
            expected_exit_code: 2,
            ..Default::default()
        },
    )?;
    assert!(stderr.contains("<FEATURE_NAME>"));
    Ok(())
}

#[test]
fn test_binary_help_shows_examples() -> eyre::Result<()> {
    let git = make_git()?;
    git.init_repo()?;

    let (stdout, _stderr) = git.feature(&["--help"])?;
    assert!(stdout.contains("Create, rebase and delete git feature branches"));
    assert!(stdout.contains(
        "$> git-feature remove myfeature   # Removes 'myfeature' from local and 'origin' remote"
    ));
    Ok(())
}
