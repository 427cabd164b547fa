//! Checks that the `upstream` and `origin` remotes point where the feature
//! workflow expects them to.
//!
//! `upstream` must be one of the official repositories, and `origin` must be
//! the contributor's own fork on GitHub. Feature branches are pushed to
//! `origin`, so pointing it at the official repository would publish them in
//! the wrong place.

use std::fmt::Display;

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::git::{GitRunInfo, GitRunOpts};

/// Name of the remote holding the official repository.
pub const UPSTREAM_REMOTE: &str = "upstream";

/// Name of the remote holding the contributor's fork.
pub const ORIGIN_REMOTE: &str = "origin";

/// URL prefixes of the official repositories, in both HTTPS and SSH form.
pub const OFFICIAL_REPO_URL_PREFIXES: &[&str] = &[
    "https://github.com/onnx/",
    "git@github.com:onnx/",
    "https://github.com/caffe2/",
    "git@github.com:caffe2/",
];

/// Whether a remote URL is used for fetching or for pushing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteDirection {
    /// The URL shown with `(fetch)`.
    Fetch,

    /// The URL shown with `(push)`.
    Push,
}

impl Display for RemoteDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteDirection::Fetch => write!(f, "fetch"),
            RemoteDirection::Push => write!(f, "push"),
        }
    }
}

/// One line of `git remote -v` output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEntry {
    /// The name of the remote, such as `origin`.
    pub name: String,

    /// The configured URL.
    pub url: String,

    /// Which of the remote's URLs this is.
    pub direction: RemoteDirection,
}

/// Parse the output of `git remote -v`.
///
/// Each line has the form `<name>\t<url> (fetch)` or `<name>\t<url> (push)`.
/// Lines which don't have that shape are skipped.
pub fn parse_remote_lines(output: &str) -> Vec<RemoteEntry> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let entry = parse_remote_line(line);
            if entry.is_none() {
                warn!(?line, "Could not parse line of `git remote -v` output");
            }
            entry
        })
        .collect()
}

fn parse_remote_line(line: &str) -> Option<RemoteEntry> {
    let (name, rest) = line.split_once('\t')?;
    let (url, direction) = rest.rsplit_once(' ')?;
    let direction = match direction {
        "(fetch)" => RemoteDirection::Fetch,
        "(push)" => RemoteDirection::Push,
        _ => return None,
    };
    Some(RemoteEntry {
        name: name.to_string(),
        url: url.to_string(),
        direction,
    })
}

/// A failed check on the configured remotes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemoteValidationError {
    /// `upstream` is missing or doesn't point to an official repository.
    #[error("Remote repository 'upstream' not setup correctly ({direction})")]
    BadUpstream {
        /// Which URL was wrong.
        direction: RemoteDirection,
    },

    /// `origin` is missing or isn't a GitHub repository.
    #[error("Remote repository 'origin' not setup correctly ({direction})")]
    BadOrigin {
        /// Which URL was wrong.
        direction: RemoteDirection,
    },

    /// `origin` points to the official repository instead of a fork.
    #[error(
        "Remote repository 'origin' points to official repository. Please point it to your own fork."
    )]
    OriginIsOfficial,
}

lazy_static! {
    static ref FORK_URL_RE: Regex = Regex::new(
        r"^(https://github\.com/|git@github\.com:)[a-zA-Z0-9\-]+/[a-zA-Z0-9\-]+(\.git)?$"
    )
    .expect("Fork URL regex should be valid");
}

/// Which remote URLs are acceptable.
#[derive(Clone, Debug)]
pub struct RemotePolicy {
    official_url_patterns: Vec<Regex>,
    fork_url_pattern: Regex,
}

impl Default for RemotePolicy {
    fn default() -> Self {
        Self::new(OFFICIAL_REPO_URL_PREFIXES)
            .expect("Official repository URL patterns should be valid")
    }
}

impl RemotePolicy {
    /// Accept `upstream` URLs consisting of one of the given prefixes, a
    /// repository name and an optional `.git` suffix.
    pub fn new<S: AsRef<str>>(official_url_prefixes: &[S]) -> eyre::Result<Self> {
        let official_url_patterns = official_url_prefixes
            .iter()
            .map(|prefix| {
                let pattern = format!(
                    r"^{}[a-zA-Z0-9\-]+(\.git)?$",
                    regex::escape(prefix.as_ref())
                );
                Regex::new(&pattern)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            official_url_patterns,
            fork_url_pattern: FORK_URL_RE.clone(),
        })
    }

    /// Accept `origin` URLs consisting of one of the given prefixes, an owner,
    /// a repository name and an optional `.git` suffix, instead of GitHub
    /// URLs.
    pub fn with_fork_url_prefixes<S: AsRef<str>>(
        self,
        fork_url_prefixes: &[S],
    ) -> eyre::Result<Self> {
        let prefixes = fork_url_prefixes
            .iter()
            .map(|prefix| regex::escape(prefix.as_ref()))
            .join("|");
        let fork_url_pattern = Regex::new(&format!(
            r"^({prefixes})[a-zA-Z0-9\-]+/[a-zA-Z0-9\-]+(\.git)?$"
        ))?;
        Ok(Self {
            fork_url_pattern,
            ..self
        })
    }

    /// Whether the URL points to one of the official repositories.
    pub fn is_official_url(&self, url: &str) -> bool {
        self.official_url_patterns
            .iter()
            .any(|pattern| pattern.is_match(url))
    }

    /// Whether the URL points to some user's repository, on GitHub unless
    /// configured otherwise.
    pub fn is_fork_url(&self, url: &str) -> bool {
        self.fork_url_pattern.is_match(url)
    }

    fn has_url(
        remotes: &[RemoteEntry],
        name: &str,
        direction: RemoteDirection,
        predicate: impl Fn(&str) -> bool,
    ) -> bool {
        remotes.iter().any(|remote| {
            remote.name == name && remote.direction == direction && predicate(&remote.url)
        })
    }

    /// Check the remotes, returning the first failed check.
    pub fn validate(&self, remotes: &[RemoteEntry]) -> Result<(), RemoteValidationError> {
        for direction in [RemoteDirection::Fetch, RemoteDirection::Push] {
            if !Self::has_url(remotes, UPSTREAM_REMOTE, direction, |url| {
                self.is_official_url(url)
            }) {
                return Err(RemoteValidationError::BadUpstream { direction });
            }
        }

        for direction in [RemoteDirection::Fetch, RemoteDirection::Push] {
            if !Self::has_url(remotes, ORIGIN_REMOTE, direction, |url| {
                self.is_fork_url(url)
            }) {
                return Err(RemoteValidationError::BadOrigin { direction });
            }
        }

        if Self::has_url(remotes, ORIGIN_REMOTE, RemoteDirection::Fetch, |url| {
            self.is_official_url(url)
        }) {
            return Err(RemoteValidationError::OriginIsOfficial);
        }

        Ok(())
    }
}

/// Read the configured remotes with `git remote -v`.
#[instrument]
pub fn read_remotes(git_run_info: &GitRunInfo) -> eyre::Result<Vec<RemoteEntry>> {
    let result = git_run_info.run_silent(&["remote", "-v"], GitRunOpts::default())?;
    let output = String::from_utf8_lossy(&result.stdout);
    let remotes = parse_remote_lines(&output);
    debug!(?remotes, "Read remotes");
    Ok(remotes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_REMOTES: &str = "\
origin\tgit@github.com:someone/onnx.git (fetch)
origin\tgit@github.com:someone/onnx.git (push)
upstream\thttps://github.com/onnx/onnx.git (fetch)
upstream\thttps://github.com/onnx/onnx.git (push)
";

    fn validate(output: &str) -> Result<(), RemoteValidationError> {
        RemotePolicy::default().validate(&parse_remote_lines(output))
    }

    #[test]
    fn test_parse_remote_lines() {
        let remotes = parse_remote_lines("origin\thttps://github.com/a/b (fetch)  \nbogus line\n\n");
        assert_eq!(
            remotes,
            vec![RemoteEntry {
                name: "origin".to_string(),
                url: "https://github.com/a/b".to_string(),
                direction: RemoteDirection::Fetch,
            }]
        );
    }

    #[test]
    fn test_accepts_valid_remotes() {
        assert_eq!(validate(GOOD_REMOTES), Ok(()));

        let caffe2 = "\
origin\thttps://github.com/some-one/caffe2 (fetch)
origin\thttps://github.com/some-one/caffe2 (push)
upstream\tgit@github.com:caffe2/caffe2 (fetch)
upstream\tgit@github.com:caffe2/caffe2 (push)
";
        assert_eq!(validate(caffe2), Ok(()));
    }

    #[test]
    fn test_rejects_bad_upstream() {
        let wrong_org = GOOD_REMOTES.replace("github.com/onnx/", "github.com/someone-else/");
        assert_eq!(
            validate(&wrong_org),
            Err(RemoteValidationError::BadUpstream {
                direction: RemoteDirection::Fetch
            })
        );

        let missing_push =
            GOOD_REMOTES.replace("upstream\thttps://github.com/onnx/onnx.git (push)\n", "");
        assert_eq!(
            validate(&missing_push),
            Err(RemoteValidationError::BadUpstream {
                direction: RemoteDirection::Push
            })
        );

        let local_path = GOOD_REMOTES.replace("https://github.com/onnx/onnx.git", "/tmp/onnx");
        assert_eq!(
            validate(&local_path),
            Err(RemoteValidationError::BadUpstream {
                direction: RemoteDirection::Fetch
            })
        );
    }

    #[test]
    fn test_rejects_bad_origin() {
        let no_origin = GOOD_REMOTES
            .lines()
            .filter(|line| !line.starts_with("origin"))
            .map(|line| format!("{line}\n"))
            .collect::<String>();
        assert_eq!(
            validate(&no_origin),
            Err(RemoteValidationError::BadOrigin {
                direction: RemoteDirection::Fetch
            })
        );

        let gitlab_push = GOOD_REMOTES.replace(
            "origin\tgit@github.com:someone/onnx.git (push)",
            "origin\tgit@gitlab.com:someone/onnx.git (push)",
        );
        assert_eq!(
            validate(&gitlab_push),
            Err(RemoteValidationError::BadOrigin {
                direction: RemoteDirection::Push
            })
        );
    }

    #[test]
    fn test_rejects_origin_pointing_to_official_repo() {
        let official_origin = GOOD_REMOTES.replace("git@github.com:someone/", "git@github.com:onnx/");
        let result = validate(&official_origin);
        assert_eq!(result, Err(RemoteValidationError::OriginIsOfficial));
        insta::assert_snapshot!(result.unwrap_err().to_string(), @"Remote repository 'origin' points to official repository. Please point it to your own fork.");
    }

    #[test]
    fn test_error_messages() {
        insta::assert_snapshot!(
            RemoteValidationError::BadUpstream { direction: RemoteDirection::Push }.to_string(),
            @"Remote repository 'upstream' not setup correctly (push)"
        );
        insta::assert_snapshot!(
            RemoteValidationError::BadOrigin { direction: RemoteDirection::Fetch }.to_string(),
            @"Remote repository 'origin' not setup correctly (fetch)"
        );
    }

    #[test]
    fn test_custom_fork_url_prefixes() -> eyre::Result<()> {
        let policy = RemotePolicy::new(&["/srv/git/onnx/"])?
            .with_fork_url_prefixes(&["/srv/git/forks/", "ssh://git.example.com/"])?;
        assert!(policy.is_official_url("/srv/git/onnx/onnx.git"));
        assert!(policy.is_fork_url("/srv/git/forks/someone/onnx.git"));
        assert!(policy.is_fork_url("ssh://git.example.com/someone/onnx"));
        assert!(!policy.is_fork_url("https://github.com/someone/onnx"));

        let remotes = parse_remote_lines(
            "\
origin\t/srv/git/forks/someone/onnx.git (fetch)
origin\t/srv/git/forks/someone/onnx.git (push)
upstream\t/srv/git/onnx/onnx.git (fetch)
upstream\t/srv/git/onnx/onnx.git (push)
",
        );
        assert_eq!(policy.validate(&remotes), Ok(()));
        Ok(())
    }

    #[test]
    fn test_repository_name_characters() {
        let policy = RemotePolicy::default();
        assert!(policy.is_official_url("https://github.com/onnx/onnx-tensorrt.git"));
        assert!(!policy.is_official_url("https://github.com/onnx/onnx_tensorrt"));
        assert!(!policy.is_official_url("https://github.com/onnx/"));
        assert!(policy.is_fork_url("git@github.com:User-123/onnx"));
        assert!(!policy.is_fork_url("https://github.com/user/onnx.git/extra"));
    }
}
