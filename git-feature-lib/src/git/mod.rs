//! Tools for interfacing with the Git executable.

mod query;
mod remote;
mod run;

pub use query::BranchQuery;
pub use remote::{
    parse_remote_lines, read_remotes, RemoteDirection, RemoteEntry, RemotePolicy,
    RemoteValidationError, OFFICIAL_REPO_URL_PREFIXES, ORIGIN_REMOTE, UPSTREAM_REMOTE,
};
pub use run::{GitRunInfo, GitRunOpts, GitRunResult};
