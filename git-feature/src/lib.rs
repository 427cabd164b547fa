//! Feature-branch workflow for contributing to a GitHub project from a fork.
//!
//! The official repository is expected to be configured as the `upstream`
//! remote, and the contributor's fork as `origin`. Feature branches are
//! started from and rebased onto `upstream`'s main branch, and published to
//! `origin`, from where pull requests are opened.

#![warn(missing_docs)]
#![warn(
    clippy::all,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro
)]
#![allow(clippy::too_many_arguments, clippy::blocks_in_conditions)]

pub mod commands;
