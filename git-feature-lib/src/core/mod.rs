//! Workflow logic and output handling.

pub mod config;
pub mod effects;
pub mod formatting;
pub mod sequencer;
pub mod workflow;
