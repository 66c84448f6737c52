//! Augur - Repository history mining and bug-lifecycle estimation.
//!
//! Augur walks a git repository's full commit history, attributes statement
//! churn to individual functions, resolves each tracker ticket's lifecycle
//! (injected, opening and fixed versions) against the release catalog, and
//! joins the two into a labelled per-function, per-release defect dataset.

pub mod cli;
pub mod config;
pub mod core;
pub mod dataset;
pub mod diff;
pub mod git;
pub mod history;
pub mod label;
pub mod lifecycle;
pub mod metrics;
pub mod parser;
pub mod tracker;
