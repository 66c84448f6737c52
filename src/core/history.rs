//! Per-function and per-file change histories.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Commit identifier (full hex SHA).
pub type CommitId = String;

/// One churn event attributed to a function or file.
///
/// Immutable once recorded; churn is always > 0 because zero-churn events
/// are suppressed at the recording site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub commit: CommitId,
    pub churn: u32,
}

/// Author and timing metadata for a commit seen during the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    pub author: String,
    /// Commit time, seconds since the epoch.
    pub seconds: i64,
}

/// Append-only change log for one function.
///
/// The function id is the stable `path + "/" + signature` string. The log
/// grows monotonically during the single history walk and is read-only
/// afterward; deleted functions keep their record so any release at or
/// before the deletion remains queryable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionHistory {
    /// Chronological churn events.
    pub changes: Vec<Change>,
    /// Commits classified as bug fixes that touched this function's file
    /// while the function was present in the post-commit snapshot.
    pub bug_fix_commits: BTreeSet<CommitId>,
}

impl FunctionHistory {
    /// Append a churn event. Zero churn is never recorded.
    pub fn record_change(&mut self, commit: &str, churn: u32) {
        if churn > 0 {
            self.changes.push(Change {
                commit: commit.to_string(),
                churn,
            });
        }
    }

    pub fn record_fix(&mut self, commit: &str) {
        self.bug_fix_commits.insert(commit.to_string());
    }

    pub fn revisions(&self) -> usize {
        self.changes.len()
    }
}

/// Append-only change log for one file, aggregating whole-file line churn
/// independent of function boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHistory {
    pub changes: Vec<Change>,
}

impl FileHistory {
    pub fn record_change(&mut self, commit: &str, churn: u32) {
        if churn > 0 {
            self.changes.push(Change {
                commit: commit.to_string(),
                churn,
            });
        }
    }
}
