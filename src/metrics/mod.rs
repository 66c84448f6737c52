//! Change-profile metrics per function and release.
//!
//! Every metric is computed from history up to and including the target
//! release; later commits never leak in. Churn contributions decay linearly
//! with age in releases, so a change made long before the target release
//! weighs less than a fresh one.

use std::collections::{HashMap, HashSet};

use chrono::DateTime;
use serde::Serialize;

use crate::core::{Change, CommitId, CommitMeta, FileHistory, FunctionHistory, Release, ReleaseCatalog};

/// Metrics of one function at one release.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeProfile {
    /// Number of revisions (NR).
    pub revisions: usize,
    /// Distinct authors (NAuth).
    pub authors: usize,
    /// Sum of age-weighted churn.
    pub total_weighted_churn: f64,
    /// Largest single age-weighted churn contribution.
    pub max_weighted_churn: f64,
    /// Mean age-weighted churn per revision.
    pub avg_weighted_churn: f64,
    /// Bug-fix commits touching the function (NFix).
    pub bug_fixes: usize,
}

/// Computes change profiles against one release catalog.
///
/// Commit-to-release mapping is resolved once at construction; commits made
/// after the last release map to no release and are excluded everywhere.
pub struct MetricsEngine<'a> {
    commits: &'a HashMap<CommitId, CommitMeta>,
    commit_release: HashMap<&'a str, usize>,
    total_releases: usize,
}

impl<'a> MetricsEngine<'a> {
    pub fn new(catalog: &ReleaseCatalog, commits: &'a HashMap<CommitId, CommitMeta>) -> Self {
        let mut commit_release = HashMap::with_capacity(commits.len());
        for (id, meta) in commits {
            let Some(instant) = DateTime::from_timestamp(meta.seconds, 0) else {
                continue;
            };
            if let Some(release) = catalog.first_containing(instant) {
                commit_release.insert(id.as_str(), release.index);
            }
        }
        Self {
            commits,
            commit_release,
            total_releases: catalog.len(),
        }
    }

    /// Release index a commit first appeared in, if any release contains it.
    fn release_of(&self, commit: &str) -> Option<usize> {
        self.commit_release.get(commit).copied()
    }

    /// Profile of one function at one release.
    pub fn profile(&self, history: &FunctionHistory, release: &Release) -> ChangeProfile {
        let mut profile = self.changes_profile(&history.changes, release);
        profile.bug_fixes = history
            .bug_fix_commits
            .iter()
            .filter(|commit| {
                self.release_of(commit)
                    .is_some_and(|changed_at| changed_at <= release.index)
            })
            .count();
        profile
    }

    /// Profile of one file at one release, over whole-file line churn.
    /// Fix attribution is per function, so `bug_fixes` stays zero here.
    pub fn file_profile(&self, history: &FileHistory, release: &Release) -> ChangeProfile {
        self.changes_profile(&history.changes, release)
    }

    fn changes_profile(&self, changes: &[Change], release: &Release) -> ChangeProfile {
        let mut profile = ChangeProfile::default();
        let mut authors: HashSet<&str> = HashSet::new();

        for change in changes {
            let Some(changed_at) = self.release_of(&change.commit) else {
                continue;
            };
            if changed_at > release.index {
                continue;
            }
            profile.revisions += 1;
            if let Some(meta) = self.commits.get(&change.commit) {
                authors.insert(meta.author.as_str());
            }

            let age = (release.index - changed_at) as f64;
            let weight = 1.0 - age / self.total_releases as f64;
            if weight > 0.0 {
                let weighted = f64::from(change.churn) * weight;
                profile.total_weighted_churn += weighted;
                profile.max_weighted_churn = profile.max_weighted_churn.max(weighted);
            }
        }

        profile.authors = authors.len();
        if profile.revisions > 0 {
            profile.avg_weighted_churn = profile.total_weighted_churn / profile.revisions as f64;
        }
        profile
    }
}
