//! Linking commits to tracker tickets by textual reference.

use std::collections::HashMap;

use git2::Oid;
use regex::Regex;

use crate::core::{CommitId, Error, Result};
use crate::git::GitRepo;

/// Matches ticket keys inside commit messages.
///
/// Built either from the concrete set of known ticket keys or, when only a
/// project prefix is known, from the `PROJECTKEY-\d+` shape. This is a
/// textual heuristic: it never verifies that the referenced ticket is
/// semantically related to the change.
pub struct BugCommitLinker {
    pattern: Option<Regex>,
}

impl BugCommitLinker {
    /// Build a linker from the set of known ticket keys.
    pub fn from_keys<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut escaped: Vec<String> = keys
            .into_iter()
            .map(|k| regex::escape(k.as_ref()))
            .collect();
        if escaped.is_empty() {
            return Ok(Self { pattern: None });
        }
        // Longest first, plus word boundaries, so KEY-12 never swallows the
        // front of KEY-123.
        escaped.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let pattern = format!(r"\b(?:{})\b", escaped.join("|"));
        let regex = Regex::new(&pattern)
            .map_err(|e| Error::InvalidArgument(format!("bad ticket key pattern: {e}")))?;
        Ok(Self {
            pattern: Some(regex),
        })
    }

    /// Build a linker for any `PROJECTKEY-<number>` reference.
    pub fn from_project_key(project_key: &str) -> Result<Self> {
        if project_key.is_empty() {
            return Err(Error::InvalidArgument(
                "project key must not be empty".to_string(),
            ));
        }
        let pattern = format!(r"(?i)\b{}-\d+\b", regex::escape(project_key));
        let regex = Regex::new(&pattern)
            .map_err(|e| Error::InvalidArgument(format!("bad project key: {e}")))?;
        Ok(Self {
            pattern: Some(regex),
        })
    }

    /// All distinct ticket keys referenced by a message, in match order.
    pub fn tickets_in(&self, message: &str) -> Vec<String> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        for found in pattern.find_iter(message) {
            let key = found.as_str().to_uppercase();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Scan every commit's full message and record commit→ticket links.
    pub fn scan(&self, repo: &GitRepo, commits: &[Oid]) -> Result<BugLinkIndex> {
        let mut by_commit = HashMap::new();
        for &oid in commits {
            let message = match repo.message(oid) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("skipping unreadable commit {oid}: {e}");
                    continue;
                }
            };
            let keys = self.tickets_in(&message);
            if !keys.is_empty() {
                by_commit.insert(oid.to_string(), keys);
            }
        }
        tracing::info!("{} commits reference at least one ticket", by_commit.len());
        Ok(BugLinkIndex { by_commit })
    }
}

/// Commit→ticket associations produced by one scan.
#[derive(Debug, Clone, Default)]
pub struct BugLinkIndex {
    by_commit: HashMap<CommitId, Vec<String>>,
}

impl BugLinkIndex {
    /// Whether the commit references any known ticket (i.e. is a bug-fix
    /// commit).
    pub fn is_fix(&self, commit: &str) -> bool {
        self.by_commit.contains_key(commit)
    }

    /// Ticket keys referenced by a commit.
    pub fn tickets_for(&self, commit: &str) -> &[String] {
        self.by_commit.get(commit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the commit references this specific ticket key.
    pub fn mentions(&self, commit: &str, key: &str) -> bool {
        self.tickets_for(commit).iter().any(|k| k == key)
    }

    pub fn fix_commit_count(&self) -> usize {
        self.by_commit.len()
    }

    #[cfg(test)]
    pub(crate) fn from_entries(entries: Vec<(CommitId, Vec<String>)>) -> Self {
        Self {
            by_commit: entries.into_iter().collect(),
        }
    }
}
