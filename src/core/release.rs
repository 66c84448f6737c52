//! Releases and the release catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// A selected release of the mined project.
///
/// Releases are immutable once constructed. The `index` is a dense 0-based
/// ordinal assigned in timestamp-ascending order, so for any two releases
/// `i < j` implies `release[i].timestamp <= release[j].timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release name (typically the git tag, e.g. `release-4.1.0`).
    pub name: String,
    /// Revision the release points at (commit SHA).
    pub revision: String,
    /// Timestamp of the tagged commit.
    pub timestamp: DateTime<Utc>,
    /// Dense 0-based ordinal by ascending timestamp.
    pub index: usize,
}

/// Ordered catalog of releases, indices dense from 0.
#[derive(Debug, Clone)]
pub struct ReleaseCatalog {
    releases: Vec<Release>,
}

impl ReleaseCatalog {
    /// Build a catalog from `(name, revision, timestamp)` entries.
    ///
    /// Entries are sorted by timestamp ascending and indexed densely. An
    /// empty entry list is a fatal precondition.
    pub fn new(mut entries: Vec<(String, String, DateTime<Utc>)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::catalog("no releases: cannot anchor any lifecycle"));
        }
        entries.sort_by_key(|(_, _, ts)| *ts);

        let releases = entries
            .into_iter()
            .enumerate()
            .map(|(index, (name, revision, timestamp))| Release {
                name,
                revision,
                timestamp,
                index,
            })
            .collect();

        Ok(Self { releases })
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub fn get(&self, index: usize) -> Option<&Release> {
        self.releases.get(index)
    }

    /// Latest release whose timestamp is `<=` the given instant.
    ///
    /// This is the release a bug report filed at `instant` was filed against.
    pub fn latest_at_or_before(&self, instant: DateTime<Utc>) -> Option<&Release> {
        self.releases
            .iter()
            .filter(|r| r.timestamp <= instant)
            .max_by_key(|r| r.timestamp)
    }

    /// Earliest release whose timestamp is strictly after the given instant.
    pub fn earliest_after(&self, instant: DateTime<Utc>) -> Option<&Release> {
        self.releases
            .iter()
            .filter(|r| r.timestamp > instant)
            .min_by_key(|r| r.timestamp)
    }

    /// Earliest release among the mapped matches for a tagged commit time.
    ///
    /// Maps a commit to the first release that contains it in time, i.e. the
    /// earliest release with timestamp `>=` the commit time.
    pub fn first_containing(&self, instant: DateTime<Utc>) -> Option<&Release> {
        self.releases
            .iter()
            .filter(|r| r.timestamp >= instant)
            .min_by_key(|r| r.timestamp)
    }

    /// Look up a release by reported version name.
    ///
    /// Tag names frequently carry a `release-` prefix that tracker version
    /// names lack; the comparison strips it and ignores case.
    pub fn by_name(&self, name: &str) -> Option<&Release> {
        if name.is_empty() {
            return None;
        }
        self.releases.iter().find(|r| {
            let normalized = r.name.strip_prefix("release-").unwrap_or(&r.name);
            normalized.eq_ignore_ascii_case(name)
        })
    }
}
