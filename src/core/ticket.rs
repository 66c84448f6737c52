//! Tracker tickets and their resolved lifecycle versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Release;

/// One resolved-version slot on a ticket.
///
/// Each of IV/OV/FV is resolved independently. `Pending` means the estimator
/// has not run yet; `Unmatched` means it ran and no catalog release
/// qualifies. Keeping the two apart avoids the "null means both" ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VersionSlot {
    #[default]
    Pending,
    Unmatched,
    Resolved(Release),
}

impl VersionSlot {
    /// The resolved release, if any.
    pub fn release(&self) -> Option<&Release> {
        match self {
            VersionSlot::Resolved(release) => Some(release),
            _ => None,
        }
    }

    /// The resolved release index, if any.
    pub fn index(&self) -> Option<usize> {
        self.release().map(|r| r.index)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, VersionSlot::Resolved(_))
    }
}

/// A bug ticket fetched from the issue tracker.
///
/// Constructed from raw tracker data; the lifecycle estimator populates the
/// three version slots exactly once, after which the ticket is read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Tracker key, e.g. `BOOKKEEPER-123`.
    pub key: String,
    /// When the ticket was opened. Missing or unparsable dates stay `None`
    /// and exclude the ticket from lifecycle resolution.
    pub created: Option<DateTime<Utc>>,
    /// When the ticket was resolved.
    pub resolved: Option<DateTime<Utc>>,
    /// Version names the reporter claims are affected, as free text.
    pub affected_versions: Vec<String>,

    /// Injected Version: earliest release the defect was present in.
    #[serde(default)]
    pub injected: VersionSlot,
    /// Opening Version: release the report was filed against.
    #[serde(default)]
    pub opening: VersionSlot,
    /// Fixed Version: first release no longer containing the defect.
    #[serde(default)]
    pub fixed: VersionSlot,
}

impl Ticket {
    pub fn new(
        key: impl Into<String>,
        created: Option<DateTime<Utc>>,
        resolved: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            key: key.into(),
            created,
            resolved,
            affected_versions: Vec::new(),
            injected: VersionSlot::Pending,
            opening: VersionSlot::Pending,
            fixed: VersionSlot::Pending,
        }
    }

    pub fn with_affected_versions(mut self, versions: Vec<String>) -> Self {
        self.affected_versions = versions;
        self
    }

    /// Whether IV, OV and FV are all resolved and order-consistent
    /// (`IV.index <= OV.index < FV.index`).
    pub fn has_valid_triple(&self) -> bool {
        match (
            self.injected.index(),
            self.opening.index(),
            self.fixed.index(),
        ) {
            (Some(iv), Some(ov), Some(fv)) => iv <= ov && ov < fv,
            _ => false,
        }
    }

    /// Whether an unknown IV can be estimated from OV and FV.
    pub fn is_estimable(&self) -> bool {
        !self.injected.is_resolved()
            && matches!(
                (self.opening.index(), self.fixed.index()),
                (Some(ov), Some(fv)) if ov < fv
            )
    }
}
