//! Binary defect labelling.
//!
//! A function is buggy at a release when some ticket's lifecycle window
//! covers that release and one of the function's bug-fix commits references
//! that ticket. The window is half-open: `IV.index <= release < FV.index`,
//! so the fixed release itself is clean.

use crate::core::{FunctionHistory, Release, Ticket};
use crate::history::BugLinkIndex;

/// Labels functions against a fixed set of estimated tickets.
pub struct Labeler<'a> {
    tickets: Vec<&'a Ticket>,
    links: &'a BugLinkIndex,
}

impl<'a> Labeler<'a> {
    /// Keep only tickets whose window is usable (IV and FV both resolved).
    pub fn new(tickets: &'a [Ticket], links: &'a BugLinkIndex) -> Self {
        let tickets = tickets
            .iter()
            .filter(|t| t.injected.is_resolved() && t.fixed.is_resolved())
            .collect();
        Self { tickets, links }
    }

    /// Number of tickets that can contribute labels.
    pub fn usable_tickets(&self) -> usize {
        self.tickets.len()
    }

    /// Whether the function is defective in the given release.
    pub fn is_buggy(&self, history: &FunctionHistory, release: &Release) -> bool {
        if history.bug_fix_commits.is_empty() {
            return false;
        }
        self.tickets.iter().any(|ticket| {
            let (Some(iv), Some(fv)) = (ticket.injected.index(), ticket.fixed.index()) else {
                return false;
            };
            iv <= release.index
                && release.index < fv
                && history
                    .bug_fix_commits
                    .iter()
                    .any(|commit| self.links.mentions(commit, &ticket.key))
        })
    }
}
