//! LCS-based statement diff engine.
//!
//! Computes an edit script between two ordered statement lists and reduces
//! it to churn counts. A replacement (`Change` delta) contributes to both
//! the inserted and the deleted count, matching the "churn = added +
//! removed" convention used downstream.

use serde::Serialize;

/// Inserted/deleted statement counts for one before/after pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EditStats {
    pub inserted: u32,
    pub deleted: u32,
}

impl EditStats {
    /// Total churn attributed to this edit.
    pub fn churn(&self) -> u32 {
        self.inserted + self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.deleted == 0
    }
}

/// One grouped delta of the edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// `count` elements present only in `after`.
    Insert { count: usize },
    /// `count` elements present only in `before`.
    Delete { count: usize },
    /// A replaced run: `source` elements removed, `target` inserted.
    Change { source: usize, target: usize },
}

/// Diff two ordered statement lists.
///
/// Equal lists yield `{0, 0}`; callers must suppress such results rather
/// than record zero-churn events.
pub fn diff<T: PartialEq>(before: &[T], after: &[T]) -> EditStats {
    let mut stats = EditStats::default();
    for delta in edit_script(before, after) {
        match delta {
            Delta::Insert { count } => stats.inserted += count as u32,
            Delta::Delete { count } => stats.deleted += count as u32,
            Delta::Change { source, target } => {
                stats.deleted += source as u32;
                stats.inserted += target as u32;
            }
        }
    }
    stats
}

/// Compute the grouped edit script via a longest-common-subsequence table.
///
/// Adjacent delete/insert runs at the same position are merged into one
/// `Change` delta.
pub fn edit_script<T: PartialEq>(before: &[T], after: &[T]) -> Vec<Delta> {
    let m = before.len();
    let n = after.len();

    // lcs[i][j] = LCS length of before[i..] and after[j..]
    let mut lcs = vec![vec![0usize; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            lcs[i][j] = if before[i] == after[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut deltas = Vec::new();
    let mut pending_deleted = 0usize;
    let mut pending_inserted = 0usize;
    let mut flush = |deleted: &mut usize, inserted: &mut usize, out: &mut Vec<Delta>| {
        match (*deleted, *inserted) {
            (0, 0) => {}
            (d, 0) => out.push(Delta::Delete { count: d }),
            (0, i) => out.push(Delta::Insert { count: i }),
            (d, i) => out.push(Delta::Change {
                source: d,
                target: i,
            }),
        }
        *deleted = 0;
        *inserted = 0;
    };

    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if before[i] == after[j] {
            flush(&mut pending_deleted, &mut pending_inserted, &mut deltas);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            pending_deleted += 1;
            i += 1;
        } else {
            pending_inserted += 1;
            j += 1;
        }
    }
    pending_deleted += m - i;
    pending_inserted += n - j;
    flush(&mut pending_deleted, &mut pending_inserted, &mut deltas);

    deltas
}
