//! Commit history walker.
//!
//! Walks every commit with at least one parent, attributes statement churn
//! to functions and line churn to files, and tags bug-fix commits onto the
//! functions present after the fix. The walk returns an immutable
//! [`WalkOutcome`]; nothing is accumulated in global state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use git2::Oid;
use rayon::prelude::*;

use crate::core::{CommitId, CommitMeta, FileHistory, FunctionHistory, Result};
use crate::diff;
use crate::git::{ChangeKind, GitRepo};
use crate::parser::StructureProvider;

use super::linker::BugLinkIndex;

/// Function signatures to statement lists for one file snapshot.
type FunctionMap = HashMap<String, Vec<String>>;

/// Memoizes provider output by blob identity within one run.
///
/// The same blob is routinely reached through many commits; parsing it once
/// is enough. The cache is owned by the walk, never ambient.
#[derive(Default)]
struct ParseCache {
    by_blob: HashMap<Oid, Arc<FunctionMap>>,
    hits: usize,
    misses: usize,
}

/// Everything the walk learned about the repository's history.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Per-function append-only histories, keyed by `path/signature`.
    pub functions: BTreeMap<String, FunctionHistory>,
    /// Per-file append-only histories, keyed by path.
    pub files: BTreeMap<String, FileHistory>,
    /// Metadata for every processed commit.
    pub commits: HashMap<CommitId, CommitMeta>,
    pub commits_processed: usize,
    pub commits_skipped: usize,
    pub files_skipped: usize,
}

/// Churn and fix events one commit contributes, before reduction.
#[derive(Debug, Default)]
struct CommitDelta {
    function_events: Vec<(String, u32)>,
    file_events: Vec<(String, u32)>,
    fixed_functions: Vec<String>,
}

/// Walks the full commit history of one repository.
pub struct HistoryWalker<'a> {
    repo: &'a GitRepo,
    provider: &'a dyn StructureProvider,
    /// Tracked source extension, e.g. `.java`.
    extension: String,
}

impl<'a> HistoryWalker<'a> {
    pub fn new(
        repo: &'a GitRepo,
        provider: &'a dyn StructureProvider,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            provider,
            extension: extension.into(),
        }
    }

    /// Walk every commit oldest-first and fold per-commit deltas into the
    /// outcome. Single-file failures and missing objects are logged and
    /// skipped, never fatal.
    pub fn walk(&self, links: &BugLinkIndex) -> Result<WalkOutcome> {
        let start = Instant::now();
        let commits = self.repo.commits_oldest_first()?;
        tracing::info!("walking {} commits", commits.len());

        let mut cache = ParseCache::default();
        let mut outcome = WalkOutcome::default();

        for (count, &oid) in commits.iter().enumerate() {
            if count > 0 && count % 500 == 0 {
                tracing::debug!("processed {count} commits");
            }

            let parents = match self.repo.parent_count(oid) {
                Ok(parents) => parents,
                Err(e) => {
                    tracing::warn!("skipping commit {oid}: {e}");
                    outcome.commits_skipped += 1;
                    continue;
                }
            };
            if parents == 0 {
                outcome.commits_skipped += 1;
                continue;
            }

            match self.commit_delta(oid, links, &mut cache, &mut outcome.files_skipped) {
                Ok(delta) => {
                    let commit = oid.to_string();
                    if let Ok(meta) = self.repo.commit_meta(oid) {
                        outcome.commits.insert(commit.clone(), meta);
                    }
                    apply_delta(&mut outcome, &commit, delta);
                    outcome.commits_processed += 1;
                }
                Err(e) => {
                    tracing::warn!("skipping commit {oid}: {e}");
                    outcome.commits_skipped += 1;
                }
            }
        }

        tracing::info!(
            "history walk finished in {:?}: {} functions, {} files ({} blob cache hits, {} misses)",
            start.elapsed(),
            outcome.functions.len(),
            outcome.files.len(),
            cache.hits,
            cache.misses,
        );
        Ok(outcome)
    }

    /// Compute one commit's churn and fix events.
    fn commit_delta(
        &self,
        oid: Oid,
        links: &BugLinkIndex,
        cache: &mut ParseCache,
        files_skipped: &mut usize,
    ) -> Result<CommitDelta> {
        let parent = self.repo.first_parent(oid)?;
        let is_fix = links.is_fix(&oid.to_string());
        let mut delta = CommitDelta::default();

        for file in self.repo.changed_files(oid)? {
            if !file.path.ends_with(&self.extension) {
                continue;
            }

            let before_blob = match self.repo.blob_at(parent, &file.old_path) {
                Ok(blob) => blob,
                Err(e) => {
                    tracing::warn!("skipping {} at {oid}: {e}", file.old_path);
                    *files_skipped += 1;
                    continue;
                }
            };
            let after_blob = if file.kind == ChangeKind::Deleted {
                None
            } else {
                match self.repo.blob_at(oid, &file.path) {
                    Ok(blob) => blob,
                    Err(e) => {
                        tracing::warn!("skipping {} at {oid}: {e}", file.path);
                        *files_skipped += 1;
                        continue;
                    }
                }
            };

            let before = self.functions_of(before_blob.as_ref(), cache);
            let after = self.functions_of(after_blob.as_ref(), cache);

            // Whole-file line churn, independent of function boundaries.
            let before_lines = lines_of(before_blob.as_ref());
            let after_lines = lines_of(after_blob.as_ref());
            let file_stats = diff::diff(&before_lines, &after_lines);
            if !file_stats.is_empty() {
                delta
                    .file_events
                    .push((file.path.clone(), file_stats.churn()));
            }

            diff_functions(&file.path, &before, &after, &mut delta.function_events);

            // A fix commit tags every function still present after the
            // change; a function the fix deleted cannot be the fixed one.
            if is_fix {
                for signature in after.keys() {
                    delta
                        .fixed_functions
                        .push(function_id(&file.path, signature));
                }
            }
        }

        Ok(delta)
    }

    /// Extract the function map of a blob, memoized by blob id.
    fn functions_of(
        &self,
        blob: Option<&(Oid, String)>,
        cache: &mut ParseCache,
    ) -> Arc<FunctionMap> {
        let Some((blob_id, content)) = blob else {
            return Arc::new(FunctionMap::new());
        };
        if let Some(parsed) = cache.by_blob.get(blob_id) {
            cache.hits += 1;
            return Arc::clone(parsed);
        }
        cache.misses += 1;
        let functions: FunctionMap = self
            .provider
            .extract_functions(content)
            .into_iter()
            .map(|f| (f.signature, f.statements))
            .collect();
        let functions = Arc::new(functions);
        cache.by_blob.insert(*blob_id, Arc::clone(&functions));
        functions
    }
}

/// Diff every function in the union of both snapshots, in parallel, and
/// append the non-zero churn events in deterministic (sorted id) order.
fn diff_functions(
    path: &str,
    before: &FunctionMap,
    after: &FunctionMap,
    events: &mut Vec<(String, u32)>,
) {
    let mut union: Vec<&String> = before.keys().chain(after.keys()).collect();
    union.sort();
    union.dedup();

    static EMPTY: Vec<String> = Vec::new();
    let computed: Vec<(String, u32)> = union
        .par_iter()
        .filter_map(|signature| {
            let stmts_before = before.get(*signature).unwrap_or(&EMPTY);
            let stmts_after = after.get(*signature).unwrap_or(&EMPTY);
            if stmts_before == stmts_after {
                return None;
            }
            let stats = diff::diff(stmts_before, stmts_after);
            if stats.is_empty() {
                return None;
            }
            Some((function_id(path, signature), stats.churn()))
        })
        .collect();

    events.extend(computed);
}

/// Reduce one commit's events into the histories, in one step per commit.
fn apply_delta(outcome: &mut WalkOutcome, commit: &str, delta: CommitDelta) {
    for (id, churn) in delta.function_events {
        outcome
            .functions
            .entry(id)
            .or_default()
            .record_change(commit, churn);
    }
    for (path, churn) in delta.file_events {
        outcome
            .files
            .entry(path)
            .or_default()
            .record_change(commit, churn);
    }
    for id in delta.fixed_functions {
        outcome.functions.entry(id).or_default().record_fix(commit);
    }
}

/// Stable function identifier: normalized path plus signature.
pub fn function_id(path: &str, signature: &str) -> String {
    format!("{}/{}", path.replace('\\', "/"), signature)
}

fn lines_of(blob: Option<&(Oid, String)>) -> Vec<String> {
    blob.map(|(_, content)| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_id_normalizes_separators() {
        assert_eq!(
            function_id("src\\main\\A.java", "f(int a)"),
            "src/main/A.java/f(int a)"
        );
    }

    #[test]
    fn test_diff_functions_union_and_suppression() {
        let mut before = FunctionMap::new();
        before.insert("kept()".to_string(), vec!["a;".to_string()]);
        before.insert("gone()".to_string(), vec!["x;".to_string(), "y;".to_string()]);

        let mut after = FunctionMap::new();
        after.insert("kept()".to_string(), vec!["a;".to_string()]);
        after.insert("fresh()".to_string(), vec!["z;".to_string()]);

        let mut events = Vec::new();
        diff_functions("A.java", &before, &after, &mut events);

        // kept() is unchanged and suppressed; the union still covers the
        // deleted and the added function.
        assert_eq!(
            events,
            vec![
                ("A.java/fresh()".to_string(), 1),
                ("A.java/gone()".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_apply_delta_is_additive() {
        let mut outcome = WalkOutcome::default();
        apply_delta(
            &mut outcome,
            "c1",
            CommitDelta {
                function_events: vec![("A.java/f()".to_string(), 3)],
                file_events: vec![("A.java".to_string(), 5)],
                fixed_functions: vec![],
            },
        );
        apply_delta(
            &mut outcome,
            "c2",
            CommitDelta {
                function_events: vec![("A.java/f()".to_string(), 1)],
                file_events: vec![("A.java".to_string(), 1)],
                fixed_functions: vec!["A.java/f()".to_string()],
            },
        );

        let history = &outcome.functions["A.java/f()"];
        assert_eq!(history.revisions(), 2);
        assert_eq!(history.changes[0].commit, "c1");
        assert_eq!(history.changes[1].commit, "c2");
        assert!(history.bug_fix_commits.contains("c2"));
        assert_eq!(outcome.files["A.java"].changes.len(), 2);
    }

    #[test]
    fn test_fix_on_untracked_function_creates_history() {
        // A fix commit can tag a function that never accumulated churn; its
        // history then exists with an empty change log.
        let mut outcome = WalkOutcome::default();
        apply_delta(
            &mut outcome,
            "c9",
            CommitDelta {
                function_events: vec![],
                file_events: vec![],
                fixed_functions: vec!["B.java/g()".to_string()],
            },
        );
        let history = &outcome.functions["B.java/g()"];
        assert_eq!(history.revisions(), 0);
        assert!(history.bug_fix_commits.contains("c9"));
    }
}
