//! Dataset assembly and emission.
//!
//! Joins the function inventory of each selected release with its change
//! profile and defect label, and writes the result as CSV or JSON. Only an
//! early fraction of the releases is emitted: labels for recent releases
//! are unreliable because many of their defects are still unreported.

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use crate::core::{Release, ReleaseCatalog, Result};
use crate::git::GitRepo;
use crate::history::{function_id, WalkOutcome};
use crate::label::Labeler;
use crate::metrics::{ChangeProfile, MetricsEngine};
use crate::parser::StructureProvider;

/// Fraction of the release history considered label-stable.
pub const DEFAULT_RELEASE_FRACTION: f64 = 0.34;

/// One labelled observation: a function at a release.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetRow {
    pub project: String,
    pub function: String,
    pub release: String,
    pub revisions: usize,
    pub authors: usize,
    pub total_weighted_churn: f64,
    pub max_weighted_churn: f64,
    pub avg_weighted_churn: f64,
    pub bug_fixes: usize,
    /// Owning-file aggregates over whole-file line churn.
    pub file_revisions: usize,
    pub file_authors: usize,
    pub file_total_weighted_churn: f64,
    pub file_avg_weighted_churn: f64,
    pub buggy: &'static str,
}

/// The file a function id belongs to: everything before the last path
/// separator ahead of the signature.
fn owning_path(id: &str) -> &str {
    let signature_start = id.find('(').unwrap_or(id.len());
    match id[..signature_start].rfind('/') {
        Some(cut) => &id[..cut],
        None => id,
    }
}

/// Output encodings for the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

/// The first `ceil(fraction * n)` releases, never fewer than one.
pub fn release_window(catalog: &ReleaseCatalog, fraction: f64) -> &[Release] {
    let n = catalog.len();
    let take = ((fraction * n as f64).ceil() as usize).clamp(1, n);
    &catalog.releases()[..take]
}

/// Every function id present in the tree at one release.
pub fn release_inventory(
    repo: &GitRepo,
    provider: &dyn StructureProvider,
    release: &Release,
    extension: &str,
) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for (path, content) in repo.files_at(&release.revision, extension)? {
        for function in provider.extract_functions(&content) {
            ids.push(function_id(&path, &function.signature));
        }
    }
    ids.sort();
    ids.dedup();
    Ok(ids)
}

/// Builds dataset rows from the mined artifacts.
pub struct DatasetBuilder<'a> {
    project: String,
    outcome: &'a WalkOutcome,
    labeler: &'a Labeler<'a>,
    engine: &'a MetricsEngine<'a>,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(
        project: impl Into<String>,
        outcome: &'a WalkOutcome,
        labeler: &'a Labeler<'a>,
        engine: &'a MetricsEngine<'a>,
    ) -> Self {
        Self {
            project: project.into(),
            outcome,
            labeler,
            engine,
        }
    }

    /// Rows for one release given its function inventory.
    ///
    /// Functions with no recorded change are skipped: a never-touched
    /// function carries no signal and would only dilute the labels.
    pub fn rows_for_release(&self, release: &Release, inventory: &[String]) -> Vec<DatasetRow> {
        let mut file_profiles: HashMap<&str, ChangeProfile> = HashMap::new();
        inventory
            .iter()
            .filter_map(|id| {
                let history = self.outcome.functions.get(id)?;
                if history.changes.is_empty() {
                    return None;
                }
                let profile = self.engine.profile(history, release);
                let buggy = self.labeler.is_buggy(history, release);

                let path = owning_path(id);
                let file = file_profiles.entry(path).or_insert_with(|| {
                    self.outcome
                        .files
                        .get(path)
                        .map(|h| self.engine.file_profile(h, release))
                        .unwrap_or_default()
                });

                Some(DatasetRow {
                    project: self.project.clone(),
                    function: id.clone(),
                    release: release.name.clone(),
                    revisions: profile.revisions,
                    authors: profile.authors,
                    total_weighted_churn: profile.total_weighted_churn,
                    max_weighted_churn: profile.max_weighted_churn,
                    avg_weighted_churn: profile.avg_weighted_churn,
                    bug_fixes: profile.bug_fixes,
                    file_revisions: file.revisions,
                    file_authors: file.authors,
                    file_total_weighted_churn: file.total_weighted_churn,
                    file_avg_weighted_churn: file.avg_weighted_churn,
                    buggy: if buggy { "yes" } else { "no" },
                })
            })
            .collect()
    }

    /// Build rows for every release in the window, pulling each release's
    /// inventory through the supplied lookup.
    pub fn build<F>(&self, window: &[Release], mut inventory: F) -> Result<Vec<DatasetRow>>
    where
        F: FnMut(&Release) -> Result<Vec<String>>,
    {
        let mut rows = Vec::new();
        for release in window {
            let ids = inventory(release)?;
            let mut batch = self.rows_for_release(release, &ids);
            tracing::debug!("{}: {} rows", release.name, batch.len());
            rows.append(&mut batch);
        }
        tracing::info!("dataset: {} rows across {} releases", rows.len(), window.len());
        Ok(rows)
    }
}

/// Serialize rows in the requested format.
pub fn write_rows<W: Write>(rows: &[DatasetRow], format: OutputFormat, out: W) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(out, rows)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FunctionHistory, Ticket, VersionSlot};
    use crate::history::BugLinkIndex;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn catalog(n: usize) -> ReleaseCatalog {
        ReleaseCatalog::new(
            (0..n)
                .map(|i| {
                    (
                        format!("release-0.{i}.0"),
                        format!("{i:040}"),
                        Utc.with_ymd_and_hms(2023, 1, i as u32 + 1, 0, 0, 0).unwrap(),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_release_window_rounds_up_and_floors_at_one() {
        let ten = catalog(10);
        assert_eq!(release_window(&ten, 0.34).len(), 4);
        assert_eq!(release_window(&ten, 1.0).len(), 10);

        let two = catalog(2);
        assert_eq!(release_window(&two, 0.34).len(), 1);
        assert_eq!(release_window(&two, 0.0).len(), 1);
    }

    #[test]
    fn test_owning_path_strips_signature() {
        assert_eq!(owning_path("src/A.java/f(int a, int b)"), "src/A.java");
        assert_eq!(owning_path("A.java/f()"), "A.java");
    }

    #[test]
    fn test_rows_skip_functions_without_history() {
        let catalog = catalog(3);
        let commits = HashMap::from([(
            "c1".to_string(),
            crate::core::CommitMeta {
                author: "ada".to_string(),
                seconds: catalog.get(0).unwrap().timestamp.timestamp(),
            },
        )]);
        let engine = MetricsEngine::new(&catalog, &commits);

        let mut ticket = Ticket::new("PROJ-1", None, None);
        ticket.injected = VersionSlot::Resolved(catalog.get(0).unwrap().clone());
        ticket.fixed = VersionSlot::Resolved(catalog.get(2).unwrap().clone());
        let tickets = vec![ticket];
        let links = BugLinkIndex::from_entries(vec![(
            "c1".to_string(),
            vec!["PROJ-1".to_string()],
        )]);
        let labeler = Labeler::new(&tickets, &links);

        let mut outcome = WalkOutcome::default();
        let mut touched = FunctionHistory::default();
        touched.record_change("c1", 3);
        touched.record_fix("c1");
        outcome.functions.insert("A.java/f()".to_string(), touched);
        outcome
            .functions
            .insert("A.java/idle()".to_string(), FunctionHistory::default());

        let builder = DatasetBuilder::new("demo", &outcome, &labeler, &engine);
        let inventory = vec![
            "A.java/f()".to_string(),
            "A.java/idle()".to_string(),
            "A.java/unknown()".to_string(),
        ];
        let rows = builder.rows_for_release(catalog.get(0).unwrap(), &inventory);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].function, "A.java/f()");
        assert_eq!(rows[0].revisions, 1);
        assert_eq!(rows[0].buggy, "yes");
    }

    #[test]
    fn test_csv_emission_has_header_and_rows() {
        let row = DatasetRow {
            project: "demo".to_string(),
            function: "A.java/f()".to_string(),
            release: "release-0.0.0".to_string(),
            revisions: 2,
            authors: 1,
            total_weighted_churn: 3.5,
            max_weighted_churn: 2.0,
            avg_weighted_churn: 1.75,
            bug_fixes: 1,
            file_revisions: 3,
            file_authors: 2,
            file_total_weighted_churn: 9.0,
            file_avg_weighted_churn: 3.0,
            buggy: "no",
        };
        let mut buffer = Vec::new();
        write_rows(&[row], OutputFormat::Csv, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("project,function,release"));
        assert!(lines.next().unwrap().ends_with(",no"));
    }

    #[test]
    fn test_json_emission_is_an_array() {
        let mut buffer = Vec::new();
        write_rows(&[], OutputFormat::Json, &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert!(value.as_array().unwrap().is_empty());
    }
}
