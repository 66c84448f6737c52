//! End-to-end pipeline tests over a scripted fixture repository.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

use augur::core::{Ticket, VersionSlot};
use augur::dataset::{release_inventory, release_window, DatasetBuilder};
use augur::git::GitRepo;
use augur::history::{BugCommitLinker, HistoryWalker};
use augur::label::Labeler;
use augur::lifecycle::LifecycleEstimator;
use augur::metrics::MetricsEngine;
use augur::parser::{Language, TreeSitterProvider};

fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, day, 12, 0, 0).unwrap()
}

fn commit(repo: &Repository, files: &[(&str, &str)], message: &str, day: u32) -> Oid {
    let workdir = repo.workdir().unwrap();
    for (path, content) in files {
        std::fs::write(workdir.join(path), content).unwrap();
    }
    let mut index = repo.index().unwrap();
    for (path, _) in files {
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let time = Time::new(ts(day).timestamp(), 0);
    let sig = Signature::new("Tester", "tester@example.com", &time).unwrap();
    let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

fn tag(repo: &Repository, oid: Oid, name: &str) {
    let object = repo.find_object(oid, None).unwrap();
    repo.tag_lightweight(name, &object, false).unwrap();
}

fn class_a(f_body: &str, g_body: &str) -> String {
    format!("class A {{\n    int f() {{ {f_body} }}\n    int g() {{ {g_body} }}\n}}\n")
}

/// Five tagged releases, one ticket, one linked fix commit.
///
/// Releases R0..R4 land on days 2, 4, 6, 8, 10. The ticket PROJ-1 reports
/// version 2.0 affected (IV = R1), is created on day 5 (OV = R1) and
/// resolved on day 9 (FV = R4). The fix commit lands on day 9.
struct Fixture {
    _dir: TempDir,
    repo: GitRepo,
    fix_commit: String,
}

fn build_fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let raw = Repository::init(dir.path()).unwrap();

    // Root commit, skipped by the walk.
    commit(&raw, &[("A.java", &class_a("return 1;", "return 9;"))], "initial", 1);

    let c1 = commit(&raw, &[("A.java", &class_a("return 2;", "return 9;"))], "tune f", 2);
    tag(&raw, c1, "release-1.0");

    let c2 = commit(&raw, &[("A.java", &class_a("return 2;", "return 8;"))], "tune g", 4);
    tag(&raw, c2, "release-2.0");

    let c3 = commit(&raw, &[("A.java", &class_a("return 3;", "return 8;"))], "rework f", 6);
    tag(&raw, c3, "release-3.0");

    let c4 = commit(&raw, &[("B.java", "class B { void h() { run(); } }\n")], "add B", 8);
    tag(&raw, c4, "release-4.0");

    let fix = commit(
        &raw,
        &[("A.java", &class_a("return 4;", "return 8;"))],
        "PROJ-1: guard f against overflow",
        9,
    );

    let c6 = commit(&raw, &[("A.java", &class_a("return 4;", "return 7;"))], "tune g again", 10);
    tag(&raw, c6, "release-5.0");

    let repo = GitRepo::open(dir.path()).unwrap();
    Fixture {
        _dir: dir,
        repo,
        fix_commit: fix.to_string(),
    }
}

fn ticket() -> Ticket {
    Ticket::new("PROJ-1", Some(ts(5)), Some(ts(9)))
        .with_affected_versions(vec!["2.0".to_string()])
}

#[test]
fn test_release_catalog_from_tags() {
    let fixture = build_fixture();
    let catalog = fixture.repo.release_catalog().unwrap();

    assert_eq!(catalog.len(), 5);
    let names: Vec<&str> = catalog.releases().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["release-1.0", "release-2.0", "release-3.0", "release-4.0", "release-5.0"]
    );
    assert_eq!(catalog.by_name("2.0").unwrap().index, 1);
}

#[test]
fn test_walk_attributes_churn_and_fixes() {
    let fixture = build_fixture();
    let provider = TreeSitterProvider::new(Language::Java);

    let tickets = vec![ticket()];
    let linker = BugCommitLinker::from_keys(tickets.iter().map(|t| t.key.as_str())).unwrap();
    let commits = fixture.repo.commits_oldest_first().unwrap();
    let links = linker.scan(&fixture.repo, &commits).unwrap();
    assert_eq!(links.fix_commit_count(), 1);
    assert!(links.is_fix(&fixture.fix_commit));

    let walker = HistoryWalker::new(&fixture.repo, &provider, ".java");
    let outcome = walker.walk(&links).unwrap();

    // The root commit contributes nothing.
    assert_eq!(outcome.commits_skipped, 1);
    assert_eq!(outcome.commits_processed, 6);

    // f changed in c1, c3 and the fix; each edit replaced one statement.
    let f = &outcome.functions["A.java/f()"];
    assert_eq!(f.revisions(), 3);
    assert!(f.changes.iter().all(|c| c.churn == 2));
    assert!(f.bug_fix_commits.contains(&fixture.fix_commit));

    // g did not change in the fix commit but was present afterward, so the
    // fix tag lands on it too.
    let g = &outcome.functions["A.java/g()"];
    assert_eq!(g.revisions(), 2);
    assert!(g.bug_fix_commits.contains(&fixture.fix_commit));

    // File-level churn follows lines, not statements.
    assert!(outcome.files.contains_key("A.java"));
    assert!(outcome.files.contains_key("B.java"));
}

#[test]
fn test_walk_is_idempotent() {
    let fixture = build_fixture();
    let provider = TreeSitterProvider::new(Language::Java);
    let linker = BugCommitLinker::from_keys(["PROJ-1"]).unwrap();
    let commits = fixture.repo.commits_oldest_first().unwrap();
    let links = linker.scan(&fixture.repo, &commits).unwrap();

    let walker = HistoryWalker::new(&fixture.repo, &provider, ".java");
    let first = walker.walk(&links).unwrap();
    let second = walker.walk(&links).unwrap();

    assert_eq!(first.functions, second.functions);
    assert_eq!(first.files, second.files);
}

#[test]
fn test_ticket_lifecycle_resolution() {
    let fixture = build_fixture();
    let catalog = fixture.repo.release_catalog().unwrap();

    let mut tickets = vec![ticket()];
    let estimator = LifecycleEstimator::new(&catalog);
    let report = estimator.estimate(&mut tickets);

    assert_eq!(report.with_valid_triple, 1);
    assert_eq!(tickets[0].injected.index(), Some(1));
    assert_eq!(tickets[0].opening.index(), Some(1));
    assert_eq!(tickets[0].fixed.index(), Some(4));
    assert!(matches!(tickets[0].injected, VersionSlot::Resolved(_)));
}

#[test]
fn test_labels_respect_half_open_window() {
    let fixture = build_fixture();
    let catalog = fixture.repo.release_catalog().unwrap();
    let provider = TreeSitterProvider::new(Language::Java);

    let mut tickets = vec![ticket()];
    let linker = BugCommitLinker::from_keys(tickets.iter().map(|t| t.key.as_str())).unwrap();
    let commits = fixture.repo.commits_oldest_first().unwrap();
    let links = linker.scan(&fixture.repo, &commits).unwrap();

    let walker = HistoryWalker::new(&fixture.repo, &provider, ".java");
    let outcome = walker.walk(&links).unwrap();

    LifecycleEstimator::new(&catalog).estimate(&mut tickets);
    let labeler = Labeler::new(&tickets, &links);
    let f = &outcome.functions["A.java/f()"];

    // IV = R1, FV = R4: buggy in R1..R3, clean at R0 and at the fix
    // release itself.
    let verdicts: Vec<bool> = catalog
        .releases()
        .iter()
        .map(|r| labeler.is_buggy(f, r))
        .collect();
    assert_eq!(verdicts, vec![false, true, true, true, false]);
}

#[test]
fn test_metrics_decay_and_cutoff() {
    let fixture = build_fixture();
    let catalog = fixture.repo.release_catalog().unwrap();
    let provider = TreeSitterProvider::new(Language::Java);

    let linker = BugCommitLinker::from_keys(["PROJ-1"]).unwrap();
    let commits = fixture.repo.commits_oldest_first().unwrap();
    let links = linker.scan(&fixture.repo, &commits).unwrap();
    let outcome = HistoryWalker::new(&fixture.repo, &provider, ".java")
        .walk(&links)
        .unwrap();

    let engine = MetricsEngine::new(&catalog, &outcome.commits);
    let f = &outcome.functions["A.java/f()"];

    // At R2 only the day-2 and day-6 edits count; the fix (day 9) maps to
    // R4 and is excluded.
    let at_r2 = engine.profile(f, catalog.get(2).unwrap());
    assert_eq!(at_r2.revisions, 2);
    assert_eq!(at_r2.authors, 1);
    assert_eq!(at_r2.bug_fixes, 0);
    // Weights: 2 * (1 - 2/5) + 2 * 1 = 3.2
    assert!((at_r2.total_weighted_churn - 3.2).abs() < 1e-9);
    assert!((at_r2.max_weighted_churn - 2.0).abs() < 1e-9);

    let at_r4 = engine.profile(f, catalog.get(4).unwrap());
    assert_eq!(at_r4.revisions, 3);
    assert_eq!(at_r4.bug_fixes, 1);
}

#[test]
fn test_dataset_rows_end_to_end() {
    let fixture = build_fixture();
    let catalog = fixture.repo.release_catalog().unwrap();
    let provider = TreeSitterProvider::new(Language::Java);

    let mut tickets = vec![ticket()];
    let linker = BugCommitLinker::from_keys(tickets.iter().map(|t| t.key.as_str())).unwrap();
    let commits = fixture.repo.commits_oldest_first().unwrap();
    let links = linker.scan(&fixture.repo, &commits).unwrap();
    let outcome = HistoryWalker::new(&fixture.repo, &provider, ".java")
        .walk(&links)
        .unwrap();

    LifecycleEstimator::new(&catalog).estimate(&mut tickets);
    let labeler = Labeler::new(&tickets, &links);
    let engine = MetricsEngine::new(&catalog, &outcome.commits);
    let builder = DatasetBuilder::new("demo", &outcome, &labeler, &engine);

    // Default fraction: ceil(0.34 * 5) = 2 releases.
    assert_eq!(release_window(&catalog, 0.34).len(), 2);

    // Emit the full history to check labels per release.
    let window = release_window(&catalog, 1.0);
    let rows = builder
        .build(window, |release| {
            release_inventory(&fixture.repo, &provider, release, ".java")
        })
        .unwrap();

    let f_rows: Vec<_> = rows.iter().filter(|r| r.function == "A.java/f()").collect();
    assert_eq!(f_rows.len(), 5);
    let labels: Vec<&str> = f_rows.iter().map(|r| r.buggy).collect();
    assert_eq!(labels, vec!["no", "yes", "yes", "yes", "no"]);
    assert!(f_rows.iter().all(|r| r.project == "demo"));
    // Owning-file aggregates cover every A.java edit seen so far.
    assert!(f_rows.last().unwrap().file_revisions >= f_rows.last().unwrap().revisions);

    // B.java appears only from R3 on; h() has exactly one recorded change.
    let h_rows: Vec<_> = rows.iter().filter(|r| r.function == "B.java/h()").collect();
    assert_eq!(h_rows.len(), 2);
    assert_eq!(h_rows[0].release, "release-4.0");
}
