//! Version control backend built on git2.
//!
//! Narrow contract: commit iteration, parent lookup, changed-path
//! computation between a commit and its first parent, blob retrieval by
//! `(commit, path)`, and tag enumeration for the release catalog.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::{Delta, DiffOptions, ObjectType, Oid, Repository, Sort};

use crate::core::{CommitMeta, Error, ReleaseCatalog, Result};

/// Kind of change a commit applied to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One changed path between a commit and its first parent.
///
/// Renames surface as an unrelated delete+add pair: rename detection is
/// deliberately off, so a moved file starts a fresh history.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    /// Path in the post-commit tree (the pre-commit path for deletions).
    pub path: String,
    /// Path in the pre-commit tree (the post-commit path for additions).
    pub old_path: String,
    pub kind: ChangeKind,
}

/// Git repository wrapper for mining operations.
pub struct GitRepo {
    repo: Repository,
    root: PathBuf,
}

impl GitRepo {
    /// Open a git repository at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path)
            .map_err(|e| Error::git(format!("failed to open repository: {e}")))?;
        let root = repo
            .workdir()
            .ok_or_else(|| Error::git("not a work tree"))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Get the repository root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All commits reachable from HEAD, oldest first.
    pub fn commits_oldest_first(&self) -> Result<Vec<Oid>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TIME | Sort::REVERSE)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            commits.push(oid?);
        }
        Ok(commits)
    }

    /// Number of parents of a commit. Zero marks a root commit.
    pub fn parent_count(&self, oid: Oid) -> Result<usize> {
        Ok(self.repo.find_commit(oid)?.parent_count())
    }

    /// First parent of a commit.
    pub fn first_parent(&self, oid: Oid) -> Result<Oid> {
        Ok(self.repo.find_commit(oid)?.parent_id(0)?)
    }

    /// Author and timing metadata for a commit.
    pub fn commit_meta(&self, oid: Oid) -> Result<CommitMeta> {
        let commit = self.repo.find_commit(oid)?;
        let meta = CommitMeta {
            author: commit.author().name().unwrap_or("unknown").to_string(),
            seconds: commit.time().seconds(),
        };
        Ok(meta)
    }

    /// Full commit message.
    pub fn message(&self, oid: Oid) -> Result<String> {
        let commit = self.repo.find_commit(oid)?;
        Ok(commit.message().unwrap_or("").to_string())
    }

    /// Changed paths between a commit and its first parent.
    pub fn changed_files(&self, oid: Oid) -> Result<Vec<ChangedFile>> {
        let commit = self.repo.find_commit(oid)?;
        if commit.parent_count() == 0 {
            return Ok(Vec::new());
        }
        let parent_tree = commit.parent(0)?.tree()?;
        let tree = commit.tree()?;

        let mut opts = DiffOptions::new();
        opts.ignore_filemode(true);
        let diff =
            self.repo
                .diff_tree_to_tree(Some(&parent_tree), Some(&tree), Some(&mut opts))?;

        let mut changed = Vec::new();
        for delta in diff.deltas() {
            let old_path = delta.old_file().path().map(path_to_string);
            let new_path = delta.new_file().path().map(path_to_string);

            let kind = match delta.status() {
                Delta::Added => ChangeKind::Added,
                Delta::Deleted => ChangeKind::Deleted,
                _ => ChangeKind::Modified,
            };
            let (path, old_path) = match kind {
                ChangeKind::Added => match new_path {
                    Some(p) => (p.clone(), p),
                    None => continue,
                },
                ChangeKind::Deleted => match old_path {
                    Some(p) => (p.clone(), p),
                    None => continue,
                },
                ChangeKind::Modified => match (new_path, old_path) {
                    (Some(new), Some(old)) => (new, old),
                    _ => continue,
                },
            };
            changed.push(ChangedFile {
                path,
                old_path,
                kind,
            });
        }
        Ok(changed)
    }

    /// Blob id and content for a path at a commit.
    ///
    /// Returns `Ok(None)` when the path does not exist in that commit's
    /// tree (the caller treats it as empty content).
    pub fn blob_at(&self, oid: Oid, path: &str) -> Result<Option<(Oid, String)>> {
        let tree = self.repo.find_commit(oid)?.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object = entry.to_object(&self.repo)?;
        match object.as_blob() {
            Some(blob) => Ok(Some((
                blob.id(),
                String::from_utf8_lossy(blob.content()).into_owned(),
            ))),
            None => Ok(None),
        }
    }

    /// Build the release catalog from repository tags.
    ///
    /// Each tag is peeled to its commit; invalid tags are skipped. Releases
    /// are ordered by tagged-commit time, indices dense from 0.
    pub fn release_catalog(&self) -> Result<ReleaseCatalog> {
        let names = self.repo.tag_names(None)?;
        let mut entries = Vec::new();
        for name in names.iter().flatten() {
            let reference = format!("refs/tags/{name}");
            let commit = match self
                .repo
                .revparse_single(&reference)
                .and_then(|obj| obj.peel_to_commit())
            {
                Ok(commit) => commit,
                Err(e) => {
                    tracing::warn!("skipping unresolvable tag {name}: {e}");
                    continue;
                }
            };
            let Some(timestamp) = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
            else {
                tracing::warn!("skipping tag {name} with out-of-range commit time");
                continue;
            };
            entries.push((name.to_string(), commit.id().to_string(), timestamp));
        }
        ReleaseCatalog::new(entries)
    }

    /// List `(path, content)` for every file with the given extension in
    /// the tree at `revision`.
    pub fn files_at(&self, revision: &str, extension: &str) -> Result<Vec<(String, String)>> {
        let commit = self
            .repo
            .revparse_single(revision)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|e| Error::git(format!("cannot resolve revision {revision}: {e}")))?;
        let tree = commit.tree()?;

        let mut files = Vec::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                let name = entry.name().unwrap_or("");
                let path = format!("{root}{name}");
                if path.ends_with(extension) {
                    if let Ok(object) = entry.to_object(&self.repo) {
                        if let Some(blob) = object.as_blob() {
                            files
                                .push((path, String::from_utf8_lossy(blob.content()).into_owned()));
                        }
                    }
                }
            }
            git2::TreeWalkResult::Ok
        })?;
        Ok(files)
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_not_a_repo() {
        let temp = tempfile::tempdir().unwrap();
        let result = GitRepo::open(temp.path());
        assert!(result.is_err());
    }
}
