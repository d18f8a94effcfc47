//! Read-only revision history queries.
//!
//! [`GitHistory`] walks a git repository from `HEAD`, most recent first, and
//! decorates each commit with the short names of the tags and branches that
//! point at it (what `git log --decorate` shows).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use git2::{ErrorCode, Oid, Repository, Sort};

use binsync_core::{RevisionEntry, RevisionId};

use crate::error::{query_err, SyncError};

/// Anything that can produce a most-recent-first history snapshot.
pub trait RevisionSource: Send + Sync {
    /// At most `max_depth` entries, most recent first.
    fn history(&self, max_depth: usize) -> Result<Vec<RevisionEntry>, SyncError>;
}

/// A fixed snapshot, used when the history was produced elsewhere.
impl RevisionSource for Vec<RevisionEntry> {
    fn history(&self, max_depth: usize) -> Result<Vec<RevisionEntry>, SyncError> {
        Ok(self.iter().take(max_depth).cloned().collect())
    }
}

/// History of the git repository containing `workspace`.
#[derive(Debug, Clone)]
pub struct GitHistory {
    workspace: PathBuf,
}

impl GitHistory {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }
}

impl RevisionSource for GitHistory {
    fn history(&self, max_depth: usize) -> Result<Vec<RevisionEntry>, SyncError> {
        let err = |e| query_err(&self.workspace, e);
        let repo = Repository::discover(&self.workspace).map_err(err)?;

        // A freshly initialised repository has no commits yet.
        match repo.head() {
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(Vec::new()),
            Err(e) => return Err(err(e)),
        }

        let labels = label_index(&repo).map_err(err)?;

        let mut revwalk = repo.revwalk().map_err(err)?;
        revwalk.push_head().map_err(err)?;
        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .map_err(err)?;

        let mut entries = Vec::with_capacity(max_depth.min(256));
        for oid in revwalk.take(max_depth) {
            let oid = oid.map_err(err)?;
            entries.push(RevisionEntry {
                id: RevisionId::from(oid.to_string()),
                labels: labels.get(&oid).cloned().unwrap_or_default(),
            });
        }

        tracing::debug!(
            workspace = %self.workspace.display(),
            entries = entries.len(),
            "read revision history",
        );
        Ok(entries)
    }
}

/// Map every commit to the sorted short names of the references pointing at it.
fn label_index(repo: &Repository) -> Result<HashMap<Oid, Vec<String>>, git2::Error> {
    let mut index: HashMap<Oid, Vec<String>> = HashMap::new();
    for reference in repo.references()? {
        let reference = reference?;
        if !(reference.is_tag() || reference.is_branch() || reference.is_remote()) {
            continue;
        }
        let Some(name) = reference.shorthand() else {
            continue;
        };
        // Tags on trees or blobs carry no revision.
        let Ok(commit) = reference.peel_to_commit() else {
            continue;
        };
        index.entry(commit.id()).or_default().push(name.to_string());
    }
    for names in index.values_mut() {
        names.sort();
        names.dedup();
    }
    Ok(index)
}
