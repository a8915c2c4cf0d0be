// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Value types exchanged with the backend.
//!
//! ```text
//! Stack (id)
//!   +-- StackBranch (name, archived)
//!         +-- Commit (id)          local and remote
//!         +-- UpstreamCommit (id)  remote only
//!               +-- TreeChange (path)
//! ```
//!
//! All types are plain snapshots in camelCase JSON. Optional fields default
//! when the backend omits them.

use serde::{Deserialize, Serialize};

/// An ordered collection of branches forming one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub id: String,
    /// Branch names, bottom of the stack first.
    #[serde(default)]
    pub heads: Vec<String>,
    /// Commit id at the top of the stack.
    #[serde(default)]
    pub tip: Option<String>,
}

/// A named, orderable unit within a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackBranch {
    pub name: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub remote_tracking_branch: Option<String>,
}

/// Commit author or committer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Where a local commit lives relative to the remote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "subject")]
pub enum CommitState {
    #[default]
    LocalOnly,
    LocalAndRemote(String),
    Integrated,
}

/// A commit reachable from a branch, local or pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub parent_ids: Vec<String>,
    #[serde(default)]
    pub author: Author,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub state: CommitState,
    #[serde(default)]
    pub has_conflicts: bool,
}

/// A commit that only exists on the remote branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamCommit {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub parent_ids: Vec<String>,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub created_at: u64,
}

/// Status of one path in a commit.
///
/// The backend attaches details (previous state, flags) to every status;
/// only the rename source is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "subject", try_from = "RawTreeStatus")]
pub enum TreeStatus {
    #[serde(rename = "Addition")]
    Added,
    #[serde(rename = "Modification")]
    Modified,
    #[serde(rename = "Deletion")]
    Deleted,
    #[serde(rename = "Rename", rename_all = "camelCase")]
    Renamed {
        previous_path: String,
        #[serde(default)]
        previous_path_bytes: Vec<u8>,
    },
}

#[derive(Deserialize)]
struct RawTreeStatus {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    subject: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameSubject {
    previous_path: String,
    #[serde(default)]
    previous_path_bytes: Vec<u8>,
}

impl TryFrom<RawTreeStatus> for TreeStatus {
    type Error = String;

    fn try_from(raw: RawTreeStatus) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "Addition" => Ok(Self::Added),
            "Modification" => Ok(Self::Modified),
            "Deletion" => Ok(Self::Deleted),
            "Rename" => {
                let subject = raw.subject.ok_or("rename status without subject")?;
                let subject: RenameSubject =
                    serde_json::from_value(subject).map_err(|e| e.to_string())?;
                Ok(Self::Renamed {
                    previous_path: subject.previous_path,
                    previous_path_bytes: subject.previous_path_bytes,
                })
            }
            other => Err(format!("unknown tree status '{other}'")),
        }
    }
}

/// A single path's change within a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeChange {
    pub path: String,
    /// Raw path bytes, which may not be valid UTF-8.
    #[serde(default)]
    pub path_bytes: Vec<u8>,
    pub status: TreeStatus,
}

impl TreeChange {
    /// The path before a rename, if any.
    #[must_use]
    pub fn previous_path(&self) -> Option<&str> {
        match &self.status {
            TreeStatus::Renamed { previous_path, .. } => Some(previous_path),
            _ => None,
        }
    }
}

// --- Requests and mutation results ---

/// Parameters for creating a new stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

/// A hunk range in unified-diff terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
}

/// One worktree change selected for a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_path_bytes: Option<Vec<u8>>,
    pub path_bytes: Vec<u8>,
    pub hunk_headers: Vec<HunkHeader>,
}

impl DiffSpec {
    /// Selects a whole tree change, with no hunk restriction.
    #[must_use]
    pub fn from_change(change: &TreeChange) -> Self {
        let previous_path_bytes = match &change.status {
            TreeStatus::Renamed {
                previous_path_bytes,
                ..
            } => Some(previous_path_bytes.clone()),
            _ => None,
        };
        Self {
            previous_path_bytes,
            path_bytes: change.path_bytes.clone(),
            hunk_headers: Vec::new(),
        }
    }
}

/// Parameters for committing worktree changes onto a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommitRequest {
    pub stack_id: String,
    pub message: String,
    /// `None` lets the backend use the current head of `stack_branch_name`.
    pub parent_id: Option<String>,
    pub stack_branch_name: String,
    pub worktree_changes: Vec<DiffSpec>,
}

/// Result of `create_commit_from_worktree_changes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommitOutcome {
    pub new_commit: Option<String>,
    #[serde(default)]
    pub paths_to_rejected_changes: Vec<String>,
}

/// Parameters for adding a branch to an existing stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeriesRequest {
    pub target_patch: Option<String>,
    pub name: String,
}

/// Identifies a commit within the (stack, branch) scope it was fetched in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitKey {
    pub stack_id: String,
    pub branch_name: String,
    pub commit_id: String,
}
