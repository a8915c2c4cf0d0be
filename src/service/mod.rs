// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Stack service: the command catalog as typed views and mutations.
//!
//! # Architecture
//!
//! ```text
//!  view method            query command                          provides
//!  -----------            -------------                          --------
//!  stacks, stack_at,      stacks {projectId}                     Stacks
//!  stack_by_id
//!  branches, branch_at,   stack_branches {projectId, stackId}    StackBranches
//!  branch_by_name
//!  commits, commit_at,    stack_branch_local_and_remote_commits  Commits
//!  commit_by_id             {projectId, stackId, branchName}
//!  upstream_commit*       stack_branch_upstream_only_commits     Commits
//!  commit_change(s)       changes_in_commit {projectId, commitId} CommitChanges
//!
//!  mutation               command                                invalidates
//!  --------               -------                                -----------
//!  new_stack              create_virtual_branch                  Stacks
//!  create_commit          create_commit_from_worktree_changes    StackBranches, Commits
//!  update_commit_message  update_commit_message                  StackBranches
//!  new_branch             create_series                          StackBranches
//!  uncommit               undo_commit                            StackBranches, Commits
//!  insert_blank_commit    insert_blank_commit                    StackBranches, Commits
//! ```
//!
//! Every view is a [`Binding`] over the shared query entry; several views of
//! the same query share one cache entry and one backend call.

use std::sync::Arc;

use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Value, json};

use crate::binding::Binding;
use crate::entity::{EntityAdapter, EntityList, EntitySelectors, EntityState};
use crate::error::{GatewayError, StateResult};
use crate::gateway::{Params, params};
use crate::model::{
    Commit, CommitKey, CreateBranchRequest, CreateCommitOutcome, CreateCommitRequest,
    CreateSeriesRequest, Stack, StackBranch, TreeChange, UpstreamCommit,
};
use crate::mutation::{MutationDef, MutationExecutor};
use crate::query::{QueryCache, QueryDef, Tag};

// --- Catalog ---

pub(crate) const STACKS: QueryDef<Stack> =
    QueryDef::new("stacks", &[Tag::Stacks], EntityAdapter::new(stack_id));

pub(crate) const STACK_BRANCHES: QueryDef<StackBranch> = QueryDef::new(
    "stack_branches",
    &[Tag::StackBranches],
    EntityAdapter::new(branch_name),
);

pub(crate) const LOCAL_AND_REMOTE_COMMITS: QueryDef<Commit> = QueryDef::new(
    "stack_branch_local_and_remote_commits",
    &[Tag::Commits],
    EntityAdapter::new(commit_id),
);

pub(crate) const UPSTREAM_COMMITS: QueryDef<UpstreamCommit> = QueryDef::new(
    "stack_branch_upstream_only_commits",
    &[Tag::Commits],
    EntityAdapter::new(upstream_commit_id),
);

pub(crate) const COMMIT_CHANGES: QueryDef<TreeChange> = QueryDef::new(
    "changes_in_commit",
    &[Tag::CommitChanges],
    EntityAdapter::new(change_path),
);

pub(crate) const CREATE_STACK: MutationDef<Stack> =
    MutationDef::new("create_virtual_branch", &[Tag::Stacks]);

pub(crate) const CREATE_COMMIT: MutationDef<CreateCommitOutcome> = MutationDef::new(
    "create_commit_from_worktree_changes",
    &[Tag::StackBranches, Tag::Commits],
);

pub(crate) const UPDATE_COMMIT_MESSAGE: MutationDef<IgnoredAny> =
    MutationDef::new("update_commit_message", &[Tag::StackBranches]);

pub(crate) const CREATE_SERIES: MutationDef<IgnoredAny> =
    MutationDef::new("create_series", &[Tag::StackBranches]);

pub(crate) const UNDO_COMMIT: MutationDef<IgnoredAny> =
    MutationDef::new("undo_commit", &[Tag::StackBranches, Tag::Commits]);

pub(crate) const INSERT_BLANK_COMMIT: MutationDef<IgnoredAny> =
    MutationDef::new("insert_blank_commit", &[Tag::StackBranches, Tag::Commits]);

fn stack_id(stack: &Stack) -> String {
    stack.id.clone()
}

fn branch_name(branch: &StackBranch) -> String {
    branch.name.clone()
}

fn commit_id(commit: &Commit) -> String {
    commit.id.clone()
}

fn upstream_commit_id(commit: &UpstreamCommit) -> String {
    commit.id.clone()
}

fn change_path(change: &TreeChange) -> String {
    change.path.clone()
}

// --- Views ---

/// List view of a query.
pub type ListBinding<T> = Binding<T, EntityList<T>>;

/// Single-entity view of a query; `None` when the entity is absent.
pub type EntityBinding<T> = Binding<T, Option<Arc<T>>>;

fn project(project_id: &str) -> Params {
    params(json!({ "projectId": project_id }))
}

fn branch_scope(project_id: &str, stack_id: &str, branch_name: &str) -> Params {
    params(json!({
        "projectId": project_id,
        "stackId": stack_id,
        "branchName": branch_name,
    }))
}

/// Serializes `request` and adds `projectId` next to its fields.
fn flatten<R: Serialize>(command: &str, project_id: &str, request: &R) -> StateResult<Params> {
    let value = serde_json::to_value(request).map_err(|e| GatewayError::InvalidParams {
        command: command.to_string(),
        message: e.to_string(),
    })?;
    let mut params = params(value);
    params.insert("projectId".into(), Value::from(project_id));
    Ok(params)
}

/// Typed access to stacks, branches, commits and changes.
#[derive(Debug, Clone)]
pub struct StackService {
    cache: QueryCache,
    mutations: MutationExecutor,
}

impl StackService {
    #[must_use]
    pub fn new(cache: QueryCache) -> Self {
        let mutations = MutationExecutor::new(cache.clone());
        Self { cache, mutations }
    }

    fn list<T>(&self, def: &QueryDef<T>, params: Params) -> StateResult<ListBinding<T>>
    where
        T: DeserializeOwned + PartialEq + Send + Sync + 'static,
    {
        let subscription = self.cache.subscribe(def, params)?;
        let selectors = EntitySelectors::<T>::new();
        Ok(Binding::new(subscription, move |state| selectors.select_all(state)))
    }

    fn nth<T>(&self, def: &QueryDef<T>, params: Params, index: usize) -> StateResult<EntityBinding<T>>
    where
        T: DeserializeOwned + PartialEq + Send + Sync + 'static,
    {
        let subscription = self.cache.subscribe(def, params)?;
        let selectors = EntitySelectors::<T>::new();
        Ok(Binding::new(subscription, move |state| selectors.select_nth(state, index)))
    }

    fn by_id<T>(&self, def: &QueryDef<T>, params: Params, id: String) -> StateResult<EntityBinding<T>>
    where
        T: DeserializeOwned + PartialEq + Send + Sync + 'static,
    {
        let subscription = self.cache.subscribe(def, params)?;
        let selectors = EntitySelectors::<T>::new();
        Ok(Binding::new(subscription, move |state| selectors.select_by_id(state, &id)))
    }

    /// All stacks of a project.
    pub fn stacks(&self, project_id: &str) -> StateResult<ListBinding<Stack>> {
        self.list(&STACKS, project(project_id))
    }

    pub fn stack_at(&self, project_id: &str, index: usize) -> StateResult<EntityBinding<Stack>> {
        self.nth(&STACKS, project(project_id), index)
    }

    pub fn stack_by_id(&self, project_id: &str, id: &str) -> StateResult<EntityBinding<Stack>> {
        self.by_id(&STACKS, project(project_id), id.to_string())
    }

    /// Branches of a stack, archived ones filtered out.
    pub fn branches(&self, project_id: &str, stack_id: &str) -> StateResult<ListBinding<StackBranch>> {
        let subscription = self.cache.subscribe(&STACK_BRANCHES, stack_scope(project_id, stack_id))?;
        let selectors = EntitySelectors::<StackBranch>::new();
        Ok(Binding::new(subscription, move |state| active(&selectors, state)))
    }

    /// Branches of a stack including archived ones.
    pub fn all_branches(&self, project_id: &str, stack_id: &str) -> StateResult<ListBinding<StackBranch>> {
        self.list(&STACK_BRANCHES, stack_scope(project_id, stack_id))
    }

    /// Branch at `index` among all branches, archived included.
    pub fn branch_at(
        &self,
        project_id: &str,
        stack_id: &str,
        index: usize,
    ) -> StateResult<EntityBinding<StackBranch>> {
        self.nth(&STACK_BRANCHES, stack_scope(project_id, stack_id), index)
    }

    pub fn branch_by_name(
        &self,
        project_id: &str,
        stack_id: &str,
        name: &str,
    ) -> StateResult<EntityBinding<StackBranch>> {
        self.by_id(&STACK_BRANCHES, stack_scope(project_id, stack_id), name.to_string())
    }

    /// Local and remote commits of a branch.
    pub fn commits(
        &self,
        project_id: &str,
        stack_id: &str,
        branch_name: &str,
    ) -> StateResult<ListBinding<Commit>> {
        self.list(
            &LOCAL_AND_REMOTE_COMMITS,
            branch_scope(project_id, stack_id, branch_name),
        )
    }

    pub fn commit_at(
        &self,
        project_id: &str,
        stack_id: &str,
        branch_name: &str,
        index: usize,
    ) -> StateResult<EntityBinding<Commit>> {
        self.nth(
            &LOCAL_AND_REMOTE_COMMITS,
            branch_scope(project_id, stack_id, branch_name),
            index,
        )
    }

    pub fn commit_by_id(&self, project_id: &str, key: &CommitKey) -> StateResult<EntityBinding<Commit>> {
        self.by_id(
            &LOCAL_AND_REMOTE_COMMITS,
            branch_scope(project_id, &key.stack_id, &key.branch_name),
            key.commit_id.clone(),
        )
    }

    /// Commits that only exist on the remote tracking branch.
    pub fn upstream_commits(
        &self,
        project_id: &str,
        stack_id: &str,
        branch_name: &str,
    ) -> StateResult<ListBinding<UpstreamCommit>> {
        self.list(&UPSTREAM_COMMITS, branch_scope(project_id, stack_id, branch_name))
    }

    pub fn upstream_commit_at(
        &self,
        project_id: &str,
        stack_id: &str,
        branch_name: &str,
        index: usize,
    ) -> StateResult<EntityBinding<UpstreamCommit>> {
        self.nth(
            &UPSTREAM_COMMITS,
            branch_scope(project_id, stack_id, branch_name),
            index,
        )
    }

    pub fn upstream_commit_by_id(
        &self,
        project_id: &str,
        key: &CommitKey,
    ) -> StateResult<EntityBinding<UpstreamCommit>> {
        self.by_id(
            &UPSTREAM_COMMITS,
            branch_scope(project_id, &key.stack_id, &key.branch_name),
            key.commit_id.clone(),
        )
    }

    /// Tree changes recorded in a commit.
    pub fn commit_changes(&self, project_id: &str, commit_id: &str) -> StateResult<ListBinding<TreeChange>> {
        self.list(&COMMIT_CHANGES, commit_scope(project_id, commit_id))
    }

    pub fn commit_change(
        &self,
        project_id: &str,
        commit_id: &str,
        path: &str,
    ) -> StateResult<EntityBinding<TreeChange>> {
        self.by_id(&COMMIT_CHANGES, commit_scope(project_id, commit_id), path.to_string())
    }

    // --- Mutations ---

    /// Creates a stack with a single new branch.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; on failure nothing is invalidated.
    pub async fn new_stack(&self, project_id: &str, branch: &CreateBranchRequest) -> StateResult<Stack> {
        let params = params(json!({ "projectId": project_id, "branch": branch }));
        self.mutations.run(&CREATE_STACK, params).await
    }

    /// Commits worktree changes onto a branch.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; on failure nothing is invalidated.
    pub async fn create_commit(
        &self,
        project_id: &str,
        request: &CreateCommitRequest,
    ) -> StateResult<CreateCommitOutcome> {
        let params = flatten(CREATE_COMMIT.command(), project_id, request)?;
        self.mutations.run(&CREATE_COMMIT, params).await
    }

    /// Rewords a commit.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; on failure nothing is invalidated.
    pub async fn update_commit_message(
        &self,
        project_id: &str,
        branch_id: &str,
        commit_oid: &str,
        message: &str,
    ) -> StateResult<()> {
        let params = params(json!({
            "projectId": project_id,
            "branchId": branch_id,
            "commitOid": commit_oid,
            "message": message,
        }));
        self.mutations.run(&UPDATE_COMMIT_MESSAGE, params).await?;
        Ok(())
    }

    /// Adds a branch on top of a stack.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; on failure nothing is invalidated.
    pub async fn new_branch(&self, project_id: &str, stack_id: &str, name: &str) -> StateResult<()> {
        let request = CreateSeriesRequest {
            target_patch: None,
            name: name.to_string(),
        };
        let params = params(json!({
            "projectId": project_id,
            "stackId": stack_id,
            "request": request,
        }));
        self.mutations.run(&CREATE_SERIES, params).await?;
        Ok(())
    }

    /// Removes a commit, returning its changes to the worktree.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; on failure nothing is invalidated.
    pub async fn uncommit(&self, project_id: &str, branch_id: &str, commit_oid: &str) -> StateResult<()> {
        let params = params(json!({
            "projectId": project_id,
            "branchId": branch_id,
            "commitOid": commit_oid,
        }));
        self.mutations.run(&UNDO_COMMIT, params).await?;
        Ok(())
    }

    /// Inserts an empty commit next to `commit_oid`; a negative offset
    /// inserts below it.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; on failure nothing is invalidated.
    pub async fn insert_blank_commit(
        &self,
        project_id: &str,
        branch_id: &str,
        commit_oid: &str,
        offset: i32,
    ) -> StateResult<()> {
        let params = params(json!({
            "projectId": project_id,
            "branchId": branch_id,
            "commitOid": commit_oid,
            "offset": offset,
        }));
        self.mutations.run(&INSERT_BLANK_COMMIT, params).await?;
        Ok(())
    }
}

fn stack_scope(project_id: &str, stack_id: &str) -> Params {
    params(json!({ "projectId": project_id, "stackId": stack_id }))
}

fn commit_scope(project_id: &str, commit_id: &str) -> Params {
    params(json!({ "projectId": project_id, "commitId": commit_id }))
}

fn active(selectors: &EntitySelectors<StackBranch>, state: &Arc<EntityState<StackBranch>>) -> EntityList<StackBranch> {
    selectors
        .select_all(state)
        .iter()
        .filter(|branch| !branch.archived)
        .cloned()
        .collect()
}
