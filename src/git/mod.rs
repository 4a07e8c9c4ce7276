//! Version-control collaborator.
//!
//! The watcher only needs three operations from a git client: clone once,
//! open the working tree, pull. [`RepoClient`] is that seam; [`repo::Git2Client`]
//! is the implementation backed by libgit2.

use std::path::Path;

pub mod remote;
pub mod repo;

pub use remote::KeyAuth;
pub use repo::{Git2Client, RepoHandle};

/// Result of a successful pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    AlreadyUpToDate,
    Updated,
}

/// Blocking git operations used by the watcher.
///
/// Calls are made from the blocking thread pool, never from the async
/// runtime threads.
pub trait RepoClient: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;
    type Worktree;

    fn clone_repo(
        &self,
        url: &str,
        dir: &Path,
        auth: Option<&KeyAuth>,
        branch: &str,
    ) -> Result<Self::Handle, git2::Error>;

    fn open_worktree(&self, handle: &Self::Handle) -> Result<Self::Worktree, git2::Error>;

    fn pull(
        &self,
        worktree: &Self::Worktree,
        auth: Option<&KeyAuth>,
        branch: &str,
    ) -> Result<PullOutcome, git2::Error>;
}
