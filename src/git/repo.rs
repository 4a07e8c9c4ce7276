use std::path::{Path, PathBuf};

use git2::{Error, Repository, build::CheckoutBuilder, build::RepoBuilder};

use crate::{
    git::{
        PullOutcome, RepoClient,
        remote::{KeyAuth, fetch_options},
    },
    log::Logger,
};

/// A cloned working copy, identified by its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    pub path: PathBuf,
}

/// [`RepoClient`] backed by libgit2.
#[derive(Clone, Default)]
pub struct Git2Client {
    progress: Option<Logger>,
}

impl Git2Client {
    /// Client reporting clone and fetch progress to `logger` at debug level.
    pub fn with_progress(logger: Logger) -> Self {
        Self {
            progress: Some(logger),
        }
    }
}

fn tracking_refspec(branch: &str) -> String {
    format!("+refs/heads/{branch}:refs/remotes/origin/{branch}")
}

impl RepoClient for Git2Client {
    type Handle = RepoHandle;
    type Worktree = Repository;

    /// Single-branch clone of `branch` into `dir`.
    fn clone_repo(
        &self,
        url: &str,
        dir: &Path,
        auth: Option<&KeyAuth>,
        branch: &str,
    ) -> Result<RepoHandle, Error> {
        let refspec = tracking_refspec(branch);

        let mut builder = RepoBuilder::new();
        builder
            .branch(branch)
            .fetch_options(fetch_options(auth, self.progress.as_ref()))
            .remote_create(move |repo, name, url| repo.remote_with_fetch(name, url, &refspec));
        builder.clone(url, dir)?;

        Ok(RepoHandle {
            path: dir.to_path_buf(),
        })
    }

    fn open_worktree(&self, handle: &RepoHandle) -> Result<Repository, Error> {
        let repo = Repository::open(&handle.path)?;
        if repo.is_bare() {
            return Err(Error::from_str("repository has no working tree"));
        }
        Ok(repo)
    }

    /// Fetches `branch` from origin and fast-forwards the local branch.
    ///
    /// Diverged history is an error: nothing is merged.
    fn pull(
        &self,
        repo: &Repository,
        auth: Option<&KeyAuth>,
        branch: &str,
    ) -> Result<PullOutcome, Error> {
        let mut remote = repo.find_remote("origin")?;
        let mut fo = fetch_options(auth, self.progress.as_ref());
        remote.fetch(&[branch], Some(&mut fo), None)?;

        let fetch_head = repo.find_reference("FETCH_HEAD")?;
        let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

        if analysis.is_up_to_date() {
            return Ok(PullOutcome::AlreadyUpToDate);
        }
        if !analysis.is_fast_forward() {
            return Err(Error::from_str("non-fast-forward update"));
        }

        let refname = format!("refs/heads/{branch}");
        let mut reference = repo.find_reference(&refname)?;
        reference.set_target(
            fetch_commit.id(),
            &format!("gitwatch: fast-forward {branch}"),
        )?;
        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::new().force()))?;

        Ok(PullOutcome::Updated)
    }
}
