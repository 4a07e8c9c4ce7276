use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tempfile::TempDir;
use tokio::{task, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::{
    config::WatchConfig,
    core::state::TerminationSignal,
    error::WatchError,
    exec::runner::Runner,
    git::{KeyAuth, PullOutcome, RepoClient, remote::load_key_auth},
    log::{Level, Logger},
};

/// Clone target. A temporary directory is removed when this is dropped.
struct WorkDir {
    path: PathBuf,
    _temp: Option<TempDir>,
}

impl WorkDir {
    fn resolve(dir: Option<&Path>) -> Result<Self, WatchError> {
        match dir.filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) => Ok(Self {
                path: dir.to_path_buf(),
                _temp: None,
            }),
            None => {
                let temp = TempDir::new().map_err(WatchError::TempDir)?;
                Ok(Self {
                    path: temp.path().to_path_buf(),
                    _temp: Some(temp),
                })
            }
        }
    }
}

/// Creates `path` and its parents if missing. Returns whether anything was
/// created; an existing directory is left untouched.
pub async fn prepare_dir(path: &Path, logger: &Logger) -> Result<bool, WatchError> {
    let dir_err = |source| WatchError::Directory {
        path: path.to_path_buf(),
        source,
    };

    if tokio::fs::try_exists(path).await.map_err(dir_err)? {
        return Ok(false);
    }

    let dir = path.display().to_string();
    logger
        .log(
            Level::Info,
            "directory not found, creating it now",
            &[("dir", &dir)],
        )
        .await;

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);
    builder.create(path).await.map_err(dir_err)?;
    Ok(true)
}

/// Clone-once, then pull/act/sleep until a fatal error or cancellation.
pub struct RepoWatcher<C: RepoClient> {
    client: Arc<C>,
    config: WatchConfig,
    runner: Runner,
    logger: Logger,
}

impl<C: RepoClient> RepoWatcher<C> {
    pub fn new(client: C, config: WatchConfig, logger: Logger) -> Self {
        let runner = Runner::new(&config, logger.clone());
        Self {
            client: Arc::new(client),
            config,
            runner,
            logger,
        }
    }

    /// Runs the watch loop to its end and turns the result into the
    /// terminal value for the run.
    pub async fn run(self, cancel: CancellationToken) -> TerminationSignal {
        match self.watch_repo(&cancel).await {
            Ok(()) => TerminationSignal::Clean,
            Err(e) => TerminationSignal::FatalError(e),
        }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, WatchError>
    where
        F: FnOnce(&C) -> T + Send + 'static,
        T: Send + 'static,
    {
        let client = Arc::clone(&self.client);
        Ok(task::spawn_blocking(move || f(&client)).await?)
    }

    async fn watch_repo(&self, cancel: &CancellationToken) -> Result<(), WatchError> {
        let workdir = WorkDir::resolve(self.config.dir.as_deref())?;
        prepare_dir(&workdir.path, &self.logger).await?;

        let auth = match &self.config.key {
            Some(path) => Some(load_key_auth(path).map_err(|source| WatchError::KeyAuth {
                path: path.clone(),
                source,
            })?),
            None => None,
        };

        let handle = self.clone_repo(&workdir.path, auth.clone()).await?;

        if cancel.is_cancelled() {
            return Ok(());
        }
        self.runner.invoke().await;

        loop {
            self.logger
                .log(Level::Debug, "pulling", &[("repo", &self.config.repo)])
                .await;

            match self
                .pull_once(handle.clone(), &workdir.path, auth.clone())
                .await?
            {
                PullOutcome::AlreadyUpToDate => {
                    self.logger
                        .debug("repo already up to date, nothing to do")
                        .await;
                }
                PullOutcome::Updated => {
                    self.logger.info("fetched new updates").await;
                    if cancel.is_cancelled() {
                        return Ok(());
                    }
                    self.runner.invoke().await;
                }
            }

            self.logger
                .debug(&format!(
                    "waiting for {} seconds",
                    self.config.interval_seconds
                ))
                .await;
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = sleep(self.config.interval()) => {}
            }
        }
    }

    async fn clone_repo(&self, dir: &Path, auth: Option<KeyAuth>) -> Result<C::Handle, WatchError> {
        let dir_display = dir.display().to_string();
        self.logger
            .log(
                Level::Info,
                "cloning",
                &[
                    ("repo", &self.config.repo),
                    ("branch", &self.config.branch),
                    ("dir", &dir_display),
                ],
            )
            .await;

        let url = self.config.repo.clone();
        let branch = self.config.branch.clone();
        let dir = dir.to_path_buf();
        let cloned = self
            .blocking(move |client| client.clone_repo(&url, &dir, auth.as_ref(), &branch))
            .await?;

        cloned.map_err(|source| WatchError::Clone {
            url: self.config.repo.clone(),
            source,
        })
    }

    async fn pull_once(
        &self,
        handle: C::Handle,
        dir: &Path,
        auth: Option<KeyAuth>,
    ) -> Result<PullOutcome, WatchError> {
        let branch = self.config.branch.clone();
        let dir = dir.to_path_buf();

        self.blocking(move |client| {
            let worktree = client
                .open_worktree(&handle)
                .map_err(|source| WatchError::Worktree { path: dir, source })?;
            client
                .pull(&worktree, auth.as_ref(), &branch)
                .map_err(|source| WatchError::Pull {
                    branch: branch.clone(),
                    source,
                })
        })
        .await?
    }
}
