#![cfg(unix)]

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use gitwatch::{
    config::WatchConfig,
    core::{
        manager::run_until_terminated,
        state::TerminationSignal,
        watcher::{RepoWatcher, prepare_dir},
    },
    error::WatchError,
    git::{KeyAuth, PullOutcome, RepoClient},
    log::{Level, Logger},
};
use pretty_assertions::assert_eq;
use tempfile::{TempDir, tempdir};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct FakeState {
    script: VecDeque<Result<PullOutcome, &'static str>>,
    fail_clone: bool,
    fail_worktree: bool,
    clone_dir: Option<PathBuf>,
    dir_existed_at_clone: bool,
    clones: usize,
    pull_times: Vec<Instant>,
}

/// Scripted git client. Pulls pop from the script, then report up to date.
#[derive(Clone, Default)]
struct FakeClient {
    state: Arc<Mutex<FakeState>>,
}

impl FakeClient {
    fn with_script(script: Vec<Result<PullOutcome, &'static str>>) -> Self {
        let client = FakeClient::default();
        client.state.lock().unwrap().script = script.into();
        client
    }

    fn pulls(&self) -> usize {
        self.state.lock().unwrap().pull_times.len()
    }
}

impl RepoClient for FakeClient {
    type Handle = PathBuf;
    type Worktree = PathBuf;

    fn clone_repo(
        &self,
        _url: &str,
        dir: &Path,
        _auth: Option<&KeyAuth>,
        _branch: &str,
    ) -> Result<PathBuf, git2::Error> {
        let mut state = self.state.lock().unwrap();
        state.clones += 1;
        state.clone_dir = Some(dir.to_path_buf());
        state.dir_existed_at_clone = dir.is_dir();
        if state.fail_clone {
            return Err(git2::Error::from_str("remote not found"));
        }
        Ok(dir.to_path_buf())
    }

    fn open_worktree(&self, handle: &PathBuf) -> Result<PathBuf, git2::Error> {
        if self.state.lock().unwrap().fail_worktree {
            return Err(git2::Error::from_str("corrupt index"));
        }
        Ok(handle.clone())
    }

    fn pull(
        &self,
        _worktree: &PathBuf,
        _auth: Option<&KeyAuth>,
        _branch: &str,
    ) -> Result<PullOutcome, git2::Error> {
        let mut state = self.state.lock().unwrap();
        state.pull_times.push(Instant::now());
        state
            .script
            .pop_front()
            .unwrap_or(Ok(PullOutcome::AlreadyUpToDate))
            .map_err(git2::Error::from_str)
    }
}

struct Fixture {
    scratch: TempDir,
    logger: Logger,
}

impl Fixture {
    async fn new() -> anyhow::Result<Self> {
        let scratch = tempdir()?;
        let logger = Logger::new(&scratch.path().join("gitwatch.log"), Level::Debug).await?;
        Ok(Self { scratch, logger })
    }

    fn runs_file(&self) -> PathBuf {
        self.scratch.path().join("runs")
    }

    /// Config whose command appends one line to `runs` per invocation.
    fn config(&self) -> WatchConfig {
        let mut config = WatchConfig::new("git@example.com:acme/site.git", "sh");
        config.args = vec![
            "-c".to_string(),
            format!("echo run >> {}", self.runs_file().display()),
        ];
        config.interval_seconds = 1;
        config.dir = Some(self.scratch.path().join("clone"));
        config
    }

    fn invocations(&self) -> usize {
        std::fs::read_to_string(self.runs_file())
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    fn log(&self) -> String {
        std::fs::read_to_string(self.scratch.path().join("gitwatch.log")).unwrap_or_default()
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_up_to_date_never_runs_command() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let client = FakeClient::with_script(vec![
        Ok(PullOutcome::AlreadyUpToDate),
        Ok(PullOutcome::AlreadyUpToDate),
        Err("connection reset"),
    ]);

    let watcher = RepoWatcher::new(client.clone(), fx.config(), fx.logger.clone());
    let signal = watcher.run(CancellationToken::new()).await;

    assert!(matches!(
        signal,
        TerminationSignal::FatalError(WatchError::Pull { .. })
    ));
    assert_eq!(signal.exit_code(), 1);
    assert_eq!(fx.invocations(), 1);
    assert_eq!(client.pulls(), 3);
    assert_eq!(
        fx.log().matches("repo already up to date").count(),
        2
    );
    Ok(())
}

#[tokio::test]
async fn test_pulls_are_spaced_by_interval() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let client = FakeClient::with_script(vec![
        Ok(PullOutcome::AlreadyUpToDate),
        Ok(PullOutcome::AlreadyUpToDate),
        Err("stop"),
    ]);

    let watcher = RepoWatcher::new(client.clone(), fx.config(), fx.logger.clone());
    watcher.run(CancellationToken::new()).await;

    let times = client.state.lock().unwrap().pull_times.clone();
    assert_eq!(times.len(), 3);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1));
    }
    Ok(())
}

#[tokio::test]
async fn test_update_runs_command_again() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let client = FakeClient::with_script(vec![Ok(PullOutcome::Updated), Err("stop")]);

    let watcher = RepoWatcher::new(client.clone(), fx.config(), fx.logger.clone());
    let signal = watcher.run(CancellationToken::new()).await;

    assert_eq!(signal.exit_code(), 1);
    assert_eq!(fx.invocations(), 2);
    assert!(fx.log().contains("fetched new updates"));
    Ok(())
}

#[tokio::test]
async fn test_failing_command_keeps_polling() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let mut config = fx.config();
    config.args = vec!["-c".to_string(), "exit 4".to_string()];
    let client = FakeClient::with_script(vec![
        Ok(PullOutcome::Updated),
        Ok(PullOutcome::AlreadyUpToDate),
        Err("stop"),
    ]);

    let watcher = RepoWatcher::new(client.clone(), config, fx.logger.clone());
    let signal = watcher.run(CancellationToken::new()).await;

    assert!(matches!(
        signal,
        TerminationSignal::FatalError(WatchError::Pull { .. })
    ));
    assert_eq!(client.pulls(), 3);
    assert_eq!(fx.log().matches("error while running command").count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_missing_dir_created_before_clone() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let mut config = fx.config();
    let nested = fx.scratch.path().join("a").join("b").join("clone");
    config.dir = Some(nested.clone());
    let client = FakeClient::with_script(vec![Err("stop")]);

    RepoWatcher::new(client.clone(), config, fx.logger.clone())
        .run(CancellationToken::new())
        .await;

    let state = client.state.lock().unwrap();
    assert!(state.dir_existed_at_clone);
    assert_eq!(state.clone_dir.as_deref(), Some(nested.as_path()));
    assert!(fx.log().contains("directory not found, creating it now"));
    Ok(())
}

#[tokio::test]
async fn test_existing_dir_reused() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let config = fx.config();
    let dir = config.dir.clone().unwrap();
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("marker"), "keep")?;

    let created = prepare_dir(&dir, &fx.logger).await?;
    assert!(!created);
    assert_eq!(std::fs::read_to_string(dir.join("marker"))?, "keep");
    assert!(!fx.log().contains("directory not found"));
    Ok(())
}

#[tokio::test]
async fn test_temp_dir_removed_after_run() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let mut config = fx.config();
    config.dir = None;
    let client = FakeClient::with_script(vec![Err("stop")]);

    RepoWatcher::new(client.clone(), config, fx.logger.clone())
        .run(CancellationToken::new())
        .await;

    let clone_dir = client.state.lock().unwrap().clone_dir.clone().unwrap();
    assert!(!clone_dir.exists());
    Ok(())
}

#[tokio::test]
async fn test_clone_failure_is_fatal() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let client = FakeClient::default();
    client.state.lock().unwrap().fail_clone = true;

    let signal = RepoWatcher::new(client.clone(), fx.config(), fx.logger.clone())
        .run(CancellationToken::new())
        .await;

    assert!(matches!(
        signal,
        TerminationSignal::FatalError(WatchError::Clone { .. })
    ));
    assert_eq!(fx.invocations(), 0);
    assert_eq!(client.pulls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_worktree_failure_is_fatal() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let client = FakeClient::default();
    client.state.lock().unwrap().fail_worktree = true;

    let signal = RepoWatcher::new(client.clone(), fx.config(), fx.logger.clone())
        .run(CancellationToken::new())
        .await;

    assert!(matches!(
        signal,
        TerminationSignal::FatalError(WatchError::Worktree { .. })
    ));
    assert_eq!(fx.invocations(), 1);
    assert_eq!(client.pulls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_key_is_fatal_before_clone() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let mut config = fx.config();
    config.key = Some(fx.scratch.path().join("no_such_key"));
    let client = FakeClient::default();

    let signal = RepoWatcher::new(client.clone(), config, fx.logger.clone())
        .run(CancellationToken::new())
        .await;

    assert!(matches!(
        signal,
        TerminationSignal::FatalError(WatchError::KeyAuth { .. })
    ));
    assert_eq!(client.state.lock().unwrap().clones, 0);
    Ok(())
}

#[tokio::test]
async fn test_interrupt_while_idle_exits_cleanly() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let client = FakeClient::default();
    let (tx, rx) = oneshot::channel::<()>();
    let interrupt = async move {
        let _ = rx.await;
        Ok(())
    };

    let watcher = RepoWatcher::new(client.clone(), fx.config(), fx.logger.clone());
    let run = tokio::spawn(run_until_terminated(watcher, interrupt, fx.logger.clone()));

    let observed = client.clone();
    wait_until(move || observed.pulls() >= 2).await;
    tx.send(()).unwrap();

    let signal = run.await?;
    assert!(matches!(signal, TerminationSignal::InterruptReceived));
    assert_eq!(signal.exit_code(), 0);
    assert_eq!(fx.invocations(), 1);
    assert_eq!(client.pulls(), 2);
    assert_eq!(fx.log().matches("repo already up to date").count(), 2);
    assert!(fx.log().contains("stopping due to an interrupt signal"));
    Ok(())
}

#[tokio::test]
async fn test_signal_error_exits_with_failure() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let client = FakeClient::default();
    let interrupt = async { Err::<(), _>(std::io::Error::other("signals unavailable")) };

    let watcher = RepoWatcher::new(client, fx.config(), fx.logger.clone());
    let signal = run_until_terminated(watcher, interrupt, fx.logger.clone()).await;

    assert!(matches!(
        signal,
        TerminationSignal::FatalError(WatchError::Signal(_))
    ));
    assert_eq!(signal.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn test_watcher_error_wins_over_pending_interrupt() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let client = FakeClient::with_script(vec![Err("unreachable remote")]);
    let interrupt = std::future::pending::<std::io::Result<()>>();

    let watcher = RepoWatcher::new(client, fx.config(), fx.logger.clone());
    let signal = run_until_terminated(watcher, interrupt, fx.logger.clone()).await;

    assert!(matches!(
        signal,
        TerminationSignal::FatalError(WatchError::Pull { .. })
    ));
    assert_eq!(fx.invocations(), 1);
    Ok(())
}

/// Generic over the client, so only the `RepoClient` bounds decide whether
/// the watcher future can be spawned.
fn spawn_supervised<C: RepoClient>(
    watcher: RepoWatcher<C>,
    logger: Logger,
) -> tokio::task::JoinHandle<TerminationSignal> {
    tokio::spawn(run_until_terminated(
        watcher,
        std::future::pending::<std::io::Result<()>>(),
        logger,
    ))
}

fn spawn_watch_loop<C: RepoClient>(
    watcher: RepoWatcher<C>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<TerminationSignal> {
    tokio::spawn(watcher.run(cancel))
}

#[tokio::test]
async fn test_watcher_spawns_for_any_client() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;

    let client = FakeClient::with_script(vec![Err("unreachable remote")]);
    let watcher = RepoWatcher::new(client, fx.config(), fx.logger.clone());
    let signal = spawn_supervised(watcher, fx.logger.clone()).await?;
    assert!(matches!(
        signal,
        TerminationSignal::FatalError(WatchError::Pull { .. })
    ));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let watcher = RepoWatcher::new(FakeClient::default(), fx.config(), fx.logger.clone());
    let signal = spawn_watch_loop(watcher, cancel).await?;
    assert!(matches!(signal, TerminationSignal::Clean));

    assert_eq!(fx.invocations(), 1);
    Ok(())
}
