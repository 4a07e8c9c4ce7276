use std::{future::Future, io, time::Duration};

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::{
    config::WatchConfig,
    core::{
        state::{TerminationSignal, completion},
        watcher::RepoWatcher,
    },
    error::WatchError,
    git::{Git2Client, RepoClient},
    log::Logger,
};

/// How long the watcher may take to wind down (and remove its temporary
/// directory) once the run is decided.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Installs the Ctrl-C (and, on unix, SIGTERM) handlers right away and
/// returns a future resolving on the first of them.
///
/// Signals delivered before the future is first polled are not lost. A
/// registration failure is reported when the future is awaited.
pub fn wait_for_interrupt() -> impl Future<Output = io::Result<()>> + Send + 'static {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let streams = signal(SignalKind::interrupt())
            .and_then(|interrupt| Ok((interrupt, signal(SignalKind::terminate())?)));
        async move {
            let (mut interrupt, mut terminate) = streams?;
            tokio::select! {
                _ = interrupt.recv() => {}
                _ = terminate.recv() => {}
            }
            Ok(())
        }
    }
    #[cfg(windows)]
    {
        let ctrl_c = tokio::signal::windows::ctrl_c();
        async move {
            ctrl_c?.recv().await;
            Ok(())
        }
    }
}

/// Starts the watcher and the interrupt listener and returns whichever
/// terminal value arrives first.
pub async fn run_until_terminated<C, S>(
    watcher: RepoWatcher<C>,
    interrupt: S,
    logger: Logger,
) -> TerminationSignal
where
    C: RepoClient,
    S: Future<Output = io::Result<()>> + Send + 'static,
{
    let (completion, receiver) = completion();
    let cancel = CancellationToken::new();

    let listener = {
        let completion = completion.clone();
        let cancel = cancel.clone();
        let logger = logger.clone();
        tokio::spawn(async move {
            let signal = match interrupt.await {
                Ok(()) => {
                    logger.info("stopping due to an interrupt signal").await;
                    TerminationSignal::InterruptReceived
                }
                Err(e) => TerminationSignal::FatalError(WatchError::Signal(e)),
            };
            completion.complete(signal).await;
            cancel.cancel();
        })
    };

    let watch_task = tokio::spawn(watcher.run(cancel.clone()));
    let abort = watch_task.abort_handle();
    let forward = {
        let completion = completion.clone();
        tokio::spawn(async move {
            let signal = match watch_task.await {
                Ok(signal) => signal,
                Err(e) => TerminationSignal::FatalError(WatchError::Task(e)),
            };
            completion.complete(signal).await;
        })
    };

    let signal = receiver.await.unwrap_or(TerminationSignal::Clean);

    listener.abort();
    cancel.cancel();
    if timeout(SHUTDOWN_GRACE, forward).await.is_err() {
        logger
            .warning("watcher did not stop in time, aborting it")
            .await;
        abort.abort();
    }

    signal
}

/// Watches `config.repo` with libgit2 until interrupted or a fatal error
/// occurs, and returns the process exit code.
pub async fn run(config: WatchConfig, logger: Logger) -> u8 {
    let interrupt = wait_for_interrupt();
    let client = Git2Client::with_progress(logger.clone());
    let watcher = RepoWatcher::new(client, config, logger.clone());
    let signal = run_until_terminated(watcher, interrupt, logger.clone()).await;

    if let Some(err) = signal.error() {
        let stage = if err.is_setup() { "setup failed" } else { "watch failed" };
        logger.error(&format!("{stage}: {err}")).await;
    }
    signal.exit_code()
}
