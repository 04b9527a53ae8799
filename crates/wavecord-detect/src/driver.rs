//! The monitor event loop.
//!
//! A single task owns the `SongMonitor` and is the only writer of its
//! state. Detection passes run on three triggers: a fixed interval, a
//! short debounce after page-mutation events (bursts collapse into
//! one pass), and an out-of-band `ForceCheck`. Page access and
//! outbound delivery are both injected, so the loop itself never
//! touches the outside world directly.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::error::DetectError;
use crate::monitor::SongMonitor;
use crate::notify::{SongSink, SongUpdate};
use crate::PageSnapshot;

/// Fixed-interval fallback between detection passes.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Quiesce window after a burst of page mutations.
pub const MUTATION_DEBOUNCE: Duration = Duration::from_millis(100);

/// Source of page snapshots, injected by the hosting entry point.
pub trait PageSource: Send + 'static {
    /// Take a snapshot of the page, or `None` if the page is gone.
    fn snapshot(&mut self) -> Option<PageSnapshot>;
}

impl<F> PageSource for F
where
    F: FnMut() -> Option<PageSnapshot> + Send + 'static,
{
    fn snapshot(&mut self) -> Option<PageSnapshot> {
        self()
    }
}

/// Control messages accepted by the running monitor.
#[derive(Debug)]
pub enum MonitorCommand {
    /// The page mutated; schedule a debounced pass.
    Mutation,
    /// Run a pass immediately, bypassing timer and debounce, and
    /// reply with the fresh state.
    ForceCheck(oneshot::Sender<SongUpdate>),
    /// Reply with the last-known state without running a pass.
    GetCurrent(oneshot::Sender<SongUpdate>),
    /// Stop the loop.
    Shutdown,
}

/// Cloneable handle to a running monitor loop.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    tx: mpsc::UnboundedSender<MonitorCommand>,
}

impl MonitorHandle {
    /// Report a page mutation. Cheap; safe to call per DOM event.
    pub fn notify_mutation(&self) {
        let _ = self.tx.send(MonitorCommand::Mutation);
    }

    /// Run an immediate detection pass and return the fresh state.
    pub async fn force_check(&self) -> Result<SongUpdate, DetectError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(MonitorCommand::ForceCheck(reply_tx))
            .map_err(|_| DetectError::MonitorGone)?;
        reply_rx.await.map_err(|_| DetectError::MonitorGone)
    }

    /// Fetch the last-known state.
    pub async fn current(&self) -> Result<SongUpdate, DetectError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(MonitorCommand::GetCurrent(reply_tx))
            .map_err(|_| DetectError::MonitorGone)?;
        reply_rx.await.map_err(|_| DetectError::MonitorGone)
    }

    /// Stop the monitor loop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(MonitorCommand::Shutdown);
    }
}

/// Spawn the monitor loop on the current runtime.
pub fn spawn<P, S>(monitor: SongMonitor, source: P, sink: S) -> (MonitorHandle, JoinHandle<()>)
where
    P: PageSource,
    S: SongSink,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run(monitor, source, sink, rx));
    (MonitorHandle { tx }, handle)
}

/// The loop body. Exposed for tests that drive time manually.
pub async fn run<P, S>(
    mut monitor: SongMonitor,
    mut source: P,
    sink: S,
    mut rx: mpsc::UnboundedReceiver<MonitorCommand>,
) where
    P: PageSource,
    S: SongSink,
{
    let mut next_tick = Instant::now() + CHECK_INTERVAL;
    let mut debounce_deadline: Option<Instant> = None;

    // Initial pass, matching the check-on-start behavior of the page
    // monitor this loop hosts.
    run_pass(&mut monitor, &mut source, &sink);

    loop {
        let debounce_at = debounce_deadline.unwrap_or_else(|| Instant::now() + CHECK_INTERVAL);

        tokio::select! {
            _ = sleep_until(next_tick) => {
                next_tick = Instant::now() + CHECK_INTERVAL;
                run_pass(&mut monitor, &mut source, &sink);
            }
            _ = sleep_until(debounce_at), if debounce_deadline.is_some() => {
                debounce_deadline = None;
                run_pass(&mut monitor, &mut source, &sink);
            }
            cmd = rx.recv() => match cmd {
                Some(MonitorCommand::Mutation) => {
                    // Resetting the deadline collapses a burst of
                    // mutations into one pass.
                    debounce_deadline = Some(Instant::now() + MUTATION_DEBOUNCE);
                }
                Some(MonitorCommand::ForceCheck(reply)) => {
                    debounce_deadline = None;
                    run_pass(&mut monitor, &mut source, &sink);
                    let _ = reply.send(monitor.status());
                }
                Some(MonitorCommand::GetCurrent(reply)) => {
                    let _ = reply.send(monitor.status());
                }
                Some(MonitorCommand::Shutdown) | None => {
                    tracing::debug!("Monitor loop stopping");
                    break;
                }
            }
        }
    }
}

/// One detection pass: snapshot, check, deliver any transition.
fn run_pass<P, S>(monitor: &mut SongMonitor, source: &mut P, sink: &S)
where
    P: PageSource,
    S: SongSink,
{
    let update = match source.snapshot() {
        Some(page) => monitor.check(&page),
        None => monitor.reset(),
    };

    if let Some(update) = update {
        if let Err(e) = sink.deliver(update) {
            // Fire-and-forget: log and carry on, the next pass is
            // unaffected.
            tracing::warn!(error = %e, "Failed to notify collaborator");
        }
    }
}
