use std::future::Future;
use std::time::Instant;

use qscripts_core::{ReloadOrchestrator, TickOutcome, TimerManager};
use tracing::{debug, info};

/// Why the watch loop returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchExit {
    /// The shutdown future completed
    Interrupted,
    /// The active script was deleted
    ScriptRemoved,
}

const POLL_TIMER: &str = "monitor";

/// Poll `monitor` on a recurring timer until `shutdown` completes or the script goes away
///
/// Each tick decides when the next one happens. Ticks run scripts
/// synchronously, so they are moved off the async worker with
/// `block_in_place`; this needs the multi-threaded runtime.
pub async fn run_watch<F>(monitor: &mut ReloadOrchestrator, shutdown: F) -> WatchExit
where
    F: Future<Output = ()>,
{
    let mut timers = TimerManager::new();
    let poll = timers.schedule_recurring(monitor.options().interval, POLL_TIMER);
    tokio::pin!(shutdown);

    loop {
        let deadline = timers
            .next_deadline()
            .unwrap_or_else(|| Instant::now() + monitor.options().interval);

        tokio::select! {
            _ = &mut shutdown => {
                info!(target: "qscripts", "Stopping");
                monitor.deactivate();
                return WatchExit::Interrupted;
            }
            _ = tokio::time::sleep_until(deadline.into()) => {}
        }

        for (id, _) in timers.tick(Instant::now()) {
            if id != poll {
                continue;
            }

            let report = tokio::task::block_in_place(|| monitor.tick());
            log_outcome(&report.outcome);
            if let TickOutcome::ScriptRemoved { .. } = report.outcome {
                timers.cancel_timer(poll);
                return WatchExit::ScriptRemoved;
            }
            timers.reschedule(poll, Instant::now(), report.next_poll);
        }
    }
}

fn log_outcome(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Executed { result: Ok(()) } => {
            info!(target: "qscripts", "Finished at {}", chrono::Local::now().format("%H:%M:%S"));
        }
        // Failures were already logged where they happened
        TickOutcome::Executed { result: Err(_) } | TickOutcome::ReloadFailed { .. } => {}
        other => debug!(target: "qscripts", "Tick: {:?}", other),
    }
}
