//! Periodic scheduler driving the dispatch unit.
//!
//! Two states, Stopped (initial) and Running. While running, a background
//! loop waits on a repeating timer and a stop signal at once, and runs one
//! dispatch cycle per timer firing. Cycles never overlap.

use crate::Dispatcher;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Configuration for the dispatch schedule.
///
/// - `interval`: time between dispatch cycles (default: 2 minutes)
/// - `batch_size`: pending messages fetched per cycle (default: 2)
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub batch_size: usize,
}

/// Longest period the loop will wait between cycles.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Shortest period; the timer cannot tick at zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl SchedulerConfig {
    /// `interval` clamped to what the timer can represent.
    pub fn period(&self) -> Duration {
        self.interval.clamp(MIN_INTERVAL, MAX_INTERVAL)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(120),
            batch_size: 2,
        }
    }
}

/// Result of [`Scheduler::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Result of [`Scheduler::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyStopped,
}

struct RunningLoop {
    stop_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

enum LoopState {
    Stopped,
    Running(RunningLoop),
}

/// Owns the background dispatch loop and its start/stop lifecycle.
///
/// `start` and `stop` may be called from any task; the lifecycle state sits
/// behind a single mutex so callers never observe a half-updated state.
pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    config: SchedulerConfig,
    state: Mutex<LoopState>,
    /// Held for the duration of each cycle. A loop started right after a
    /// stop waits here until the previous loop's last cycle is done.
    cycle_guard: Arc<tokio::sync::Mutex<()>>,
    /// Most recently stopped loop, kept so shutdown can wait for it.
    last_loop: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, config: SchedulerConfig) -> Self {
        Self {
            dispatcher,
            config,
            state: Mutex::new(LoopState::Stopped),
            cycle_guard: Arc::new(tokio::sync::Mutex::new(())),
            last_loop: Mutex::new(None),
        }
    }

    /// Start the background loop.
    ///
    /// Must be called from within a Tokio runtime. The first cycle runs one
    /// full interval after start.
    pub fn start(&self) -> StartOutcome {
        let mut state = self.state.lock();
        if let LoopState::Running(running) = &*state {
            if !running.handle.is_finished() {
                return StartOutcome::AlreadyRunning;
            }
        }

        if self.config.period() != self.config.interval {
            warn!(
                requested_secs = self.config.interval.as_secs(),
                period_secs = self.config.period().as_secs(),
                "Dispatch interval out of range, clamping"
            );
        }

        let (stop_tx, stop_rx) = broadcast::channel::<()>(1);
        let handle = tokio::spawn(run_loop(
            self.dispatcher.clone(),
            self.config.clone(),
            self.cycle_guard.clone(),
            stop_rx,
        ));
        *state = LoopState::Running(RunningLoop { stop_tx, handle });

        info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "Scheduler started"
        );
        StartOutcome::Started
    }

    /// Signal the loop to exit.
    ///
    /// Returns once no further cycle can begin. A cycle already in flight is
    /// left to finish on its own.
    pub fn stop(&self) -> StopOutcome {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, LoopState::Stopped) {
            LoopState::Stopped => StopOutcome::AlreadyStopped,
            LoopState::Running(running) => {
                // The loop may have already exited; nothing to signal then.
                let _ = running.stop_tx.send(());
                *self.last_loop.lock() = Some(running.handle);
                info!("Scheduler stopped");
                StopOutcome::Stopped
            }
        }
    }

    pub fn is_running(&self) -> bool {
        match &*self.state.lock() {
            LoopState::Stopped => false,
            LoopState::Running(running) => !running.handle.is_finished(),
        }
    }

    /// Stop the loop and wait for any in-flight cycle to finish.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.last_loop.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler loop ended abnormally");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let LoopState::Running(running) = &*self.state.lock() {
            let _ = running.stop_tx.send(());
        }
    }
}

async fn run_loop(
    dispatcher: Arc<Dispatcher>,
    config: SchedulerConfig,
    cycle_guard: Arc<tokio::sync::Mutex<()>>,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let period = config.period();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.recv() => {
                debug!("Scheduler loop received stop signal");
                break;
            }
            _ = ticker.tick() => {
                let _guard = cycle_guard.lock().await;
                // A stop that raced with the tick wins.
                if !matches!(stop_rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)) {
                    break;
                }

                debug!("Running dispatch cycle");
                if let Err(e) = dispatcher.process_pending(config.batch_size).await {
                    error!(error = %e, "Dispatch cycle failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EndpointResponse, MemoryStore, RecordingCache, ScriptedEndpoint};
    use crate::DEFAULT_SEND_TIMEOUT;

    const INTERVAL: Duration = Duration::from_secs(120);

    struct Harness {
        store: Arc<MemoryStore>,
        endpoint: Arc<ScriptedEndpoint>,
        scheduler: Scheduler,
    }

    fn harness() -> Harness {
        harness_with(INTERVAL, DEFAULT_SEND_TIMEOUT)
    }

    fn harness_with(interval: Duration, send_timeout: Duration) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let endpoint = Arc::new(ScriptedEndpoint::always("ext-1"));
        let cache = Arc::new(RecordingCache::new());
        let dispatcher = Arc::new(
            Dispatcher::new(store.clone(), endpoint.clone(), cache).with_send_timeout(send_timeout),
        );
        let scheduler = Scheduler::new(
            dispatcher,
            SchedulerConfig {
                interval,
                batch_size: 2,
            },
        );
        Harness {
            store,
            endpoint,
            scheduler,
        }
    }

    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
        // Let the loop task run its cycle to completion.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn starts_stopped() {
        let h = harness();
        assert!(!h.scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_keeps_one_loop() {
        let h = harness();
        h.store.insert("+1", "one");

        assert_eq!(h.scheduler.start(), StartOutcome::Started);
        assert_eq!(h.scheduler.start(), StartOutcome::AlreadyRunning);
        assert!(h.scheduler.is_running());

        advance(INTERVAL + Duration::from_millis(1)).await;

        assert_eq!(h.store.fetch_calls(), vec![2]);
        assert_eq!(h.endpoint.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_when_stopped_is_a_no_op() {
        let h = harness();
        assert_eq!(h.scheduler.stop(), StopOutcome::AlreadyStopped);
        assert!(!h.scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn no_cycle_before_first_interval() {
        let h = harness();
        h.store.insert("+1", "one");
        h.scheduler.start();

        advance(INTERVAL - Duration::from_secs(1)).await;

        assert!(h.store.fetch_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn runs_one_cycle_per_interval() {
        let h = harness();
        h.scheduler.start();

        advance(INTERVAL + Duration::from_millis(1)).await;
        advance(INTERVAL).await;
        advance(INTERVAL).await;

        assert_eq!(h.store.fetch_calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn no_cycles_after_stop() {
        let h = harness();
        h.scheduler.start();
        advance(INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(h.store.fetch_calls().len(), 1);

        assert_eq!(h.scheduler.stop(), StopOutcome::Stopped);
        assert!(!h.scheduler.is_running());
        h.store.insert("+1", "late");

        advance(INTERVAL * 3).await;

        assert_eq!(h.store.fetch_calls().len(), 1);
        assert_eq!(h.endpoint.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_does_not_stop_scheduler() {
        let h = harness();
        h.store.set_fail_fetch(true);
        h.scheduler.start();

        advance(INTERVAL + Duration::from_millis(1)).await;
        assert!(h.scheduler.is_running());

        h.store.set_fail_fetch(false);
        h.store.insert("+1", "one");
        advance(INTERVAL).await;

        assert_eq!(h.store.fetch_calls().len(), 2);
        assert_eq!(h.endpoint.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_resumes_cycles() {
        let h = harness();
        h.scheduler.start();
        h.scheduler.stop();

        assert_eq!(h.scheduler.start(), StartOutcome::Started);
        advance(INTERVAL + Duration::from_millis(1)).await;

        assert!(h.scheduler.is_running());
        assert_eq!(h.store.fetch_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_loop_exit() {
        let h = harness();
        h.scheduler.start();

        h.scheduler.shutdown().await;

        assert!(!h.scheduler.is_running());
        assert!(h.scheduler.last_loop.lock().is_none());
    }

    #[test]
    fn period_is_clamped_to_timer_range() {
        let huge = SchedulerConfig {
            interval: Duration::from_secs(u64::MAX),
            batch_size: 2,
        };
        assert_eq!(huge.period(), MAX_INTERVAL);

        let zero = SchedulerConfig {
            interval: Duration::ZERO,
            batch_size: 2,
        };
        assert_eq!(zero.period(), MIN_INTERVAL);

        assert_eq!(SchedulerConfig::default().period(), INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_interval_keeps_loop_alive() {
        let h = harness_with(Duration::from_secs(u64::MAX), DEFAULT_SEND_TIMEOUT);

        assert_eq!(h.scheduler.start(), StartOutcome::Started);
        advance(Duration::from_secs(1)).await;

        assert!(h.scheduler.is_running());
        assert!(h.store.fetch_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_cycle_finishes_after_stop_and_is_the_last() {
        // Send timeout longer than the interval keeps the first cycle busy.
        let h = harness_with(INTERVAL, Duration::from_secs(300));
        h.endpoint.queue(EndpointResponse::Hang);
        let id = h.store.insert("+1", "one");
        h.scheduler.start();

        // t=121: first cycle is blocked on the hung send.
        advance(INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(h.store.fetch_calls(), vec![2]);
        assert_eq!(h.endpoint.call_count(), 1);

        assert_eq!(h.scheduler.stop(), StopOutcome::Stopped);
        assert!(!h.scheduler.is_running());

        // t=430: the send timed out at t=420 and the cycle completed.
        advance(Duration::from_secs(309)).await;
        advance(INTERVAL * 3).await;

        assert_eq!(h.store.fetch_calls(), vec![2]);
        assert_eq!(h.endpoint.call_count(), 1);
        assert!(h.store.message(id).unwrap().is_pending());
        assert!(h.store.marks().is_empty());

        h.scheduler.shutdown().await;
        assert!(h.scheduler.last_loop.lock().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_waits_for_previous_cycle() {
        let h = harness_with(INTERVAL, Duration::from_secs(300));
        h.endpoint.queue(EndpointResponse::Hang);
        let id = h.store.insert("+1", "one");
        h.scheduler.start();

        // t=121: old loop's cycle hangs until t=420.
        advance(INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(h.store.fetch_calls().len(), 1);

        h.scheduler.stop();
        assert_eq!(h.scheduler.start(), StartOutcome::Started);

        // t=250: the new loop ticked at t=241 but may not start a cycle yet.
        advance(Duration::from_secs(129)).await;
        assert_eq!(h.store.fetch_calls().len(), 1);

        // t=419: still blocked behind the hung send.
        advance(Duration::from_secs(169)).await;
        assert_eq!(h.store.fetch_calls().len(), 1);
        assert_eq!(h.endpoint.call_count(), 1);

        // t=430: old cycle timed out, the new loop ran and delivered.
        advance(Duration::from_secs(11)).await;
        assert!(h.store.fetch_calls().len() >= 2);
        assert_eq!(h.endpoint.call_count(), 2);
        assert_eq!(h.store.message(id).unwrap().delivery_id(), Some("ext-1"));
        assert!(h.scheduler.is_running());
    }
}
