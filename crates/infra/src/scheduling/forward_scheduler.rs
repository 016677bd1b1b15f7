//! Daemon-mode scheduler driving one forwarding pass per tick.
//!
//! Each tick computes an overlapping window from the previous tick's end,
//! runs the pipeline over it and sleeps until `interval` after the tick
//! started. Shutdown is observed before fetching and while sleeping, so a
//! batch in flight is always finished.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use auditbridge_core::{ForwardingPipeline, SystemClock};
//! use auditbridge_infra::scheduling::{ForwardScheduler, ForwardSchedulerConfig};
//!
//! # async fn example(pipeline: ForwardingPipeline) -> Result<(), Box<dyn std::error::Error>> {
//! let mut scheduler = ForwardScheduler::new(
//!     Arc::new(pipeline),
//!     Arc::new(SystemClock),
//!     ForwardSchedulerConfig { interval: Duration::from_secs(300), ..Default::default() },
//! )?;
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! let summary = scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use auditbridge_core::{next_tick_delay, Clock, ForwardingPipeline, SchedulerState, WindowSchedule};
use auditbridge_domain::constants::{DEFAULT_DAEMON_INTERVAL_SECS, DEFAULT_LOOKBACK_HOURS, DEFAULT_OVERLAP_SECS};
use auditbridge_domain::RunResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<SchedulerResult<DaemonSummary>>>>>;

/// Configuration for the forward scheduler
#[derive(Debug, Clone)]
pub struct ForwardSchedulerConfig {
    /// Time between tick starts
    pub interval: Duration,
    /// Window length of the first tick
    pub lookback: Duration,
    /// How far each window reaches back before the previous window's end
    pub overlap: Duration,
    /// Fetch and batch without sending
    pub dry_run: bool,
    /// How long `stop` waits for the loop to finish
    pub join_timeout: Duration,
}

impl Default for ForwardSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_DAEMON_INTERVAL_SECS),
            lookback: Duration::from_secs(u64::from(DEFAULT_LOOKBACK_HOURS) * 3600),
            overlap: Duration::from_secs(DEFAULT_OVERLAP_SECS),
            dry_run: false,
            join_timeout: Duration::from_secs(30),
        }
    }
}

/// Totals over a daemon's lifetime, returned when it stops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DaemonSummary {
    pub ticks: u64,
    /// Ticks whose window was empty because of clock skew
    pub ticks_skipped: u64,
    pub runs_succeeded: u64,
    /// Runs with a fetch failure or at least one failed batch
    pub runs_failed: u64,
    /// Runs that stopped paginating before the source's last page
    pub runs_truncated: u64,
    pub records_fetched: u64,
    pub records_delivered: u64,
    pub last_end: Option<DateTime<Utc>>,
}

impl DaemonSummary {
    fn record(&mut self, result: &RunResult) {
        if result.is_success() {
            self.runs_succeeded += 1;
        } else {
            self.runs_failed += 1;
        }
        if result.truncated {
            self.runs_truncated += 1;
        }
        self.records_fetched += result.records_fetched as u64;
        self.records_delivered += result.records_delivered as u64;
    }
}

/// Everything the loop needs, moved into the spawned task.
struct LoopContext {
    pipeline: Arc<ForwardingPipeline>,
    clock: Arc<dyn Clock>,
    state: Arc<watch::Sender<SchedulerState>>,
    schedule: WindowSchedule,
    config: ForwardSchedulerConfig,
}

/// Scheduler running the forwarding pipeline on a fixed cadence
pub struct ForwardScheduler {
    pipeline: Arc<ForwardingPipeline>,
    clock: Arc<dyn Clock>,
    config: ForwardSchedulerConfig,
    schedule: WindowSchedule,
    state: Arc<watch::Sender<SchedulerState>>,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl ForwardScheduler {
    /// Create a new forward scheduler
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Configuration` for a zero interval or lookback.
    pub fn new(
        pipeline: Arc<ForwardingPipeline>,
        clock: Arc<dyn Clock>,
        config: ForwardSchedulerConfig,
    ) -> SchedulerResult<Self> {
        if config.interval.is_zero() {
            return Err(SchedulerError::Configuration("daemon interval must be greater than 0".into()));
        }
        let schedule = WindowSchedule::new(config.overlap, config.lookback).map_err(|e| SchedulerError::halt(&e))?;
        let (state, _) = watch::channel(SchedulerState::Idle);

        Ok(Self {
            pipeline,
            clock,
            config,
            schedule,
            state: Arc::new(state),
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Token that stops the loop at the next tick boundary when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Run the loop on the current task until cancelled or halted.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Configuration` when the pipeline raises a
    /// configuration error; the daemon stops at that point.
    pub async fn run(&self) -> SchedulerResult<DaemonSummary> {
        Self::forward_loop(self.context(), self.cancellation_token.clone()).await
    }

    /// Start the scheduler
    ///
    /// Spawns a background task running the loop.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!("Starting forward scheduler");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let context = self.context();
        let cancel = self.cancellation_token.clone();
        let handle = tokio::spawn(async move { Self::forward_loop(context, cancel).await });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the background task and awaits completion of the current tick.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler was never started, the tick does not finish
    /// within the join timeout, or the loop itself halted with an error.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<DaemonSummary> {
        let Some(handle) = self.task_handle.lock().await.take() else {
            return Err(SchedulerError::NotRunning);
        };

        info!("Stopping forward scheduler");
        self.cancellation_token.cancel();

        let join_timeout = self.config.join_timeout;
        tokio::time::timeout(join_timeout, handle)
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })??
    }

    /// Check if scheduler is running
    ///
    /// A scheduler is considered running if it has an active task handle that
    /// hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    fn context(&self) -> LoopContext {
        LoopContext {
            pipeline: Arc::clone(&self.pipeline),
            clock: Arc::clone(&self.clock),
            state: Arc::clone(&self.state),
            schedule: self.schedule.clone(),
            config: self.config.clone(),
        }
    }

    /// Background forwarding loop
    async fn forward_loop(context: LoopContext, cancel: CancellationToken) -> SchedulerResult<DaemonSummary> {
        let LoopContext { pipeline, clock, state, mut schedule, config } = context;
        let mut summary = DaemonSummary::default();

        info!(
            interval_secs = config.interval.as_secs(),
            overlap_secs = config.overlap.as_secs(),
            dry_run = config.dry_run,
            "Forward loop started"
        );

        loop {
            if cancel.is_cancelled() {
                debug!("Forward loop cancelled before tick");
                break;
            }

            let tick_started = Instant::now();
            let now = clock.now();
            summary.ticks += 1;

            let next = match schedule.next_window(now) {
                Ok(next) => next,
                Err(err) => {
                    error!(error = %err, "Cannot compute window, halting daemon");
                    state.send_replace(SchedulerState::Stopped);
                    return Err(SchedulerError::halt(&err));
                }
            };

            match next {
                None => {
                    summary.ticks_skipped += 1;
                    warn!(
                        tick = summary.ticks,
                        last_end = ?schedule.last_end(),
                        %now,
                        "Window start is not before now, skipping tick"
                    );
                }
                Some(window) => {
                    info!(tick = summary.ticks, %window, "Starting forwarding tick");
                    state.send_replace(SchedulerState::Fetching);

                    let result = match pipeline.collect(&window).await {
                        Ok(prepared) => {
                            state.send_replace(SchedulerState::Delivering);
                            pipeline.deliver(prepared, config.dry_run).await
                        }
                        Err(err) if err.is_configuration() => {
                            error!(error = %err, "Configuration error, halting daemon");
                            state.send_replace(SchedulerState::Stopped);
                            return Err(SchedulerError::halt(&err));
                        }
                        Err(err) => {
                            error!(error = %err, %window, "Fetch failed, window will be retried next tick");
                            RunResult::fetch_failed(window, config.dry_run, err.to_string())
                        }
                    };

                    summary.record(&result);
                    if !result.is_success() {
                        warn!(failures = ?result.failures, "Forwarding tick completed with failures");
                    }
                    if schedule.complete_tick(&result) {
                        debug!(last_end = %window.end(), "Advanced window");
                    }
                }
            }

            state.send_replace(SchedulerState::Sleeping);
            let delay = next_tick_delay(config.interval, tick_started.elapsed());
            debug!(delay_ms = delay.as_millis() as u64, "Sleeping until next tick");

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Forward loop cancelled while sleeping");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        state.send_replace(SchedulerState::Stopped);
        summary.last_end = schedule.last_end();
        info!(
            ticks = summary.ticks,
            succeeded = summary.runs_succeeded,
            failed = summary.runs_failed,
            delivered = summary.records_delivered,
            "Forward loop stopped"
        );
        Ok(summary)
    }
}
