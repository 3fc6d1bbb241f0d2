//! Controller Handle - acquisition loop lifecycle
//!
//! Ties the background [`ReportReader`](super::reader) to the foreground
//! listener. The handle is a typestate machine:
//!
//! ```text
//! start() ──► Running ──stop()──► Stopping ──reader joined──► Stopped
//! ```
//!
//! `stop` consumes the running handle, so stopping twice or listening after
//! a stop is rejected at compile time. A [`Stopper`] carries the same
//! cancellation signal and can be fired from inside a handler or another
//! task, any number of times.

use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::io::Read;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use super::decoder::{self, State};
use super::error::ControllerError;
use super::reader::{forward_error, ErrorRoute, RawReport, ReportReader};

/// Tuning for the acquisition loop
///
/// # Examples
///
/// ```rust
/// use dualshock::controller::ControllerSettings;
///
/// // Throttle a replayed capture to the device's native rate
/// let replay = ControllerSettings {
///     pacing_hz: Some(254),
///     ..ControllerSettings::default()
/// };
/// assert!(replay.pacing_interval().is_some());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Raw reports buffered between reader and listener
    ///
    /// Kept small on purpose: the device reports at ~254 Hz and a stale
    /// backlog is worse than backpressure on the reader.
    pub queue_capacity: usize,

    /// Optional fixed reading rate. Real hardware paces itself through the
    /// blocking read, so this is only useful for replayed or synthetic
    /// sources.
    pub pacing_hz: Option<u32>,

    /// Pause after a failed read before retrying
    pub retry_delay_ms: u64,

    /// How long `stop` waits for the reader thread to finish
    pub shutdown_timeout_ms: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 2,
            pacing_hz: None,
            retry_delay_ms: 4,
            shutdown_timeout_ms: 250,
        }
    }
}

impl ControllerSettings {
    pub fn pacing_interval(&self) -> Option<Duration> {
        self.pacing_hz
            .filter(|hz| *hz > 0)
            .map(|hz| Duration::from_secs_f64(1.0 / f64::from(hz)))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Rejects settings that would make channel creation panic.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.queue_capacity == 0 {
            return Err(ControllerError::InvalidSettings(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.pacing_hz == Some(0) {
            return Err(ControllerError::InvalidSettings(
                "pacing_hz must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Clonable stop signal for a running controller.
///
/// Firing it makes both the reader and any `listen` call return. It does not
/// join the reader; call [`ControllerHandle::stop`] for that.
#[derive(Clone, Debug)]
pub struct Stopper {
    cancel: CancellationToken,
}

impl Stopper {
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            info!("Stop signal raised");
        }
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum LoopState {
    Running,
    Stopping,
    Stopped,
}

#[machine]
#[derive(Debug)]
pub struct ControllerHandle<S: LoopState> {
    // Settings the loop was started with
    settings: ControllerSettings,

    // Shared stop signal for reader and listener
    cancel: CancellationToken,

    // Cancels the reader if the handle is dropped without stop()
    _cancel_on_drop: DropGuard,

    // Raw reports coming from the reader
    reports: mpsc::Receiver<RawReport>,

    // Subscriber installed by errors(), shared with the reader
    error_route: watch::Sender<ErrorRoute>,

    // Blocking reader task
    reader_task: Option<JoinHandle<()>>,
}

// Methods available in all states
impl<S: LoopState> ControllerHandle<S> {
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }
}

impl ControllerHandle<Running> {
    /// Starts reading from `source` in the background.
    ///
    /// Reports are queued immediately, before the first [`listen`] call.
    ///
    /// # Errors
    ///
    /// * [`ControllerError::InvalidSettings`] - the queue capacity or rate is zero
    /// * [`ControllerError::InvalidState`] - called outside a tokio runtime
    ///
    /// [`listen`]: ControllerHandle::listen
    pub fn start<R>(source: R, settings: Option<ControllerSettings>) -> Result<Self, ControllerError>
    where
        R: Read + Send + 'static,
    {
        info!("Starting controller with settings: {:?}", settings);

        let settings = settings.unwrap_or_default();
        settings.validate()?;

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ControllerError::InvalidState(format!("controller needs a tokio runtime: {}", e))
        })?;

        let (report_sender, report_receiver) = mpsc::channel(settings.queue_capacity);
        // No subscriber until errors() is called
        let (error_route, route_receiver) = watch::channel(None);
        debug!(
            "Created report queue with capacity {}",
            settings.queue_capacity
        );

        let cancel = CancellationToken::new();
        let reader = ReportReader::new(
            source,
            &settings,
            report_sender,
            route_receiver,
            cancel.clone(),
        );

        info!("Spawning report reader task");
        let reader_task = runtime.spawn_blocking(move || reader.run());
        debug!("Reader task spawned with handle: {:?}", reader_task);

        Ok(Self::new(
            settings,
            cancel.clone(),
            cancel.drop_guard(),
            report_receiver,
            error_route,
            Some(reader_task),
        ))
    }

    /// Decodes queued reports and hands each [`State`] to `handler`, in the
    /// order they were read.
    ///
    /// Returns once the stop signal fires or the reader goes away. A report
    /// that was dequeued after the signal is dropped, not delivered. Reports
    /// too short to decode are sent to the error stream and skipped.
    pub async fn listen<F>(&mut self, mut handler: F)
    where
        F: FnMut(State),
    {
        info!("Listening for controller reports");
        let mut delivered: u64 = 0;

        loop {
            let raw = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Listener observed stop signal");
                    break;
                }
                next = self.reports.recv() => match next {
                    Some(raw) => raw,
                    None => {
                        warn!("Report queue closed by reader, listener exiting");
                        break;
                    }
                },
            };

            if self.cancel.is_cancelled() {
                debug!("Dropping report dequeued after stop signal");
                break;
            }

            match decoder::decode(raw.as_bytes()) {
                Ok(state) => {
                    handler(state);
                    delivered += 1;
                }
                Err(e) => {
                    warn!("Skipping undecodable report: {}", e);
                    forward_error(self.error_route.borrow().as_ref(), e);
                }
            }
        }

        info!("Listener stopped after delivering {} states", delivered);
    }

    /// Subscribes to the stream of read and decode failures.
    ///
    /// Failures never stop the loop. Every failure raised after this call is
    /// delivered, however late the consumer drains; earlier ones are only
    /// logged. The stream ends once the controller is stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidState`] if the stream was already
    /// taken.
    pub fn errors(&mut self) -> Result<mpsc::UnboundedReceiver<ControllerError>, ControllerError> {
        if self.error_route.borrow().is_some() {
            return Err(ControllerError::InvalidState(
                "error stream already taken".to_string(),
            ));
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        self.error_route.send_replace(Some(sender));
        debug!("Error stream subscribed");
        Ok(receiver)
    }

    pub fn stopper(&self) -> Stopper {
        Stopper {
            cancel: self.cancel.clone(),
        }
    }

    /// Signals both sides to stop, waits for the reader and releases the
    /// queue and error stream.
    pub async fn stop(self) -> ControllerHandle<Stopped> {
        info!("Stopping controller");
        self.cancel.cancel();
        let stopping: ControllerHandle<Stopping> = self.transition();
        stopping.shutdown().await
    }
}

impl ControllerHandle<Stopping> {
    async fn shutdown(mut self) -> ControllerHandle<Stopped> {
        // Unblocks a reader waiting on a full queue
        self.reports.close();

        if let Some(task) = self.reader_task.take() {
            let timeout = self.settings.shutdown_timeout();
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => debug!("Report reader joined"),
                Ok(Err(e)) => error!("Report reader task failed: {}", e),
                Err(_) => warn!(
                    "Report reader still blocked in read after {:?}, detaching it",
                    timeout
                ),
            }
        }

        // Ends the subscriber's stream once buffered failures are drained
        self.error_route.send_replace(None);
        while self.reports.try_recv().is_ok() {}

        info!("Controller stopped");
        self.transition()
    }
}

impl ControllerHandle<Stopped> {
    /// Always true; lets callers assert on the final state.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
