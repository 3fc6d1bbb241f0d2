//! Background report reader
//!
//! Pulls fixed-size reports from a blocking byte source and queues them for
//! the listener. Runs on a tokio blocking thread because the source read
//! cannot be awaited.

use chrono::Local;
use std::io::{ErrorKind, Read};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::controller_handle::ControllerSettings;
use crate::controller::decoder::REPORT_LEN;
use crate::controller::error::ControllerError;

/// One report exactly as read from the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawReport {
    bytes: [u8; REPORT_LEN],
    len: usize,
}

impl RawReport {
    pub fn new(bytes: [u8; REPORT_LEN], len: usize) -> Self {
        Self {
            bytes,
            len: len.min(REPORT_LEN),
        }
    }

    /// The bytes the source actually filled.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Error stream subscriber, `None` until `errors()` is called.
pub(crate) type ErrorRoute = Option<mpsc::UnboundedSender<ControllerError>>;

// Hand an error to the subscriber without ever blocking the caller
pub(crate) fn forward_error(
    subscriber: Option<&mpsc::UnboundedSender<ControllerError>>,
    err: ControllerError,
) -> bool {
    match subscriber {
        Some(sender) => match sender.send(err) {
            Ok(()) => true,
            Err(mpsc::error::SendError(err)) => {
                debug!("Error stream closed, dropping: {}", err);
                false
            }
        },
        None => {
            debug!("No error subscriber, dropping: {}", err);
            false
        }
    }
}

pub(crate) struct ReportReader<R> {
    source: R,
    report_sender: mpsc::Sender<RawReport>,
    error_route: watch::Receiver<ErrorRoute>,
    cancel: CancellationToken,
    pacing: Option<Duration>,
    retry_delay: Duration,
}

impl<R: Read> ReportReader<R> {
    pub(crate) fn new(
        source: R,
        settings: &ControllerSettings,
        report_sender: mpsc::Sender<RawReport>,
        error_route: watch::Receiver<ErrorRoute>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            report_sender,
            error_route,
            cancel,
            pacing: settings.pacing_interval(),
            retry_delay: settings.retry_delay(),
        }
    }

    // Read a single report; a zero-length read counts as a failure
    fn read_report(&mut self) -> Result<RawReport, ControllerError> {
        let mut bytes = [0u8; REPORT_LEN];
        let len = self.source.read(&mut bytes)?;
        if len == 0 {
            let eof = std::io::Error::new(ErrorKind::UnexpectedEof, "source returned no data");
            return Err(eof.into());
        }
        Ok(RawReport::new(bytes, len))
    }

    /// Runs until the cancellation token fires or the report queue closes.
    pub(crate) fn run(mut self) {
        info!(
            "Starting report reader loop (pacing: {:?}, retry delay: {:?})",
            self.pacing, self.retry_delay
        );

        // For throughput monitoring
        let mut report_count: u64 = 0;
        let mut failure_count: u64 = 0;
        let mut dropped_errors: u64 = 0;
        let mut failing = false;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        loop {
            if self.cancel.is_cancelled() {
                debug!("Reader observed stop signal");
                break;
            }

            match self.read_report() {
                Ok(report) => {
                    report_count += 1;
                    debug!("Read report of {} bytes", report.len());
                    if failing {
                        info!("Source recovered, reading reports again");
                        failing = false;
                    }

                    if self.cancel.is_cancelled() {
                        debug!("Dropping report read after stop signal");
                        break;
                    }
                    // Blocks while the queue is full; fails once the listener side closes it
                    if self.report_sender.blocking_send(report).is_err() {
                        info!("Report queue closed, reader exiting");
                        break;
                    }
                    if let Some(interval) = self.pacing {
                        std::thread::sleep(interval);
                    }
                }
                Err(e) => {
                    failure_count += 1;
                    // Only the first of a run; the stats carry the rest
                    if failing {
                        debug!("Failed to read report: {}", e);
                    } else {
                        warn!("Failed to read report: {}", e);
                        failing = true;
                    }
                    if !forward_error(self.error_route.borrow().as_ref(), e) {
                        dropped_errors += 1;
                    }
                    std::thread::sleep(self.retry_delay);
                }
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Report reader stats: {} reports, {} failures in last {} seconds (avg {:.2}/sec)",
                    report_count,
                    failure_count,
                    log_interval.num_seconds(),
                    report_count as f64 / log_interval.num_seconds() as f64
                );
                if dropped_errors > 0 {
                    warn!(
                        "Dropped {} read failures, no error stream subscriber",
                        dropped_errors
                    );
                }
                report_count = 0;
                failure_count = 0;
                dropped_errors = 0;
                last_log_time = now;
            }
        }

        info!("Report reader stopped");
    }
}
