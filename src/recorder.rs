use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tokio::{
    fs::OpenOptions,
    io::{AsyncWrite, BufWriter},
    sync::oneshot,
    task::JoinHandle,
};

use crate::{
    resolver::{ResolveError, StreamSource},
    stats::SessionStatistics,
    util::until,
    worker::{CycleError, Session},
};

/// Consecutive transient failures a session tolerates before giving up.
pub const RETRY_TOLERANCE: u32 = 15;

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("session start {start} is after its end {end}")]
    InvalidWindow {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
    #[error("output file error: {0}")]
    Sink(#[from] std::io::Error),
    #[error("authentication failed: {0}")]
    Auth(#[from] ResolveError),
    #[error("giving up after {attempts} consecutive failures: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: CycleError,
    },
}

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub retry_tolerance: u32,
    pub pacing_margin: Duration,
    pub poll_interval: Duration,
    pub outdir: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            retry_tolerance: RETRY_TOLERANCE,
            pacing_margin: Duration::from_millis(500),
            poll_interval: Duration::from_secs(1),
            outdir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    Escalate,
}

/// Linear backoff: the n-th consecutive failure waits n seconds, until the
/// count goes past the tolerance.
pub fn retry_decision(failures: u32, tolerance: u32) -> RetryDecision {
    if failures > tolerance {
        RetryDecision::Escalate
    } else {
        RetryDecision::Retry(Duration::from_secs(failures as u64))
    }
}

pub fn output_file_name(channel: &str, start: &DateTime<FixedOffset>) -> String {
    format!("{}_{}.aac", channel, start.format("%Y%m%d_%H%M%S"))
}

/// Aborts the end-of-window timer when the session exits before it fires.
struct EndTimer(JoinHandle<()>);

impl EndTimer {
    fn arm(after: Duration) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(());
        });
        (Self(handle), rx)
    }
}

impl Drop for EndTimer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Records one channel, one session at a time.
pub struct Recorder<S> {
    source: S,
    channel: String,
    config: RecorderConfig,
}

impl<S: StreamSource> Recorder<S> {
    pub fn new(source: S, channel: &str, config: RecorderConfig) -> Self {
        Self {
            source,
            channel: channel.to_string(),
            config,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn output_path(&self, start: &DateTime<FixedOffset>) -> PathBuf {
        self.config
            .outdir
            .join(output_file_name(&self.channel, start))
    }

    /// Records the `[start, end)` window into a new file in the output
    /// directory.
    pub async fn record(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<SessionStatistics, RecordError> {
        if start > end {
            return Err(RecordError::InvalidWindow { start, end });
        }

        tokio::time::sleep(until(&start)).await;

        let path = self.output_path(&start);
        let file = open_sink(&path).await?;
        info!("Recording channel {} into {}", self.channel, path.display());

        self.record_into(BufWriter::new(file), end).await
    }

    /// Runs download cycles into `sink` until `end`, then closes it.
    pub async fn record_into<W>(
        &self,
        sink: W,
        end: DateTime<FixedOffset>,
    ) -> Result<SessionStatistics, RecordError>
    where
        W: AsyncWrite + Unpin,
    {
        let (_timer, mut end_signal) = EndTimer::arm(until(&end));
        let mut session = Session::new(
            &self.source,
            &self.channel,
            sink,
            self.config.pacing_margin,
        );
        let mut failures = 0;

        loop {
            let wait = match session.run_cycle().await {
                Ok(pacing) => {
                    failures = 0;
                    session.flush().await?;
                    pacing.map_or(self.config.poll_interval, |p| p.max(self.config.poll_interval))
                }
                Err(CycleError::Resolve(e)) => return Err(RecordError::Auth(e)),
                Err(CycleError::Sink(e)) => return Err(RecordError::Sink(e)),
                Err(e) => {
                    failures += 1;
                    session.stats.failures += 1;
                    match retry_decision(failures, self.config.retry_tolerance) {
                        RetryDecision::Retry(backoff) => {
                            warn!(
                                "Channel {} download failed (attempt {}): {}",
                                self.channel, failures, e
                            );
                            backoff
                        }
                        RetryDecision::Escalate => {
                            return Err(RecordError::RetriesExhausted {
                                attempts: failures,
                                source: e,
                            });
                        }
                    }
                }
            };

            // The end of the window is only ever observed here, between
            // cycles.
            tokio::select! {
                _ = &mut end_signal => break,
                _ = tokio::time::sleep(wait) => (),
            }
        }

        let stats = session.finish().await?;
        info!("Channel {} session done: {}", self.channel, stats.summary());

        Ok(stats)
    }
}

/// Runs one bounded recording session. The scheduler drives sessions
/// through this.
#[async_trait]
pub trait SessionRunner: Send + Sync {
    async fn run_session(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<SessionStatistics, RecordError>;
}

#[async_trait]
impl<S: StreamSource> SessionRunner for Recorder<S> {
    async fn run_session(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<SessionStatistics, RecordError> {
        self.record(start, end).await
    }
}

async fn open_sink(path: &Path) -> std::io::Result<tokio::fs::File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}
