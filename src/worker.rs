use std::{collections::HashSet, time::Duration};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    resolver::{FetchError, ResolveError, StreamIdentity, StreamSource},
    stats::SessionStatistics,
};

#[derive(thiserror::Error, Debug)]
pub enum CycleError {
    #[error("could not resolve stream: {0}")]
    Resolve(#[from] ResolveError),
    #[error("{0}")]
    Fetch(#[from] FetchError),
    #[error("could not write to output: {0}")]
    Sink(#[source] std::io::Error),
    #[error("short write of {path}: {written} of {expected} bytes")]
    ShortWrite {
        path: String,
        expected: usize,
        written: usize,
    },
}

impl CycleError {
    /// Transient errors are worth retrying after a pause. Credential and
    /// output problems are not going to fix themselves.
    pub fn is_transient(&self) -> bool {
        matches!(self, CycleError::Fetch(_) | CycleError::ShortWrite { .. })
    }
}

/// Per-session download state. Everything here lives and dies with one
/// recording session.
pub struct Session<'a, S: ?Sized, W> {
    source: &'a S,
    channel: &'a str,
    sink: W,
    written: HashSet<String>,
    identity: Option<StreamIdentity>,
    pacing_margin: Duration,
    pub stats: SessionStatistics,
}

impl<'a, S, W> Session<'a, S, W>
where
    S: StreamSource + ?Sized,
    W: AsyncWrite + Unpin,
{
    pub fn new(source: &'a S, channel: &'a str, sink: W, pacing_margin: Duration) -> Self {
        Self {
            source,
            channel,
            sink,
            written: HashSet::new(),
            identity: None,
            pacing_margin,
            stats: SessionStatistics::new(),
        }
    }

    pub fn is_written(&self, path: &str) -> bool {
        self.written.contains(path)
    }

    async fn identity(&mut self) -> Result<StreamIdentity, ResolveError> {
        match &self.identity {
            Some(identity) if identity.credentials.assigned() => Ok(identity.clone()),
            _ => {
                let identity = self.source.resolve(self.channel).await?;
                if !identity.credentials.assigned() {
                    return Err(ResolveError::MissingCookies(identity.server));
                }
                info!(
                    "Channel {} authorized on {} as {}",
                    self.channel, identity.server, identity.channel_name
                );
                self.identity = Some(identity.clone());
                Ok(identity)
            }
        }
    }

    /// Runs one poll-and-fetch cycle, appending every segment not written yet.
    /// Returns how long to wait before polling again, if the stream cadence
    /// calls for it.
    pub async fn run_cycle(&mut self) -> Result<Option<Duration>, CycleError> {
        let started = tokio::time::Instant::now();
        self.stats.cycles += 1;

        let identity = self.identity().await?;
        let segments = self
            .source
            .list_segments(&identity)
            .await
            .map_err(|e| self.on_fetch_error(e))?;

        let mut last_new = None;
        for segment in segments {
            if self.written.contains(&segment.path) {
                continue;
            }

            let payload = self
                .source
                .fetch_segment(&identity, &segment.path)
                .await
                .map_err(|e| self.on_fetch_error(e))?;
            if payload.is_empty() {
                return Err(FetchError::EmptyPayload(segment.path).into());
            }

            self.append(&segment.path, &payload).await?;
            debug!("Wrote {} ({} bytes)", segment.path, payload.len());

            self.stats.record_segment(payload.len());
            last_new = Some(segment.duration());
            self.written.insert(segment.path);
        }

        Ok(last_new.and_then(|duration| pacing_delay(started.elapsed(), duration, self.pacing_margin)))
    }

    async fn append(&mut self, path: &str, payload: &[u8]) -> Result<(), CycleError> {
        let mut written = 0;
        while written < payload.len() {
            let n = self
                .sink
                .write(&payload[written..])
                .await
                .map_err(CycleError::Sink)?;
            if n == 0 {
                break;
            }
            written += n;
        }

        if written != payload.len() {
            return Err(CycleError::ShortWrite {
                path: path.to_string(),
                expected: payload.len(),
                written,
            });
        }
        Ok(())
    }

    fn on_fetch_error(&mut self, e: FetchError) -> CycleError {
        if e.is_unauthorized() {
            warn!("Credentials for channel {} rejected, re-authorizing", self.channel);
            self.identity = None;
        }
        e.into()
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        self.sink.flush().await
    }

    /// Flushes and closes the sink, dropping the dedup set with the session.
    pub async fn finish(mut self) -> std::io::Result<SessionStatistics> {
        self.sink.flush().await?;
        self.sink.shutdown().await?;
        Ok(self.stats)
    }
}

/// Delay before the next poll: when the cycle finished quicker than the
/// segment it fetched lasts, wait out that segment minus a margin.
pub fn pacing_delay(elapsed: Duration, segment: Duration, margin: Duration) -> Option<Duration> {
    if elapsed < segment {
        Some(segment.saturating_sub(margin))
    } else {
        None
    }
}
