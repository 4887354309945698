// Relay - one upstream completion stream in, one client stream out.
// Phases: Idle -> UpstreamConnecting -> Streaming -> Completed | Failed

mod frame;
mod framing;
mod upstream;

pub use frame::{DONE_SENTINEL, Frame, FrameDecoder, MAX_LINE_BYTES, parse_line};
pub use framing::Framing;
pub use upstream::{ByteStream, Credential, HttpUpstream, Upstream, UpstreamRequest};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::metrics::{ACTIVE_STREAMS, RELAY_COMPLETED, RELAY_FAILED, SKIPPED_FRAMES, STREAM_LATENCY};

const CHANNEL_CAPACITY: usize = 64;

// Malformed frames logged individually per invocation; the rest are counted
const SKIP_WARN_LIMIT: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Idle,
    UpstreamConnecting,
    Streaming,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RelayOutcome {
    pub phase: RelayPhase,
    pub content: String,
    pub skipped: u64,
    pub client_gone: bool,
}

impl RelayOutcome {
    pub fn is_completed(&self) -> bool {
        self.phase == RelayPhase::Completed
    }
}

pub type OnFinish = Box<dyn FnOnce(&RelayOutcome) + Send + 'static>;

pub struct RelayJob {
    // feature name, for logs
    pub label: String,
    pub request: UpstreamRequest,
    pub framing: Framing,
    // rendered completion message
    pub trailer: String,
}

// on_finish runs once, after the trailer or diagnostic is queued
pub fn relay(
    upstream: Arc<dyn Upstream>,
    job: RelayJob,
    on_finish: OnFinish,
) -> impl Stream<Item = Bytes> + Send + 'static {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(run(upstream, job, tx, on_finish));
    ReceiverStream::new(rx)
}

enum Stop {
    Upstream(RelayError),
    ClientGone,
}

#[derive(PartialEq)]
enum Flow {
    More,
    Done,
}

async fn run(
    upstream: Arc<dyn Upstream>,
    job: RelayJob,
    tx: mpsc::Sender<Bytes>,
    on_finish: OnFinish,
) {
    let started = Instant::now();
    ACTIVE_STREAMS.inc();

    let mut pump = Pump {
        label: &job.label,
        framing: job.framing,
        tx: &tx,
        phase: RelayPhase::Idle,
        content: String::new(),
        skips: 0,
    };

    let result = tokio::select! {
        result = pump.drive(upstream.as_ref(), job.request.clone()) => result,
        _ = tx.closed() => Err(Stop::ClientGone),
    };

    let failed_in = pump.phase;
    let skipped = pump.skips;
    let mut outcome = RelayOutcome {
        phase: RelayPhase::Failed,
        content: std::mem::take(&mut pump.content),
        skipped,
        client_gone: false,
    };

    match result {
        Ok(()) => {
            outcome.phase = RelayPhase::Completed;
            let _ = tx.send(job.framing.trailer(&job.trailer)).await;
            RELAY_COMPLETED.inc();
            info!(
                feature = %job.label,
                chars = outcome.content.chars().count(),
                skipped,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Relay completed"
            );
        }
        Err(Stop::Upstream(err)) => {
            let _ = tx.send(job.framing.diagnostic(&err)).await;
            RELAY_FAILED.inc();
            warn!(
                feature = %job.label,
                phase = ?failed_in,
                error = %err,
                "Relay failed"
            );
        }
        Err(Stop::ClientGone) => {
            outcome.client_gone = true;
            RELAY_FAILED.inc();
            info!(
                feature = %job.label,
                phase = ?failed_in,
                "Client disconnected, upstream dropped"
            );
        }
    }

    if skipped > SKIP_WARN_LIMIT {
        warn!(feature = %job.label, skipped, "Malformed upstream frames skipped");
    }

    STREAM_LATENCY.observe(started.elapsed().as_secs_f64());
    ACTIVE_STREAMS.dec();
    on_finish(&outcome);
}

// Per-invocation state while frames are flowing
struct Pump<'a> {
    label: &'a str,
    framing: Framing,
    tx: &'a mpsc::Sender<Bytes>,
    phase: RelayPhase,
    content: String,
    skips: u64,
}

impl Pump<'_> {
    async fn drive(&mut self, upstream: &dyn Upstream, request: UpstreamRequest) -> Result<(), Stop> {
        self.phase = RelayPhase::UpstreamConnecting;
        let mut body = upstream.open(request).await.map_err(Stop::Upstream)?;

        self.phase = RelayPhase::Streaming;
        debug!(feature = %self.label, "Upstream stream open");

        let mut decoder = FrameDecoder::new();
        while let Some(chunk) = body.next().await {
            decoder.push(&chunk.map_err(Stop::Upstream)?);
            if self.forward(&mut decoder).await? == Flow::Done {
                return Ok(());
            }
        }

        // upstream closed without the sentinel
        decoder.finish();
        self.forward(&mut decoder).await?;
        Ok(())
    }

    async fn forward(&mut self, decoder: &mut FrameDecoder) -> Result<Flow, Stop> {
        while let Some(frame) = decoder.next_frame() {
            match frame {
                Frame::Content(text) => {
                    self.tx
                        .send(self.framing.fragment(&text))
                        .await
                        .map_err(|_| Stop::ClientGone)?;
                    self.content.push_str(&text);
                }
                Frame::Done => return Ok(Flow::Done),
                Frame::Ignored => {}
                Frame::Malformed(reason) => self.skip(&reason),
            }
        }
        Ok(Flow::More)
    }

    fn skip(&mut self, reason: &str) {
        self.skips += 1;
        SKIPPED_FRAMES.inc();
        if self.skips <= SKIP_WARN_LIMIT {
            warn!(feature = %self.label, reason, "Skipping malformed upstream frame");
        }
    }
}
