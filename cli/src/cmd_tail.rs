//! `chainsync tail`: follow an endpoint and print every response.
//!
//! Sessions never reconnect by themselves. On a retryable failure this
//! command opens a new session from the last point it printed, waiting
//! longer before each attempt.

use std::time::Duration;

use anyhow::{Context, Result};
use chainsync_core::{
    ChainSyncError, ChainSyncResult, FrameSource, Point, Response, TransportError, WireShape,
};
use chainsync_ws::{CancelToken, Session, SessionConfig};
use tracing::{info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct TailArgs {
    pub url: String,
    pub pipeline: usize,
    pub count: Option<u64>,
    pub legacy: bool,
    pub points: Option<String>,
    pub retries: u32,
    pub json: bool,
}

/// Progress carried across reconnects.
#[derive(Debug, Default)]
struct Progress {
    printed: u64,
    last_point: Option<Point>,
}

impl Progress {
    fn done(&self, count: Option<u64>) -> bool {
        count.is_some_and(|limit| self.printed >= limit)
    }

    fn record(&mut self, response: &Response) {
        self.printed += 1;
        if let ChainSyncResult::NextBlock(next) = &response.result {
            self.last_point = Some(next.point());
        }
    }

    /// Where the next session should intersect.
    fn resume_points(&self, initial: &[Point]) -> Vec<Point> {
        match &self.last_point {
            Some(point) => vec![point.clone()],
            None => initial.to_vec(),
        }
    }
}

pub async fn run(args: TailArgs) -> Result<()> {
    let initial = parse_points(args.points.as_deref())?;
    let shape = if args.legacy { WireShape::Legacy } else { WireShape::Current };

    let root = CancelToken::new();
    {
        let root = root.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted");
                root.cancel();
            }
        });
    }

    let mut progress = Progress::default();
    let mut attempt = 0u32;
    loop {
        let config = SessionConfig::new(&args.url)
            .with_pipeline(args.pipeline)
            .with_shape(shape)
            .with_points(progress.resume_points(&initial));

        match follow(config, &root, &args, &mut progress).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_cancelled() => return Ok(()),
            Err(e) if e.is_retryable() && attempt < args.retries => {
                let delay = backoff(attempt);
                attempt += 1;
                warn!(error = %e, attempt, retries = args.retries, delay_ms = delay.as_millis() as u64, "session failed, reconnecting");
                tokio::select! {
                    _ = root.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => return Err(e).context("chain-sync session failed"),
        }
    }
}

/// Run one session until the count is reached, the server ends the stream,
/// or the session fails.
async fn follow(
    config: SessionConfig,
    root: &CancelToken,
    args: &TailArgs,
    progress: &mut Progress,
) -> Result<(), TransportError> {
    let session = Session::connect_with_cancel(config, root).await?;

    let outcome = loop {
        if progress.done(args.count) {
            break Ok(());
        }
        match session.next_response().await {
            Ok(Some(response)) => {
                print_response(&response, args.json);
                progress.record(&response);
            }
            Ok(None) => {
                info!(url = %session.url(), "server ended the stream");
                break Ok(());
            }
            Err(ChainSyncError::Decode(e)) => warn!(error = %e, "skipping undecodable frame"),
            Err(ChainSyncError::Transport(e)) => break Err(e),
        }
    };

    // A task failure already ended the loop; `close` only adds one that
    // struck after it.
    let closed = session.close().await;
    outcome.and(closed)
}

fn print_response(response: &Response, as_json: bool) {
    if as_json {
        match serde_json::to_string(response) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "cannot render response"),
        }
        return;
    }
    match &response.result {
        ChainSyncResult::FindIntersection(result) => println!("{result}"),
        ChainSyncResult::NextBlock(next) => println!("{next}"),
    }
}

fn parse_points(raw: Option<&str>) -> Result<Vec<Point>> {
    match raw {
        None => Ok(vec![]),
        Some(raw) => serde_json::from_str(raw).context("--points must be a JSON array of points"),
    }
}

/// Doubles per attempt from `INITIAL_BACKOFF`, capped at `MAX_BACKOFF`.
fn backoff(attempt: u32) -> Duration {
    INITIAL_BACKOFF
        .checked_mul(1u32 << attempt.min(16))
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}
