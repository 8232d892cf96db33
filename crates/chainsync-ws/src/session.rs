//! Pipelined chain-sync session over one WebSocket.
//!
//! A session owns two tasks. The writer sends the find-intersection request
//! and then one next-block request per credit; the reader hands every data
//! frame to the consumer and refills one credit per answered request. With
//! the credit queue preloaded with `pipeline` credits, exactly that many
//! next-block requests are in flight at any time.
//!
//! ```text
//!            credits (mpsc, N)            frames (mpsc)
//!  writer <-------------------- reader ------------------> next_frame()
//!    |  <-- pongs (mpsc) -------  |  ---> tip slot (watch)
//!    v                            ^
//!   sink  ====== WebSocket ====== stream
//! ```
//!
//! A task that fails records its error in the session's failure slot and
//! cancels the session; the consumer gets that error once, from whichever
//! of `next_frame` or `close` runs first.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::{JoinError, JoinHandle};
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use chainsync_core::error::TransportError;
use chainsync_core::point::Tip;
use chainsync_core::request;
use chainsync_core::response::Response;
use chainsync_core::transport::FrameSource;

use crate::cancel::CancelToken;
use crate::config::SessionConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type TaskResult = Result<(), TransportError>;
type FailureSlot = Arc<Mutex<Option<TransportError>>>;

/// Pings waiting for a pong; extra pings beyond this are dropped.
const PONG_QUEUE: usize = 4;
/// Upper bound on the closing handshake once cancelled.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// A running chain-sync session.
///
/// Dropping a session cancels it; call [`Session::close`] to also wait for
/// its tasks.
pub struct Session {
    url: String,
    frames: Mutex<mpsc::Receiver<Bytes>>,
    tip: watch::Receiver<Option<Tip>>,
    cancel: CancelToken,
    failure: FailureSlot,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl Session {
    /// Connect to `config.endpoint` and start streaming.
    pub async fn connect(config: SessionConfig) -> Result<Self, TransportError> {
        Self::connect_with_cancel(config, &CancelToken::new()).await
    }

    /// Like [`Session::connect`]; the session is also cancelled with `parent`.
    pub async fn connect_with_cancel(
        config: SessionConfig,
        parent: &CancelToken,
    ) -> Result<Self, TransportError> {
        config.validate()?;
        let init = request::encode_find_intersection(config.shape, &config.service_name, &config.points)?;
        let next = request::encode_next_block(config.shape, &config.service_name)?;

        info!(url = %config.endpoint, pipeline = config.pipeline, shape = ?config.shape, "connecting chain-sync session");
        let (ws, _) = tokio_tungstenite::connect_async(config.endpoint.as_str())
            .await
            .map_err(|e| TransportError::Connection {
                url: config.endpoint.clone(),
                reason: e.to_string(),
            })?;
        let (sink, stream) = ws.split();

        let (credit_tx, credit_rx) = mpsc::channel(config.pipeline);
        for _ in 0..config.pipeline {
            let _ = credit_tx.try_send(());
        }
        let (frame_tx, frame_rx) = mpsc::channel(config.frame_capacity);
        let (pong_tx, pong_rx) = mpsc::channel(PONG_QUEUE);
        let (tip_tx, tip_rx) = watch::channel(None);
        let cancel = parent.child();
        let failure = FailureSlot::default();

        let writer = tokio::spawn(supervise(
            "writer",
            cancel.clone(),
            failure.clone(),
            write_loop(sink, init, next, credit_rx, pong_rx, cancel.clone()),
        ));
        let reader = tokio::spawn({
            let run =
                read_loop(stream, credit_tx, frame_tx.clone(), pong_tx, tip_tx, cancel.clone());
            let supervised = supervise("reader", cancel.clone(), failure.clone(), run);
            async move {
                supervised.await;
                // The frame queue closes only after a failure is on record,
                // so the consumer never mistakes it for a clean end.
                drop(frame_tx);
            }
        });

        Ok(Self {
            url: config.endpoint,
            frames: Mutex::new(frame_rx),
            tip: tip_rx,
            cancel,
            failure,
            tasks: Mutex::new(Some((writer, reader))),
        })
    }

    /// The next frame in receive order.
    ///
    /// Returns `Ok(None)` once the server ended the stream cleanly and every
    /// buffered frame was read. Once the session is cancelled it returns the
    /// fatal error that ended it, if one is still unreported, and
    /// [`TransportError::Cancelled`] otherwise, even if frames are still
    /// buffered.
    pub async fn next_frame(&self) -> Result<Option<Bytes>, TransportError> {
        if self.cancel.is_cancelled() {
            return Err(self.ended().await);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(self.ended().await),
            frame = async { self.frames.lock().await.recv().await } => Ok(frame),
        }
    }

    /// Why a cancelled session stopped: the unreported failure, or plain
    /// cancellation.
    async fn ended(&self) -> TransportError {
        self.failure.lock().await.take().unwrap_or(TransportError::Cancelled)
    }

    /// Watch the remote tip. Updates coalesce: a slow watcher only sees the
    /// latest tip.
    pub fn tip_changed(&self) -> watch::Receiver<Option<Tip>> {
        self.tip.clone()
    }

    /// The latest tip seen, if any.
    pub fn tip(&self) -> Option<Tip> {
        self.tip.borrow().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the session and wait for both tasks.
    ///
    /// Returns the first fatal error unless `next_frame` already reported it;
    /// later calls return `Ok(())`.
    pub async fn close(&self) -> Result<(), TransportError> {
        self.cancel.cancel();
        if let Some((writer, reader)) = self.tasks.lock().await.take() {
            let (writer, reader) = tokio::join!(writer, reader);
            joined(reader).and(joined(writer))?;
            info!(url = %self.url, "chain-sync session closed");
        }
        match self.failure.lock().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl FrameSource for Session {
    async fn next_frame(&self) -> Result<Option<Bytes>, TransportError> {
        Session::next_frame(self).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        Session::close(self).await
    }

    fn url(&self) -> &str {
        &self.url
    }
}

fn joined(res: Result<(), JoinError>) -> TaskResult {
    res.map_err(|e| TransportError::Other(format!("session task ended abnormally: {e}")))
}

fn ws_err(e: WsError) -> TransportError {
    TransportError::WebSocket(e.to_string())
}

/// Errors that only mean the peer already finished the closing handshake.
fn is_closed(e: &WsError) -> bool {
    matches!(
        e,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::SendAfterClosing)
    )
}

/// Send one message; `Ok(false)` when the connection is already closed or
/// the session is cancelled while the send is stuck on a full socket.
async fn send(
    sink: &mut WsSink,
    msg: Message,
    cancel: &CancelToken,
) -> Result<bool, TransportError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(false),
        sent = sink.send(msg) => match sent {
            Ok(()) => Ok(true),
            Err(e) if is_closed(&e) => Ok(false),
            Err(e) => Err(ws_err(e)),
        },
    }
}

/// Run one session task. A failure is recorded, first one wins, and then
/// cancels the whole session.
async fn supervise(
    task: &'static str,
    cancel: CancelToken,
    failure: FailureSlot,
    fut: impl Future<Output = TaskResult>,
) {
    if let Err(e) = fut.await {
        warn!(task, error = %e, "chain-sync task failed");
        let mut slot = failure.lock().await;
        if slot.is_none() {
            *slot = Some(e);
        }
        drop(slot);
        cancel.cancel();
    }
}

async fn write_loop(
    mut sink: WsSink,
    init: String,
    next: String,
    mut credits: mpsc::Receiver<()>,
    mut pongs: mpsc::Receiver<Vec<u8>>,
    cancel: CancelToken,
) -> TaskResult {
    if !send(&mut sink, Message::Text(init.into()), &cancel).await? {
        return Ok(());
    }
    debug!("sent find-intersection request");

    let mut pongs_open = true;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("writer closing socket");
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await;
                return Ok(());
            }
            pong = pongs.recv(), if pongs_open => match pong {
                Some(payload) => {
                    if !send(&mut sink, Message::Pong(payload), &cancel).await? {
                        return Ok(());
                    }
                }
                None => pongs_open = false,
            },
            credit = credits.recv() => match credit {
                Some(()) => {
                    if !send(&mut sink, Message::Text(next.clone().into()), &cancel).await? {
                        return Ok(());
                    }
                    debug!("sent next-block request");
                }
                // The reader is gone; nothing more will be answered.
                None => {
                    let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await;
                    return Ok(());
                }
            },
        }
    }
}

async fn read_loop(
    mut stream: WsSource,
    credits: mpsc::Sender<()>,
    frames: mpsc::Sender<Bytes>,
    pongs: mpsc::Sender<Vec<u8>>,
    tip: watch::Sender<Option<Tip>>,
    cancel: CancelToken,
) -> TaskResult {
    // The first data frame answers find-intersection, which took no credit.
    let mut intersection_answered = false;

    loop {
        let msg = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            msg = stream.next() => msg,
        };

        let frame = match msg {
            None => {
                debug!("stream ended");
                return Ok(());
            }
            Some(Ok(Message::Close(close))) => {
                debug!(?close, "server closed the stream");
                return Ok(());
            }
            Some(Err(e)) if is_closed(&e) => return Ok(()),
            Some(Err(e)) => return Err(ws_err(e)),
            Some(Ok(Message::Ping(payload))) => {
                let _ = pongs.try_send(payload);
                continue;
            }
            Some(Ok(Message::Pong(_) | Message::Frame(_))) => continue,
            Some(Ok(Message::Text(text))) => Bytes::from(text),
            Some(Ok(Message::Binary(data))) => Bytes::from(data),
        };

        if intersection_answered {
            let _ = credits.try_send(());
        } else {
            intersection_answered = true;
        }

        if let Some(latest) = Response::peek_tip(&frame) {
            tip.send_if_modified(|current| {
                if current.as_ref() == Some(&latest) {
                    return false;
                }
                *current = Some(latest);
                true
            });
        }

        debug!(bytes = frame.len(), "frame received");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            sent = frames.send(frame) => {
                // Consumer dropped the session.
                if sent.is_err() {
                    return Ok(());
                }
            }
        }
    }
}
