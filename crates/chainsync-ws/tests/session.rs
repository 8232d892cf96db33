//! End-to-end session tests against an in-process WebSocket server.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use chainsync_core::error::TransportError;
use chainsync_core::point::Tip;
use chainsync_core::response::{Method, Response};
use chainsync_core::FrameSource;
use chainsync_ws::{CancelToken, Session, SessionConfig, WireShape};

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

type ServerWs = WebSocketStream<TcpStream>;

/// Accept one connection on a fresh port and hand it to `handler`.
async fn serve<F, Fut>(handler: F) -> String
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        handler(ws).await;
    });
    format!("ws://{addr}")
}

fn tip() -> Tip {
    Tip::new(100, "aa".repeat(32), 10)
}

fn intersection_reply() -> Message {
    let body = json!({
        "jsonrpc": "2.0",
        "method": "findIntersection",
        "result": {"intersection": "origin", "tip": tip()},
        "id": "findIntersection"
    });
    Message::Text(body.to_string().into())
}

fn backward_reply() -> Message {
    let body = json!({
        "jsonrpc": "2.0",
        "method": "nextBlock",
        "result": {"direction": "backward", "tip": tip(), "point": "origin"},
        "id": "nextBlock"
    });
    Message::Text(body.to_string().into())
}

fn method_of(msg: &Message) -> Option<String> {
    let Message::Text(text) = msg else {
        return None;
    };
    let v: Value = serde_json::from_str(text.as_str()).ok()?;
    v.get("method")
        .or_else(|| v.get("methodname"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Answers find-intersection at once, then drains requests until closed.
async fn answer_intersection_then_idle(mut ws: ServerWs) {
    while let Some(Ok(msg)) = ws.next().await {
        if matches!(method_of(&msg).as_deref(), Some("findIntersection" | "FindIntersect")) {
            let _ = ws.send(intersection_reply()).await;
        }
    }
}

#[tokio::test]
async fn keeps_exactly_pipeline_requests_outstanding() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<usize>();
    let (release_tx, mut release_rx) = mpsc::unbounded_channel::<usize>();

    let url = serve(move |mut ws| async move {
        let mut next_requests = 0usize;
        let mut withheld = 0usize;
        loop {
            tokio::select! {
                msg = ws.next() => {
                    let Some(Ok(msg)) = msg else { return };
                    match method_of(&msg).as_deref() {
                        Some("findIntersection") => {
                            let _ = ws.send(intersection_reply()).await;
                        }
                        Some("nextBlock") => {
                            next_requests += 1;
                            withheld += 1;
                            let _ = seen_tx.send(next_requests);
                        }
                        _ => {}
                    }
                }
                Some(n) = release_rx.recv() => {
                    for _ in 0..n.min(withheld) {
                        let _ = ws.send(backward_reply()).await;
                        withheld -= 1;
                    }
                }
            }
        }
    })
    .await;

    let session = Session::connect(SessionConfig::new(url).with_pipeline(8).with_frame_capacity(16))
        .await
        .unwrap();

    let first = session.next_frame().await.unwrap().unwrap();
    assert_eq!(Response::decode(&first).unwrap().method, Method::FindIntersection);

    async fn wait_for_count(rx: &mut mpsc::UnboundedReceiver<usize>, target: usize) {
        loop {
            let n = timeout(WAIT, rx.recv()).await.expect("request arrived").unwrap();
            if n == target {
                return;
            }
        }
    }

    wait_for_count(&mut seen_rx, 8).await;
    assert!(
        timeout(QUIET, seen_rx.recv()).await.is_err(),
        "no request beyond the pipeline depth while replies are withheld"
    );

    release_tx.send(8).unwrap();
    for _ in 0..8 {
        let frame = timeout(WAIT, session.next_frame()).await.unwrap().unwrap().unwrap();
        assert_eq!(Response::decode(&frame).unwrap().method, Method::NextBlock);
    }

    wait_for_count(&mut seen_rx, 16).await;
    assert!(timeout(QUIET, seen_rx.recv()).await.is_err());

    session.close().await.unwrap();
}

#[tokio::test]
async fn close_unblocks_waiting_consumer() {
    let url = serve(answer_intersection_then_idle).await;
    let session = Arc::new(Session::connect(SessionConfig::new(url).with_pipeline(2)).await.unwrap());
    session.next_frame().await.unwrap().unwrap();

    let consumer = {
        let session = session.clone();
        tokio::spawn(async move { session.next_frame().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    timeout(WAIT, session.close()).await.expect("close returned").unwrap();
    let res = timeout(WAIT, consumer).await.unwrap().unwrap();
    assert!(matches!(res, Err(TransportError::Cancelled)));

    // Errors are reported once; a second close is a no-op.
    session.close().await.unwrap();
    assert!(session.is_cancelled());
}

#[tokio::test]
async fn dropped_connection_reaches_consumer() {
    let url = serve(|mut ws| async move {
        if ws.next().await.is_some() {
            let _ = ws.send(intersection_reply()).await;
        }
        // Give the client time to read the reply, then vanish without a
        // closing handshake.
        tokio::time::sleep(QUIET).await;
        drop(ws);
    })
    .await;

    let session = Session::connect(SessionConfig::new(url).with_pipeline(2)).await.unwrap();
    let err = timeout(WAIT, async {
        loop {
            match session.next_frame().await {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("a dropped connection is not a clean end"),
                Err(e) => break e,
            }
        }
    })
    .await
    .expect("failure surfaced");
    assert!(matches!(err, TransportError::WebSocket(_)), "got {err:?}");
    assert!(err.is_retryable());

    // Reported once: afterwards the session is just cancelled.
    assert!(matches!(session.next_frame().await, Err(TransportError::Cancelled)));
    session.close().await.unwrap();
}

#[tokio::test]
async fn close_reports_failure_nobody_read() {
    let url = serve(|ws| async move {
        tokio::time::sleep(QUIET).await;
        drop(ws);
    })
    .await;

    let session = Session::connect(SessionConfig::new(url).with_pipeline(1)).await.unwrap();
    // Wait for the session to notice, without consuming the failure.
    timeout(WAIT, async {
        while !session.is_cancelled() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session cancelled itself");

    let err = session.close().await.unwrap_err();
    assert!(err.is_retryable(), "got {err:?}");
    session.close().await.unwrap();
}

#[tokio::test]
async fn close_does_not_wait_on_a_stalled_send() {
    // The server never reads, so the client's socket buffers fill up and a
    // send stays pending.
    let url = serve(|ws| async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(ws);
    })
    .await;

    let config = SessionConfig::new(url)
        .with_shape(WireShape::Legacy)
        .with_service_name("x".repeat(1 << 20))
        .with_pipeline(64);
    let session = Session::connect(config).await.unwrap();
    tokio::time::sleep(QUIET).await;

    timeout(WAIT, session.close())
        .await
        .expect("close returned while a send was stuck")
        .unwrap();
}

#[tokio::test]
async fn parent_cancellation_reaches_session() {
    let url = serve(answer_intersection_then_idle).await;
    let parent = CancelToken::new();
    let session = Session::connect_with_cancel(SessionConfig::new(url), &parent).await.unwrap();
    parent.cancel();
    assert!(matches!(session.next_frame().await, Err(TransportError::Cancelled)));
    session.close().await.unwrap();
}

#[tokio::test]
async fn answers_ping_with_pong() {
    let (pong_tx, pong_rx) = oneshot::channel::<Vec<u8>>();
    let url = serve(move |mut ws| async move {
        ws.send(Message::Ping(b"chainsync".to_vec().into())).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Pong(payload) = msg {
                let _ = pong_tx.send(payload.to_vec());
                break;
            }
        }
        while ws.next().await.is_some() {}
    })
    .await;

    let session = Session::connect(SessionConfig::new(url).with_pipeline(1)).await.unwrap();
    let payload = timeout(WAIT, pong_rx).await.expect("pong arrived").unwrap();
    assert_eq!(payload, b"chainsync");
    session.close().await.unwrap();
}

#[tokio::test]
async fn clean_server_close_ends_stream() {
    let url = serve(|mut ws| async move {
        // Take find-intersection and the single pipelined request first, so
        // the client has nothing left to send when the close arrives.
        let mut requests = 0;
        while let Some(Ok(msg)) = ws.next().await {
            if method_of(&msg).is_some() {
                requests += 1;
            }
            if requests == 2 {
                break;
            }
        }
        ws.send(intersection_reply()).await.unwrap();
        let _ = ws.close(None).await;
        while ws.next().await.is_some() {}
    })
    .await;

    let session = Session::connect(SessionConfig::new(url).with_pipeline(1)).await.unwrap();
    let first = timeout(WAIT, session.next_frame()).await.unwrap().unwrap();
    assert!(first.is_some());
    let end = timeout(WAIT, session.next_frame()).await.unwrap().unwrap();
    assert!(end.is_none());
    session.close().await.unwrap();
}

#[tokio::test]
async fn tip_slot_follows_frames() {
    let url = serve(answer_intersection_then_idle).await;
    let session = Session::connect(SessionConfig::new(url)).await.unwrap();
    let mut tips = session.tip_changed();

    let resp = session.next_response().await.unwrap().unwrap();
    assert_eq!(resp.tip(), Some(&tip()));
    assert_eq!(session.tip(), Some(tip()));
    assert!(tips.has_changed().unwrap());
    assert_eq!(*tips.borrow_and_update(), Some(tip()));
    session.close().await.unwrap();
}

#[tokio::test]
async fn legacy_shape_on_the_wire() {
    let (first_tx, first_rx) = oneshot::channel::<Value>();
    let url = serve(move |mut ws| async move {
        if let Some(Ok(Message::Text(text))) = ws.next().await {
            let _ = first_tx.send(serde_json::from_str(text.as_str()).unwrap());
        }
        while ws.next().await.is_some() {}
    })
    .await;

    let config = SessionConfig::new(url).with_shape(WireShape::Legacy).with_pipeline(1);
    let session = Session::connect(config).await.unwrap();
    let first = timeout(WAIT, first_rx).await.unwrap().unwrap();
    assert_eq!(first["methodname"], "FindIntersect");
    assert_eq!(first["servicename"], "ogmios");
    assert_eq!(first["args"]["points"], json!(["origin"]));
    session.close().await.unwrap();
}

#[tokio::test]
async fn connection_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let err = Session::connect(SessionConfig::new(format!("ws://127.0.0.1:{port}")))
        .await
        .err()
        .expect("nothing listens there");
    assert!(matches!(err, TransportError::Connection { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn invalid_config_is_rejected_before_dialing() {
    let err = Session::connect(SessionConfig::new("ws://127.0.0.1:1").with_pipeline(0))
        .await
        .err()
        .expect("zero pipeline");
    assert!(matches!(err, TransportError::Config(_)));
}
