//! chainsync-ws: pipelined chain-sync session over WebSocket.
//!
//! A [`Session`] keeps a fixed number of next-block requests in flight and
//! hands raw frames to the consumer in receive order. Decode them with
//! [`chainsync_core::Response::decode`], or use the
//! [`FrameSource::next_response`](chainsync_core::FrameSource::next_response)
//! convenience.
//!
//! # Example
//!
//! ```no_run
//! use chainsync_ws::{Session, SessionConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::connect(SessionConfig::new("ws://localhost:1337").with_pipeline(50)).await?;
//! while let Some(frame) = session.next_frame().await? {
//!     let response = chainsync_core::Response::decode(&frame)?;
//!     println!("{:?}", response.tip());
//! }
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod session;

pub use cancel::CancelToken;
pub use chainsync_core::request::WireShape;
pub use config::SessionConfig;
pub use session::Session;
