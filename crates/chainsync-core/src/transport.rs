//! The `FrameSource` trait: the seam between a streaming session and the
//! code that consumes its frames.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ChainSyncError, TransportError};
use crate::response::Response;

/// A stream of raw chain-sync frames.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so a source can be shared with a
/// task that closes it while another task reads.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// The next frame in receive order.
    ///
    /// Returns `Ok(None)` once the stream ended cleanly.
    async fn next_frame(&self) -> Result<Option<Bytes>, TransportError>;

    /// Stop the source and wait for it to wind down.
    async fn close(&self) -> Result<(), TransportError>;

    /// The endpoint this source reads from.
    fn url(&self) -> &str;

    /// Convenience: read the next frame and decode it.
    async fn next_response(&self) -> Result<Option<Response>, ChainSyncError> {
        match self.next_frame().await? {
            Some(frame) => Ok(Some(Response::decode(&frame)?)),
            None => Ok(None),
        }
    }
}
