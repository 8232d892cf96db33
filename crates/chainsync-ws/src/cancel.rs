//! Hierarchical cancellation built on `watch` channels.

use std::sync::Arc;

use futures::future::select_all;
use tokio::sync::watch;

struct Node {
    tx: watch::Sender<bool>,
    parent: Option<Arc<Node>>,
}

/// A cancellation signal shared by clones.
///
/// A token created with [`CancelToken::child`] is cancelled when it, or any
/// of its ancestors, is cancelled. Cancelling a child never affects its
/// parent.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Node>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<Arc<Node>>) -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Node { tx, parent }),
        }
    }

    /// A new token cancelled together with `self`.
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.inner.clone()))
    }

    pub fn cancel(&self) {
        self.inner.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.lineage().any(|node| *node.tx.borrow())
    }

    /// Resolves once this token or an ancestor is cancelled.
    pub async fn cancelled(&self) {
        let waits = self.lineage().map(|node| {
            let mut rx = node.tx.subscribe();
            Box::pin(async move {
                // The sender lives as long as `self` is borrowed.
                let _ = rx.wait_for(|cancelled| *cancelled).await;
            })
        });
        select_all(waits).await;
    }

    fn lineage(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(Some(self.inner.as_ref()), |node| node.parent.as_deref())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
