use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::task::Context;
use std::task::Poll;

use futures::channel::oneshot;
use futures::FutureExt;
use serde::Deserialize;
use serde::Serialize;
use tracing::trace;
use tracing::warn;

use crate::mount::NodeId;

/// How an attached node finished loading,
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Loaded,
    Failed,
}

/// Resolving side of a completion,
///
/// Resolving consumes the handle so a completion cannot be resolved twice. Dropping the
/// handle w/o resolving it resolves the completion as failed.
///
pub struct CompletionHandle {
    node: NodeId,
    tx: oneshot::Sender<Outcome>,
}

impl CompletionHandle {
    /// Node this handle reports for,
    ///
    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Resolves the completion as loaded,
    ///
    pub fn succeed(self) {
        self.resolve(Outcome::Loaded)
    }

    /// Resolves the completion as failed,
    ///
    pub fn fail(self) {
        self.resolve(Outcome::Failed)
    }

    /// Returns true if the completion was dropped and nothing can observe a resolve,
    ///
    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.tx.is_canceled()
    }

    /// Resolves the completion,
    ///
    pub fn resolve(self, outcome: Outcome) {
        trace!("Resolving {:?} w/ {:?}", self.node, outcome);
        if self.tx.send(outcome).is_err() {
            trace!("Nothing is waiting on {:?}", self.node);
        }
    }
}

/// Future that resolves once w/ the outcome of loading an attached node,
///
pub struct Completion {
    node: NodeId,
    rx: oneshot::Receiver<Outcome>,
}

impl Completion {
    /// Returns a connected handle and completion for node,
    ///
    pub fn pair(node: NodeId) -> (CompletionHandle, Completion) {
        let (tx, rx) = oneshot::channel();
        (CompletionHandle { node, tx }, Completion { node, rx })
    }

    /// Returns a completion that is already resolved,
    ///
    pub fn settled(node: NodeId, outcome: Outcome) -> Completion {
        let (handle, completion) = Self::pair(node);
        handle.resolve(outcome);
        completion
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.rx.poll_unpin(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => {
                trace!("Handle for {:?} was dropped", this.node);
                Poll::Ready(Outcome::Failed)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Registers observers for the load/error events of a node,
///
/// `observe` is called after the node is created and before it is attached, exactly once
/// per node.
///
pub trait CompletionNotifier: Send + Sync {
    /// Returns a completion that resolves when node finishes loading,
    ///
    fn observe(&self, node: NodeId) -> Completion;
}

#[derive(Default)]
struct NotifierState {
    /// Handles waiting to be resolved,
    ///
    pending: BTreeMap<NodeId, CompletionHandle>,
    /// If set, every observed node is resolved immediately,
    ///
    settle: Option<Outcome>,
}

impl NotifierState {
    /// Drops handles whose completion was dropped, e.g. a load that timed out,
    ///
    fn prune(&mut self) {
        self.pending.retain(|node, handle| {
            let canceled = handle.is_canceled();
            if canceled {
                trace!("Dropping observer for {:?}, completion is gone", node);
            }
            !canceled
        });
    }
}

/// In-memory completion notifier,
///
/// By default completions stay pending until resolved w/ `settle` or `settle_all`, which
/// is what a host driving its own event loop would call from its load/error listeners.
///
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    inner: Arc<Mutex<NotifierState>>,
}

impl MemoryNotifier {
    /// Returns a notifier that leaves completions pending,
    ///
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a notifier that resolves every completion immediately w/ outcome,
    ///
    pub fn settling(outcome: Outcome) -> Self {
        let notifier = Self::default();
        notifier.state().settle = Some(outcome);
        notifier
    }

    /// Resolves the completion for node, returns false if nothing was pending,
    ///
    pub fn settle(&self, node: NodeId, outcome: Outcome) -> bool {
        let handle = self.state().pending.remove(&node);

        if let Some(handle) = handle.filter(|h| !h.is_canceled()) {
            handle.resolve(outcome);
            true
        } else {
            false
        }
    }

    /// Resolves every pending completion, returns the count resolved,
    ///
    pub fn settle_all(&self, outcome: Outcome) -> usize {
        let pending = {
            let mut state = self.state();
            state.prune();
            std::mem::take(&mut state.pending)
        };

        let count = pending.len();
        for (_, handle) in pending {
            handle.resolve(outcome);
        }
        count
    }

    /// Returns nodes w/ pending completions,
    ///
    pub fn pending(&self) -> Vec<NodeId> {
        let mut state = self.state();
        state.prune();
        state.pending.keys().copied().collect()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, NotifierState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CompletionNotifier for MemoryNotifier {
    fn observe(&self, node: NodeId) -> Completion {
        let mut state = self.state();

        if let Some(outcome) = state.settle {
            return Completion::settled(node, outcome);
        }

        state.prune();
        let (handle, completion) = Completion::pair(node);
        if state.pending.insert(node, handle).is_some() {
            warn!("Replacing observer for {:?}", node);
        }
        completion
    }
}

#[allow(unused)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completion_resolves_once() {
        let (handle, completion) = Completion::pair(NodeId(1));
        handle.succeed();
        assert_eq!(Outcome::Loaded, completion.await);

        let (handle, completion) = Completion::pair(NodeId(2));
        drop(handle);
        assert_eq!(Outcome::Failed, completion.await);
    }

    #[tokio::test]
    async fn test_memory_notifier() {
        let notifier = MemoryNotifier::new();

        let a = notifier.observe(NodeId(1));
        let b = notifier.observe(NodeId(2));
        assert_eq!(vec![NodeId(1), NodeId(2)], notifier.pending());

        assert!(notifier.settle(NodeId(1), Outcome::Failed));
        assert!(!notifier.settle(NodeId(1), Outcome::Loaded));
        assert_eq!(Outcome::Failed, a.await);

        assert_eq!(1, notifier.settle_all(Outcome::Loaded));
        assert_eq!(Outcome::Loaded, b.await);
        assert!(notifier.pending().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_completions_are_pruned() {
        let notifier = MemoryNotifier::new();

        let a = notifier.observe(NodeId(1));
        let b = notifier.observe(NodeId(2));
        drop(a);
        assert_eq!(vec![NodeId(2)], notifier.pending());
        assert!(!notifier.settle(NodeId(1), Outcome::Loaded));

        // Abandoned observers don't pile up across many loads
        for id in 10..100 {
            drop(notifier.observe(NodeId(id)));
        }
        assert_eq!(vec![NodeId(2)], notifier.pending());

        drop(b);
        assert_eq!(0, notifier.settle_all(Outcome::Loaded));
        assert!(notifier.pending().is_empty());
    }

    #[tokio::test]
    async fn test_settling_notifier() {
        let notifier = MemoryNotifier::settling(Outcome::Loaded);

        let completion = notifier.observe(NodeId(7));
        assert!(notifier.pending().is_empty());
        assert_eq!(NodeId(7), completion.node());
        assert_eq!(Outcome::Loaded, completion.await);
    }
}
