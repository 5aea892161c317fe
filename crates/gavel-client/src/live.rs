//! Single-consumer reconciliation loop.
//!
//! Each live view owns one task reading a bounded inbox. The task applies
//! inputs one at a time and publishes the result over a `watch` channel;
//! readers never block the loop and never see a half-applied input.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::reconcile::{Outcome, Reconcile, ViewInput};

/// How long `close` lets the loop drain before aborting it.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Cloneable write end of a view's inbox.
#[derive(Debug, Clone)]
pub struct ViewHandle {
    inbox: mpsc::Sender<ViewInput>,
}

impl ViewHandle {
    pub async fn submit(&self, input: ViewInput) -> Result<()> {
        self.inbox
            .send(input)
            .await
            .map_err(|_| ClientError::ViewClosed)
    }

    pub fn sender(&self) -> mpsc::Sender<ViewInput> {
        self.inbox.clone()
    }
}

/// A running view: its reconciliation task plus the channels around it.
pub struct LiveView<V> {
    handle: ViewHandle,
    state: watch::Receiver<V>,
    task: JoinHandle<()>,
}

impl<V: Reconcile> LiveView<V> {
    pub fn spawn(initial: V, capacity: usize) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel(capacity.max(1));
        let (state_tx, state_rx) = watch::channel(initial);
        let task = tokio::spawn(reconcile_loop(inbox_rx, state_tx));
        Self {
            handle: ViewHandle { inbox: inbox_tx },
            state: state_rx,
            task,
        }
    }

    pub fn handle(&self) -> ViewHandle {
        self.handle.clone()
    }

    pub async fn submit(&self, input: ViewInput) -> Result<()> {
        self.handle.submit(input).await
    }

    /// Watch the view. Every published value has all inputs up to some
    /// point applied.
    pub fn subscribe(&self) -> watch::Receiver<V> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> watch::Ref<'_, V> {
        self.state.borrow()
    }

    /// Stop the loop once queued inputs are applied. Inputs still held by
    /// other handles after the grace period are dropped.
    pub async fn close(self) {
        let Self {
            handle, mut task, ..
        } = self;
        drop(handle);

        if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
            warn!("Live view still has open handles, aborting reconcile loop");
            task.abort();
            let _ = task.await;
        }
    }
}

async fn reconcile_loop<V: Reconcile>(
    mut inbox: mpsc::Receiver<ViewInput>,
    state: watch::Sender<V>,
) {
    while let Some(input) = inbox.recv().await {
        let kind = input.kind();
        let mut outcome = Outcome::Ignored("not applied");
        state.send_if_modified(|view| {
            outcome = view.apply(input);
            outcome.changed()
        });

        match outcome {
            Outcome::Ignored(reason) => debug!(kind, reason, "Input left view unchanged"),
            applied => debug!(kind, outcome = ?applied, "View updated"),
        }
    }
    debug!("Inbox closed, reconcile loop stopped");
}
