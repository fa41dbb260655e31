//! Bounded spawner for display requests
//!
//! Producers (the key poller, the control loop) push requests into a bounded
//! channel. A single loop claims them in arrival order, so the newest request
//! always wins, then runs each one as its own task under a permit limit.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use super::controller::{DisplayRequest, OverlayController};
use super::icons::IconKey;

/// Default cap on display tasks alive at once.
pub const DEFAULT_MAX_INFLIGHT: usize = 16;

/// Pending requests buffered before producers start waiting.
const REQUEST_QUEUE: usize = 64;

/// Errors returned when handing a request to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The dispatch loop has stopped.
    Closed,
    /// The queue is full (only from [`DisplayDispatcher::try_request`]).
    Full,
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Closed => write!(f, "Display dispatcher has stopped"),
            DispatchError::Full => write!(f, "Display request queue is full"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Handle for submitting display requests. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DisplayDispatcher {
    tx: mpsc::Sender<DisplayRequest>,
}

impl DisplayDispatcher {
    /// Spawn the dispatch loop. It runs until every handle is dropped.
    pub fn start(controller: Arc<OverlayController>, max_inflight: usize) -> Self {
        let (dispatcher, rx) = Self::channel();
        let permits = Arc::new(Semaphore::new(max_inflight.max(1)));

        log::info!(
            "Starting display dispatcher (max {} in flight)",
            max_inflight.max(1)
        );
        tokio::spawn(run_dispatch_loop(controller, rx, permits));

        dispatcher
    }

    /// A handle plus the raw receiving end, for driving requests yourself.
    pub fn channel() -> (Self, mpsc::Receiver<DisplayRequest>) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
        (Self { tx }, rx)
    }

    /// Queue a request, waiting if the queue is full.
    pub async fn request(&self, key: IconKey) -> Result<(), DispatchError> {
        self.tx
            .send(DisplayRequest::new(key))
            .await
            .map_err(|_| DispatchError::Closed)
    }

    /// Queue a request without waiting. For callers outside the runtime.
    pub fn try_request(&self, key: IconKey) -> Result<(), DispatchError> {
        self.tx
            .try_send(DisplayRequest::new(key))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DispatchError::Full,
                mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
            })
    }
}

async fn run_dispatch_loop(
    controller: Arc<OverlayController>,
    mut rx: mpsc::Receiver<DisplayRequest>,
    permits: Arc<Semaphore>,
) {
    while let Some(request) = rx.recv().await {
        // Claim first so older runs start winding down while we wait for a permit
        let ticket = controller.claim(request);

        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        let controller = controller.clone();
        tokio::spawn(async move {
            let _permit = permit;
            // Errors are already reported by the controller
            if let Ok(outcome) = controller.run(ticket).await {
                log::debug!("Display {} finished: {:?}", request.key, outcome);
            }
        });
    }

    log::info!("Display dispatcher stopped");
}
