//! Effect runner and control loop for KeyDisplay
//!
//! The control loop consumes tray events one at a time, folds them through
//! the reducer and hands the resulting effects to a [`ControlEffectRunner`].
//! Display effects go through a forwarder task that waits for room on the
//! dispatcher queue, so a full queue delays them but never drops them. Each
//! display still runs as its own task and two quick toggles can overlap; the
//! overlay controller sorts that out.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::locks::{KeyPoller, KeyStateSource};
use crate::overlay::{DisplayDispatcher, IconKey};
use crate::state_machine::{reduce, ControlEffect, ControlEvent, ControlState};

/// Control events buffered before senders start failing.
const CONTROL_QUEUE: usize = 32;

/// Executes control effects other than `Exit`, which the loop owns.
pub trait ControlEffectRunner: Send + Sync {
    fn run(&self, effect: ControlEffect);
}

/// Runner backed by the display dispatcher and a lock poller.
pub struct OverlayEffectRunner {
    dispatcher: DisplayDispatcher,
    displays: mpsc::UnboundedSender<IconKey>,
    source: Arc<dyn KeyStateSource>,
    poll_interval: Duration,
    poller: Mutex<Option<KeyPoller>>,
}

impl OverlayEffectRunner {
    pub fn new(
        dispatcher: DisplayDispatcher,
        source: Arc<dyn KeyStateSource>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        let (displays, rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_displays(dispatcher.clone(), rx));

        Arc::new(Self {
            dispatcher,
            displays,
            source,
            poll_interval,
            poller: Mutex::new(None),
        })
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .map(|slot| slot.as_ref().map_or(false, KeyPoller::is_running))
            .unwrap_or(false)
    }
}

impl ControlEffectRunner for OverlayEffectRunner {
    fn run(&self, effect: ControlEffect) {
        match effect {
            ControlEffect::Display(key) => {
                if self.displays.send(key).is_err() {
                    log::error!("Display forwarder stopped, dropping {}", key);
                }
            }

            ControlEffect::StartPolling => {
                let mut slot = self.poller.lock().unwrap_or_else(|e| e.into_inner());
                if slot.as_ref().map_or(false, KeyPoller::is_running) {
                    log::debug!("Lock polling already running");
                    return;
                }
                *slot = Some(KeyPoller::start(
                    self.source.clone(),
                    self.dispatcher.clone(),
                    self.poll_interval,
                ));
            }

            ControlEffect::StopPolling => {
                let mut slot = self.poller.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(poller) = slot.take() {
                    poller.stop();
                }
            }

            ControlEffect::Exit { .. } => {
                log::debug!("Exit is handled by the control loop");
            }
        }
    }
}

/// Hand control-driven displays to the dispatcher in order, waiting whenever
/// its queue is full.
async fn forward_displays(
    dispatcher: DisplayDispatcher,
    mut rx: mpsc::UnboundedReceiver<IconKey>,
) {
    while let Some(key) = rx.recv().await {
        if let Err(e) = dispatcher.request(key).await {
            log::error!("Failed to request {}: {}", key, e);
            break;
        }
    }
    log::debug!("Display forwarder stopped");
}

/// Sender side of the control loop, for the tray and app lifecycle.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlEvent>,
}

impl ControlHandle {
    pub async fn send(
        &self,
        event: ControlEvent,
    ) -> Result<(), mpsc::error::SendError<ControlEvent>> {
        self.tx.send(event).await
    }

    /// Non-blocking send, for menu callbacks running off the async runtime.
    pub fn try_send(
        &self,
        event: ControlEvent,
    ) -> Result<(), mpsc::error::TrySendError<ControlEvent>> {
        self.tx.try_send(event)
    }
}

/// Create the control event channel.
pub fn control_channel() -> (ControlHandle, mpsc::Receiver<ControlEvent>) {
    let (tx, rx) = mpsc::channel(CONTROL_QUEUE);
    (ControlHandle { tx }, rx)
}

/// Why the control loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Quit was handled and its grace period has elapsed; exit the process.
    Quit,
    /// Every sender was dropped.
    Closed,
}

/// Run the control loop until Quit (after its grace delay) or channel close.
pub async fn run_control_loop(
    mut rx: mpsc::Receiver<ControlEvent>,
    runner: Arc<dyn ControlEffectRunner>,
    grace: Duration,
) -> LoopExit {
    let mut state = ControlState::default();
    log::info!("Control loop started");

    while let Some(event) = rx.recv().await {
        log::debug!("Received control event: {:?}", event);

        let (next, effects) = reduce(&state, event, grace);
        if next != state {
            log::info!("Control state transition: {:?} -> {:?}", state, next);
        }
        state = next;

        let mut exit_after = None;
        for eff in effects {
            match eff {
                ControlEffect::Exit { grace } => exit_after = Some(grace),
                other => runner.run(other),
            }
        }

        if let Some(grace) = exit_after {
            log::info!("Quit requested, exiting in {:?}", grace);
            tokio::time::sleep(grace).await;
            return LoopExit::Quit;
        }
    }

    log::info!("Control loop ended");
    LoopExit::Closed
}
