//! Key poller - samples lock states on a fixed tick and requests icons

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{KeyStateSource, LockDiffer, LockStates};
use crate::overlay::DisplayDispatcher;

/// Default sampling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Sample `source` every `interval` and request an icon for each lock that
/// changed since the previous sample.
///
/// The stop token is checked once per tick, so stopping can take up to one
/// interval to be observed.
pub async fn run_poller(
    source: Arc<dyn KeyStateSource>,
    dispatcher: DisplayDispatcher,
    stop: CancellationToken,
    interval: Duration,
) {
    let mut differ = LockDiffer::new(LockStates::sample(source.as_ref()));
    log::info!(
        "Lock polling started every {:?}, initial state {:?}",
        interval,
        differ.previous()
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        for key in differ.observe(LockStates::sample(source.as_ref())) {
            log::debug!("Lock state changed: {}", key);
            if let Err(e) = dispatcher.request(key).await {
                log::error!("Failed to request {}: {}", key, e);
                return;
            }
        }

        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }
    }

    log::info!("Lock polling stopped");
}

/// Owns a running poll loop. Stops it when dropped.
pub struct KeyPoller {
    cancel_token: CancellationToken,
}

impl KeyPoller {
    /// Spawn a poll loop on the current runtime.
    pub fn start(
        source: Arc<dyn KeyStateSource>,
        dispatcher: DisplayDispatcher,
        interval: Duration,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        tokio::spawn(run_poller(
            source,
            dispatcher,
            cancel_token.clone(),
            interval,
        ));
        Self { cancel_token }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled()
    }

    pub fn stop(&self) {
        if self.is_running() {
            log::info!("Stopping lock polling");
        }
        self.cancel_token.cancel();
    }
}

impl Drop for KeyPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::{FixedLockSource, LockKey};
    use crate::overlay::IconKey;

    #[tokio::test(start_paused = true)]
    async fn emits_one_request_per_changed_lock() {
        let source = Arc::new(FixedLockSource::default());
        let (dispatcher, mut rx) = DisplayDispatcher::channel();
        let poller = KeyPoller::start(source.clone(), dispatcher, DEFAULT_POLL_INTERVAL);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());

        source.set_all(LockStates::new(true, false, true));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut keys = Vec::new();
        while let Ok(request) = rx.try_recv() {
            keys.push(request.key);
        }
        keys.sort_by_key(|k| k.as_str());
        assert_eq!(keys, vec![IconKey::CapsLockOn, IconKey::ScrollLockOn]);

        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn initial_state_is_not_announced() {
        let source = Arc::new(FixedLockSource::new(LockStates::new(true, true, true)));
        let (dispatcher, mut rx) = DisplayDispatcher::channel();
        let _poller = KeyPoller::start(source, dispatcher, DEFAULT_POLL_INTERVAL);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_observed_within_a_tick() {
        let source = Arc::new(FixedLockSource::default());
        let (dispatcher, mut rx) = DisplayDispatcher::channel();
        let stop = CancellationToken::new();
        let task = tokio::spawn(run_poller(
            source.clone(),
            dispatcher,
            stop.clone(),
            DEFAULT_POLL_INTERVAL,
        ));

        tokio::time::sleep(Duration::from_millis(10)).await;
        stop.cancel();
        tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        assert!(task.is_finished());

        // Changes after stopping go unreported
        source.set(LockKey::CapsLock, true);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_poller_stops_it() {
        let source = Arc::new(FixedLockSource::default());
        let (dispatcher, mut rx) = DisplayDispatcher::channel();
        let poller = KeyPoller::start(source.clone(), dispatcher, DEFAULT_POLL_INTERVAL);
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(poller);
        tokio::time::sleep(Duration::from_millis(10)).await;

        source.set(LockKey::NumLock, true);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }
}
