//! Control state machine for KeyDisplay
//!
//! Tray events are folded through `reduce()`, which returns the next state
//! and the effects to run. The reducer never touches the overlay or the
//! poller itself; the effect runner does.

use std::time::Duration;

use crate::overlay::IconKey;

/// Whether lock polling and the overlay are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub active: bool,
}

/// Events from the control surface (tray menu) and app lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// App launched with overlay enabled
    Startup,
    /// User toggled the overlay on/off
    Toggle,
    /// User asked to quit
    Quit,
}

/// Effects to be executed after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEffect {
    Display(IconKey),
    StartPolling,
    StopPolling,
    /// Wait `grace` for the last icon to play out, then exit
    Exit { grace: Duration },
}

/// Reducer function: (state, event) -> (next_state, effects)
///
/// `grace` is how long Quit waits before exiting; callers pass the overlay
/// timeout so the "off" icon gets its full time on screen.
pub fn reduce(
    state: &ControlState,
    event: ControlEvent,
    grace: Duration,
) -> (ControlState, Vec<ControlEffect>) {
    use ControlEffect::*;
    use ControlEvent::*;

    match (state.active, event) {
        (false, Startup) | (false, Toggle) => (
            ControlState { active: true },
            vec![Display(IconKey::OverlayOn), StartPolling],
        ),
        (true, Startup) => (*state, vec![]),
        (true, Toggle) => (
            ControlState { active: false },
            vec![Display(IconKey::OverlayOff), StopPolling],
        ),
        (_, Quit) => (
            *state,
            vec![Display(IconKey::OverlayOff), StopPolling, Exit { grace }],
        ),
    }
}
