//! Keyboard lock-state polling
//!
//! The core only needs to ask "is this lock on?". On Linux the answer comes
//! from the keyboard LEDs via evdev, which works the same on X11 and Wayland.
//!
//! # Requirements
//! - User must be in the `input` group: `sudo usermod -aG input $USER`
//! - Log out and back in after adding to group

mod differ;
mod evdev_source;
pub mod poller;

pub use differ::LockDiffer;
pub use evdev_source::{find_lock_keyboards, EvdevLockSource};
pub use poller::{run_poller, KeyPoller};

use std::sync::Mutex;

use crate::overlay::IconKey;

/// The three lock keys the overlay reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    CapsLock,
    NumLock,
    ScrollLock,
}

impl LockKey {
    pub const ALL: [LockKey; 3] = [LockKey::CapsLock, LockKey::NumLock, LockKey::ScrollLock];

    /// Icon announcing that this lock is now `on`/off.
    pub fn icon(&self, on: bool) -> IconKey {
        match (self, on) {
            (LockKey::CapsLock, true) => IconKey::CapsLockOn,
            (LockKey::CapsLock, false) => IconKey::CapsLockOff,
            (LockKey::NumLock, true) => IconKey::NumLockOn,
            (LockKey::NumLock, false) => IconKey::NumLockOff,
            (LockKey::ScrollLock, true) => IconKey::ScrollLockOn,
            (LockKey::ScrollLock, false) => IconKey::ScrollLockOff,
        }
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockKey::CapsLock => write!(f, "Caps Lock"),
            LockKey::NumLock => write!(f, "Num Lock"),
            LockKey::ScrollLock => write!(f, "Scroll Lock"),
        }
    }
}

/// A snapshot of all three locks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockStates {
    pub caps: bool,
    pub num: bool,
    pub scroll: bool,
}

impl LockStates {
    pub fn new(caps: bool, num: bool, scroll: bool) -> Self {
        Self { caps, num, scroll }
    }

    pub fn get(&self, lock: LockKey) -> bool {
        match lock {
            LockKey::CapsLock => self.caps,
            LockKey::NumLock => self.num,
            LockKey::ScrollLock => self.scroll,
        }
    }

    pub fn set(&mut self, lock: LockKey, on: bool) {
        match lock {
            LockKey::CapsLock => self.caps = on,
            LockKey::NumLock => self.num = on,
            LockKey::ScrollLock => self.scroll = on,
        }
    }

    /// Query every lock from `source`.
    pub fn sample(source: &dyn KeyStateSource) -> Self {
        Self {
            caps: source.is_lock_on(LockKey::CapsLock),
            num: source.is_lock_on(LockKey::NumLock),
            scroll: source.is_lock_on(LockKey::ScrollLock),
        }
    }
}

/// Anything that can report whether a lock key is currently on.
pub trait KeyStateSource: Send + Sync {
    fn is_lock_on(&self, lock: LockKey) -> bool;
}

/// Source whose state is set by hand. Used by tests and headless runs.
#[derive(Debug, Default)]
pub struct FixedLockSource {
    states: Mutex<LockStates>,
}

impl FixedLockSource {
    pub fn new(states: LockStates) -> Self {
        Self {
            states: Mutex::new(states),
        }
    }

    pub fn set(&self, lock: LockKey, on: bool) {
        if let Ok(mut states) = self.states.lock() {
            states.set(lock, on);
        }
    }

    pub fn set_all(&self, next: LockStates) {
        if let Ok(mut states) = self.states.lock() {
            *states = next;
        }
    }
}

impl KeyStateSource for FixedLockSource {
    fn is_lock_on(&self, lock: LockKey) -> bool {
        self.states
            .lock()
            .map(|states| states.get(lock))
            .unwrap_or(false)
    }
}
