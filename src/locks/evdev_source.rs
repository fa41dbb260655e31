//! Lock state from keyboard LEDs via evdev

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use evdev::{Device, LedType};

use super::{KeyStateSource, LockKey, LockStates};

fn led_for(lock: LockKey) -> LedType {
    match lock {
        LockKey::CapsLock => LedType::LED_CAPSL,
        LockKey::NumLock => LedType::LED_NUML,
        LockKey::ScrollLock => LedType::LED_SCROLLL,
    }
}

/// Find keyboards that expose lock LEDs
pub fn find_lock_keyboards() -> Vec<(PathBuf, Device)> {
    evdev::enumerate()
        .filter_map(|(path, device)| {
            let has_lock_leds = device.supported_leds().map_or(false, |leds| {
                leds.contains(LedType::LED_CAPSL) && leds.contains(LedType::LED_NUML)
            });

            if has_lock_leds {
                let name = device.name().unwrap_or("Unknown");
                log::info!("Found keyboard with lock LEDs: {:?} ({})", path, name);
                Some((path, device))
            } else {
                None
            }
        })
        .collect()
}

/// Reads lock state from one keyboard's LED bits.
///
/// The kernel keeps LED state in sync across keyboards, so one device is
/// enough. Read failures fall back to the last known value so a flaky device
/// does not produce phantom toggles.
pub struct EvdevLockSource {
    path: PathBuf,
    device: Mutex<Device>,
    last: Mutex<LockStates>,
    failing: AtomicBool,
}

impl EvdevLockSource {
    /// Open the first keyboard that has lock LEDs.
    pub fn open() -> Result<Self, String> {
        let mut keyboards = find_lock_keyboards();
        if keyboards.is_empty() {
            let all_devices = evdev::enumerate().count();
            if all_devices == 0 {
                return Err("No input devices found. Ensure you are in the 'input' group:\n\
                     sudo usermod -aG input $USER\n\
                     Then log out and back in."
                    .to_string());
            }
            return Err(format!(
                "Found {} input devices but none expose Caps/Num Lock LEDs. \
                 This might be a permissions issue or no keyboard is connected.",
                all_devices
            ));
        }

        let (path, device) = keyboards.remove(0);
        Ok(Self::from_device(path, device))
    }

    pub fn from_device(path: PathBuf, device: Device) -> Self {
        Self {
            path,
            device: Mutex::new(device),
            last: Mutex::new(LockStates::default()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStateSource for EvdevLockSource {
    fn is_lock_on(&self, lock: LockKey) -> bool {
        let read = match self.device.lock() {
            Ok(device) => device.get_led_state().map_err(|e| e.to_string()),
            Err(_) => Err("device mutex poisoned".to_string()),
        };

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match read {
            Ok(leds) => {
                if self.failing.swap(false, Ordering::Relaxed) {
                    log::info!("LED state readable again on {:?}", self.path);
                }
                let on = leds.contains(led_for(lock));
                last.set(lock, on);
                on
            }
            Err(e) => {
                // Polled every few ms; only report the first failure in a run
                if !self.failing.swap(true, Ordering::Relaxed) {
                    log::warn!("Failed to read LED state from {:?}: {}", self.path, e);
                }
                last.get(lock)
            }
        }
    }
}
