//! KeyDisplay: flashes an overlay icon when Caps, Num or Scroll Lock toggles
//!
//! The interesting part is [`overlay::OverlayController`], which decides which
//! of several overlapping display requests owns the window and how a fade is
//! interrupted by a newer one. Lock polling ([`locks`]) and the tray
//! ([`state_machine`], [`effects`]) feed it requests.
//!
//! The tray application itself lives behind the `tray` feature.

pub mod effects;
pub mod locks;
pub mod overlay;
pub mod settings;
pub mod state_machine;

#[cfg(feature = "tray")]
mod tray;

#[cfg(feature = "tray")]
pub use tray::{run, MonitorGeometry, WebviewSurface};
