//! On-screen overlay: icon loading, layout and the display/fade controller

mod controller;
pub mod dispatch;
mod icons;
pub mod layout;
mod scope;
mod surface;

pub use controller::{
    DisplayOutcome, DisplayRequest, DisplayTicket, FadeOutcome, OverlayController, OverlayTiming,
    FADE_STEPS, FADE_STEP_PERCENT,
};
pub use dispatch::{DispatchError, DisplayDispatcher};
pub use icons::{DirIconStore, IconKey, IconStore, ScaledIcon, StaticIconStore};
pub use layout::{FixedScreen, ScreenGeometry, ScreenSize};
pub use scope::{CancelScope, ScopeGuard};
pub use surface::{OverlaySurface, RecordingSurface, SurfaceOp, SurfaceSnapshot};

/// Errors that can occur while displaying an icon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// The icon for `key` could not be loaded
    AssetMissing { key: IconKey, reason: String },
}

impl std::fmt::Display for OverlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayError::AssetMissing { key, reason } => {
                write!(f, "Icon '{}' could not be loaded: {}", key, reason)
            }
        }
    }
}

impl std::error::Error for OverlayError {}
