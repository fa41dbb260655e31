//! The drawable region the overlay controller drives

use std::sync::Mutex;

use super::icons::{IconKey, ScaledIcon};

/// An always-on-top window that shows a single image.
///
/// Calls are synchronous. Implementations that need a particular thread are
/// responsible for marshalling onto it.
pub trait OverlaySurface: Send + Sync {
    fn set_image(&self, icon: &ScaledIcon);
    fn resize(&self, width: u32, height: u32);
    fn move_to(&self, x: i32, y: i32);
    /// Opacity in percent, 0..=100.
    fn set_opacity(&self, percent: u8);
    fn show(&self);
    fn hide(&self);
}

/// One command issued to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOp {
    SetImage(IconKey),
    Resize(u32, u32),
    Move(i32, i32),
    Opacity(u8),
    Show,
    Hide,
}

/// What a surface looks like after replaying its commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    pub image: Option<IconKey>,
    pub size: (u32, u32),
    pub position: (i32, i32),
    pub opacity: u8,
    pub visible: bool,
}

impl Default for SurfaceSnapshot {
    fn default() -> Self {
        Self {
            image: None,
            size: (0, 0),
            position: (0, 0),
            opacity: 100,
            visible: false,
        }
    }
}

/// Surface that only records the commands it receives.
///
/// Used by tests and by headless runs.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Mutex<Vec<SurfaceOp>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, op: SurfaceOp) {
        log::trace!("surface: {:?}", op);
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op);
        }
    }

    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    /// Every opacity value written, in order.
    pub fn opacities(&self) -> Vec<u8> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                SurfaceOp::Opacity(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, op: SurfaceOp) -> usize {
        self.ops().into_iter().filter(|o| *o == op).count()
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.ops()
            .into_iter()
            .fold(SurfaceSnapshot::default(), |mut s, op| {
                match op {
                    SurfaceOp::SetImage(key) => s.image = Some(key),
                    SurfaceOp::Resize(w, h) => s.size = (w, h),
                    SurfaceOp::Move(x, y) => s.position = (x, y),
                    SurfaceOp::Opacity(p) => s.opacity = p,
                    SurfaceOp::Show => s.visible = true,
                    SurfaceOp::Hide => s.visible = false,
                }
                s
            })
    }
}

impl OverlaySurface for RecordingSurface {
    fn set_image(&self, icon: &ScaledIcon) {
        self.push(SurfaceOp::SetImage(icon.key));
    }

    fn resize(&self, width: u32, height: u32) {
        self.push(SurfaceOp::Resize(width, height));
    }

    fn move_to(&self, x: i32, y: i32) {
        self.push(SurfaceOp::Move(x, y));
    }

    fn set_opacity(&self, percent: u8) {
        self.push(SurfaceOp::Opacity(percent.min(100)));
    }

    fn show(&self) {
        self.push(SurfaceOp::Show);
    }

    fn hide(&self) {
        self.push(SurfaceOp::Hide);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_replays_commands() {
        let surface = RecordingSurface::new();
        surface.set_image(&ScaledIcon {
            key: IconKey::CapsLockOn,
            width: 10,
            height: 5,
            png: Vec::new(),
        });
        surface.resize(10, 5);
        surface.move_to(3, 4);
        surface.show();
        surface.set_opacity(40);

        let snap = surface.snapshot();
        assert_eq!(snap.image, Some(IconKey::CapsLockOn));
        assert_eq!(snap.size, (10, 5));
        assert_eq!(snap.position, (3, 4));
        assert_eq!(snap.opacity, 40);
        assert!(snap.visible);

        surface.hide();
        assert!(!surface.snapshot().visible);
    }
}
