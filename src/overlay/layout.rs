//! Overlay sizing and placement relative to the primary screen

/// Pixel dimensions of the primary screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Source of the primary screen dimensions.
///
/// Queried on every display so resolution changes between requests are
/// picked up. `None` means the size could not be determined.
pub trait ScreenGeometry: Send + Sync {
    fn primary_screen_size(&self) -> Option<ScreenSize>;
}

/// Fixed-size screen, used when no windowing backend is available.
#[derive(Debug, Clone, Copy)]
pub struct FixedScreen(pub ScreenSize);

impl ScreenGeometry for FixedScreen {
    fn primary_screen_size(&self) -> Option<ScreenSize> {
        Some(self.0)
    }
}

/// Largest edge an icon may have: a tenth of the screen width.
pub fn bounding_box(screen: ScreenSize) -> u32 {
    screen.width / 10
}

/// Margin from the top and right screen edges.
pub fn padding(screen: ScreenSize) -> u32 {
    screen.height / 24
}

/// Scale `width` x `height` to fit inside a `bound` x `bound` box, keeping the
/// aspect ratio. Images may be scaled up as well as down.
pub fn fit_within(width: u32, height: u32, bound: u32) -> (u32, u32) {
    if width == 0 || height == 0 || bound == 0 {
        return (0, 0);
    }

    let (bound, width, height) = (bound as u64, width as u64, height as u64);
    if width >= height {
        let scaled_h = (height * bound / width).max(1);
        (bound as u32, scaled_h as u32)
    } else {
        let scaled_w = (width * bound / height).max(1);
        (scaled_w as u32, bound as u32)
    }
}

/// Top-left position anchoring an image of `image_width` to the top-right
/// corner, inset by [`padding`] on both axes.
///
/// The x coordinate can go negative on degenerate screens.
pub fn placement(screen: ScreenSize, image_width: u32) -> (i32, i32) {
    let pad = padding(screen) as i64;
    let x = screen.width as i64 - image_width as i64 - pad;
    (x as i32, pad as i32)
}
