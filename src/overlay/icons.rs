//! Icon keys and icon loading
//!
//! Icons live in a directory as `<key>.png`. They are loaded fresh on every
//! display, fitted to the current bound and resampled with Lanczos3.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::FilterType;

use super::layout::fit_within;
use super::OverlayError;

/// Every image the overlay knows how to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconKey {
    CapsLockOn,
    CapsLockOff,
    NumLockOn,
    NumLockOff,
    ScrollLockOn,
    ScrollLockOff,
    OverlayOn,
    OverlayOff,
}

impl IconKey {
    pub const ALL: [IconKey; 8] = [
        IconKey::CapsLockOn,
        IconKey::CapsLockOff,
        IconKey::NumLockOn,
        IconKey::NumLockOff,
        IconKey::ScrollLockOn,
        IconKey::ScrollLockOff,
        IconKey::OverlayOn,
        IconKey::OverlayOff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IconKey::CapsLockOn => "capslock_on",
            IconKey::CapsLockOff => "capslock_off",
            IconKey::NumLockOn => "numlock_on",
            IconKey::NumLockOff => "numlock_off",
            IconKey::ScrollLockOn => "scrolllock_on",
            IconKey::ScrollLockOff => "scrolllock_off",
            IconKey::OverlayOn => "overlay_on",
            IconKey::OverlayOff => "overlay_off",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.png", self.as_str())
    }
}

impl std::fmt::Display for IconKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An icon resampled to its on-screen size, encoded as PNG.
///
/// `png` is empty when the fitted size is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledIcon {
    pub key: IconKey,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl ScaledIcon {
    /// `data:` URL suitable for an `<img src>`.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Resolves icon keys to images fitted within a square bound.
pub trait IconStore: Send + Sync {
    fn load_scaled(&self, key: IconKey, bound: u32) -> Result<ScaledIcon, OverlayError>;
}

/// Loads `<dir>/<key>.png` from disk.
#[derive(Debug, Clone)]
pub struct DirIconStore {
    dir: PathBuf,
}

impl DirIconStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: IconKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Keys whose image file does not exist.
    pub fn missing(&self) -> Vec<IconKey> {
        IconKey::ALL
            .into_iter()
            .filter(|key| !self.path_for(*key).is_file())
            .collect()
    }
}

impl IconStore for DirIconStore {
    fn load_scaled(&self, key: IconKey, bound: u32) -> Result<ScaledIcon, OverlayError> {
        let path = self.path_for(key);
        let img = image::open(&path).map_err(|e| OverlayError::AssetMissing {
            key,
            reason: format!("{}: {}", path.display(), e),
        })?;

        let (width, height) = fit_within(img.width(), img.height(), bound);
        if width == 0 || height == 0 {
            return Ok(ScaledIcon {
                key,
                width,
                height,
                png: Vec::new(),
            });
        }

        let scaled = img.resize_exact(width, height, FilterType::Lanczos3);
        let mut png = Vec::new();
        scaled
            .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
            .map_err(|e| OverlayError::AssetMissing {
                key,
                reason: format!("re-encode {}: {}", path.display(), e),
            })?;

        Ok(ScaledIcon {
            key,
            width,
            height,
            png,
        })
    }
}

/// In-memory store of natural icon sizes, no pixel data.
#[derive(Debug, Clone, Default)]
pub struct StaticIconStore {
    sizes: HashMap<IconKey, (u32, u32)>,
}

impl StaticIconStore {
    /// Every key present at the same natural size.
    pub fn uniform(width: u32, height: u32) -> Self {
        Self {
            sizes: IconKey::ALL
                .into_iter()
                .map(|key| (key, (width, height)))
                .collect(),
        }
    }

    pub fn with(mut self, key: IconKey, width: u32, height: u32) -> Self {
        self.sizes.insert(key, (width, height));
        self
    }

    pub fn without(mut self, key: IconKey) -> Self {
        self.sizes.remove(&key);
        self
    }
}

impl IconStore for StaticIconStore {
    fn load_scaled(&self, key: IconKey, bound: u32) -> Result<ScaledIcon, OverlayError> {
        let (w, h) = self
            .sizes
            .get(&key)
            .copied()
            .ok_or_else(|| OverlayError::AssetMissing {
                key,
                reason: "not registered".to_string(),
            })?;
        let (width, height) = fit_within(w, h, bound);
        Ok(ScaledIcon {
            key,
            width,
            height,
            png: Vec::new(),
        })
    }
}
