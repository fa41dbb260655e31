//! Tauri shell: tray menu, overlay webview window and app wiring

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tauri::{
    menu::{Menu, MenuItem},
    tray::TrayIconBuilder,
    App, AppHandle, Emitter, Manager, PhysicalPosition, PhysicalSize, WebviewWindow, WindowEvent,
};

use crate::effects::{
    control_channel, run_control_loop, ControlHandle, LoopExit, OverlayEffectRunner,
};
use crate::locks::{EvdevLockSource, FixedLockSource, KeyStateSource};
use crate::overlay::{
    DirIconStore, DisplayDispatcher, OverlayController, OverlaySurface, ScaledIcon,
    ScreenGeometry, ScreenSize,
};
use crate::settings::{load_settings, OverlaySettings};
use crate::state_machine::ControlEvent;

/// Label of the overlay window in tauri.conf.json
const OVERLAY_LABEL: &str = "overlay";

/// Image update sent to the overlay page
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagePayload {
    key: String,
    data_url: String,
    width: u32,
    height: u32,
}

/// Overlay surface backed by a frameless, transparent webview window.
///
/// Size, position and visibility go through the window API. The image and
/// the opacity are pushed to the page as events, since the window itself has
/// no opacity control.
pub struct WebviewSurface {
    window: WebviewWindow,
}

impl WebviewSurface {
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }
}

impl OverlaySurface for WebviewSurface {
    fn set_image(&self, icon: &ScaledIcon) {
        let payload = ImagePayload {
            key: icon.key.to_string(),
            data_url: icon.data_url(),
            width: icon.width,
            height: icon.height,
        };
        if let Err(e) = self.window.emit("overlay-image", payload) {
            log::warn!("Failed to send overlay image: {}", e);
        }
    }

    fn resize(&self, width: u32, height: u32) {
        if let Err(e) = self.window.set_size(PhysicalSize::new(width, height)) {
            log::warn!("Failed to resize overlay to {}x{}: {}", width, height, e);
        }
    }

    fn move_to(&self, x: i32, y: i32) {
        if let Err(e) = self.window.set_position(PhysicalPosition::new(x, y)) {
            log::warn!("Failed to move overlay to ({}, {}): {}", x, y, e);
        }
    }

    fn set_opacity(&self, percent: u8) {
        if let Err(e) = self.window.emit("overlay-opacity", percent.min(100)) {
            log::warn!("Failed to send overlay opacity: {}", e);
        }
    }

    fn show(&self) {
        if let Err(e) = self.window.show() {
            log::warn!("Failed to show overlay: {}", e);
        }
    }

    fn hide(&self) {
        if let Err(e) = self.window.hide() {
            log::warn!("Failed to hide overlay: {}", e);
        }
    }
}

/// Primary monitor size, as seen by the overlay window.
pub struct MonitorGeometry {
    window: WebviewWindow,
}

impl MonitorGeometry {
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }
}

impl ScreenGeometry for MonitorGeometry {
    fn primary_screen_size(&self) -> Option<ScreenSize> {
        match self.window.primary_monitor() {
            Ok(Some(monitor)) => {
                let size = monitor.size();
                Some(ScreenSize::new(size.width, size.height))
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to query primary monitor: {}", e);
                None
            }
        }
    }
}

/// Icon directory: settings override, then bundled resources, then the
/// source tree in debug builds.
fn resolve_icon_dir(app: &AppHandle, settings: &OverlaySettings) -> PathBuf {
    if let Some(dir) = &settings.icon_dir {
        return dir.clone();
    }

    if let Ok(resources) = app.path().resource_dir() {
        let bundled = resources.join("assets");
        if bundled.is_dir() {
            return bundled;
        }
    }

    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"))
}

fn build_tray(app: &App) -> tauri::Result<()> {
    let toggle_item = MenuItem::with_id(app, "toggle", "Toggle", true, None::<&str>)?;
    let quit_item = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
    let menu = Menu::with_items(app, &[&toggle_item, &quit_item])?;

    let mut builder = TrayIconBuilder::with_id("main")
        .tooltip("KeyDisplay: shows Caps/Num/Scroll Lock changes")
        .menu(&menu)
        .on_menu_event(|app, event| {
            let control_event = match event.id.as_ref() {
                "toggle" => ControlEvent::Toggle,
                "quit" => ControlEvent::Quit,
                _ => return,
            };
            log::info!("Tray: {:?} clicked", control_event);

            match app.try_state::<ControlHandle>() {
                Some(control) => {
                    if let Err(e) = control.try_send(control_event) {
                        log::error!("Failed to send {:?}: {}", control_event, e);
                    }
                }
                None => log::warn!("ControlHandle not available for {:?}", control_event),
            }
        });

    if let Some(icon) = app.default_window_icon() {
        builder = builder.icon(icon.clone());
    }

    builder.build(app)?;
    Ok(())
}

// ============================================================================
// Application entry point
// ============================================================================

pub fn run() {
    let settings = load_settings();
    let log_level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    tauri::Builder::default()
        .plugin(tauri_plugin_log::Builder::default().level(log_level).build())
        .setup(move |app| {
            log::info!("Settings: {:?}", settings);

            let window = app
                .get_webview_window(OVERLAY_LABEL)
                .ok_or("overlay window missing from tauri.conf.json")?;

            let icons = DirIconStore::new(resolve_icon_dir(app.handle(), &settings));
            let missing = icons.missing();
            if !missing.is_empty() {
                log::warn!(
                    "Icons missing from {:?}: {:?}",
                    icons.dir(),
                    missing.iter().map(|k| k.as_str()).collect::<Vec<_>>()
                );
            }

            let controller = Arc::new(OverlayController::new(
                Arc::new(WebviewSurface::new(window.clone())),
                Arc::new(MonitorGeometry::new(window)),
                Arc::new(icons),
                settings.timing(),
            ));

            let source: Arc<dyn KeyStateSource> = match EvdevLockSource::open() {
                Ok(source) => {
                    log::info!("Reading lock state from {:?}", source.path());
                    Arc::new(source)
                }
                Err(e) => {
                    // Keep running so the tray still works; nothing will be reported
                    log::error!("Lock state unavailable: {}", e);
                    Arc::new(FixedLockSource::default())
                }
            };

            let (control, rx) = control_channel();
            app.manage(control.clone());
            build_tray(app)?;

            let app_handle = app.handle().clone();
            let grace = settings.timing().timeout;
            let poll_interval = settings.poll_interval();
            let max_inflight = settings.max_inflight_displays;
            let start_active = settings.start_active;

            tauri::async_runtime::spawn(async move {
                let dispatcher = DisplayDispatcher::start(controller, max_inflight);
                let runner = OverlayEffectRunner::new(dispatcher, source, poll_interval);

                if start_active {
                    if let Err(e) = control.send(ControlEvent::Startup).await {
                        log::error!("Failed to send startup event: {}", e);
                    }
                }

                if run_control_loop(rx, runner, grace).await == LoopExit::Quit {
                    app_handle.exit(0);
                }
            });

            log::info!("KeyDisplay started");
            Ok(())
        })
        .on_window_event(|window, event| {
            // The overlay is only ever hidden, never closed
            if let WindowEvent::CloseRequested { api, .. } = event {
                if window.label() == OVERLAY_LABEL {
                    api.prevent_close();
                    let _ = window.hide();
                }
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
