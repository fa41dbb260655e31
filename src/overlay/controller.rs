//! Overlay controller: who owns the surface, and when it fades out
//!
//! A display request runs in two phases. [`OverlayController::claim`] is
//! synchronous: it records the request, supersedes whatever ran before and
//! hands back a ticket. [`OverlayController::run`] then waits for the previous
//! owner to exit, draws the icon, sleeps out the timeout and fades.
//!
//! Only one run touches the surface at a time. A newer claim cancels the
//! older run at its next cancellation point (the ack wait, the timeout sleep
//! or a fade step), and the newer run does not draw until the older one has
//! dropped its guard.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use super::icons::{IconKey, IconStore};
use super::layout::{self, ScreenGeometry, ScreenSize};
use super::scope::{CancelScope, ScopeGuard};
use super::surface::OverlaySurface;
use super::OverlayError;

/// Number of opacity steps in a fade.
pub const FADE_STEPS: u8 = 25;
/// Opacity removed per fade step, in percent.
pub const FADE_STEP_PERCENT: u8 = 4;

/// Timing knobs for a display cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayTiming {
    /// How long an icon stays fully visible before fading.
    pub timeout: Duration,
    /// Delay between fade steps.
    pub fade_interval: Duration,
}

impl Default for OverlayTiming {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(1000),
            fade_interval: Duration::from_millis(40),
        }
    }
}

impl OverlayTiming {
    /// Total time of an uninterrupted fade.
    pub fn fade_duration(&self) -> Duration {
        self.fade_interval * FADE_STEPS as u32
    }
}

/// A request to show one icon. Never mutated, only superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRequest {
    pub id: Uuid,
    pub key: IconKey,
    pub issued_at: Instant,
}

impl DisplayRequest {
    pub fn new(key: IconKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            issued_at: Instant::now(),
        }
    }
}

/// A claimed request, ready to run.
#[derive(Debug)]
pub struct DisplayTicket {
    request: DisplayRequest,
    previous: CancelScope,
    guard: ScopeGuard,
}

impl DisplayTicket {
    pub fn request(&self) -> &DisplayRequest {
        &self.request
    }
}

/// How a display cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOutcome {
    /// Faded out and hidden.
    Hidden,
    /// A newer request took over the surface.
    Superseded,
}

/// How a fade ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeOutcome {
    Completed,
    Interrupted,
}

#[derive(Debug)]
struct OverlaySession {
    last_update: Instant,
    latest: Option<Uuid>,
    scope: CancelScope,
}

pub struct OverlayController {
    surface: Arc<dyn OverlaySurface>,
    screen: Arc<dyn ScreenGeometry>,
    icons: Arc<dyn IconStore>,
    timing: OverlayTiming,
    session: Mutex<OverlaySession>,
}

impl OverlayController {
    pub fn new(
        surface: Arc<dyn OverlaySurface>,
        screen: Arc<dyn ScreenGeometry>,
        icons: Arc<dyn IconStore>,
        timing: OverlayTiming,
    ) -> Self {
        Self {
            surface,
            screen,
            icons,
            timing,
            session: Mutex::new(OverlaySession {
                last_update: Instant::now(),
                latest: None,
                scope: CancelScope::settled(),
            }),
        }
    }

    pub fn timing(&self) -> OverlayTiming {
        self.timing
    }

    /// Id of the most recently claimed request.
    pub fn latest(&self) -> Option<Uuid> {
        self.session().latest
    }

    fn session(&self) -> MutexGuard<'_, OverlaySession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Show `key` and hide it again after the timeout, unless superseded.
    pub async fn display(&self, key: IconKey) -> Result<DisplayOutcome, OverlayError> {
        let ticket = self.claim(DisplayRequest::new(key));
        self.run(ticket).await
    }

    /// Record `request` as the newest one and cancel the previous owner.
    pub fn claim(&self, request: DisplayRequest) -> DisplayTicket {
        let (scope, guard) = CancelScope::new();
        let previous = {
            let mut session = self.session();
            session.last_update = Instant::now();
            session.latest = Some(request.id);
            std::mem::replace(&mut session.scope, scope)
        };

        // A fade from the previous request may have left the window translucent
        self.surface.set_opacity(100);
        previous.cancel();

        log::debug!("Claimed display {} ({})", request.key, request.id);
        DisplayTicket {
            request,
            previous,
            guard,
        }
    }

    /// Drive a claimed request to completion.
    pub async fn run(&self, ticket: DisplayTicket) -> Result<DisplayOutcome, OverlayError> {
        let DisplayTicket {
            request,
            previous,
            guard,
        } = ticket;

        previous.cancel_and_wait().await;
        if guard.is_cancelled() {
            log::debug!(
                "Display {} ({}) superseded before drawing",
                request.key,
                request.id
            );
            return Ok(DisplayOutcome::Superseded);
        }

        self.surface.set_opacity(100);

        let screen = self.screen.primary_screen_size().unwrap_or_else(|| {
            log::debug!("Primary screen size unavailable, drawing at zero size");
            ScreenSize::default()
        });

        let icon = match self.icons.load_scaled(request.key, layout::bounding_box(screen)) {
            Ok(icon) => icon,
            Err(e) => {
                log::error!("Display {} aborted: {}", request.key, e);
                return Err(e);
            }
        };

        self.surface.set_image(&icon);
        self.surface.resize(icon.width, icon.height);
        let (x, y) = layout::placement(screen, icon.width);
        self.surface.move_to(x, y);
        self.surface.show();

        log::debug!(
            "Showing {} at ({}, {}) size {}x{}, queued {:?}",
            request.key,
            x,
            y,
            icon.width,
            icon.height,
            request.issued_at.elapsed()
        );

        tokio::select! {
            biased;
            _ = guard.cancelled() => return Ok(DisplayOutcome::Superseded),
            _ = tokio::time::sleep(self.timing.timeout) => {}
        }

        if !self.is_current(request.id) {
            return Ok(DisplayOutcome::Superseded);
        }

        match self.fadeout(&guard).await {
            FadeOutcome::Completed => {
                self.surface.hide();
                log::debug!("Display {} ({}) hidden", request.key, request.id);
                Ok(DisplayOutcome::Hidden)
            }
            FadeOutcome::Interrupted => Ok(DisplayOutcome::Superseded),
        }
    }

    /// No newer request has landed and the timeout has fully elapsed.
    fn is_current(&self, id: Uuid) -> bool {
        let session = self.session();
        session.latest == Some(id) && session.last_update.elapsed() >= self.timing.timeout
    }

    /// Ramp opacity from 100% down to 4%, one step per fade interval.
    ///
    /// 0% is never written; hiding the surface afterwards is what conceals it.
    pub async fn fadeout(&self, guard: &ScopeGuard) -> FadeOutcome {
        for step in (1..=FADE_STEPS).rev() {
            self.surface.set_opacity(step * FADE_STEP_PERCENT);

            tokio::select! {
                biased;
                _ = guard.cancelled() => return FadeOutcome::Interrupted,
                _ = tokio::time::sleep(self.timing.fade_interval) => {}
            }
        }
        FadeOutcome::Completed
    }
}
