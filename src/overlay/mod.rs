// Overlay coordinator: owns the small and big overlays and drives the host.
//
// At most one overlay is active at a time, enforced by `Active`. The
// coordinator lives on the UI thread; the watcher's timer thread only sees
// the published `SharedVisibility`.

pub mod big;
pub mod small;

pub use big::{BigOverlayButton, BigOverlayView};
pub use small::{SmallOverlayView, SmallViewCommand};

use crate::config::AppConfig;
use crate::geometry::{LayoutParams, OverlayKind, Size};
use crate::memory::{MemorySource, MemoryStatsReader};
use crate::platform::OverlayHost;
use crate::touch::{DragTracker, TouchEvent};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    None,
    Small,
    Big,
}

impl VisibilityState {
    pub fn is_showing(self) -> bool {
        self != VisibilityState::None
    }

    fn to_u8(self) -> u8 {
        match self {
            VisibilityState::None => 0,
            VisibilityState::Small => 1,
            VisibilityState::Big => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => VisibilityState::Small,
            2 => VisibilityState::Big,
            _ => VisibilityState::None,
        }
    }
}

/// Visibility as last published by the coordinator, readable from any thread.
#[derive(Debug, Clone, Default)]
pub struct SharedVisibility(Arc<AtomicU8>);

impl SharedVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> VisibilityState {
        VisibilityState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn is_showing(&self) -> bool {
        self.get().is_showing()
    }

    fn set(&self, state: VisibilityState) {
        self.0.store(state.to_u8(), Ordering::SeqCst);
    }
}

/// Knobs the coordinator takes from [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySettings {
    pub tap_slop_px: f32,
    pub remember_position: bool,
    pub status_bar_height: Option<i32>,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            tap_slop_px: 0.0,
            remember_position: true,
            status_bar_height: None,
        }
    }
}

impl From<&AppConfig> for OverlaySettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            tap_slop_px: cfg.tap_slop_px,
            remember_position: cfg.remember_position,
            status_bar_height: cfg.status_bar_height,
        }
    }
}

#[derive(Debug)]
enum Active {
    Small(SmallOverlayView),
    Big(BigOverlayView),
}

pub struct OverlayCoordinator<H, M> {
    host: H,
    memory: MemoryStatsReader<M>,
    settings: OverlaySettings,
    active: Option<Active>,
    small_size: Option<Size>,
    big_size: Option<Size>,
    small_params: Option<LayoutParams>,
    big_params: Option<LayoutParams>,
    status_bar_height: Option<i32>,
    visibility: SharedVisibility,
}

impl<H: OverlayHost, M: MemorySource> OverlayCoordinator<H, M> {
    pub fn new(host: H, memory: MemoryStatsReader<M>, settings: OverlaySettings) -> Self {
        Self {
            host,
            memory,
            settings,
            active: None,
            small_size: None,
            big_size: None,
            small_params: None,
            big_params: None,
            status_bar_height: None,
            visibility: SharedVisibility::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Handle for threads that need to read visibility.
    pub fn shared_visibility(&self) -> SharedVisibility {
        self.visibility.clone()
    }

    pub fn visibility(&self) -> VisibilityState {
        match self.active {
            None => VisibilityState::None,
            Some(Active::Small(_)) => VisibilityState::Small,
            Some(Active::Big(_)) => VisibilityState::Big,
        }
    }

    pub fn is_showing(&self) -> bool {
        self.active.is_some()
    }

    pub fn small_view(&self) -> Option<&SmallOverlayView> {
        match &self.active {
            Some(Active::Small(view)) => Some(view),
            _ => None,
        }
    }

    pub fn big_view(&self) -> Option<&BigOverlayView> {
        match &self.active {
            Some(Active::Big(view)) => Some(view),
            _ => None,
        }
    }

    fn publish(&self) {
        self.visibility.set(self.visibility());
    }

    /// Host status bar height, resolved lazily. Failures count as 0 and are
    /// retried next time.
    fn status_bar_height(&mut self) -> i32 {
        if let Some(h) = self.settings.status_bar_height.or(self.status_bar_height) {
            return h;
        }
        match self.host.status_bar_height() {
            Ok(h) => {
                self.status_bar_height = Some(h);
                h
            }
            Err(e) => {
                tracing::warn!(error = %e, "status bar height lookup failed, using 0");
                0
            }
        }
    }

    fn small_layout(&mut self) -> LayoutParams {
        if self.settings.remember_position {
            if let Some(params) = self.small_params {
                return params;
            }
        }
        let size = match self.small_size {
            Some(size) => size,
            None => *self
                .small_size
                .insert(self.host.view_size(OverlayKind::Small)),
        };
        LayoutParams::small(self.host.screen_size(), size)
    }

    fn big_layout(&mut self) -> LayoutParams {
        if self.settings.remember_position {
            if let Some(params) = self.big_params {
                return params;
            }
        }
        let size = match self.big_size {
            Some(size) => size,
            None => *self.big_size.insert(self.host.view_size(OverlayKind::Big)),
        };
        LayoutParams::big(self.host.screen_size(), size)
    }

    /// Shows the small overlay unless it is already up. Closes the big one first.
    pub fn create_small(&mut self) {
        if self.small_view().is_some() {
            return;
        }
        self.remove_big();

        let params = self.small_layout();
        if let Err(e) = self.host.add_view(&params) {
            tracing::warn!(error = %e, "failed to add small overlay");
            return;
        }
        self.small_params = Some(params);

        let label = self.memory.used_percent_label();
        if let Err(e) = self.host.set_label(&label) {
            tracing::warn!(error = %e, "failed to set overlay label");
        }

        let drag = DragTracker::new(self.status_bar_height(), self.settings.tap_slop_px);
        self.active = Some(Active::Small(SmallOverlayView::new(params, drag)));
        self.publish();
        tracing::debug!(x = params.x, y = params.y, "small overlay shown");
    }

    pub fn remove_small(&mut self) {
        if self.small_view().is_none() {
            return;
        }
        self.active = None;
        if let Err(e) = self.host.remove_view(OverlayKind::Small) {
            tracing::warn!(error = %e, "failed to remove small overlay");
        }
        self.publish();
        tracing::debug!("small overlay removed");
    }

    /// Shows the big overlay unless it is already up. Closes the small one first.
    pub fn create_big(&mut self) {
        if self.big_view().is_some() {
            return;
        }
        self.remove_small();

        let params = self.big_layout();
        if let Err(e) = self.host.add_view(&params) {
            tracing::warn!(error = %e, "failed to add big overlay");
            return;
        }
        self.big_params = Some(params);
        self.active = Some(Active::Big(BigOverlayView::new(params)));
        self.publish();
        tracing::debug!("big overlay shown");
    }

    pub fn remove_big(&mut self) {
        if self.big_view().is_none() {
            return;
        }
        self.active = None;
        if let Err(e) = self.host.remove_view(OverlayKind::Big) {
            tracing::warn!(error = %e, "failed to remove big overlay");
        }
        self.publish();
        tracing::debug!("big overlay removed");
    }

    pub fn used_percent_value(&self) -> String {
        self.memory.used_percent_label()
    }

    /// Re-renders the label if the small overlay is up.
    pub fn update_used_percent(&mut self) {
        if self.small_view().is_none() {
            return;
        }
        let label = self.memory.used_percent_label();
        if let Err(e) = self.host.set_label(&label) {
            tracing::warn!(error = %e, "failed to refresh overlay label");
        }
    }

    pub fn on_small_touch(&mut self, event: TouchEvent) {
        let Some(Active::Small(view)) = self.active.as_mut() else {
            return;
        };
        match view.on_touch(event) {
            SmallViewCommand::Reposition(params) => {
                self.small_params = Some(params);
                if let Err(e) = self.host.update_view_layout(&params) {
                    tracing::warn!(error = %e, "failed to move small overlay");
                }
            }
            SmallViewCommand::OpenBig => self.create_big(),
            SmallViewCommand::None => {}
        }
    }

    pub fn on_big_button(&mut self, button: BigOverlayButton) {
        if self.big_view().is_none() {
            return;
        }
        match button {
            BigOverlayButton::Close => {
                self.remove_big();
                self.remove_small();
            }
            BigOverlayButton::Back => {
                self.remove_big();
                self.create_small();
            }
        }
    }
}
