// Host integration seams.
//
// The overlay logic only talks to the host through these traits: placing
// windows (`OverlayHost`) and inspecting the foreground app
// (`ForegroundProbe`). Memory queries live in `crate::memory`.

pub mod headless;
#[cfg(windows)]
pub mod windows;

use crate::geometry::{LayoutParams, OverlayKind, Size};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{0:?} overlay is not attached")]
    NotAttached(OverlayKind),
    #[error("{0:?} overlay is already attached")]
    AlreadyAttached(OverlayKind),
    #[error("status bar height unavailable")]
    StatusBarUnavailable,
    #[error("{0}")]
    Os(String),
}

/// Screen overlay placement. Every call happens on the UI thread.
pub trait OverlayHost {
    fn screen_size(&self) -> Size;

    /// Natural size of the given overlay layout. Queried once per kind.
    fn view_size(&mut self, kind: OverlayKind) -> Size;

    fn add_view(&mut self, params: &LayoutParams) -> Result<(), PlatformError>;

    fn update_view_layout(&mut self, params: &LayoutParams) -> Result<(), PlatformError>;

    fn remove_view(&mut self, kind: OverlayKind) -> Result<(), PlatformError>;

    /// Replaces the percentage text on the small overlay.
    fn set_label(&mut self, text: &str) -> Result<(), PlatformError>;

    /// Height of the system bar above the overlay coordinate space.
    fn status_bar_height(&self) -> Result<i32, PlatformError>;
}

/// Foreground inspection. Called from the watcher's timer thread.
pub trait ForegroundProbe: Send + Sync {
    /// Identifier of the app currently in front, if any.
    fn foreground_package(&self) -> Option<String>;

    /// Identifiers that count as the home screen.
    fn home_packages(&self) -> Vec<String>;
}
