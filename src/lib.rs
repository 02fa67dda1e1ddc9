// Floating memory usage overlay.
//
// A small draggable overlay shows the used-memory percentage while the home
// screen (the desktop) is in front; tapping it opens a larger panel. A
// background watcher polls the foreground app and posts show / hide /
// refresh decisions to the UI thread, which owns all overlay state.

pub mod config;
pub mod dispatch;
pub mod geometry;
pub mod logging;
pub mod memory;
pub mod overlay;
pub mod platform;
pub mod touch;
pub mod watcher;
