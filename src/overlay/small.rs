use crate::geometry::LayoutParams;
use crate::touch::{DragTracker, TouchEvent, TouchOutcome};

/// What the coordinator must do after a touch on the small overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmallViewCommand {
    None,
    /// Push the new placement to the host right away
    Reposition(LayoutParams),
    /// Tap: swap to the big overlay
    OpenBig,
}

/// Compact overlay showing the memory percentage. Draggable; a tap expands it.
#[derive(Debug, Clone)]
pub struct SmallOverlayView {
    params: LayoutParams,
    drag: DragTracker,
}

impl SmallOverlayView {
    pub fn new(params: LayoutParams, drag: DragTracker) -> Self {
        Self { params, drag }
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    pub fn on_touch(&mut self, event: TouchEvent) -> SmallViewCommand {
        match self.drag.handle(event) {
            TouchOutcome::Moved { x, y } => {
                self.params.x = x;
                self.params.y = y;
                SmallViewCommand::Reposition(self.params)
            }
            TouchOutcome::Tap => SmallViewCommand::OpenBig,
            TouchOutcome::Pressed | TouchOutcome::Dropped | TouchOutcome::Ignored => {
                SmallViewCommand::None
            }
        }
    }
}
