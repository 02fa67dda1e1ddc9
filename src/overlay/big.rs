use crate::geometry::LayoutParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BigOverlayButton {
    /// Dismiss every overlay
    Close,
    /// Collapse back to the small overlay
    Back,
}

/// Expanded overlay, centered on screen.
#[derive(Debug, Clone)]
pub struct BigOverlayView {
    params: LayoutParams,
}

impl BigOverlayView {
    pub fn new(params: LayoutParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }
}
