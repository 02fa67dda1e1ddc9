// Screen-space geometry shared by the overlay views and the host backends.

/// Which overlay a host call refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Small,
    Big,
}

/// Pointer position, fractional like the raw input it comes from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Window flags requested from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFlags {
    /// Drawn above other applications
    pub system_overlay: bool,
    /// Touches outside the window go to whatever is underneath
    pub not_touch_modal: bool,
    /// Never takes keyboard focus
    pub not_focusable: bool,
}

impl WindowFlags {
    pub const OVERLAY: Self = Self {
        system_overlay: true,
        not_touch_modal: true,
        not_focusable: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8888,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    TopLeft,
}

/// Placement of one overlay window. Size is fixed once computed; `x`/`y`
/// follow the pointer while the small overlay is dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutParams {
    pub kind: OverlayKind,
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub y: i32,
    pub flags: WindowFlags,
    pub format: PixelFormat,
    pub gravity: Gravity,
}

impl LayoutParams {
    /// Small overlay: right edge, vertical center.
    pub fn small(screen: Size, view: Size) -> Self {
        Self {
            kind: OverlayKind::Small,
            width: view.width,
            height: view.height,
            x: (screen.width - view.width).max(0),
            y: screen.height / 2,
            flags: WindowFlags::OVERLAY,
            format: PixelFormat::Rgba8888,
            gravity: Gravity::TopLeft,
        }
    }

    /// Big overlay: centered on screen.
    pub fn big(screen: Size, view: Size) -> Self {
        Self {
            kind: OverlayKind::Big,
            width: view.width,
            height: view.height,
            x: screen.width / 2 - view.width / 2,
            y: screen.height / 2 - view.height / 2,
            flags: WindowFlags::OVERLAY,
            format: PixelFormat::Rgba8888,
            gravity: Gravity::TopLeft,
        }
    }
}
