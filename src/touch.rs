// Drag and tap recognition for the small overlay.
//
// A gesture runs `Idle -> Pressed -> (Dragging | tap on release)`. Every move
// repositions the overlay at once; a release whose screen point matches the
// press point (within `tap_slop`) is a tap.

use crate::geometry::PointF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    Move,
    Up,
    Cancel,
}

/// One pointer sample as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub action: TouchAction,
    /// Position relative to the overlay's top-left corner
    pub in_view: PointF,
    /// Raw screen position, status bar included
    pub raw: PointF,
}

impl TouchEvent {
    pub fn new(action: TouchAction, in_view: PointF, raw: PointF) -> Self {
        Self {
            action,
            in_view,
            raw,
        }
    }
}

/// State of a single down-to-up gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchSession {
    pub press_in_view: PointF,
    pub press_in_screen: PointF,
    pub current_in_screen: PointF,
}

impl TouchSession {
    pub fn begin(press_in_view: PointF, press_in_screen: PointF) -> Self {
        Self {
            press_in_view,
            press_in_screen,
            current_in_screen: press_in_screen,
        }
    }

    /// Overlay origin that keeps the pressed point under the pointer.
    pub fn position(&self) -> (i32, i32) {
        drag_position(self.press_in_view, self.current_in_screen)
    }

    pub fn is_tap(&self, slop: f32) -> bool {
        let dx = (self.current_in_screen.x - self.press_in_screen.x).abs();
        let dy = (self.current_in_screen.y - self.press_in_screen.y).abs();
        dx <= slop && dy <= slop
    }
}

/// `current - press_in_view`, truncated to whole pixels.
pub fn drag_position(press_in_view: PointF, current_in_screen: PointF) -> (i32, i32) {
    (
        (current_in_screen.x - press_in_view.x) as i32,
        (current_in_screen.y - press_in_view.y) as i32,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Pressed,
    Dragging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchOutcome {
    /// Event outside a gesture, nothing to do
    Ignored,
    Pressed,
    /// Overlay must move to `(x, y)` now
    Moved { x: i32, y: i32 },
    /// Released away from the press point
    Dropped,
    Tap,
}

#[derive(Debug, Clone)]
pub struct DragTracker {
    phase: DragPhase,
    session: Option<TouchSession>,
    status_bar_height: f32,
    tap_slop: f32,
}

impl DragTracker {
    pub fn new(status_bar_height: i32, tap_slop: f32) -> Self {
        Self {
            phase: DragPhase::Idle,
            session: None,
            status_bar_height: status_bar_height as f32,
            tap_slop: tap_slop.max(0.0),
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&TouchSession> {
        self.session.as_ref()
    }

    fn to_screen(&self, raw: PointF) -> PointF {
        PointF::new(raw.x, raw.y - self.status_bar_height)
    }

    pub fn handle(&mut self, event: TouchEvent) -> TouchOutcome {
        match event.action {
            TouchAction::Down => {
                let screen = self.to_screen(event.raw);
                self.session = Some(TouchSession::begin(event.in_view, screen));
                self.phase = DragPhase::Pressed;
                TouchOutcome::Pressed
            }
            TouchAction::Move => {
                let screen = self.to_screen(event.raw);
                let Some(session) = self.session.as_mut() else {
                    return TouchOutcome::Ignored;
                };
                session.current_in_screen = screen;
                self.phase = DragPhase::Dragging;
                let (x, y) = session.position();
                TouchOutcome::Moved { x, y }
            }
            TouchAction::Up => {
                self.phase = DragPhase::Idle;
                match self.session.take() {
                    Some(session) if session.is_tap(self.tap_slop) => TouchOutcome::Tap,
                    Some(_) => TouchOutcome::Dropped,
                    None => TouchOutcome::Ignored,
                }
            }
            TouchAction::Cancel => {
                self.phase = DragPhase::Idle;
                self.session = None;
                TouchOutcome::Ignored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(action: TouchAction, view: (f32, f32), raw: (f32, f32)) -> TouchEvent {
        TouchEvent::new(action, PointF::new(view.0, view.1), PointF::new(raw.0, raw.1))
    }

    #[test]
    fn drag_translation() {
        let pos = drag_position(PointF::new(10.0, 20.0), PointF::new(150.0, 250.0));
        assert_eq!(pos, (140, 230));
    }

    #[test]
    fn status_bar_is_subtracted_from_screen_y() {
        let mut t = DragTracker::new(25, 0.0);
        t.handle(ev(TouchAction::Down, (10.0, 20.0), (100.0, 225.0)));
        assert_eq!(
            t.session().unwrap().press_in_screen,
            PointF::new(100.0, 200.0)
        );
        let out = t.handle(ev(TouchAction::Move, (0.0, 0.0), (150.0, 275.0)));
        assert_eq!(out, TouchOutcome::Moved { x: 140, y: 230 });
    }

    #[test]
    fn phases() {
        let mut t = DragTracker::new(0, 0.0);
        assert_eq!(t.phase(), DragPhase::Idle);
        t.handle(ev(TouchAction::Down, (1.0, 1.0), (5.0, 5.0)));
        assert_eq!(t.phase(), DragPhase::Pressed);
        t.handle(ev(TouchAction::Move, (0.0, 0.0), (6.0, 5.0)));
        assert_eq!(t.phase(), DragPhase::Dragging);
        assert_eq!(
            t.handle(ev(TouchAction::Up, (0.0, 0.0), (6.0, 5.0))),
            TouchOutcome::Dropped
        );
        assert_eq!(t.phase(), DragPhase::Idle);
        assert!(t.session().is_none());
    }

    #[test]
    fn slop_allows_small_jitter() {
        let mut t = DragTracker::new(0, 2.0);
        t.handle(ev(TouchAction::Down, (1.0, 1.0), (50.0, 50.0)));
        t.handle(ev(TouchAction::Move, (0.0, 0.0), (51.5, 49.0)));
        assert_eq!(
            t.handle(ev(TouchAction::Up, (0.0, 0.0), (51.5, 49.0))),
            TouchOutcome::Tap
        );
    }

    #[test]
    fn cancel_never_taps() {
        let mut t = DragTracker::new(0, 0.0);
        t.handle(ev(TouchAction::Down, (1.0, 1.0), (50.0, 50.0)));
        assert_eq!(
            t.handle(ev(TouchAction::Cancel, (0.0, 0.0), (50.0, 50.0))),
            TouchOutcome::Ignored
        );
        assert_eq!(
            t.handle(ev(TouchAction::Up, (0.0, 0.0), (50.0, 50.0))),
            TouchOutcome::Ignored
        );
    }

    #[test]
    fn move_without_press_is_ignored() {
        let mut t = DragTracker::new(0, 0.0);
        assert_eq!(
            t.handle(ev(TouchAction::Move, (0.0, 0.0), (3.0, 3.0))),
            TouchOutcome::Ignored
        );
    }
}
