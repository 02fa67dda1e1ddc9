use memfloat::geometry::{OverlayKind, PointF, Size};
use memfloat::memory::{MemoryError, MemorySource, MemoryStatsReader};
use memfloat::overlay::{OverlayCoordinator, OverlaySettings, VisibilityState};
use memfloat::platform::headless::{HeadlessHost, HostOp};
use memfloat::touch::{drag_position, DragTracker, TouchAction, TouchEvent, TouchOutcome};

struct NoMemory;

impl MemorySource for NoMemory {
    fn total_kb(&self) -> Result<u64, MemoryError> {
        Err(MemoryError::ZeroTotal)
    }

    fn available_kb(&self) -> Result<u64, MemoryError> {
        Err(MemoryError::ZeroTotal)
    }
}

fn ev(action: TouchAction, view: (f32, f32), raw: (f32, f32)) -> TouchEvent {
    TouchEvent::new(action, PointF::new(view.0, view.1), PointF::new(raw.0, raw.1))
}

#[test]
fn drag_follows_pointer() {
    assert_eq!(
        drag_position(PointF::new(10.0, 20.0), PointF::new(150.0, 250.0)),
        (140, 230)
    );

    let mut c = OverlayCoordinator::new(
        HeadlessHost::new(Size::new(1080, 1920)),
        MemoryStatsReader::new(NoMemory, "--"),
        OverlaySettings::default(),
    );
    c.create_small();
    assert_eq!(c.host().label(), Some("--"));
    c.host_mut().clear_ops();

    c.on_small_touch(ev(TouchAction::Down, (10.0, 20.0), (100.0, 200.0)));
    c.on_small_touch(ev(TouchAction::Move, (10.0, 20.0), (150.0, 250.0)));

    let moved = c.host().attached(OverlayKind::Small).unwrap();
    assert_eq!((moved.x, moved.y), (140, 230));
    assert_eq!(c.host().ops(), &[HostOp::Update(*moved)]);

    c.on_small_touch(ev(TouchAction::Up, (10.0, 20.0), (150.0, 250.0)));
    assert_eq!(c.visibility(), VisibilityState::Small);
}

#[test]
fn every_move_repositions_immediately() {
    let mut t = DragTracker::new(0, 0.0);
    t.handle(ev(TouchAction::Down, (10.0, 20.0), (100.0, 200.0)));
    let outs: Vec<_> = [(110.0, 200.0), (120.0, 210.0), (130.0, 220.0)]
        .into_iter()
        .map(|raw| t.handle(ev(TouchAction::Move, (0.0, 0.0), raw)))
        .collect();
    assert_eq!(
        outs,
        vec![
            TouchOutcome::Moved { x: 100, y: 180 },
            TouchOutcome::Moved { x: 110, y: 190 },
            TouchOutcome::Moved { x: 120, y: 200 },
        ]
    );
}

#[test]
fn exact_release_is_one_tap() {
    let mut t = DragTracker::new(0, 0.0);
    t.handle(ev(TouchAction::Down, (10.0, 20.0), (100.0, 200.0)));
    assert_eq!(
        t.handle(ev(TouchAction::Up, (10.0, 20.0), (100.0, 200.0))),
        TouchOutcome::Tap
    );
    // A stray release after the gesture ended does not tap again.
    assert_eq!(
        t.handle(ev(TouchAction::Up, (10.0, 20.0), (100.0, 200.0))),
        TouchOutcome::Ignored
    );
}

#[test]
fn one_pixel_drift_suppresses_tap() {
    let mut t = DragTracker::new(0, 0.0);
    t.handle(ev(TouchAction::Down, (10.0, 20.0), (100.0, 200.0)));
    t.handle(ev(TouchAction::Move, (10.0, 20.0), (101.0, 200.0)));
    assert_eq!(
        t.handle(ev(TouchAction::Up, (10.0, 20.0), (101.0, 200.0))),
        TouchOutcome::Dropped
    );
}

#[test]
fn sub_pixel_drift_suppresses_tap() {
    let mut t = DragTracker::new(0, 0.0);
    t.handle(ev(TouchAction::Down, (10.0, 20.0), (100.0, 200.0)));
    t.handle(ev(TouchAction::Move, (10.0, 20.0), (100.0, 200.25)));
    assert_eq!(
        t.handle(ev(TouchAction::Up, (10.0, 20.0), (100.0, 200.25))),
        TouchOutcome::Dropped
    );
}

#[test]
fn returning_to_press_point_still_taps() {
    let mut t = DragTracker::new(0, 0.0);
    t.handle(ev(TouchAction::Down, (10.0, 20.0), (100.0, 200.0)));
    t.handle(ev(TouchAction::Move, (10.0, 20.0), (130.0, 200.0)));
    t.handle(ev(TouchAction::Move, (10.0, 20.0), (100.0, 200.0)));
    assert_eq!(
        t.handle(ev(TouchAction::Up, (10.0, 20.0), (100.0, 200.0))),
        TouchOutcome::Tap
    );
}
