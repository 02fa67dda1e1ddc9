use memfloat::dispatch::{apply, ChannelDispatcher, UiDispatcher, UiMessage};
use memfloat::geometry::Size;
use memfloat::memory::{MemoryError, MemorySource, MemoryStatsReader};
use memfloat::overlay::{OverlayCoordinator, OverlaySettings, SharedVisibility, VisibilityState};
use memfloat::platform::headless::{HeadlessHost, StaticProbe};
use memfloat::watcher::{
    ForegroundWatcher, HomeDetector, PollAction, WatcherService, DEFAULT_POLL_INTERVAL,
};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const HOME: &str = "com.example.launcher";
const APP: &str = "com.example.browser";

struct Half;

impl MemorySource for Half {
    fn total_kb(&self) -> Result<u64, MemoryError> {
        Ok(1_000)
    }

    fn available_kb(&self) -> Result<u64, MemoryError> {
        Ok(500)
    }
}

#[derive(Clone, Default)]
struct Recording {
    sent: Arc<Mutex<Vec<UiMessage>>>,
}

impl Recording {
    fn take(&self) -> Vec<UiMessage> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

impl UiDispatcher for Recording {
    fn post(&self, msg: UiMessage) -> bool {
        self.sent.lock().unwrap().push(msg);
        true
    }
}

fn coordinator() -> OverlayCoordinator<HeadlessHost, Half> {
    OverlayCoordinator::new(
        HeadlessHost::new(Size::new(1080, 1920)),
        MemoryStatsReader::new(Half, "--"),
        OverlaySettings::default(),
    )
}

fn watcher(
    probe: &StaticProbe,
    visibility: SharedVisibility,
    recording: &Recording,
) -> ForegroundWatcher<StaticProbe, Recording> {
    ForegroundWatcher::new(
        HomeDetector::new(probe.clone(), Vec::new()),
        visibility,
        recording.clone(),
    )
}

#[test]
fn all_four_transitions() {
    let probe = StaticProbe::new(vec![HOME.to_string()]);
    let recording = Recording::default();

    let hidden = coordinator();
    let mut shown = coordinator();
    shown.create_small();

    let cases = [
        (HOME, &hidden, Some(PollAction::ShowSmall)),
        (APP, &shown, Some(PollAction::HideAll)),
    ];
    for (foreground, c, expected) in cases {
        probe.set_foreground(Some(foreground));
        let w = watcher(&probe, c.shared_visibility(), &recording);
        assert_eq!(w.tick(), expected);
        assert_eq!(
            recording.take(),
            expected.map(UiMessage::Poll).into_iter().collect::<Vec<_>>()
        );
    }

    // (home, showing) -> refresh
    let mut shown = coordinator();
    shown.create_small();
    probe.set_foreground(Some(HOME));
    let w = watcher(&probe, shown.shared_visibility(), &recording);
    assert_eq!(w.tick(), Some(PollAction::RefreshPercent));
    assert_eq!(
        recording.take(),
        vec![UiMessage::Poll(PollAction::RefreshPercent)]
    );

    // (not home, hidden) -> nothing posted
    let hidden = coordinator();
    probe.set_foreground(Some(APP));
    let w = watcher(&probe, hidden.shared_visibility(), &recording);
    assert_eq!(w.tick(), None);
    assert!(recording.take().is_empty());

    // No foreground app at all counts as not home.
    probe.set_foreground(None);
    assert_eq!(w.tick(), None);
}

#[test]
fn posted_actions_drive_the_coordinator() {
    let probe = StaticProbe::new(vec![HOME.to_string()]);
    let recording = Recording::default();
    let mut c = coordinator();
    let w = watcher(&probe, c.shared_visibility(), &recording);

    let step = |c: &mut OverlayCoordinator<HeadlessHost, Half>| {
        w.tick();
        for msg in recording.take() {
            let _ = apply(c, msg);
        }
    };

    probe.set_foreground(Some(HOME));
    step(&mut c);
    assert_eq!(c.visibility(), VisibilityState::Small);
    assert_eq!(c.host().label(), Some("50%"));

    c.create_big();
    probe.set_foreground(Some(APP));
    step(&mut c);
    assert_eq!(c.visibility(), VisibilityState::None);
    assert_eq!(c.host().attached_count(), 0);

    step(&mut c);
    assert_eq!(c.visibility(), VisibilityState::None);
}

#[test]
fn service_start_is_idempotent_and_destroy_stops_ticks() {
    let probe = StaticProbe::new(vec![HOME.to_string()]);
    probe.set_foreground(Some(HOME));
    let (tx, rx) = mpsc::channel();
    let w = ForegroundWatcher::new(
        HomeDetector::new(probe, Vec::new()),
        SharedVisibility::new(),
        ChannelDispatcher::new(tx),
    );

    let mut service = WatcherService::new(w, Duration::from_secs(3600));
    assert!(service.on_start_command());
    assert!(!service.on_start_command());
    assert!(service.is_running());

    // First tick fires immediately; a second timer would post a second one.
    let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first, UiMessage::Poll(PollAction::ShowSmall));
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    service.on_destroy();
    assert!(!service.is_running());
    service.on_destroy();

    assert!(service.on_start_command());
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        UiMessage::Poll(PollAction::ShowSmall)
    );
}

#[test]
fn service_ticks_at_a_fixed_rate() {
    let probe = StaticProbe::new(vec![HOME.to_string()]);
    probe.set_foreground(Some(HOME));
    let (tx, rx) = mpsc::channel();
    let w = ForegroundWatcher::new(
        HomeDetector::new(probe, Vec::new()),
        SharedVisibility::new(),
        ChannelDispatcher::new(tx),
    );

    let mut service = WatcherService::new(w, Duration::from_millis(10));
    service.on_start_command();
    for _ in 0..3 {
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
    drop(service);

    // The timer thread is joined on drop; whatever it queued is finite.
    while rx.try_recv().is_ok() {}
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn zero_period_falls_back_to_default_rate() {
    let probe = StaticProbe::new(vec![HOME.to_string()]);
    probe.set_foreground(Some(HOME));
    let (tx, rx) = mpsc::channel();
    let w = ForegroundWatcher::new(
        HomeDetector::new(probe, Vec::new()),
        SharedVisibility::new(),
        ChannelDispatcher::new(tx),
    );

    let mut service = WatcherService::new(w, Duration::ZERO);
    assert_eq!(service.period(), DEFAULT_POLL_INTERVAL);

    service.on_start_command();
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    std::thread::sleep(Duration::from_millis(100));
    service.on_destroy();

    let queued = rx.try_iter().count();
    assert!(queued <= 1, "timer posted {queued} extra ticks in 100ms");
}
