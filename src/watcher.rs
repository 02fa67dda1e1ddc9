// Foreground watcher: a fixed-rate poll that decides whether the overlay
// should be shown, hidden or refreshed, and posts that decision to the UI
// thread. The timer thread never touches overlay state itself.

use crate::dispatch::{UiDispatcher, UiMessage};
use crate::overlay::SharedVisibility;
use crate::platform::ForegroundProbe;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Home is in front and nothing is shown
    ShowSmall,
    /// Left the home screen with an overlay up
    HideAll,
    /// Home is in front and an overlay is up
    RefreshPercent,
}

pub fn decide(is_home: bool, is_showing: bool) -> Option<PollAction> {
    match (is_home, is_showing) {
        (true, false) => Some(PollAction::ShowSmall),
        (false, true) => Some(PollAction::HideAll),
        (true, true) => Some(PollAction::RefreshPercent),
        (false, false) => None,
    }
}

/// Decides whether the foreground app is the home screen.
pub struct HomeDetector<P> {
    probe: P,
    extra_homes: Vec<String>,
}

impl<P: ForegroundProbe> HomeDetector<P> {
    pub fn new(probe: P, extra_homes: Vec<String>) -> Self {
        Self { probe, extra_homes }
    }

    pub fn is_home(&self) -> bool {
        let Some(current) = self.probe.foreground_package() else {
            return false;
        };
        self.extra_homes.iter().any(|home| *home == current)
            || self.probe.home_packages().iter().any(|home| *home == current)
    }
}

/// One poll tick's worth of logic.
pub struct ForegroundWatcher<P, D> {
    home: HomeDetector<P>,
    visibility: SharedVisibility,
    dispatcher: D,
}

impl<P: ForegroundProbe, D: UiDispatcher> ForegroundWatcher<P, D> {
    pub fn new(home: HomeDetector<P>, visibility: SharedVisibility, dispatcher: D) -> Self {
        Self {
            home,
            visibility,
            dispatcher,
        }
    }

    /// Reads state, decides, posts. Returns what was posted.
    pub fn tick(&self) -> Option<PollAction> {
        let is_home = self.home.is_home();
        let is_showing = self.visibility.is_showing();
        let action = decide(is_home, is_showing)?;
        tracing::trace!(is_home, is_showing, ?action, "poll");
        if !self.dispatcher.post(UiMessage::Poll(action)) {
            tracing::debug!(?action, "ui thread gone, poll action dropped");
        }
        Some(action)
    }
}

struct Timer {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the poll timer. Start is idempotent; destroy cancels.
pub struct WatcherService<P, D> {
    watcher: Arc<ForegroundWatcher<P, D>>,
    period: Duration,
    timer: Option<Timer>,
}

impl<P, D> WatcherService<P, D>
where
    P: ForegroundProbe + 'static,
    D: UiDispatcher + 'static,
{
    /// A zero period would spin the timer, so it falls back to
    /// [`DEFAULT_POLL_INTERVAL`].
    pub fn new(watcher: ForegroundWatcher<P, D>, period: Duration) -> Self {
        let period = if period.is_zero() {
            tracing::warn!("zero poll period, using default");
            DEFAULT_POLL_INTERVAL
        } else {
            period
        };
        Self {
            watcher: Arc::new(watcher),
            period,
            timer: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Starts the timer, first tick immediately. Returns `false` if it was
    /// already running.
    pub fn on_start_command(&mut self) -> bool {
        if self.timer.is_some() {
            return false;
        }

        let (stop, stop_rx) = mpsc::channel::<()>();
        let watcher = Arc::clone(&self.watcher);
        let period = self.period;

        let spawned = thread::Builder::new()
            .name("memfloat-watcher".into())
            .spawn(move || {
                let mut next = Instant::now();
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    watcher.tick();
                    // Fixed rate: late ticks catch up instead of drifting.
                    next += period;
                }
                tracing::debug!("watcher timer stopped");
            });

        match spawned {
            Ok(handle) => {
                tracing::info!(period_ms = period.as_millis() as u64, "watcher started");
                self.timer = Some(Timer { stop, handle });
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to spawn watcher thread");
                false
            }
        }
    }

    /// Cancels the timer. Actions already posted to the UI thread still run.
    pub fn on_destroy(&mut self) {
        if self.stop_timer() {
            tracing::info!("watcher destroyed");
        }
    }
}

impl<P, D> WatcherService<P, D> {
    fn stop_timer(&mut self) -> bool {
        let Some(timer) = self.timer.take() else {
            return false;
        };
        let _ = timer.stop.send(());
        let _ = timer.handle.join();
        true
    }
}

impl<P, D> Drop for WatcherService<P, D> {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::StaticProbe;

    #[test]
    fn decision_table() {
        assert_eq!(decide(true, false), Some(PollAction::ShowSmall));
        assert_eq!(decide(false, true), Some(PollAction::HideAll));
        assert_eq!(decide(true, true), Some(PollAction::RefreshPercent));
        assert_eq!(decide(false, false), None);
    }

    #[test]
    fn home_matches_probe_or_extra_list() {
        let probe = StaticProbe::new(vec!["launcher".into()]);
        let detector = HomeDetector::new(probe.clone(), vec!["alt.launcher".into()]);

        assert!(!detector.is_home());
        probe.set_foreground(Some("launcher"));
        assert!(detector.is_home());
        probe.set_foreground(Some("alt.launcher"));
        assert!(detector.is_home());
        probe.set_foreground(Some("browser"));
        assert!(!detector.is_home());
    }
}
