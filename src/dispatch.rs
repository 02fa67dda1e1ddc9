// Messages posted to the UI thread, which alone owns the overlay coordinator.

use crate::memory::MemorySource;
use crate::overlay::{BigOverlayButton, OverlayCoordinator};
use crate::platform::OverlayHost;
use crate::touch::TouchEvent;
use crate::watcher::PollAction;
use std::ops::ControlFlow;
use std::sync::mpsc::{Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiMessage {
    Poll(PollAction),
    SmallTouch(TouchEvent),
    BigButton(BigOverlayButton),
    Shutdown,
}

/// Posts work onto the UI thread. Returns `false` if the UI thread is gone.
pub trait UiDispatcher: Send + Sync {
    fn post(&self, msg: UiMessage) -> bool;
}

#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: Sender<UiMessage>,
}

impl ChannelDispatcher {
    pub fn new(tx: Sender<UiMessage>) -> Self {
        Self { tx }
    }
}

impl UiDispatcher for ChannelDispatcher {
    fn post(&self, msg: UiMessage) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Applies one message to the coordinator.
pub fn apply<H: OverlayHost, M: MemorySource>(
    coordinator: &mut OverlayCoordinator<H, M>,
    msg: UiMessage,
) -> ControlFlow<()> {
    match msg {
        UiMessage::Poll(PollAction::ShowSmall) => coordinator.create_small(),
        UiMessage::Poll(PollAction::HideAll) => {
            coordinator.remove_small();
            coordinator.remove_big();
        }
        UiMessage::Poll(PollAction::RefreshPercent) => coordinator.update_used_percent(),
        UiMessage::SmallTouch(event) => coordinator.on_small_touch(event),
        UiMessage::BigButton(button) => coordinator.on_big_button(button),
        UiMessage::Shutdown => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

/// Runs until `Shutdown` arrives or every sender is dropped.
pub fn run_ui_loop<H: OverlayHost, M: MemorySource>(
    rx: Receiver<UiMessage>,
    coordinator: &mut OverlayCoordinator<H, M>,
) {
    while let Ok(msg) = rx.recv() {
        if apply(coordinator, msg).is_break() {
            break;
        }
    }
    coordinator.remove_small();
    coordinator.remove_big();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::memory::{MemoryError, MemoryStatsReader};
    use crate::overlay::{OverlaySettings, VisibilityState};
    use crate::platform::headless::HeadlessHost;
    use std::sync::mpsc;

    struct Broken;

    impl MemorySource for Broken {
        fn total_kb(&self) -> Result<u64, MemoryError> {
            Err(MemoryError::Query("offline".into()))
        }

        fn available_kb(&self) -> Result<u64, MemoryError> {
            Err(MemoryError::Query("offline".into()))
        }
    }

    #[test]
    fn ui_loop_applies_until_shutdown_and_cleans_up() {
        let mut coordinator = OverlayCoordinator::new(
            HeadlessHost::new(Size::new(800, 600)),
            MemoryStatsReader::new(Broken, "--"),
            OverlaySettings::default(),
        );
        let (tx, rx) = mpsc::channel();
        let dispatcher = ChannelDispatcher::new(tx);
        assert!(dispatcher.post(UiMessage::Poll(PollAction::ShowSmall)));
        assert!(dispatcher.post(UiMessage::Shutdown));
        assert!(dispatcher.post(UiMessage::Poll(PollAction::ShowSmall)));

        run_ui_loop(rx, &mut coordinator);

        assert_eq!(coordinator.host().label(), None);
        assert_eq!(coordinator.visibility(), VisibilityState::None);
        assert_eq!(coordinator.host().attached_count(), 0);
    }

    #[test]
    fn post_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        assert!(!ChannelDispatcher::new(tx).post(UiMessage::Shutdown));
    }
}
