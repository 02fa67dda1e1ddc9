// In-memory host: no real windows, every call is recorded and logged.
//
// Used on hosts without a native backend and as the test double.

use super::{ForegroundProbe, OverlayHost, PlatformError};
use crate::config::AppConfig;
use crate::dispatch::{run_ui_loop, ChannelDispatcher};
use crate::geometry::{LayoutParams, OverlayKind, Size};
use crate::memory::{MemoryStatsReader, ProcMeminfo};
use crate::overlay::{OverlayCoordinator, OverlaySettings};
use crate::watcher::{ForegroundWatcher, HomeDetector, WatcherService};
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SMALL_VIEW_SIZE: Size = Size::new(64, 32);
pub const BIG_VIEW_SIZE: Size = Size::new(320, 200);

/// Host call as observed by [`HeadlessHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    Add(LayoutParams),
    Update(LayoutParams),
    Remove(OverlayKind),
    Label(String),
}

#[derive(Debug)]
pub struct HeadlessHost {
    screen: Size,
    status_bar: Option<i32>,
    attached: HashMap<OverlayKind, LayoutParams>,
    label: Option<String>,
    ops: Vec<HostOp>,
    size_queries: usize,
    fail_adds: bool,
}

impl HeadlessHost {
    pub fn new(screen: Size) -> Self {
        Self {
            screen,
            status_bar: Some(0),
            attached: HashMap::new(),
            label: None,
            ops: Vec::new(),
            size_queries: 0,
            fail_adds: false,
        }
    }

    /// `None` makes `status_bar_height` fail.
    pub fn with_status_bar(mut self, height: Option<i32>) -> Self {
        self.status_bar = height;
        self
    }

    pub fn set_fail_adds(&mut self, fail: bool) {
        self.fail_adds = fail;
    }

    pub fn attached(&self, kind: OverlayKind) -> Option<&LayoutParams> {
        self.attached.get(&kind)
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn size_queries(&self) -> usize {
        self.size_queries
    }
}

impl OverlayHost for HeadlessHost {
    fn screen_size(&self) -> Size {
        self.screen
    }

    fn view_size(&mut self, kind: OverlayKind) -> Size {
        self.size_queries += 1;
        match kind {
            OverlayKind::Small => SMALL_VIEW_SIZE,
            OverlayKind::Big => BIG_VIEW_SIZE,
        }
    }

    fn add_view(&mut self, params: &LayoutParams) -> Result<(), PlatformError> {
        if self.fail_adds {
            return Err(PlatformError::Os("add refused".into()));
        }
        if self.attached.contains_key(&params.kind) {
            return Err(PlatformError::AlreadyAttached(params.kind));
        }
        tracing::info!(kind = ?params.kind, x = params.x, y = params.y, "overlay added");
        self.attached.insert(params.kind, *params);
        self.ops.push(HostOp::Add(*params));
        Ok(())
    }

    fn update_view_layout(&mut self, params: &LayoutParams) -> Result<(), PlatformError> {
        let slot = self
            .attached
            .get_mut(&params.kind)
            .ok_or(PlatformError::NotAttached(params.kind))?;
        *slot = *params;
        tracing::debug!(kind = ?params.kind, x = params.x, y = params.y, "overlay moved");
        self.ops.push(HostOp::Update(*params));
        Ok(())
    }

    fn remove_view(&mut self, kind: OverlayKind) -> Result<(), PlatformError> {
        self.attached
            .remove(&kind)
            .ok_or(PlatformError::NotAttached(kind))?;
        if kind == OverlayKind::Small {
            self.label = None;
        }
        tracing::info!(?kind, "overlay removed");
        self.ops.push(HostOp::Remove(kind));
        Ok(())
    }

    fn set_label(&mut self, text: &str) -> Result<(), PlatformError> {
        if !self.attached.contains_key(&OverlayKind::Small) {
            return Err(PlatformError::NotAttached(OverlayKind::Small));
        }
        if self.label.as_deref() != Some(text) {
            tracing::info!(memory = text, "overlay label");
        }
        self.label = Some(text.to_string());
        self.ops.push(HostOp::Label(text.to_string()));
        Ok(())
    }

    fn status_bar_height(&self) -> Result<i32, PlatformError> {
        self.status_bar.ok_or(PlatformError::StatusBarUnavailable)
    }
}

/// Foreground probe driven by hand. Clones share the same foreground slot.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    foreground: Arc<Mutex<Option<String>>>,
    homes: Vec<String>,
}

impl StaticProbe {
    pub fn new(homes: Vec<String>) -> Self {
        Self {
            foreground: Arc::new(Mutex::new(None)),
            homes,
        }
    }

    pub fn set_foreground(&self, package: Option<&str>) {
        if let Ok(mut slot) = self.foreground.lock() {
            *slot = package.map(str::to_string);
        }
    }
}

impl ForegroundProbe for StaticProbe {
    fn foreground_package(&self) -> Option<String> {
        self.foreground.lock().ok().and_then(|slot| slot.clone())
    }

    fn home_packages(&self) -> Vec<String> {
        self.homes.clone()
    }
}

/// Home identifier the headless run reports as always in front.
pub const HEADLESS_HOME: &str = "headless.desktop";

/// Runs the overlay against the in-memory host with the home screen pinned
/// to the foreground. Overlay activity shows up in the log only.
pub fn run(config: &AppConfig) {
    let probe = StaticProbe::new(vec![HEADLESS_HOME.to_string()]);
    probe.set_foreground(Some(HEADLESS_HOME));

    let mut coordinator = OverlayCoordinator::new(
        HeadlessHost::new(Size::new(1920, 1080)),
        MemoryStatsReader::new(
            ProcMeminfo::new(&config.meminfo_path),
            config.fallback_label.clone(),
        ),
        OverlaySettings::from(config),
    );

    let (tx, rx) = mpsc::channel();
    let watcher = ForegroundWatcher::new(
        HomeDetector::new(probe, config.home_packages.clone()),
        coordinator.shared_visibility(),
        ChannelDispatcher::new(tx),
    );
    let mut service = WatcherService::new(watcher, Duration::from_millis(config.poll_interval_ms));
    service.on_start_command();

    run_ui_loop(rx, &mut coordinator);
    service.on_destroy();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_add_is_rejected() {
        let mut host = HeadlessHost::new(Size::new(800, 600));
        let params = LayoutParams::small(host.screen_size(), SMALL_VIEW_SIZE);
        host.add_view(&params).unwrap();
        assert!(matches!(
            host.add_view(&params),
            Err(PlatformError::AlreadyAttached(OverlayKind::Small))
        ));
        assert_eq!(host.attached_count(), 1);
    }

    #[test]
    fn label_needs_small_overlay() {
        let mut host = HeadlessHost::new(Size::new(800, 600));
        assert!(host.set_label("10%").is_err());
    }

    #[test]
    fn probe_clones_share_foreground() {
        let probe = StaticProbe::new(vec!["home".into()]);
        let other = probe.clone();
        probe.set_foreground(Some("home"));
        assert_eq!(other.foreground_package().as_deref(), Some("home"));
    }
}
