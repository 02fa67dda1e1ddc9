// Win32 backend: layered topmost popup windows for the overlays, desktop
// detection by foreground window class, and the UI-thread message loop.
//
// The overlay windows are WS_EX_NOACTIVATE so clicking them never steals the
// foreground from the desktop. Pointer input on the overlays is turned into
// `UiMessage`s and drained by the same loop that applies watcher decisions,
// so all overlay mutation stays on this thread.

mod tray;

use super::{ForegroundProbe, OverlayHost, PlatformError};
use crate::config::AppConfig;
use crate::dispatch::{apply, UiDispatcher, UiMessage};
use crate::geometry::{LayoutParams, OverlayKind, PointF, Size};
use crate::memory::{MemoryError, MemorySource, MemoryStatsReader};
use crate::overlay::{BigOverlayButton, OverlayCoordinator, OverlaySettings};
use crate::touch::{TouchAction, TouchEvent};
use crate::watcher::{ForegroundWatcher, HomeDetector, WatcherService};

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreateSolidBrush, DeleteObject, DrawTextW, EndPaint, FillRect, InvalidateRect,
    SetBkMode, SetTextColor, DT_CENTER, DT_SINGLELINE, DT_VCENTER, HBRUSH, HDC, HGDIOBJ,
    PAINTSTRUCT, TRANSPARENT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::SystemInformation::{GlobalMemoryStatusEx, MEMORYSTATUSEX};
use windows::Win32::System::Threading::{CreateMutexW, OpenMutexW, SYNCHRONIZATION_ACCESS_RIGHTS};
use windows::Win32::UI::Input::KeyboardAndMouse::{GetCapture, ReleaseCapture, SetCapture};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClassNameW,
    GetClientRect, GetCursorPos, GetForegroundWindow, GetMessageW, GetSystemMetrics,
    GetWindowLongPtrW, PostMessageW, PostQuitMessage, RegisterClassW, SetLayeredWindowAttributes,
    SetWindowLongPtrW, SetWindowPos, ShowWindow, TranslateMessage, CS_HREDRAW, CS_VREDRAW,
    GWLP_USERDATA, HWND_TOPMOST, LWA_ALPHA, MSG, SM_CXSCREEN, SM_CYSCREEN, SWP_NOACTIVATE,
    SW_SHOWNOACTIVATE, WINDOW_EX_STYLE, WM_APP, WM_CAPTURECHANGED, WM_COMMAND, WM_LBUTTONDOWN,
    WM_LBUTTONUP, WM_MOUSEMOVE, WM_PAINT, WM_RBUTTONUP, WNDCLASSW, WS_EX_LAYERED,
    WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
};

const OVERLAY_CLASS: &str = "MemfloatOverlay";
const CONTROL_CLASS: &str = "MemfloatControl";
const SINGLE_INSTANCE_MUTEX: &str = "MemfloatMutex";

/// Posted to the control window after a `UiMessage` is queued.
const WM_APP_WAKE: u32 = WM_APP + 2;

const SMALL_SIZE: Size = Size::new(72, 36);
const BIG_SIZE: Size = Size::new(260, 160);
const BUTTON_HEIGHT: i32 = 40;
const OVERLAY_ALPHA: u8 = 230;

const CLR_BACKGROUND: COLORREF = COLORREF(0x00110703);
const CLR_FOREGROUND: COLORREF = COLORREF(0x00FCFAF8);
const CLR_BUTTON: COLORREF = COLORREF(0x003B291E);

/// Desktop shell window classes; the desktop is the "home screen" here.
const DESKTOP_CLASSES: [&str; 2] = ["Progman", "WorkerW"];

// Shared with the window procedures, which run re-entrantly inside host calls.
static DISPATCHER: Mutex<Option<Win32Dispatcher>> = Mutex::new(None);

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn os_error(e: windows::core::Error) -> PlatformError {
    PlatformError::Os(e.to_string())
}

fn hwnd_from(raw: isize) -> HWND {
    HWND(raw as *mut std::ffi::c_void)
}

/// Per-window state. Boxed by `Win32Host` and reachable from the window
/// procedure through `GWLP_USERDATA` until the window is destroyed.
struct OverlayWindow {
    kind: OverlayKind,
    label: String,
}

/// The state pointer stored on `hwnd`, if it is one of our overlays.
unsafe fn window_state<'a>(hwnd: HWND) -> Option<&'a OverlayWindow> {
    let ptr = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const OverlayWindow;
    ptr.as_ref()
}

fn post(msg: UiMessage) {
    if let Some(dispatcher) = DISPATCHER.lock().ok().and_then(|d| d.clone()) {
        dispatcher.post(msg);
    }
}

/// Queues a message and wakes the message loop through the control window.
#[derive(Clone)]
pub struct Win32Dispatcher {
    tx: Sender<UiMessage>,
    control: isize,
}

impl UiDispatcher for Win32Dispatcher {
    fn post(&self, msg: UiMessage) -> bool {
        if self.tx.send(msg).is_err() {
            return false;
        }
        unsafe {
            PostMessageW(
                Some(hwnd_from(self.control)),
                WM_APP_WAKE,
                WPARAM(0),
                LPARAM(0),
            )
            .is_ok()
        }
    }
}

/// Memory figures from `GlobalMemoryStatusEx`.
pub struct Win32Memory;

impl Win32Memory {
    fn status() -> Result<MEMORYSTATUSEX, MemoryError> {
        let mut status = MEMORYSTATUSEX {
            dwLength: std::mem::size_of::<MEMORYSTATUSEX>() as u32,
            ..Default::default()
        };
        unsafe { GlobalMemoryStatusEx(&mut status) }
            .map_err(|e| MemoryError::Query(e.to_string()))?;
        Ok(status)
    }
}

impl MemorySource for Win32Memory {
    fn total_kb(&self) -> Result<u64, MemoryError> {
        Ok(Self::status()?.ullTotalPhys / 1024)
    }

    fn available_kb(&self) -> Result<u64, MemoryError> {
        Ok(Self::status()?.ullAvailPhys / 1024)
    }
}

/// Reports the class of the foreground window.
pub struct DesktopProbe;

impl ForegroundProbe for DesktopProbe {
    fn foreground_package(&self) -> Option<String> {
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.0.is_null() {
                return None;
            }
            let mut buf = [0u16; 256];
            let len = GetClassNameW(hwnd, &mut buf);
            if len <= 0 {
                return None;
            }
            Some(String::from_utf16_lossy(&buf[..len as usize]))
        }
    }

    fn home_packages(&self) -> Vec<String> {
        DESKTOP_CLASSES.iter().map(|c| c.to_string()).collect()
    }
}

struct Attached {
    hwnd: isize,
    state: *mut OverlayWindow,
}

impl Attached {
    fn hwnd(&self) -> HWND {
        hwnd_from(self.hwnd)
    }
}

#[derive(Default)]
pub struct Win32Host {
    small: Option<Attached>,
    big: Option<Attached>,
    /// Last memory label, copied into each overlay window as it is created.
    label: String,
}

impl Win32Host {
    fn slot(&mut self, kind: OverlayKind) -> &mut Option<Attached> {
        match kind {
            OverlayKind::Small => &mut self.small,
            OverlayKind::Big => &mut self.big,
        }
    }
}

impl Drop for Win32Host {
    fn drop(&mut self) {
        for kind in [OverlayKind::Small, OverlayKind::Big] {
            let _ = self.remove_view(kind);
        }
    }
}

impl OverlayHost for Win32Host {
    fn screen_size(&self) -> Size {
        unsafe { Size::new(GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }

    fn view_size(&mut self, kind: OverlayKind) -> Size {
        match kind {
            OverlayKind::Small => SMALL_SIZE,
            OverlayKind::Big => BIG_SIZE,
        }
    }

    fn add_view(&mut self, params: &LayoutParams) -> Result<(), PlatformError> {
        if self.slot(params.kind).is_some() {
            return Err(PlatformError::AlreadyAttached(params.kind));
        }

        let mut ex_style = WS_EX_LAYERED | WS_EX_TOOLWINDOW;
        if params.flags.system_overlay {
            ex_style |= WS_EX_TOPMOST;
        }
        if params.flags.not_focusable {
            ex_style |= WS_EX_NOACTIVATE;
        }

        let class_name = wide(OVERLAY_CLASS);
        let hwnd = unsafe {
            let hinstance = GetModuleHandleW(PCWSTR::null()).map_err(os_error)?;
            CreateWindowExW(
                ex_style,
                PCWSTR(class_name.as_ptr()),
                PCWSTR::null(),
                WS_POPUP,
                params.x,
                params.y,
                params.width,
                params.height,
                None,
                None,
                Some(hinstance.into()),
                None,
            )
            .map_err(os_error)?
        };

        let state = Box::into_raw(Box::new(OverlayWindow {
            kind: params.kind,
            label: self.label.clone(),
        }));
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, state as isize);
            let _ = SetLayeredWindowAttributes(hwnd, COLORREF(0), OVERLAY_ALPHA, LWA_ALPHA);
            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
        }
        *self.slot(params.kind) = Some(Attached {
            hwnd: hwnd.0 as isize,
            state,
        });
        Ok(())
    }

    fn update_view_layout(&mut self, params: &LayoutParams) -> Result<(), PlatformError> {
        let hwnd = self
            .slot(params.kind)
            .as_ref()
            .map(Attached::hwnd)
            .ok_or(PlatformError::NotAttached(params.kind))?;
        unsafe {
            SetWindowPos(
                hwnd,
                Some(HWND_TOPMOST),
                params.x,
                params.y,
                params.width,
                params.height,
                SWP_NOACTIVATE,
            )
            .map_err(os_error)
        }
    }

    fn remove_view(&mut self, kind: OverlayKind) -> Result<(), PlatformError> {
        let attached = self
            .slot(kind)
            .take()
            .ok_or(PlatformError::NotAttached(kind))?;
        let hwnd = attached.hwnd();
        unsafe {
            // Detach the state first so messages sent during destruction skip it.
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
            let destroyed = DestroyWindow(hwnd).map_err(os_error);
            drop(Box::from_raw(attached.state));
            destroyed
        }
    }

    fn set_label(&mut self, text: &str) -> Result<(), PlatformError> {
        let attached = self
            .small
            .as_ref()
            .ok_or(PlatformError::NotAttached(OverlayKind::Small))?;
        let hwnd = attached.hwnd();
        unsafe {
            (*attached.state).label = text.to_string();
            let _ = InvalidateRect(Some(hwnd), None, true);
        }
        self.label = text.to_string();
        Ok(())
    }

    fn status_bar_height(&self) -> Result<i32, PlatformError> {
        // Overlay coordinates are plain screen coordinates on the desktop.
        Ok(0)
    }
}

fn big_buttons(client: &RECT) -> (RECT, RECT) {
    let top = client.bottom - BUTTON_HEIGHT;
    let mid = (client.left + client.right) / 2;
    let close = RECT {
        left: client.left,
        top,
        right: mid,
        bottom: client.bottom,
    };
    let back = RECT {
        left: mid,
        top,
        right: client.right,
        bottom: client.bottom,
    };
    (close, back)
}

fn contains(rect: &RECT, x: i32, y: i32) -> bool {
    x >= rect.left && x < rect.right && y >= rect.top && y < rect.bottom
}

unsafe fn draw_text(hdc: HDC, text: &str, rect: &RECT) {
    let mut buf: Vec<u16> = text.encode_utf16().collect();
    let mut rect = *rect;
    DrawTextW(hdc, &mut buf, &mut rect, DT_CENTER | DT_VCENTER | DT_SINGLELINE);
}

unsafe fn paint(hwnd: HWND, state: &OverlayWindow) {
    let mut ps = PAINTSTRUCT::default();
    let hdc = BeginPaint(hwnd, &mut ps);

    let mut client = RECT::default();
    let _ = GetClientRect(hwnd, &mut client);

    let background: HBRUSH = CreateSolidBrush(CLR_BACKGROUND);
    FillRect(hdc, &client, background);
    let _ = DeleteObject(HGDIOBJ::from(background));

    SetBkMode(hdc, TRANSPARENT);
    SetTextColor(hdc, CLR_FOREGROUND);

    let label = state.label.as_str();
    match state.kind {
        OverlayKind::Small => draw_text(hdc, label, &client),
        OverlayKind::Big => {
            let (close, back) = big_buttons(&client);
            let header = RECT {
                bottom: close.top,
                ..client
            };
            draw_text(hdc, &format!("Memory used: {label}"), &header);

            let button: HBRUSH = CreateSolidBrush(CLR_BUTTON);
            for (rect, text) in [(close, "Close"), (back, "Back")] {
                let inner = RECT {
                    left: rect.left + 6,
                    top: rect.top + 4,
                    right: rect.right - 6,
                    bottom: rect.bottom - 6,
                };
                FillRect(hdc, &inner, button);
                draw_text(hdc, text, &inner);
            }
            let _ = DeleteObject(HGDIOBJ::from(button));
        }
    }

    let _ = EndPaint(hwnd, &ps);
}

fn lparam_point(lparam: LPARAM) -> (i32, i32) {
    let x = (lparam.0 & 0xffff) as i16 as i32;
    let y = ((lparam.0 >> 16) & 0xffff) as i16 as i32;
    (x, y)
}

fn touch_event(action: TouchAction, lparam: LPARAM) -> TouchEvent {
    let (x, y) = lparam_point(lparam);
    let mut cursor = POINT::default();
    unsafe {
        let _ = GetCursorPos(&mut cursor);
    }
    TouchEvent::new(
        action,
        PointF::new(x as f32, y as f32),
        PointF::new(cursor.x as f32, cursor.y as f32),
    )
}

unsafe extern "system" fn overlay_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let Some(state) = window_state(hwnd) else {
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    };

    match (state.kind, msg) {
        (_, WM_PAINT) => {
            paint(hwnd, state);
            LRESULT(0)
        }
        (OverlayKind::Small, WM_LBUTTONDOWN) => {
            let _ = SetCapture(hwnd);
            post(UiMessage::SmallTouch(touch_event(TouchAction::Down, lparam)));
            LRESULT(0)
        }
        (OverlayKind::Small, WM_MOUSEMOVE) => {
            if GetCapture() == hwnd {
                post(UiMessage::SmallTouch(touch_event(TouchAction::Move, lparam)));
            }
            LRESULT(0)
        }
        (OverlayKind::Small, WM_LBUTTONUP) => {
            post(UiMessage::SmallTouch(touch_event(TouchAction::Up, lparam)));
            let _ = ReleaseCapture();
            LRESULT(0)
        }
        (OverlayKind::Small, WM_CAPTURECHANGED) => {
            post(UiMessage::SmallTouch(touch_event(TouchAction::Cancel, lparam)));
            LRESULT(0)
        }
        (OverlayKind::Big, WM_LBUTTONUP) => {
            let mut client = RECT::default();
            let _ = GetClientRect(hwnd, &mut client);
            let (close, back) = big_buttons(&client);
            let (x, y) = lparam_point(lparam);
            if contains(&close, x, y) {
                post(UiMessage::BigButton(BigOverlayButton::Close));
            } else if contains(&back, x, y) {
                post(UiMessage::BigButton(BigOverlayButton::Back));
            }
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

unsafe extern "system" fn control_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        // Queued messages are drained by the loop once this returns.
        WM_APP_WAKE => LRESULT(0),
        tray::WM_TRAY_ICON => {
            if lparam.0 as u32 == WM_RBUTTONUP || lparam.0 as u32 == WM_LBUTTONUP {
                tray::show_context_menu(hwnd);
            }
            LRESULT(0)
        }
        WM_COMMAND => {
            if (wparam.0 & 0xffff) as u32 == tray::IDM_QUIT {
                post(UiMessage::Shutdown);
            }
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

fn register_classes() -> Result<(), PlatformError> {
    let overlay_name = wide(OVERLAY_CLASS);
    let control_name = wide(CONTROL_CLASS);
    unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null()).map_err(os_error)?;

        let overlay = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(overlay_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(overlay_name.as_ptr()),
            ..Default::default()
        };
        let control = WNDCLASSW {
            lpfnWndProc: Some(control_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(control_name.as_ptr()),
            ..Default::default()
        };

        if RegisterClassW(&overlay) == 0 || RegisterClassW(&control) == 0 {
            return Err(PlatformError::Os("RegisterClassW failed".into()));
        }
    }
    Ok(())
}

/// Hidden window that owns the tray icon and wakes the message loop.
fn create_control_window() -> Result<HWND, PlatformError> {
    let class_name = wide(CONTROL_CLASS);
    unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null()).map_err(os_error)?;
        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            PCWSTR(class_name.as_ptr()),
            PCWSTR::null(),
            WS_POPUP,
            0,
            0,
            0,
            0,
            None,
            None,
            Some(hinstance.into()),
            None,
        )
        .map_err(os_error)
    }
}

fn is_already_running() -> bool {
    let name = wide(SINGLE_INSTANCE_MUTEX);

    unsafe {
        let existing = OpenMutexW(
            SYNCHRONIZATION_ACCESS_RIGHTS(0x001F0001), // MUTEX_ALL_ACCESS
            false,
            PCWSTR(name.as_ptr()),
        );
        if existing.is_ok() {
            return true;
        }
        let _ = CreateMutexW(None, true, PCWSTR(name.as_ptr()));
        false
    }
}

fn drain<H: OverlayHost, M: MemorySource>(
    rx: &Receiver<UiMessage>,
    coordinator: &mut OverlayCoordinator<H, M>,
) {
    while let Ok(msg) = rx.try_recv() {
        if apply(coordinator, msg).is_break() {
            unsafe { PostQuitMessage(0) };
        }
    }
}

/// Starts the watcher and runs the Win32 message loop until quit from the tray.
pub fn run(config: &AppConfig) -> Result<(), PlatformError> {
    if is_already_running() {
        tracing::info!("another instance is running, exiting");
        return Ok(());
    }

    register_classes()?;
    let control = create_control_window()?;
    tray::add_tray_icon(control);

    let (tx, rx) = mpsc::channel();
    let dispatcher = Win32Dispatcher {
        tx,
        control: control.0 as isize,
    };
    if let Ok(mut slot) = DISPATCHER.lock() {
        *slot = Some(dispatcher.clone());
    }

    let mut coordinator = OverlayCoordinator::new(
        Win32Host::default(),
        MemoryStatsReader::new(Win32Memory, config.fallback_label.clone()),
        OverlaySettings::from(config),
    );
    let watcher = ForegroundWatcher::new(
        HomeDetector::new(DesktopProbe, config.home_packages.clone()),
        coordinator.shared_visibility(),
        dispatcher,
    );
    let mut service = WatcherService::new(watcher, Duration::from_millis(config.poll_interval_ms));
    service.on_start_command();

    unsafe {
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
            drain(&rx, &mut coordinator);
        }
    }

    service.on_destroy();
    coordinator.remove_small();
    coordinator.remove_big();
    if let Ok(mut slot) = DISPATCHER.lock() {
        *slot = None;
    }
    tray::remove_tray_icon(control);
    unsafe {
        let _ = DestroyWindow(control);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    fn classes() {
        static REGISTER: Once = Once::new();
        REGISTER.call_once(|| register_classes().unwrap());
    }

    fn label_of(attached: &Option<Attached>) -> String {
        let hwnd = attached.as_ref().unwrap().hwnd();
        unsafe { window_state(hwnd) }.unwrap().label.clone()
    }

    #[test]
    fn label_is_stored_per_window() {
        classes();
        let mut host = Win32Host::default();
        let screen = host.screen_size();

        host.add_view(&LayoutParams::small(screen, SMALL_SIZE)).unwrap();
        host.set_label("42%").unwrap();
        assert_eq!(label_of(&host.small), "42%");

        let mut other = Win32Host::default();
        other.add_view(&LayoutParams::small(screen, SMALL_SIZE)).unwrap();
        assert_eq!(label_of(&other.small), "");

        host.add_view(&LayoutParams::big(screen, BIG_SIZE)).unwrap();
        assert_eq!(label_of(&host.big), "42%");

        let small = host.small.as_ref().unwrap().hwnd();
        host.remove_view(OverlayKind::Small).unwrap();
        assert!(unsafe { window_state(small) }.is_none());
        assert!(host.set_label("50%").is_err());
    }
}
