//! Win32 backend.
//!
//! - Gamma: `GetDeviceGammaRamp` on the screen DC, `SetDeviceGammaRamp` on a
//!   DC created for every attached monitor.
//! - Monitors: `EnumDisplayMonitors` + `GetMonitorInfoW`.
//! - Overlays: layered, click-through, tool-window popups painted with a
//!   black class brush; opacity through `SetLayeredWindowAttributes`.
//! - Foreground: an out-of-context `EVENT_SYSTEM_FOREGROUND` WinEvent hook.
//!   Out-of-context callbacks run on the thread that installed the hook while
//!   it pumps messages, so they are queued in a thread-local and drained by
//!   the subscription.
//!
//! Everything here must stay on the event loop thread.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::c_void;
use std::mem;
use std::rc::Rc;

use windows::Win32::Foundation::{BOOL, COLORREF, HMODULE, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    CreateDCW, CreateSolidBrush, DeleteDC, EnumDisplayMonitors, GetDC, GetMonitorInfoW, HDC,
    HMONITOR, MONITORINFOEXW, ReleaseDC,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Accessibility::{HWINEVENTHOOK, SetWinEventHook, UnhookWinEvent};
use windows::Win32::UI::ColorSystem::{GetDeviceGammaRamp, SetDeviceGammaRamp};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetForegroundWindow,
    LWA_ALPHA, MSG, PM_REMOVE, PeekMessageW, RegisterClassExW, SW_HIDE, SW_SHOWNOACTIVATE,
    SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SetLayeredWindowAttributes, SetWindowPos, ShowWindow,
    TranslateMessage, WNDCLASSEXW, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
    WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};
use windows::core::{PCWSTR, w};

use super::{
    DisplayEnumerator, ForegroundSource, ForegroundSubscription, GammaDevice, MessagePump,
    MonitorInfo, OverlaySurface, Platform, Rect, SurfaceFactory, WindowHandle,
};
use crate::gamma::GammaRamp;

const EVENT_SYSTEM_FOREGROUND: u32 = 0x0003;
const WINEVENT_OUTOFCONTEXT: u32 = 0x0000;
const ERROR_CLASS_ALREADY_EXISTS: i32 = 1410;
const OVERLAY_CLASS: &str = "EyeshadeOverlay";

fn wide_string(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

fn from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

// ─────────────────────────────────────────────────────────────────────────────
// Monitors
// ─────────────────────────────────────────────────────────────────────────────

unsafe extern "system" fn enum_monitors_callback(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _rect: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    unsafe {
        let monitors = &mut *(lparam.0 as *mut Vec<MonitorInfo>);

        let mut info = MONITORINFOEXW::default();
        info.monitorInfo.cbSize = mem::size_of::<MONITORINFOEXW>() as u32;

        if GetMonitorInfoW(hmonitor, &mut info.monitorInfo).as_bool() {
            let rc = info.monitorInfo.rcMonitor;
            let name_len = info
                .szDevice
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(info.szDevice.len());

            monitors.push(MonitorInfo {
                handle: hmonitor.0 as isize,
                name: String::from_utf16_lossy(&info.szDevice[..name_len]),
                rect: Rect::new(rc.left, rc.top, rc.right - rc.left, rc.bottom - rc.top),
                // MONITORINFOF_PRIMARY
                is_primary: info.monitorInfo.dwFlags & 1 != 0,
            });
        }
    }
    BOOL(1)
}

fn enumerate_monitors() -> Result<Vec<MonitorInfo>> {
    let mut monitors: Vec<MonitorInfo> = Vec::new();
    let ok = unsafe {
        EnumDisplayMonitors(
            None,
            None,
            Some(enum_monitors_callback),
            LPARAM(&mut monitors as *mut Vec<MonitorInfo> as isize),
        )
    };
    if !ok.as_bool() {
        anyhow::bail!(
            "EnumDisplayMonitors failed: {}",
            std::io::Error::last_os_error()
        );
    }
    Ok(monitors)
}

struct Win32Displays;

impl DisplayEnumerator for Win32Displays {
    fn enumerate(&mut self) -> Result<Vec<MonitorInfo>> {
        enumerate_monitors()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gamma
// ─────────────────────────────────────────────────────────────────────────────

struct Win32Gamma;

impl GammaDevice for Win32Gamma {
    fn read_ramp(&mut self) -> Result<GammaRamp> {
        let mut ramp = GammaRamp::identity();
        unsafe {
            let hdc = GetDC(HWND::default());
            if hdc.is_invalid() {
                anyhow::bail!("GetDC failed for the screen");
            }
            let ok = GetDeviceGammaRamp(hdc, &mut ramp as *mut GammaRamp as *mut c_void);
            ReleaseDC(HWND::default(), hdc);
            if !ok.as_bool() {
                anyhow::bail!("GetDeviceGammaRamp failed");
            }
        }
        Ok(ramp)
    }

    fn write_ramp(&mut self, ramp: &GammaRamp) -> Result<()> {
        let monitors = enumerate_monitors()?;
        let mut failed = Vec::new();

        for monitor in &monitors {
            let device = wide_string(&monitor.name);
            unsafe {
                let hdc = CreateDCW(w!("DISPLAY"), PCWSTR(device.as_ptr()), PCWSTR::null(), None);
                if hdc.is_invalid() {
                    failed.push(monitor.name.clone());
                    continue;
                }
                let ok = SetDeviceGammaRamp(hdc, ramp as *const GammaRamp as *const c_void);
                let _ = DeleteDC(hdc);
                if !ok.as_bool() {
                    failed.push(monitor.name.clone());
                }
            }
        }

        if !failed.is_empty() {
            anyhow::bail!("SetDeviceGammaRamp failed for {}", failed.join(", "));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Overlay surfaces
// ─────────────────────────────────────────────────────────────────────────────

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

struct Win32Surfaces {
    class_name: Vec<u16>,
}

impl Win32Surfaces {
    fn register() -> Result<Self> {
        let class_name = wide_string(OVERLAY_CLASS);
        unsafe {
            let hinstance = GetModuleHandleW(None).context("GetModuleHandleW failed")?;
            let wc = WNDCLASSEXW {
                cbSize: mem::size_of::<WNDCLASSEXW>() as u32,
                lpfnWndProc: Some(window_proc),
                hInstance: hinstance.into(),
                hbrBackground: CreateSolidBrush(COLORREF(0)),
                lpszClassName: PCWSTR(class_name.as_ptr()),
                ..Default::default()
            };

            if RegisterClassExW(&wc) == 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() != Some(ERROR_CLASS_ALREADY_EXISTS) {
                    anyhow::bail!("RegisterClassExW failed: {}", err);
                }
            }
        }
        Ok(Self { class_name })
    }
}

impl SurfaceFactory for Win32Surfaces {
    fn create_surface(&self, bounds: Rect) -> Result<Box<dyn OverlaySurface>> {
        let window_name = wide_string("eyeshade");
        let ex_style =
            WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE | WS_EX_TOPMOST;

        let hwnd = unsafe {
            let hinstance = GetModuleHandleW(None).context("GetModuleHandleW failed")?;
            CreateWindowExW(
                ex_style,
                PCWSTR(self.class_name.as_ptr()),
                PCWSTR(window_name.as_ptr()),
                WS_POPUP,
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                None,
                None,
                hinstance,
                None,
            )
            .context("CreateWindowExW failed")?
        };

        let mut surface = Win32Surface { hwnd };
        surface.set_opacity(0)?;
        Ok(Box::new(surface))
    }
}

struct Win32Surface {
    hwnd: HWND,
}

impl OverlaySurface for Win32Surface {
    fn handle(&self) -> WindowHandle {
        from_hwnd(self.hwnd)
    }

    fn set_opacity(&mut self, alpha: u8) -> Result<()> {
        unsafe { SetLayeredWindowAttributes(self.hwnd, COLORREF(0), alpha, LWA_ALPHA) }
            .context("SetLayeredWindowAttributes failed")
    }

    fn show(&mut self) -> Result<()> {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
        }
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_HIDE);
        }
        Ok(())
    }

    fn place_behind(&mut self, window: WindowHandle) -> Result<()> {
        unsafe {
            SetWindowPos(
                self.hwnd,
                to_hwnd(window),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
        }
        .context("SetWindowPos failed")
    }
}

impl Drop for Win32Surface {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Foreground notifications
// ─────────────────────────────────────────────────────────────────────────────

thread_local! {
    static FOREGROUND_QUEUE: RefCell<Option<VecDeque<isize>>> = const { RefCell::new(None) };
}

unsafe extern "system" fn foreground_event_proc(
    _hook: HWINEVENTHOOK,
    event: u32,
    hwnd: HWND,
    _id_object: i32,
    _id_child: i32,
    _thread: u32,
    _time: u32,
) {
    if event != EVENT_SYSTEM_FOREGROUND || hwnd.0.is_null() {
        return;
    }
    FOREGROUND_QUEUE.with(|queue| {
        if let Some(queue) = queue.borrow_mut().as_mut() {
            queue.push_back(hwnd.0 as isize);
        }
    });
}

struct Win32Foreground;

impl ForegroundSource for Win32Foreground {
    fn subscribe(&self) -> Result<Box<dyn ForegroundSubscription>> {
        let already = FOREGROUND_QUEUE.with(|queue| queue.borrow().is_some());
        if already {
            anyhow::bail!("A foreground subscription is already active");
        }

        // No WINEVENT_SKIPOWNPROCESS: the controller filters its own overlay.
        let hook = unsafe {
            SetWinEventHook(
                EVENT_SYSTEM_FOREGROUND,
                EVENT_SYSTEM_FOREGROUND,
                HMODULE::default(),
                Some(foreground_event_proc),
                0,
                0,
                WINEVENT_OUTOFCONTEXT,
            )
        };
        if hook.is_invalid() {
            anyhow::bail!(
                "SetWinEventHook failed: {}",
                std::io::Error::last_os_error()
            );
        }

        FOREGROUND_QUEUE.with(|queue| *queue.borrow_mut() = Some(VecDeque::new()));
        Ok(Box::new(Win32ForegroundSubscription { hook }))
    }

    fn current(&self) -> Option<WindowHandle> {
        let hwnd = unsafe { GetForegroundWindow() };
        (!hwnd.0.is_null()).then(|| from_hwnd(hwnd))
    }
}

struct Win32ForegroundSubscription {
    hook: HWINEVENTHOOK,
}

impl ForegroundSubscription for Win32ForegroundSubscription {
    fn try_next(&mut self) -> Option<WindowHandle> {
        FOREGROUND_QUEUE.with(|queue| {
            queue
                .borrow_mut()
                .as_mut()
                .and_then(VecDeque::pop_front)
                .map(WindowHandle)
        })
    }
}

impl Drop for Win32ForegroundSubscription {
    fn drop(&mut self) {
        unsafe {
            let _ = UnhookWinEvent(self.hook);
        }
        FOREGROUND_QUEUE.with(|queue| *queue.borrow_mut() = None);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message pump
// ─────────────────────────────────────────────────────────────────────────────

struct Win32Pump;

impl MessagePump for Win32Pump {
    fn pump(&mut self) {
        let mut msg = MSG::default();
        unsafe {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

/// Build the Win32 platform. Must be called on the event loop thread.
pub fn platform() -> Result<Platform> {
    Ok(Platform {
        name: "Win32",
        gamma: Box::new(Win32Gamma),
        displays: Box::new(Win32Displays),
        surfaces: Rc::new(Win32Surfaces::register()?),
        foreground: Rc::new(Win32Foreground),
        pump: Box::new(Win32Pump),
    })
}
