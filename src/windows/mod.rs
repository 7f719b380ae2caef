//! Main/mini window orchestration.
//!
//! The app shows exactly one of two surfaces at a time: the full main window
//! while idle, or the floating mini timer (plus a tray icon) while a
//! countdown runs. All geometry decisions live in [`layout`]; this module
//! applies them to real windows.

pub mod layout;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{info, warn};
use tauri::{
    menu::{ContextMenu, Menu, MenuItem, PredefinedMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIcon, TrayIconBuilder, TrayIconEvent},
    AppHandle, Emitter, LogicalSize, Manager, PhysicalPosition, PhysicalSize, WebviewUrl,
    WebviewWindowBuilder,
};

use crate::ipc::{DisplayMessage, PointPayload};
use crate::settings::MiniPosition;
use crate::store::DataStore;
use layout::{DisplayBounds, WindowAction, WindowMode};

pub const MAIN_LABEL: &str = "main";
pub const MINI_LABEL: &str = "mini";

struct DragOrigin {
    window: PhysicalPosition<i32>,
    cursor: PointPayload,
}

pub struct WindowOrchestrator {
    app: AppHandle,
    store: DataStore,
    mode: Mutex<WindowMode>,
    always_on_top: AtomicBool,
    theme: Mutex<(String, String)>,
    tray: Mutex<Option<TrayIcon>>,
    resize_task: Mutex<Option<tauri::async_runtime::JoinHandle<()>>>,
    drag_origin: Mutex<Option<DragOrigin>>,
}

impl WindowOrchestrator {
    pub fn new(app: AppHandle, store: DataStore) -> Arc<Self> {
        let settings = store.settings();
        Arc::new(Self {
            app,
            store,
            mode: Mutex::new(WindowMode::Main),
            always_on_top: AtomicBool::new(settings.general.always_on_top),
            theme: Mutex::new((
                settings.appearance.theme.clone(),
                settings.appearance.accent_color,
            )),
            tray: Mutex::new(None),
            resize_task: Mutex::new(None),
            drag_origin: Mutex::new(None),
        })
    }

    pub fn mode(&self) -> WindowMode {
        *self.mode.lock().unwrap()
    }

    /// Send a push message to one display, silently dropping it if that
    /// window does not currently exist.
    pub fn notify(&self, label: &str, message: &DisplayMessage) {
        if let Some(window) = self.app.get_webview_window(label) {
            let _ = window.emit(message.channel(), message.payload());
        }
    }

    pub fn broadcast(&self, message: &DisplayMessage) {
        self.notify(MAIN_LABEL, message);
        self.notify(MINI_LABEL, message);
    }

    /// Follow the countdown run state: running swaps to the mini surface,
    /// stopped brings the main window back.
    pub fn set_timer_running(self: &Arc<Self>, running: bool) {
        let target = if running {
            WindowMode::Mini
        } else {
            WindowMode::Main
        };
        self.switch_to(target);
    }

    pub fn restore_main(self: &Arc<Self>) {
        self.switch_to(WindowMode::Main);
    }

    fn switch_to(self: &Arc<Self>, target: WindowMode) {
        let plan = {
            let mut mode = self.mode.lock().unwrap();
            let plan = layout::plan_transition(*mode, target);
            if !plan.is_empty() {
                *mode = target;
            }
            plan
        };
        if plan.is_empty() {
            return;
        }
        info!("window mode -> {target:?}");
        for action in plan {
            if let Err(err) = self.apply(action) {
                warn!("window transition step {action:?} failed: {err:#}");
            }
        }
    }

    fn apply(self: &Arc<Self>, action: WindowAction) -> Result<()> {
        match action {
            WindowAction::RestoreBeforeHide => {
                if let Some(main) = self.app.get_webview_window(MAIN_LABEL) {
                    main.unminimize()?;
                }
            }
            WindowAction::SetSkipTaskbar(skip) => {
                if let Some(main) = self.app.get_webview_window(MAIN_LABEL) {
                    main.set_skip_taskbar(skip)?;
                }
            }
            WindowAction::HideMain => {
                if let Some(main) = self.app.get_webview_window(MAIN_LABEL) {
                    main.hide()?;
                }
            }
            WindowAction::CreateTray => {
                let tray = self.build_tray()?;
                *self.tray.lock().unwrap() = Some(tray);
            }
            WindowAction::CreateMini => {
                self.create_mini_window()?;
            }
            WindowAction::DestroyMini => {
                if let Some(mini) = self.app.get_webview_window(MINI_LABEL) {
                    mini.close()?;
                }
            }
            WindowAction::DestroyTray => {
                self.tray.lock().unwrap().take();
            }
            WindowAction::ShowMain => {
                if let Some(main) = self.app.get_webview_window(MAIN_LABEL) {
                    main.show()?;
                }
            }
            WindowAction::FocusMain => {
                if let Some(main) = self.app.get_webview_window(MAIN_LABEL) {
                    main.set_focus()?;
                }
            }
        }
        Ok(())
    }

    fn create_mini_window(self: &Arc<Self>) -> Result<()> {
        if self.app.get_webview_window(MINI_LABEL).is_some() {
            return Ok(());
        }
        let (x, y) = self.resolved_mini_position();
        let window = WebviewWindowBuilder::new(
            &self.app,
            MINI_LABEL,
            WebviewUrl::App("mini.html".into()),
        )
        .title("FocusFlow")
        .inner_size(layout::MINI_SIZE as f64, layout::MINI_SIZE as f64)
        .decorations(false)
        .transparent(true)
        .shadow(false)
        .resizable(false)
        .maximizable(false)
        .skip_taskbar(true)
        .always_on_top(self.always_on_top.load(Ordering::Relaxed))
        .visible(true)
        .build()?;
        window.set_position(PhysicalPosition::new(x, y))?;
        Ok(())
    }

    fn resolved_mini_position(&self) -> (i32, i32) {
        let saved = self.store.settings().mini_timer.position;
        let displays: Vec<DisplayBounds> = self
            .app
            .available_monitors()
            .unwrap_or_default()
            .iter()
            .map(monitor_bounds)
            .collect();
        let primary = self
            .app
            .primary_monitor()
            .ok()
            .flatten()
            .map(|m| monitor_bounds(&m))
            .or_else(|| displays.first().copied())
            .unwrap_or(DisplayBounds {
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
            });
        layout::resolve_mini_position(saved, &displays, primary)
    }

    fn build_tray(self: &Arc<Self>) -> Result<TrayIcon> {
        let show = MenuItem::with_id(&self.app, "show", "Show FocusFlow", true, None::<&str>)?;
        let toggle = MenuItem::with_id(&self.app, "toggle", "Pause / Resume", true, None::<&str>)?;
        let end = MenuItem::with_id(&self.app, "end", "End Session", true, None::<&str>)?;
        let reset = MenuItem::with_id(&self.app, "reset", "Reset Timer", true, None::<&str>)?;
        let quit = MenuItem::with_id(&self.app, "quit", "Quit", true, None::<&str>)?;
        let menu = Menu::with_items(
            &self.app,
            &[
                &show,
                &PredefinedMenuItem::separator(&self.app)?,
                &toggle,
                &end,
                &reset,
                &PredefinedMenuItem::separator(&self.app)?,
                &quit,
            ],
        )?;

        let mut builder = TrayIconBuilder::new()
            .tooltip("FocusFlow")
            .menu(&menu)
            .show_menu_on_left_click(false)
            .on_menu_event(|app, event| handle_menu_event(app, event.id().as_ref()))
            .on_tray_icon_event(|tray, event| {
                if let TrayIconEvent::Click {
                    button: MouseButton::Left,
                    button_state: MouseButtonState::Up,
                    ..
                } = event
                {
                    let state = tray.app_handle().state::<crate::AppState>();
                    state.windows.restore_main();
                }
            });
        if let Some(icon) = self.app.default_window_icon() {
            builder = builder.icon(icon.clone());
        }
        Ok(builder.build(&self.app)?)
    }

    /// The right-click menu on the mini window mirrors the tray menu.
    pub fn show_mini_context_menu(&self) -> Result<()> {
        let window = self
            .app
            .get_webview_window(MINI_LABEL)
            .ok_or_else(|| anyhow!("mini window is not open"))?;
        let toggle = MenuItem::with_id(&self.app, "toggle", "Pause / Resume", true, None::<&str>)?;
        let end = MenuItem::with_id(&self.app, "end", "End Session", true, None::<&str>)?;
        let reset = MenuItem::with_id(&self.app, "reset", "Reset Timer", true, None::<&str>)?;
        let show = MenuItem::with_id(&self.app, "show", "Back to Main Window", true, None::<&str>)?;
        let menu = Menu::with_items(
            &self.app,
            &[
                &toggle,
                &end,
                &reset,
                &PredefinedMenuItem::separator(&self.app)?,
                &show,
            ],
        )?;
        menu.popup(window.as_ref().window())?;
        Ok(())
    }

    /// Global shortcut: surface the app when it is tucked away, tuck it away
    /// when it is front and center.
    pub fn toggle_via_shortcut(self: &Arc<Self>) {
        if self.mode() == WindowMode::Mini {
            self.restore_main();
            return;
        }
        let Some(main) = self.app.get_webview_window(MAIN_LABEL) else {
            return;
        };
        if main.is_minimized().unwrap_or(false) {
            let _ = main.unminimize();
            let _ = main.set_focus();
        } else if main.is_focused().unwrap_or(false) {
            let _ = main.minimize();
        } else {
            let _ = main.show();
            let _ = main.set_focus();
        }
    }

    pub fn minimize_main(&self) {
        if let Some(main) = self.app.get_webview_window(MAIN_LABEL) {
            let _ = main.minimize();
        }
    }

    pub fn toggle_maximize_main(&self) {
        if let Some(main) = self.app.get_webview_window(MAIN_LABEL) {
            if main.is_maximized().unwrap_or(false) {
                let _ = main.unmaximize();
            } else {
                let _ = main.maximize();
            }
        }
    }

    pub fn close_main(&self) {
        if let Some(main) = self.app.get_webview_window(MAIN_LABEL) {
            let _ = main.close();
        }
    }

    pub fn set_always_on_top(&self, enabled: bool) {
        self.always_on_top.store(enabled, Ordering::Relaxed);
        for label in [MAIN_LABEL, MINI_LABEL] {
            if let Some(window) = self.app.get_webview_window(label) {
                let _ = window.set_always_on_top(enabled);
            }
        }
        self.store
            .update_settings(|s| s.general.always_on_top = enabled);
    }

    /// Persist a theme change and push it to every open display.
    pub fn apply_theme(&self, theme: &str, accent: &str) {
        *self.theme.lock().unwrap() = (theme.to_string(), accent.to_string());
        self.store.update_settings(|s| {
            s.appearance.theme = theme.to_string();
            s.appearance.accent_color = accent.to_string();
        });
        let color = match theme {
            "light" => tauri::window::Color(245, 245, 245, 255),
            _ => tauri::window::Color(10, 10, 10, 255),
        };
        for label in [MAIN_LABEL, MINI_LABEL] {
            if let Some(window) = self.app.get_webview_window(label) {
                let _ = window.set_background_color(Some(color));
            }
        }
        self.broadcast(&DisplayMessage::ApplyTheme {
            theme: theme.to_string(),
            accent: accent.to_string(),
        });
    }

    /// Re-send the stored theme to a display that just loaded.
    pub fn sync_theme(&self) {
        let (theme, accent) = self.theme.lock().unwrap().clone();
        self.broadcast(&DisplayMessage::ApplyTheme { theme, accent });
    }

    /// Animate the main window to a new width, growing around its center.
    /// A second request supersedes any animation still in flight.
    pub fn set_window_width(&self, target_logical: f64) {
        let target_logical = target_logical.clamp(
            layout::COMPACT_WIDTH as f64,
            layout::FULL_WIDTH as f64,
        );
        let Some(main) = self.app.get_webview_window(MAIN_LABEL) else {
            return;
        };
        let mut guard = self.resize_task.lock().unwrap();
        if let Some(task) = guard.take() {
            task.abort();
        }
        *guard = Some(tauri::async_runtime::spawn(async move {
            if let Err(err) = animate_width(&main, target_logical).await {
                warn!("window resize failed: {err:#}");
            }
        }));
    }

    pub fn begin_mini_drag(&self, cursor: PointPayload) {
        let Some(mini) = self.app.get_webview_window(MINI_LABEL) else {
            return;
        };
        let Ok(window) = mini.outer_position() else {
            return;
        };
        *self.drag_origin.lock().unwrap() = Some(DragOrigin { window, cursor });
        self.notify(
            MINI_LABEL,
            &DisplayMessage::MiniDragStartPos {
                x: window.x,
                y: window.y,
            },
        );
    }

    pub fn drag_mini(&self, cursor: PointPayload) {
        let guard = self.drag_origin.lock().unwrap();
        let Some(origin) = guard.as_ref() else {
            return;
        };
        let x = origin.window.x + (cursor.x - origin.cursor.x).round() as i32;
        let y = origin.window.y + (cursor.y - origin.cursor.y).round() as i32;
        if let Some(mini) = self.app.get_webview_window(MINI_LABEL) {
            let _ = mini.set_position(PhysicalPosition::new(x, y));
        }
    }

    /// Drop the drag and persist wherever the window ended up.
    pub fn end_mini_drag(&self) {
        if self.drag_origin.lock().unwrap().take().is_none() {
            return;
        }
        let Some(mini) = self.app.get_webview_window(MINI_LABEL) else {
            return;
        };
        if let Ok(pos) = mini.outer_position() {
            self.store.update_settings(|s| {
                s.mini_timer.position = MiniPosition {
                    x: Some(pos.x),
                    y: Some(pos.y),
                };
            });
            self.notify(
                MINI_LABEL,
                &DisplayMessage::MiniPositionSaved { x: pos.x, y: pos.y },
            );
        }
    }
}

fn monitor_bounds(monitor: &tauri::Monitor) -> DisplayBounds {
    DisplayBounds {
        x: monitor.position().x,
        y: monitor.position().y,
        width: monitor.size().width,
        height: monitor.size().height,
    }
}

fn handle_menu_event(app: &AppHandle, id: &str) {
    let state = app.state::<crate::AppState>();
    match id {
        "show" => state.windows.restore_main(),
        "toggle" => {
            let timer = state.timer.clone();
            state.windows.broadcast(&DisplayMessage::RemotePause);
            tauri::async_runtime::spawn(async move {
                timer.toggle_pause().await;
            });
        }
        "end" => {
            let timer = state.timer.clone();
            state.windows.broadcast(&DisplayMessage::RemoteEnd);
            tauri::async_runtime::spawn(async move {
                timer.end().await;
            });
        }
        "reset" => {
            let timer = state.timer.clone();
            state.windows.broadcast(&DisplayMessage::RemoteReset);
            tauri::async_runtime::spawn(async move {
                timer.reset().await;
            });
        }
        "quit" => app.exit(0),
        _ => {}
    }
}

async fn animate_width(main: &tauri::WebviewWindow, target_logical: f64) -> Result<()> {
    let scale = main.scale_factor()?;
    let position = main.outer_position()?;
    let size = main.inner_size()?;
    let target = (target_logical * scale).round() as u32;
    if size.width == target {
        return Ok(());
    }

    // Relax the minimum before shrinking so the animation is not clamped,
    // then enforce the mode's real minimum once settled.
    let loose_min = layout::min_width_for(target).min(layout::COMPACT_WIDTH) as f64;
    main.set_min_size(Some(LogicalSize::new(loose_min, layout::MIN_HEIGHT as f64)))?;

    for frame in layout::resize_frames(position.x, size.width, target) {
        main.set_size(PhysicalSize::new(frame.width, size.height))?;
        main.set_position(PhysicalPosition::new(frame.x, position.y))?;
        tokio::time::sleep(Duration::from_millis(layout::RESIZE_FRAME_MS)).await;
    }

    main.set_min_size(Some(LogicalSize::new(
        layout::min_width_for(target) as f64,
        layout::MIN_HEIGHT as f64,
    )))?;
    Ok(())
}
