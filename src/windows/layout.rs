//! Window geometry rules, kept free of any windowing handles so the numbers
//! can be tested directly.

use serde::Serialize;

use crate::settings::MiniPosition;

/// Main window width with the side panel closed.
pub const COMPACT_WIDTH: u32 = 460;
/// Main window width with the side panel open.
pub const FULL_WIDTH: u32 = 900;
pub const MIN_HEIGHT: u32 = 550;
/// The expanded layout breaks below this, so the minimum follows the mode.
pub const FULL_MIN_WIDTH: u32 = 700;
/// The mini timer is a square.
pub const MINI_SIZE: u32 = 160;

pub const RESIZE_STEPS: u32 = 12;
pub const RESIZE_FRAME_MS: u64 = 16;

/// Offset from the mini window origin to the point checked for visibility.
const CENTER_PROBE_OFFSET: i32 = 80;
/// Default mini position sits this far in from the work area's bottom-right.
const DEFAULT_INSET: i32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayBounds {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && x < self.x + self.width as i32
            && y < self.y + self.height as i32
    }
}

/// Where to place the mini window: the saved spot if a probe point near its
/// center still lands on a connected display, otherwise the bottom-right of
/// the primary work area. Guards against a position saved on a monitor that
/// has since been unplugged.
pub fn resolve_mini_position(
    saved: MiniPosition,
    displays: &[DisplayBounds],
    primary_work_area: DisplayBounds,
) -> (i32, i32) {
    if let (Some(x), Some(y)) = (saved.x, saved.y) {
        let (probe_x, probe_y) = (x + CENTER_PROBE_OFFSET, y + CENTER_PROBE_OFFSET);
        if displays.iter().any(|d| d.contains(probe_x, probe_y)) {
            return (x, y);
        }
    }
    (
        primary_work_area.x + primary_work_area.width as i32 - DEFAULT_INSET,
        primary_work_area.y + primary_work_area.height as i32 - DEFAULT_INSET,
    )
}

pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeFrame {
    pub x: i32,
    pub width: u32,
}

/// Frames for the panel open/close animation. The window grows (or shrinks)
/// around its center, so x shifts by half the width change each frame. The
/// last frame snaps to the exact target.
pub fn resize_frames(start_x: i32, start_width: u32, target_width: u32) -> Vec<ResizeFrame> {
    let delta = target_width as f64 - start_width as f64;
    (1..=RESIZE_STEPS)
        .map(|step| {
            let width = if step == RESIZE_STEPS {
                target_width as f64
            } else {
                let eased = ease_out_cubic(step as f64 / RESIZE_STEPS as f64);
                start_width as f64 + delta * eased
            };
            let shift = (width - start_width as f64) / 2.0;
            ResizeFrame {
                x: start_x - shift.round() as i32,
                width: width.round() as u32,
            }
        })
        .collect()
}

/// Minimum width to enforce for a given target width. Must be set before
/// shrinking below the old minimum, so callers apply the smaller of old and
/// new before animating and the exact value after.
pub fn min_width_for(target_width: u32) -> u32 {
    if target_width > COMPACT_WIDTH {
        FULL_MIN_WIDTH
    } else {
        COMPACT_WIDTH
    }
}

/// Which presentation the app is in. Exactly one of the main or mini windows
/// is visible at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    Main,
    Mini,
}

/// Ordered side effects for a mode switch, interpreted by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    /// Un-minimize first so the hide below does not leave a taskbar ghost.
    RestoreBeforeHide,
    /// Keep the hidden main window off the taskbar; reactivating it from
    /// there while its webview is throttled can freeze the window.
    SetSkipTaskbar(bool),
    HideMain,
    CreateTray,
    CreateMini,
    DestroyMini,
    DestroyTray,
    ShowMain,
    FocusMain,
}

pub fn plan_transition(from: WindowMode, to: WindowMode) -> Vec<WindowAction> {
    use WindowAction::*;
    match (from, to) {
        (WindowMode::Main, WindowMode::Mini) => {
            vec![
                RestoreBeforeHide,
                SetSkipTaskbar(true),
                HideMain,
                CreateTray,
                CreateMini,
            ]
        }
        (WindowMode::Mini, WindowMode::Main) => vec![
            DestroyMini,
            DestroyTray,
            SetSkipTaskbar(false),
            ShowMain,
            FocusMain,
        ],
        _ => Vec::new(),
    }
}
