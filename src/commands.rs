//! Non-timer commands: settings, session history, reports, and the two
//! channel-dispatched bridge entry points the displays funnel everything
//! else through.

use chrono::Local;
use log::{debug, info, warn};
use serde_json::{json, Value};
use tauri::{AppHandle, State};
use tauri_plugin_dialog::DialogExt;

use crate::ipc::{ControllerMessage, DataRequest};
use crate::ledger::Session;
use crate::settings::{clamp_minutes, Settings};
use crate::stats::{
    self, ChartRange, DashboardSummary, GoalReport, HeatmapCell, LabelSlice,
};
use crate::AppState;

#[tauri::command]
pub fn get_settings(state: State<'_, AppState>) -> Settings {
    state.store.settings()
}

/// Replace the settings document and apply the pieces that have immediate
/// side effects (pin state, idle watching, the global shortcut).
#[tauri::command]
pub async fn update_settings(
    settings: Value,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<Settings, String> {
    let previous = state.store.settings();
    let next = Settings::from_value(&settings);
    let applied = state.store.update_settings(|s| *s = next);

    if applied.general.always_on_top != previous.general.always_on_top {
        state.windows.set_always_on_top(applied.general.always_on_top);
    }
    crate::configure_idle(
        &app,
        applied.timer.idle_detection.enabled,
        applied.timer.idle_detection.timeout_minutes,
    );
    if applied.shortcuts.global_toggle != previous.shortcuts.global_toggle {
        crate::register_global_shortcut(
            &app,
            &applied.shortcuts.global_toggle,
            Some(&previous.shortcuts.global_toggle),
        );
    }
    Ok(applied)
}

#[tauri::command]
pub fn list_sessions(state: State<'_, AppState>) -> Vec<Session> {
    state.store.sessions()
}

#[tauri::command]
pub fn attach_session_notes(
    index: usize,
    notes: String,
    state: State<'_, AppState>,
) -> Result<(), String> {
    if state.store.attach_notes(index, &notes) {
        Ok(())
    } else {
        Err(format!("no session at index {index}"))
    }
}

#[tauri::command]
pub fn delete_session(index: usize, state: State<'_, AppState>) -> Result<(), String> {
    if state.store.delete_session(index) {
        Ok(())
    } else {
        Err(format!("no session at index {index}"))
    }
}

#[tauri::command]
pub fn matching_labels(query: String, state: State<'_, AppState>) -> Vec<String> {
    state.store.matching_labels(&query)
}

#[tauri::command]
pub fn get_dashboard_summary(state: State<'_, AppState>) -> DashboardSummary {
    stats::dashboard_summary(&state.store.sessions(), Local::now().date_naive())
}

#[tauri::command]
pub fn get_label_breakdown(state: State<'_, AppState>) -> Vec<LabelSlice> {
    stats::label_breakdown(&state.store.sessions())
}

#[tauri::command]
pub fn get_chart_data(range: ChartRange, state: State<'_, AppState>) -> Vec<stats::ChartPoint> {
    stats::chart_data(&state.store.sessions(), range, Local::now().date_naive())
}

#[tauri::command]
pub fn get_goal_report(state: State<'_, AppState>) -> GoalReport {
    let goals = state.store.settings().goals;
    stats::goal_report(
        &state.store.sessions(),
        goals.daily_hours,
        goals.weekly_hours,
        Local::now().date_naive(),
    )
}

#[tauri::command]
pub fn get_heatmap(state: State<'_, AppState>) -> Vec<HeatmapCell> {
    let goals = state.store.settings().goals;
    stats::heatmap(
        &state.store.sessions(),
        goals.daily_hours,
        Local::now().date_naive(),
    )
}

/// Fire-and-forget bridge. Unknown channels are logged and dropped so a
/// stale display build cannot crash the core.
#[tauri::command]
pub async fn bridge_send(
    channel: String,
    payload: Value,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<(), String> {
    match ControllerMessage::from_wire(&channel, payload) {
        Ok(message) => {
            dispatch(message, &app, &state).await;
            Ok(())
        }
        Err(err) => {
            warn!("dropping bridge message: {err}");
            Ok(())
        }
    }
}

async fn dispatch(message: ControllerMessage, app: &AppHandle, state: &State<'_, AppState>) {
    use ControllerMessage::*;
    match message {
        WindowMinimize => state.windows.minimize_main(),
        WindowMaximize => state.windows.toggle_maximize_main(),
        WindowClose => state.windows.close_main(),
        RestoreMain => state.windows.restore_main(),
        ThemeChanged(theme) => state.windows.apply_theme(&theme.theme, &theme.accent),
        ThemeSync(_) => state.windows.sync_theme(),
        SetAlwaysOnTop(enabled) => {
            state.windows.set_always_on_top(enabled);
        }
        SetWindowWidth(width) => state.windows.set_window_width(width),
        SetIdleDetection(config) => {
            let timeout = clamp_minutes(config.timeout_minutes);
            state.store.update_settings(|s| {
                s.timer.idle_detection.enabled = config.enabled;
                s.timer.idle_detection.timeout_minutes = timeout;
            });
            crate::configure_idle(app, config.enabled, timeout);
        }
        ShowMiniContextMenu => {
            if let Err(err) = state.windows.show_mini_context_menu() {
                warn!("mini context menu failed: {err:#}");
            }
        }
        MiniDragStart(point) => state.windows.begin_mini_drag(point),
        MiniDragging(point) => state.windows.drag_mini(point),
        MiniDragEnd => state.windows.end_mini_drag(),
        InstallUpdate => info!("update install requested, no updater configured"),
        // The countdown lives here now; state echoes from older display
        // builds are accepted and ignored.
        TimerStateChanged(_) | TimerFinished | TimerIsRunning(_) | TimerTick(_) => {
            debug!("ignoring display-side timer echo");
        }
    }
}

/// Request/response bridge. Unlike `bridge_send`, unknown channels are hard
/// errors because the caller is waiting on an answer.
#[tauri::command]
pub async fn bridge_request(
    channel: String,
    payload: Value,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<Value, String> {
    let request = DataRequest::from_wire(&channel, payload).map_err(|e| e.to_string())?;
    match request {
        DataRequest::LoadData => Ok(state.store.document()),
        DataRequest::SaveData(document) => {
            state.store.replace_document(&document);
            Ok(Value::Bool(true))
        }
        DataRequest::GetDataPath => Ok(Value::String(state.store.path().display().to_string())),
        DataRequest::ExportCsv => export_csv(&app, state.store.clone()).await,
    }
}

/// Prompt for a destination and write the ledger out as CSV.
async fn export_csv(app: &AppHandle, store: crate::store::DataStore) -> Result<Value, String> {
    let default_name = format!(
        "focusflow-sessions-{}.csv",
        Local::now().format("%Y-%m-%d")
    );
    let dialog = app.dialog().clone();
    let picked = tauri::async_runtime::spawn_blocking(move || {
        dialog
            .file()
            .set_file_name(default_name)
            .add_filter("CSV", &["csv"])
            .blocking_save_file()
    })
    .await
    .map_err(|e| e.to_string())?;

    let Some(file) = picked else {
        return Ok(json!({ "canceled": true }));
    };
    let path = file.into_path().map_err(|e| e.to_string())?;
    let csv = stats::sessions_csv(&store.sessions());
    std::fs::write(&path, csv).map_err(|e| e.to_string())?;
    info!("exported session CSV to {}", path.display());
    Ok(json!({ "canceled": false, "path": path.display().to_string() }))
}
