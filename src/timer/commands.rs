//! Timer commands invoked directly by the displays.

use tauri::State;

use crate::AppState;

use super::TimerSnapshot;

#[tauri::command]
pub async fn get_timer_state(state: State<'_, AppState>) -> Result<TimerSnapshot, String> {
    Ok(state.timer.snapshot().await)
}

#[tauri::command]
pub async fn set_timer_duration(
    seconds: u64,
    state: State<'_, AppState>,
) -> Result<TimerSnapshot, String> {
    state.timer.set_duration(seconds).await;
    Ok(state.timer.snapshot().await)
}

#[tauri::command]
pub async fn set_task_label(label: String, state: State<'_, AppState>) -> Result<(), String> {
    state.timer.set_label(label);
    Ok(())
}

#[tauri::command]
pub async fn start_timer(state: State<'_, AppState>) -> Result<TimerSnapshot, String> {
    state.timer.start().await;
    Ok(state.timer.snapshot().await)
}

#[tauri::command]
pub async fn pause_timer(state: State<'_, AppState>) -> Result<TimerSnapshot, String> {
    state.timer.pause().await;
    Ok(state.timer.snapshot().await)
}

#[tauri::command]
pub async fn resume_timer(state: State<'_, AppState>) -> Result<TimerSnapshot, String> {
    state.timer.resume().await;
    Ok(state.timer.snapshot().await)
}

#[tauri::command]
pub async fn toggle_timer(state: State<'_, AppState>) -> Result<TimerSnapshot, String> {
    state.timer.toggle_pause().await;
    Ok(state.timer.snapshot().await)
}

/// End the running focus stretch. Returns the index of the logged session,
/// or `None` when nothing was recorded, so the display knows whether to
/// offer the notes prompt.
#[tauri::command]
pub async fn end_timer(state: State<'_, AppState>) -> Result<Option<usize>, String> {
    Ok(state.timer.end().await)
}

#[tauri::command]
pub async fn reset_timer(state: State<'_, AppState>) -> Result<TimerSnapshot, String> {
    state.timer.reset().await;
    Ok(state.timer.snapshot().await)
}
