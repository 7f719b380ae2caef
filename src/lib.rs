mod audio;
mod commands;
mod idle;
mod ipc;
mod ledger;
mod settings;
mod stats;
mod store;
mod timer;
mod windows;

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::{info, warn};
use tauri::Manager;
use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};
use tauri_plugin_notification::NotificationExt;
use tokio::time::MissedTickBehavior;

use commands::{
    attach_session_notes, bridge_request, bridge_send, delete_session, get_chart_data,
    get_dashboard_summary, get_goal_report, get_heatmap, get_label_breakdown, get_settings,
    list_sessions, matching_labels, update_settings,
};
use idle::{IdleMonitor, IdleSignal, SystemIdleProbe};
use ipc::DisplayMessage;
use store::DataStore;
use timer::{
    commands::{
        end_timer, get_timer_state, pause_timer, reset_timer, resume_timer, set_task_label,
        set_timer_duration, start_timer, toggle_timer,
    },
    TimerController,
};
use windows::WindowOrchestrator;

pub(crate) struct AppState {
    pub(crate) store: DataStore,
    pub(crate) timer: TimerController,
    pub(crate) windows: Arc<WindowOrchestrator>,
    pub(crate) idle: IdleMonitor,
}

/// (Re)arm the idle watcher with the current configuration. Detection pauses
/// the countdown and tells the displays; recovery only tells the displays,
/// resuming stays a user decision.
pub(crate) fn configure_idle(app: &tauri::AppHandle, enabled: bool, timeout_minutes: u32) {
    let Some(state) = app.try_state::<AppState>() else {
        return;
    };
    let timer = state.timer.clone();
    let orchestrator = state.windows.clone();
    let notifier = app.clone();
    state.idle.configure(
        enabled,
        timeout_minutes,
        Arc::new(SystemIdleProbe),
        state.timer.running_flag(),
        move |signal, idle_secs| match signal {
            IdleSignal::Detected => {
                let timer = timer.clone();
                tauri::async_runtime::spawn(async move {
                    timer.pause().await;
                });
                orchestrator.broadcast(&DisplayMessage::IdleDetected {
                    idle_minutes: idle_secs / 60,
                });
                let result = notifier
                    .notification()
                    .builder()
                    .title("Timer paused")
                    .body("You seem to be away, so the focus timer was paused.")
                    .show();
                if let Err(err) = result {
                    warn!("idle notification failed: {err}");
                }
            }
            IdleSignal::Resumed => {
                orchestrator.broadcast(&DisplayMessage::IdleResumed);
            }
        },
    );
}

/// Swap the app-summoning shortcut. Registration failures (the accelerator
/// being taken by another app, usually) are logged, not fatal.
pub(crate) fn register_global_shortcut(
    app: &tauri::AppHandle,
    accelerator: &str,
    previous: Option<&str>,
) {
    if let Some(previous) = previous {
        if let Err(err) = app.global_shortcut().unregister(previous) {
            warn!("could not unregister shortcut {previous}: {err}");
        }
    }
    let result = app.global_shortcut().on_shortcut(
        accelerator,
        move |app, _shortcut, event| {
            if event.state() == ShortcutState::Pressed {
                if let Some(state) = app.try_state::<AppState>() {
                    state.windows.toggle_via_shortcut();
                }
            }
        },
    );
    match result {
        Ok(()) => info!("global shortcut registered: {accelerator}"),
        Err(err) => warn!("could not register shortcut {accelerator}: {err}"),
    }
}

/// Send the Sunday summary if it is due and has not gone out yet today.
fn run_weekly_check(app: &tauri::AppHandle, store: &DataStore) {
    let today = Local::now().date_naive();
    let report = store.settings().weekly_report;
    if !stats::weekly_report_due(today, report.enabled, report.last_sent) {
        return;
    }
    let body = stats::weekly_report_body(&store.sessions(), today);
    let result = app
        .notification()
        .builder()
        .title("Your week in focus")
        .body(body)
        .show();
    match result {
        Ok(()) => {
            store.update_settings(|s| s.weekly_report.last_sent = Some(today));
            info!("weekly report sent");
        }
        Err(err) => warn!("weekly report notification failed: {err}"),
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("FocusFlow starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            // A second launch just surfaces the running instance.
            if let Some(state) = app.try_state::<AppState>() {
                state.windows.restore_main();
            }
        }))
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_notification::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let store = DataStore::new(app_data_dir.join("focusflow-data.json"));
                let settings = store.settings();

                let timer = TimerController::new(app.handle().clone(), store.clone());
                let orchestrator = WindowOrchestrator::new(app.handle().clone(), store.clone());

                app.manage(AppState {
                    store: store.clone(),
                    timer,
                    windows: orchestrator,
                    idle: IdleMonitor::new(),
                });

                configure_idle(
                    app.handle(),
                    settings.timer.idle_detection.enabled,
                    settings.timer.idle_detection.timeout_minutes,
                );
                register_global_shortcut(app.handle(), &settings.shortcuts.global_toggle, None);

                let handle = app.handle().clone();
                tauri::async_runtime::spawn(async move {
                    // Give the webviews a moment before the startup check.
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    let mut ticker = tokio::time::interval(Duration::from_secs(3600));
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        ticker.tick().await;
                        if let Some(state) = handle.try_state::<AppState>() {
                            run_weekly_check(&handle, &state.store);
                        }
                    }
                });

                if let Some(main) = app.get_webview_window(windows::MAIN_LABEL) {
                    main.set_always_on_top(settings.general.always_on_top)?;
                    main.show()?;
                }

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            get_timer_state,
            set_timer_duration,
            set_task_label,
            start_timer,
            pause_timer,
            resume_timer,
            toggle_timer,
            end_timer,
            reset_timer,
            get_settings,
            update_settings,
            list_sessions,
            attach_session_notes,
            delete_session,
            matching_labels,
            get_dashboard_summary,
            get_label_breakdown,
            get_chart_data,
            get_goal_report,
            get_heatmap,
            bridge_send,
            bridge_request,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
