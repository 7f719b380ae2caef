use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Break and idle minute inputs are clamped to this range instead of rejected.
pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 60;

pub fn clamp_minutes(value: u32) -> u32 {
    value.clamp(MIN_MINUTES, MAX_MINUTES)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    pub always_on_top: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self { always_on_top: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakTimerSettings {
    pub enabled: bool,
    pub break_minutes: u32,
}

impl Default for BreakTimerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            break_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNotesSettings {
    pub enabled: bool,
}

impl Default for SessionNotesSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleDetectionSettings {
    pub enabled: bool,
    pub timeout_minutes: u32,
}

impl Default for IdleDetectionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_minutes: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub break_timer: BreakTimerSettings,
    pub session_notes: SessionNotesSettings,
    pub idle_detection: IdleDetectionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutSettings {
    pub start_pause: String,
    pub reset: String,
    pub end: String,
    pub minimize: String,
    pub show_help: String,
    pub global_toggle: String,
}

impl Default for ShortcutSettings {
    fn default() -> Self {
        Self {
            start_pause: "Space".into(),
            reset: "Ctrl+R".into(),
            end: "Ctrl+Shift+E".into(),
            minimize: "Escape".into(),
            show_help: "?".into(),
            global_toggle: "Ctrl+Shift+F".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppearanceSettings {
    pub theme: String,
    pub accent_color: String,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            theme: "dark".into(),
            accent_color: "white".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSettings {
    pub daily_hours: f64,
    pub weekly_hours: f64,
}

impl Default for GoalSettings {
    fn default() -> Self {
        Self {
            daily_hours: 4.0,
            weekly_hours: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MiniPosition {
    pub x: Option<i32>,
    pub y: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniTimerSettings {
    pub position: MiniPosition,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReportSettings {
    pub enabled: bool,
    pub last_sent: Option<NaiveDate>,
}

/// All user-facing options, persisted as the `settings` section of the data
/// file. Loading always goes through [`Settings::from_value`] so documents
/// written by older versions pick up newly added keys from the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub general: GeneralSettings,
    pub timer: TimerSettings,
    pub shortcuts: ShortcutSettings,
    pub appearance: AppearanceSettings,
    pub goals: GoalSettings,
    pub mini_timer: MiniTimerSettings,
    pub weekly_report: WeeklyReportSettings,
}

impl Settings {
    /// Reconcile a loaded JSON value against the defaults and deserialize.
    ///
    /// Keys absent from the loaded document (or whole sections with the wrong
    /// shape) are backfilled from defaults; primitives and arrays present in
    /// the document win.
    pub fn from_value(loaded: &Value) -> Self {
        let defaults =
            serde_json::to_value(Settings::default()).expect("default settings serialize");
        let merged = merge_defaults(loaded, &defaults);
        match serde_json::from_value(merged) {
            Ok(settings) => normalize(settings),
            Err(err) => {
                log::warn!("settings document did not deserialize, using defaults: {err}");
                Settings::default()
            }
        }
    }
}

fn normalize(mut settings: Settings) -> Settings {
    settings.timer.break_timer.break_minutes =
        clamp_minutes(settings.timer.break_timer.break_minutes);
    settings.timer.idle_detection.timeout_minutes =
        clamp_minutes(settings.timer.idle_detection.timeout_minutes);
    settings
}

/// Recursive reconciliation of a loaded settings value against the default
/// document. Object-valued keys recurse; everything else is taken from the
/// loaded document when present. Keys unknown to the defaults are dropped.
pub fn merge_defaults(loaded: &Value, defaults: &Value) -> Value {
    match (loaded, defaults) {
        (Value::Object(loaded_map), Value::Object(default_map)) => {
            let mut out = serde_json::Map::with_capacity(default_map.len());
            for (key, default_value) in default_map {
                let merged = match loaded_map.get(key) {
                    Some(loaded_value) if default_value.is_object() => {
                        merge_defaults(loaded_value, default_value)
                    }
                    Some(loaded_value) => loaded_value.clone(),
                    None => default_value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        // Loaded value has the wrong shape for an object section.
        _ => defaults.clone(),
    }
}
