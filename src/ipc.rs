//! Typed bridge between the webviews and the Rust core.
//!
//! Every channel the displays may use is a variant here; anything else is
//! rejected at the deserialization boundary. Renaming a variant changes the
//! wire name, so the kebab-case strings below are the protocol.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::timer::state::TickPayload;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePayload {
    pub theme: String,
    #[serde(default = "default_accent")]
    pub accent: String,
}

fn default_accent() -> String {
    "white".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleConfigPayload {
    pub enabled: bool,
    pub timeout_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PointPayload {
    pub x: f64,
    pub y: f64,
}

/// Fire-and-forget messages a display may send to the core.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum ControllerMessage {
    WindowMinimize,
    WindowMaximize,
    WindowClose,
    TimerStateChanged(Value),
    TimerFinished,
    TimerIsRunning(bool),
    TimerTick(Value),
    RestoreMain,
    ThemeChanged(ThemePayload),
    ThemeSync(ThemePayload),
    SetAlwaysOnTop(bool),
    SetWindowWidth(f64),
    SetIdleDetection(IdleConfigPayload),
    ShowMiniContextMenu,
    MiniDragStart(PointPayload),
    MiniDragging(PointPayload),
    MiniDragEnd,
    InstallUpdate,
}

impl ControllerMessage {
    pub fn from_wire(channel: &str, payload: Value) -> Result<Self> {
        serde_json::from_value(json!({ "channel": channel, "payload": payload }))
            .map_err(|_| anyhow!("unknown controller channel: {channel}"))
    }
}

/// Request/response channels. Unlike [`ControllerMessage`], these return a
/// value to the caller, so an unknown channel is an error instead of a
/// dropped message.
#[derive(Debug, Clone, PartialEq)]
pub enum DataRequest {
    LoadData,
    SaveData(Value),
    GetDataPath,
    ExportCsv,
}

impl DataRequest {
    pub fn from_wire(channel: &str, payload: Value) -> Result<Self> {
        match channel {
            "load-data" => Ok(Self::LoadData),
            "save-data" => Ok(Self::SaveData(payload)),
            "get-data-path" => Ok(Self::GetDataPath),
            "export-csv" => Ok(Self::ExportCsv),
            other => Err(anyhow!("unknown data channel: {other}")),
        }
    }
}

/// Messages the core pushes to a display. `channel()` is the event name the
/// webview listens on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DisplayMessage {
    RemotePause,
    RemoteReset,
    RemoteEnd,
    IdleDetected {
        #[serde(rename = "idleMinutes")]
        idle_minutes: u64,
    },
    IdleResumed,
    MiniPositionSaved { x: i32, y: i32 },
    ApplyTheme { theme: String, accent: String },
    UpdateTime(TickPayload),
    MiniDragStartPos { x: i32, y: i32 },
    UpdateAvailable { version: String },
    UpdateDownloaded,
}

impl DisplayMessage {
    pub fn channel(&self) -> &'static str {
        match self {
            Self::RemotePause => "remote-pause",
            Self::RemoteReset => "remote-reset",
            Self::RemoteEnd => "remote-end",
            Self::IdleDetected { .. } => "idle-detected",
            Self::IdleResumed => "idle-resumed",
            Self::MiniPositionSaved { .. } => "mini-position-saved",
            Self::ApplyTheme { .. } => "apply-theme",
            Self::UpdateTime(_) => "update-time",
            Self::MiniDragStartPos { .. } => "mini-drag-start-pos",
            Self::UpdateAvailable { .. } => "update-available",
            Self::UpdateDownloaded => "update-downloaded",
        }
    }

    pub fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_controller_channels_parse() {
        let msg = ControllerMessage::from_wire("window-minimize", Value::Null).unwrap();
        assert_eq!(msg, ControllerMessage::WindowMinimize);

        let msg = ControllerMessage::from_wire("set-always-on-top", json!(false)).unwrap();
        assert_eq!(msg, ControllerMessage::SetAlwaysOnTop(false));

        let msg = ControllerMessage::from_wire("set-window-width", json!(900)).unwrap();
        assert_eq!(msg, ControllerMessage::SetWindowWidth(900.0));

        let msg = ControllerMessage::from_wire(
            "set-idle-detection",
            json!({ "enabled": true, "timeoutMinutes": 10 }),
        )
        .unwrap();
        assert_eq!(
            msg,
            ControllerMessage::SetIdleDetection(IdleConfigPayload {
                enabled: true,
                timeout_minutes: 10,
            })
        );

        let msg = ControllerMessage::from_wire("mini-dragging", json!({ "x": 4.0, "y": 9.5 }))
            .unwrap();
        assert_eq!(
            msg,
            ControllerMessage::MiniDragging(PointPayload { x: 4.0, y: 9.5 })
        );
    }

    #[test]
    fn theme_payload_defaults_the_accent() {
        let msg =
            ControllerMessage::from_wire("theme-changed", json!({ "theme": "light" })).unwrap();
        match msg {
            ControllerMessage::ThemeChanged(theme) => {
                assert_eq!(theme.theme, "light");
                assert_eq!(theme.accent, "white");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_channels_are_rejected() {
        assert!(ControllerMessage::from_wire("format-disk", Value::Null).is_err());
        assert!(ControllerMessage::from_wire("window-minimize-all", Value::Null).is_err());
        assert!(DataRequest::from_wire("drop-tables", Value::Null).is_err());
    }

    #[test]
    fn data_channels_parse() {
        assert_eq!(
            DataRequest::from_wire("load-data", Value::Null).unwrap(),
            DataRequest::LoadData
        );
        assert_eq!(
            DataRequest::from_wire("get-data-path", Value::Null).unwrap(),
            DataRequest::GetDataPath
        );
        assert_eq!(
            DataRequest::from_wire("export-csv", Value::Null).unwrap(),
            DataRequest::ExportCsv
        );
        match DataRequest::from_wire("save-data", json!({ "sessions": [] })).unwrap() {
            DataRequest::SaveData(doc) => assert!(doc.get("sessions").is_some()),
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn display_channels_use_exact_wire_names() {
        assert_eq!(DisplayMessage::RemotePause.channel(), "remote-pause");
        assert_eq!(
            DisplayMessage::IdleDetected { idle_minutes: 10 }.channel(),
            "idle-detected"
        );
        assert_eq!(
            DisplayMessage::MiniPositionSaved { x: 1, y: 2 }.channel(),
            "mini-position-saved"
        );
        assert_eq!(
            DisplayMessage::ApplyTheme {
                theme: "dark".into(),
                accent: "white".into()
            }
            .channel(),
            "apply-theme"
        );
    }

    #[test]
    fn display_payloads_serialize_in_wire_shape() {
        let payload = DisplayMessage::MiniPositionSaved { x: 1720, y: 880 }.payload();
        assert_eq!(payload, json!({ "x": 1720, "y": 880 }));

        let payload = DisplayMessage::IdleDetected { idle_minutes: 12 }.payload();
        assert_eq!(payload, json!({ "idleMinutes": 12 }));
    }
}
