//! Display server detection and external command helpers.

use std::process::{Output, Stdio};

use tokio::process::Command;
use winrec_common::error::{WinrecError, WinrecResult};
use winrec_platform_core::{DisplayServer, GeometryProbe};

use crate::hyprland::HyprlandProbe;
use crate::xdotool::XdotoolProbe;

/// Detect the current display server.
pub fn detect_display_server() -> DisplayServer {
    if std::env::var("HYPRLAND_INSTANCE_SIGNATURE").is_ok() {
        DisplayServer::Hyprland
    } else if std::env::var("WAYLAND_DISPLAY").is_ok() {
        DisplayServer::Wayland
    } else if std::env::var("DISPLAY").is_ok() {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}

/// Binary used to query window geometry on the given display server.
pub fn probe_binary(display_server: DisplayServer) -> Option<&'static str> {
    match display_server {
        DisplayServer::Hyprland => Some("hyprctl"),
        DisplayServer::X11 => Some("xdotool"),
        DisplayServer::Wayland | DisplayServer::Unknown => None,
    }
}

/// Build the geometry probe for the detected display server.
pub fn probe_for(
    display_server: DisplayServer,
    window_name: &str,
) -> WinrecResult<Box<dyn GeometryProbe>> {
    match display_server {
        DisplayServer::Hyprland => Ok(Box::new(HyprlandProbe::new(window_name))),
        DisplayServer::X11 => Ok(Box::new(XdotoolProbe::new(window_name))),
        DisplayServer::Wayland => Err(WinrecError::platform(
            "Window geometry queries are only supported on Hyprland among Wayland compositors",
        )),
        DisplayServer::Unknown => Err(WinrecError::platform(
            "Unsupported display server (neither Hyprland nor X11)",
        )),
    }
}

/// Whether `binary` resolves on `PATH`.
///
/// The name is passed as a positional parameter, never spliced into the
/// script, so it cannot carry shell syntax.
pub fn command_exists(binary: &str) -> bool {
    std::process::Command::new("sh")
        .args(["-c", r#"command -v "$1""#, "sh", binary])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run a short-lived query command and capture its output.
///
/// Spawn failures map to [`WinrecError::Probe`]; the exit status is left to
/// the caller because some tools signal "no match" through it.
pub(crate) async fn run_query(program: &str, args: &[&str]) -> WinrecResult<Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| WinrecError::probe(format!("Failed to run {program}: {e}")))
}
