//! Hyprland window probing through `hyprctl -j`.

use serde::Deserialize;
use winrec_common::error::{WinrecError, WinrecResult};
use winrec_platform_core::{
    enclosing_screen_bounds, GeometryProbe, MonitorInfo, WindowGeometry, WindowRect,
};

use crate::display::run_query;

/// A client entry from `hyprctl clients -j`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HyprClient {
    at: [i32; 2],
    size: [i32; 2],
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    initial_title: Option<String>,
    #[serde(default = "default_true")]
    mapped: bool,
    #[serde(default)]
    hidden: bool,
}

fn default_true() -> bool {
    true
}

impl HyprClient {
    fn matches(&self, needle: &str) -> bool {
        [&self.title, &self.class, &self.initial_title]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// A monitor entry from `hyprctl monitors -j`.
#[derive(Debug, Deserialize)]
struct HyprMonitor {
    name: String,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

/// Finds the first visible client whose title, class, or initial title
/// contains `window_name` (case-insensitive).
pub struct HyprlandProbe {
    needle: String,
}

impl HyprlandProbe {
    pub fn new(window_name: &str) -> Self {
        Self {
            needle: window_name.to_lowercase(),
        }
    }

    async fn hyprctl_json(&self, what: &str) -> WinrecResult<String> {
        let output = run_query("hyprctl", &[what, "-j"]).await?;
        if !output.status.success() {
            return Err(WinrecError::probe(format!(
                "hyprctl {what} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl GeometryProbe for HyprlandProbe {
    async fn query(&mut self) -> WinrecResult<Option<WindowGeometry>> {
        let clients = self.hyprctl_json("clients").await?;
        let Some(rect) = find_client(&clients, &self.needle)? else {
            return Ok(None);
        };

        let monitors = parse_monitors(&self.hyprctl_json("monitors").await?)?;
        let screen = enclosing_screen_bounds(&monitors)
            .ok_or_else(|| WinrecError::probe("hyprctl reported no monitors"))?;

        Ok(Some(rect.clamp_to(screen)))
    }

    fn name(&self) -> &str {
        "hyprland"
    }
}

fn find_client(json: &str, needle: &str) -> WinrecResult<Option<WindowRect>> {
    let clients: Vec<HyprClient> = serde_json::from_str(json)
        .map_err(|e| WinrecError::probe(format!("Invalid hyprctl clients output: {e}")))?;

    Ok(clients
        .iter()
        .filter(|c| c.mapped && !c.hidden)
        .find(|c| c.matches(needle))
        .map(|c| WindowRect::new(c.at[0], c.at[1], c.size[0], c.size[1])))
}

fn parse_monitors(json: &str) -> WinrecResult<Vec<MonitorInfo>> {
    let monitors: Vec<HyprMonitor> = serde_json::from_str(json)
        .map_err(|e| WinrecError::probe(format!("Invalid hyprctl monitors output: {e}")))?;

    Ok(monitors
        .into_iter()
        .map(|m| MonitorInfo {
            name: m.name,
            x: m.x,
            y: m.y,
            width: m.width,
            height: m.height,
        })
        .collect())
}
