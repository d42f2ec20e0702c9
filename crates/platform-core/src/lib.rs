//! winrec platform core contracts.
//!
//! This crate contains the window geometry types and the probe interface
//! used by the capture engine without coupling to a concrete compositor.

use std::fmt;

use serde::{Deserialize, Serialize};
use winrec_common::error::WinrecResult;

/// Position and size of the tracked window, clamped to the screen.
///
/// Equality is exact: any pixel delta is a different geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl WindowGeometry {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A zero-sized geometry (e.g. minimized window) cannot be recorded.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Renders as `x,y wxh`, the slurp/wf-recorder rectangle syntax.
impl fmt::Display for WindowGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Unclamped window rectangle as reported by the windowing system.
///
/// Origins may be negative when the window hangs off the top/left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect with the screen so that `x + width <= screen.width` and
    /// `y + height <= screen.height`. A window fully off-screen collapses to
    /// a degenerate geometry.
    pub fn clamp_to(&self, screen: ScreenBounds) -> WindowGeometry {
        let (x, width) = clamp_axis(self.x, self.width, screen.width);
        let (y, height) = clamp_axis(self.y, self.height, screen.height);
        WindowGeometry {
            x,
            y,
            width,
            height,
        }
    }
}

fn clamp_axis(origin: i32, extent: i32, screen_extent: u32) -> (u32, u32) {
    let screen_extent = i64::from(screen_extent);
    let start = i64::from(origin).clamp(0, screen_extent);
    let end = (i64::from(origin) + i64::from(extent.max(0))).clamp(0, screen_extent);
    // Both values lie in [0, screen_extent] which fits in u32.
    (start as u32, (end - start).max(0) as u32)
}

/// Extent of the screen area a window can occupy, anchored at `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub width: u32,
    pub height: u32,
}

impl ScreenBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Information about a connected monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitorInfo {
    /// Monitor name/identifier.
    pub name: String,
    /// Position in the virtual desktop (pixels).
    pub x: i32,
    pub y: i32,
    /// Resolution in physical pixels.
    pub width: u32,
    pub height: u32,
}

/// Enclosing screen extent covering all connected monitors.
///
/// Returns `None` when no monitors are known.
pub fn enclosing_screen_bounds(monitors: &[MonitorInfo]) -> Option<ScreenBounds> {
    let max_x = monitors
        .iter()
        .map(|m| i64::from(m.x) + i64::from(m.width))
        .max()?;
    let max_y = monitors
        .iter()
        .map(|m| i64::from(m.y) + i64::from(m.height))
        .max()?;

    Some(ScreenBounds {
        width: max_x.clamp(0, i64::from(u32::MAX)) as u32,
        height: max_y.clamp(0, i64::from(u32::MAX)) as u32,
    })
}

/// Display server / compositor family used for probing and capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayServer {
    Hyprland,
    Wayland,
    X11,
    #[default]
    Unknown,
}

/// Queries the current geometry of the tracked window.
///
/// `Ok(None)` means the window was not found. Errors are recoverable: the
/// watcher treats them as "not found" for the current tick. Screen bounds
/// are re-read on every call so resolution changes are respected.
#[async_trait::async_trait]
pub trait GeometryProbe: Send {
    async fn query(&mut self) -> WinrecResult<Option<WindowGeometry>>;

    /// Probe name for logging.
    fn name(&self) -> &str;
}
