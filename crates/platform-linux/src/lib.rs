//! winrec Linux Platform Integration
//!
//! Platform-specific implementations for Linux:
//! - **Display Detection:** Hyprland / generic Wayland / X11 session detection
//! - **Hyprland:** Window and monitor geometry via `hyprctl -j`
//! - **X11:** Window and display geometry via `xdotool`
//! - **Permissions:** External binary checks and user guidance

pub mod display;
pub mod hyprland;
pub mod permissions;
pub mod xdotool;

pub use display::*;
pub use hyprland::HyprlandProbe;
pub use xdotool::XdotoolProbe;
