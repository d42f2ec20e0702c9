//! External dependency detection and guidance for Linux.
//!
//! winrec drives external tools for probing, recording, and merging.
//! Missing required tools abort `record` at startup, never mid-run.

use winrec_platform_core::DisplayServer;

use crate::display::{command_exists, probe_binary};

/// A system capability that winrec may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    /// Binary checked on `PATH`, if the capability maps to one.
    pub binary: Option<String>,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities for the given display server and recorder binary.
pub fn check_capabilities(display_server: DisplayServer, recorder_binary: &str) -> Vec<Capability> {
    check_capabilities_with(display_server, recorder_binary, command_exists)
}

fn check_capabilities_with(
    display_server: DisplayServer,
    recorder_binary: &str,
    exists: impl Fn(&str) -> bool,
) -> Vec<Capability> {
    vec![
        check_probe(display_server, &exists),
        binary_capability(
            "Screen Recorder",
            recorder_binary,
            "Captures one window rectangle per segment",
            true,
            &exists,
        ),
        binary_capability(
            "Segment Merger",
            "ffmpeg",
            "Concatenates segments into the final recording (stream copy)",
            true,
            &exists,
        ),
        binary_capability(
            "Segment Verifier",
            "ffprobe",
            "Skips undecodable segments before merging",
            false,
            &exists,
        ),
    ]
}

fn check_probe(display_server: DisplayServer, exists: &impl Fn(&str) -> bool) -> Capability {
    match probe_binary(display_server) {
        Some(binary) => binary_capability(
            "Window Geometry",
            binary,
            "Queries the tracked window's position and size",
            true,
            exists,
        ),
        None => Capability {
            name: "Window Geometry".to_string(),
            binary: None,
            description: format!("No geometry probe for display server {display_server:?}"),
            available: false,
            required: true,
            fix_instructions: Some(
                "Run under Hyprland (hyprctl) or an X11 session (xdotool)".to_string(),
            ),
        },
    }
}

fn binary_capability(
    name: &str,
    binary: &str,
    description: &str,
    required: bool,
    exists: &impl Fn(&str) -> bool,
) -> Capability {
    let available = exists(binary);
    Capability {
        name: name.to_string(),
        binary: Some(binary.to_string()),
        description: description.to_string(),
        available,
        required,
        fix_instructions: if available {
            None
        } else {
            Some(format!("Install '{binary}' and make sure it is on PATH"))
        },
    }
}

/// The first required capability that is unavailable.
pub fn first_missing_required(capabilities: &[Capability]) -> Option<&Capability> {
    capabilities.iter().find(|c| c.required && !c.available)
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("winrec System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}
