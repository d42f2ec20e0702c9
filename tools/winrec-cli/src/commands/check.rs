//! Check external tool availability.

use winrec_capture_engine::backend_for;
use winrec_common::config::RecorderBackendKind;
use winrec_platform_core::DisplayServer;
use winrec_platform_linux::detect_display_server;
use winrec_platform_linux::permissions::{check_capabilities, print_capability_report};

pub fn run(backend: RecorderBackendKind) -> anyhow::Result<()> {
    println!("winrec System Check");
    println!("{}", "=".repeat(50));

    let ds = detect_display_server();
    match ds {
        DisplayServer::Hyprland => println!("[OK] Display server: Hyprland"),
        DisplayServer::X11 => println!("[OK] Display server: X11"),
        DisplayServer::Wayland => {
            println!("[WARN] Display server: Wayland (window queries need Hyprland)")
        }
        DisplayServer::Unknown => println!("[WARN] Display server: Unknown"),
    }

    let recorder = match backend_for(backend, ds) {
        Ok(backend) => backend.binary().to_string(),
        Err(e) => {
            println!("[WARN] {e}");
            "ffmpeg".to_string()
        }
    };

    let capabilities = check_capabilities(ds, &recorder);
    println!();
    print_capability_report(&capabilities);

    let all_required_ok = capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available);

    println!();
    if all_required_ok {
        println!("All required tools are available. winrec is ready.");
    } else {
        println!("Some required tools are missing. See above for fixes.");
    }

    Ok(())
}
