//! Open documents in the default browser.
//!
//! Cross-platform: Windows, macOS, Linux and WSL. Under WSL the Windows
//! browser is used.

use std::path::Path;
use std::process::{Command, Stdio};

/// Whether we are running inside WSL (`/proc/version` mentions Microsoft).
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|v| {
            let v = v.to_lowercase();
            v.contains("microsoft") || v.contains("wsl")
        })
        .unwrap_or(false)
}

/// `file://` URL for a local document. Relative paths are resolved against
/// the current directory.
pub fn file_url(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let raw = absolute.to_string_lossy().replace('\\', "/");
    let encoded: String = raw
        .chars()
        .map(|c| match c {
            ' ' => "%20".to_string(),
            '#' => "%23".to_string(),
            '?' => "%3F".to_string(),
            '%' => "%25".to_string(),
            c => c.to_string(),
        })
        .collect();

    if encoded.starts_with('/') {
        format!("file://{}", encoded)
    } else {
        format!("file:///{}", encoded)
    }
}

/// Open a URL in the default browser.
///
/// Returns `true` if a launcher process was started:
/// - **WSL**: `wslview`, then `cmd.exe /c start`, then `powershell.exe`
/// - **Linux**: `xdg-open`
/// - **macOS**: `open`
/// - **Windows**: `cmd /c start`
pub fn open_browser(url: &str) -> bool {
    #[cfg(target_os = "windows")]
    {
        Command::new("cmd")
            .args(["/c", "start", "", url])
            .stderr(Stdio::null())
            .spawn()
            .is_ok()
    }

    #[cfg(target_os = "macos")]
    {
        Command::new("open")
            .arg(url)
            .stderr(Stdio::null())
            .spawn()
            .is_ok()
    }

    #[cfg(target_os = "linux")]
    {
        if !is_wsl() {
            return Command::new("xdg-open")
                .arg(url)
                .stderr(Stdio::null())
                .spawn()
                .is_ok();
        }

        if Command::new("wslview").arg(url).spawn().is_ok() {
            return true;
        }

        // Run from C:\ so cmd.exe does not complain about UNC paths
        if Command::new("cmd.exe")
            .current_dir("/mnt/c/")
            .args(["/c", "start", "", url])
            .stderr(Stdio::null())
            .spawn()
            .is_ok()
        {
            return true;
        }

        Command::new("powershell.exe")
            .current_dir("/mnt/c/")
            .args(["-Command", &format!("Start-Process '{}'", url)])
            .stderr(Stdio::null())
            .spawn()
            .is_ok()
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        let _ = url;
        false
    }
}
