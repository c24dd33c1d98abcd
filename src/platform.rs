//! Host integration: opening console pages in the browser and copying text.

use color_eyre::eyre::{eyre, Result};
use std::process::{Command, Stdio};
use std::time::Duration;

const CLIPBOARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Open `url` with the platform's default handler. Only http(s) URLs are
/// accepted.
pub fn open_url(url: &str) -> Result<()> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(eyre!("Refusing to open non-HTTP URL: {url}"));
    }

    if cfg!(target_os = "windows") {
        // The empty "" is the window title; without it `start` treats the URL as one.
        return spawn_detached("cmd", &["/C", "start", "", url])
            .map_err(|e| eyre!("Failed to open browser: {e}"));
    }

    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if std::env::var_os("WSL_DISTRO_NAME").is_some() {
        "wslview"
    } else {
        "xdg-open"
    };
    match spawn_detached(opener, &[url]) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(eyre!("Failed to open browser with {opener}: {e}")),
    }

    if std::env::var_os("WSL_DISTRO_NAME").is_some() {
        return spawn_detached("cmd.exe", &["/C", "start", "", url])
            .map_err(|e| eyre!("Failed to open browser via cmd.exe: {e}"));
    }

    Err(eyre!(
        "No browser opener found. On WSL install wslu; on Linux install xdg-utils."
    ))
}

fn spawn_detached(cmd: &str, args: &[&str]) -> std::io::Result<()> {
    Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

/// Pipe `text` into the first clipboard tool that is installed.
pub async fn copy_to_clipboard(text: &str) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let candidates: &[(&str, &[&str])] = if cfg!(target_os = "macos") {
        &[("pbcopy", &[])]
    } else if cfg!(target_os = "windows") {
        &[("clip.exe", &[])]
    } else {
        &[
            ("clip.exe", &[]),
            ("wl-copy", &[]),
            ("xclip", &["-selection", "clipboard"]),
        ]
    };

    for (cmd, args) in candidates {
        let Ok(mut child) = tokio::process::Command::new(cmd)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        else {
            continue;
        };
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| eyre!("Failed to write to clipboard: {e}"))?;
        }
        let status = tokio::time::timeout(CLIPBOARD_TIMEOUT, child.wait())
            .await
            .map_err(|_| eyre!("clipboard command timed out after {}s", CLIPBOARD_TIMEOUT.as_secs()))??;
        if status.success() {
            return Ok(());
        }
    }

    Err(eyre!(
        "No clipboard tool found. Install xclip, wl-copy, or use WSL with clip.exe"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_urls() {
        let err = open_url("file:///etc/passwd").unwrap_err();
        assert!(err.to_string().contains("non-HTTP"));
        assert!(open_url("javascript:alert(1)").is_err());
    }
}
