//! System browser hand-off

use parking_lot::Mutex;
use std::process::Command;
use url::Url;

pub trait SystemOpener: Send + Sync {
    fn open(&self, url: &Url);
}

/// Opens URLs with the platform's default browser
pub struct PlatformOpener;

impl SystemOpener for PlatformOpener {
    fn open(&self, url: &Url) {
        tracing::info!(url = %url, "Handing URL to system browser");
        if let Err(e) = open_command(url.as_str()).spawn() {
            tracing::warn!(url = %url, error = %e, "Failed to open system browser");
        }
    }
}

#[cfg(target_os = "macos")]
fn open_command(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(target_os = "windows")]
fn open_command(url: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", url]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn open_command(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}

/// Records hand-offs instead of performing them
#[derive(Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<Url>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().clone()
    }
}

impl SystemOpener for RecordingOpener {
    fn open(&self, url: &Url) {
        self.opened.lock().push(url.clone());
    }
}
