//! Terminal input thread and application event channel.
//!
//! [`EventHandler`] spawns an OS thread (not a tokio task) because
//! `crossterm::event::poll()` blocks. Background requests report back through
//! the same channel, so the UI loop is the only place state changes.

use crate::api::ApiError;
use crate::app::DialogOwner;
use crate::launch::{NavTarget, Navigator, Notifier};
use crate::run::{Permissions, RunDetails, RunRef};
use crate::workflow::BatchReport;
use crate::workspace::Workspace;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    PollResult {
        runs: Vec<RunRef>,
        /// `true` when the user asked for the refresh.
        manual: bool,
    },
    /// A user-requested refresh failed; ends its loading indicator.
    RefreshFailed(String),
    WorkspaceLoaded(Workspace),
    PermissionsLoaded(Permissions),
    RunDetailsLoaded {
        id: String,
        result: Result<Option<RunDetails>, ApiError>,
    },
    Navigate(NavTarget),
    Alert {
        title: String,
        body: String,
    },
    Toast(String),
    BatchProgress {
        owner: DialogOwner,
        done: usize,
        total: usize,
    },
    BatchFinished {
        owner: DialogOwner,
        report: BatchReport,
    },
    ClipboardResult(Result<(), String>),
    /// Global toast, auto-dismisses after `ERROR_TTL_SECS`.
    Error(String),
}

/// Routes navigation and notifications from background tasks into the event
/// loop.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: AppEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("event sink: channel closed");
        }
    }
}

impl Navigator for EventSink {
    fn navigate(&self, target: &NavTarget) {
        self.send(AppEvent::Navigate(target.clone()));
    }
}

impl Notifier for EventSink {
    fn alert(&self, title: &str, body: &str) {
        self.send(AppEvent::Alert {
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    fn toast(&self, message: &str) {
        self.send(AppEvent::Toast(message.to_string()));
    }
}

/// Report a terminal failure that ends the input thread.
fn send_terminal_error(tx: &mpsc::UnboundedSender<AppEvent>, msg: String) {
    if tx.send(AppEvent::Error(msg)).is_err() {
        tracing::warn!("input thread: channel closed");
    }
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let thread = std::thread::spawn(move || {
            while !shutdown_flag.load(Ordering::Relaxed) {
                match event::poll(tick_rate) {
                    Err(e) => {
                        send_terminal_error(&event_tx, format!("Terminal poll error: {e}"));
                        break;
                    }
                    Ok(false) => {
                        if event_tx.send(AppEvent::Tick).is_err() {
                            break;
                        }
                        continue;
                    }
                    Ok(true) => {}
                }
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) => {
                        if event_tx.send(AppEvent::Key(key)).is_err() {
                            break;
                        }
                    }
                    // EINTR
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        send_terminal_error(&event_tx, format!("Terminal read error: {e}"));
                        break;
                    }
                    _ => {}
                }
            }
        });

        Self {
            rx,
            tx,
            shutdown,
            thread: Some(thread),
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("event thread panicked");
            }
        }
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        // Joining here could hang if poll() is blocked during unwinding.
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
