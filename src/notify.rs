//! Desktop notifications for launches and finished batches.

#[cfg(feature = "desktop-notify")]
use notify_rust::{Notification, Urgency};

/// Show a desktop notification. Returns an error message to surface in the
/// error bar when the notification daemon refused it.
#[cfg(feature = "desktop-notify")]
pub fn send_desktop(summary: &str, body: &str, failed: bool) -> Option<String> {
    let (icon, urgency) = if failed {
        ("dialog-error", Urgency::Critical)
    } else {
        ("dialog-information", Urgency::Normal)
    };
    Notification::new()
        .summary(summary)
        .body(body)
        .icon(icon)
        .urgency(urgency)
        .show()
        .err()
        .map(|e| format!("Desktop notification failed: {e}"))
}

#[cfg(not(feature = "desktop-notify"))]
pub fn send_desktop(_summary: &str, _body: &str, _failed: bool) -> Option<String> {
    None
}
