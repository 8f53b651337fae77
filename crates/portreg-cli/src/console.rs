//! Terminal implementations of the notification and confirmation ports.

use std::io::{self, BufRead, Write};

use portreg_core::{ConfirmRequest, ConfirmationPort, Notification, NotificationLevel, NotificationPort};

/// Prints notifications to stderr so stdout stays usable for listings.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl NotificationPort for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        eprintln!("{}", format_notification(&notification));
    }
}

pub fn format_notification(notification: &Notification) -> String {
    let marker = match notification.level {
        NotificationLevel::Success => "✓",
        NotificationLevel::Info => "•",
        NotificationLevel::Warn => "!",
        NotificationLevel::Error => "✗",
    };
    if notification.detail.is_empty() {
        format!("{} {}", marker, notification.summary)
    } else {
        format!("{} {}: {}", marker, notification.summary, notification.detail)
    }
}

/// Asks on the terminal and reads a y/N answer from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm {
    /// Accept without asking (`--yes`)
    pub assume_yes: bool,
}

impl StdinConfirm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl ConfirmationPort for StdinConfirm {
    fn confirm(&self, request: &ConfirmRequest) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{}: {} [y/N] ", request.title, request.message);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => is_yes(&answer),
        }
    }
}

/// Anything other than an explicit yes declines.
pub fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "e" | "evet"
    )
}
