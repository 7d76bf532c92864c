use std::cell::RefCell;

use tracing::info;

/// A one-line notification surface for the person driving a front-end.
pub trait Notifier {
    fn show_info(&self, message: &str);
}

/// Prints notifications to stderr, prefixed so they stand apart from relayed
/// process output, and records them in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn show_info(&self, message: &str) {
        info!(target: "xvrkit::notify", "{}", message);
        eprintln!("[xvrkit] {}", message);
    }
}

/// Keeps every notification in memory. Useful for tests and for callers that
/// want to present messages themselves.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: RefCell<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.messages.borrow().last().cloned()
    }
}

impl Notifier for MemoryNotifier {
    fn show_info(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}
