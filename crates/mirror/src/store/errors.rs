use std::fmt::Display;
use std::sync::Arc;

use super::cell::{ObservableCell, Subscription};

/// Append-only list of user-visible failure messages.
#[derive(Debug, Clone)]
pub struct ErrorChannel {
    entries: ObservableCell<Vec<String>>,
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self {
            entries: ObservableCell::new("errors", Vec::new()),
        }
    }
}

impl ErrorChannel {
    /// Appends `"<context>: <error>"`.
    pub fn push(&self, context: &str, error: impl Display) {
        let message = format!("{context}: {error}");
        self.entries.update(move |current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(message);
            next
        });
    }

    pub fn entries(&self) -> Arc<Vec<String>> {
        self.entries.snapshot()
    }

    pub fn len(&self) -> usize {
        self.entries.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.snapshot().is_empty()
    }

    pub fn clear(&self) {
        self.entries.set(Vec::new());
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Vec<String>) + Send + Sync + 'static,
    {
        self.entries.subscribe(observer)
    }
}
