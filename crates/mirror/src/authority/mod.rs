//! Access to the authority process that owns games, configuration and
//! selection.

mod command;
mod error;
mod tcp;
pub mod wire;

use std::sync::mpsc;

use serde_json::Value;

pub use command::AuthorityCommand;
pub use error::AuthorityError;
pub use tcp::TcpAuthority;

/// Request/response plus event delivery. Implementations must be usable from
/// the UI thread and the event consumer thread at the same time.
pub trait Authority: Send + Sync {
    /// Sends one command and blocks until the authority answers it.
    fn call(&self, command: &AuthorityCommand) -> Result<Value, AuthorityError>;

    /// Opens the pushed event stream. At most one subscription per connection.
    fn subscribe(&self) -> Result<EventSubscription, AuthorityError>;
}

/// Raw event payloads in the order the authority pushed them. Iteration ends
/// when the authority stops sending.
pub struct EventSubscription {
    events: mpsc::Receiver<String>,
}

impl EventSubscription {
    pub fn new(events: mpsc::Receiver<String>) -> Self {
        Self { events }
    }

    pub fn channel() -> (mpsc::Sender<String>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, Self::new(receiver))
    }

    /// Blocks for the next payload; `None` once the stream has ended.
    pub fn next_event(&self) -> Option<String> {
        self.events.recv().ok()
    }
}

impl Iterator for EventSubscription {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_event()
    }
}
