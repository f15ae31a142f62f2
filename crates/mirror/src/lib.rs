//! Client-side mirror of the authority's games, configuration and live
//! selection state.

pub mod authority;
pub mod bootstrap;
pub mod config;
pub mod events;
pub mod model;
pub mod requests;
pub mod store;

#[cfg(test)]
mod testing;

pub use authority::{Authority, AuthorityCommand, AuthorityError, EventSubscription, TcpAuthority};
pub use bootstrap::{Bootstrap, BootstrapReport, BootstrapStage};
pub use config::{ClientConfig, ConfigError};
pub use events::{
    spawn_event_consumer, AuthorityEvent, ConsumerStats, EventConsumer, EventConsumerHandle,
};
pub use requests::Requests;
pub use store::{MirrorState, ObservableCell, SelectionSnapshot, Subscription};
