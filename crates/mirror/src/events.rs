//! Folds authority-pushed events into the mirrored state.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::authority::EventSubscription;
use crate::model::Game;
use crate::store::MirrorState;

pub(crate) const STREAM_CLOSED_CONTEXT: &str = "Event stream closed";
const STREAM_CLOSED_REASON: &str = "authority stopped sending events";

#[derive(Debug, Clone, PartialEq)]
pub enum AuthorityEvent {
    UpdatedGames { games: Vec<Game> },
    SwitchedWeapon { weapon_index: usize },
    SwitchedLoadout { loadout_index: usize },
    SwitchedCategory { category_index: usize },
    StartedShooting { weapon_index: usize },
    StoppedShooting,
}

/// An event this client understands, or the tag of one it does not.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    Known(AuthorityEvent),
    Unknown { tag: String },
}

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("event envelope is not valid: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("`{tag}` payload invalid at {path}: {message}")]
    Payload {
        tag: String,
        path: String,
        message: String,
    },
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct GamesPayload {
    games: Vec<Game>,
}

#[derive(Deserialize)]
struct WeaponPayload {
    weapon_ind: usize,
}

#[derive(Deserialize)]
struct LoadoutPayload {
    loadout_ind: usize,
}

#[derive(Deserialize)]
struct CategoryPayload {
    category_ind: usize,
}

pub fn decode_event(raw: &str) -> Result<DecodedEvent, EventDecodeError> {
    let envelope: Envelope = serde_json::from_str(raw).map_err(EventDecodeError::Envelope)?;
    let tag = envelope.event;
    let event = match tag.as_str() {
        "UpdatedGames" => {
            let payload: GamesPayload = decode_payload(&tag, envelope.data)?;
            AuthorityEvent::UpdatedGames {
                games: payload.games,
            }
        }
        "SwitchedWeapon" => {
            let payload: WeaponPayload = decode_payload(&tag, envelope.data)?;
            AuthorityEvent::SwitchedWeapon {
                weapon_index: payload.weapon_ind,
            }
        }
        "SwitchedLoadout" => {
            let payload: LoadoutPayload = decode_payload(&tag, envelope.data)?;
            AuthorityEvent::SwitchedLoadout {
                loadout_index: payload.loadout_ind,
            }
        }
        "SwitchedCategory" => {
            let payload: CategoryPayload = decode_payload(&tag, envelope.data)?;
            AuthorityEvent::SwitchedCategory {
                category_index: payload.category_ind,
            }
        }
        "StartedShooting" => {
            let payload: WeaponPayload = decode_payload(&tag, envelope.data)?;
            AuthorityEvent::StartedShooting {
                weapon_index: payload.weapon_ind,
            }
        }
        "StoppedShooting" => AuthorityEvent::StoppedShooting,
        _ => return Ok(DecodedEvent::Unknown { tag }),
    };
    Ok(DecodedEvent::Known(event))
}

fn decode_payload<T: DeserializeOwned>(tag: &str, data: Value) -> Result<T, EventDecodeError> {
    serde_path_to_error::deserialize(data).map_err(|error| EventDecodeError::Payload {
        tag: tag.to_string(),
        path: error.path().to_string(),
        message: error.into_inner().to_string(),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub applied: u64,
    pub unknown: u64,
    pub malformed: u64,
}

/// Applies events strictly in arrival order. Nothing is buffered or reordered
/// and no event is checked against the current hierarchy.
pub struct EventConsumer {
    state: MirrorState,
    stats: ConsumerStats,
    shutdown: Arc<AtomicBool>,
}

impl EventConsumer {
    pub fn new(state: MirrorState) -> Self {
        Self {
            state,
            stats: ConsumerStats::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    pub fn apply(&self, event: AuthorityEvent) {
        let selection = &self.state.selection;
        match event {
            AuthorityEvent::UpdatedGames { games } => {
                self.state.entities.replace_games(games);
            }
            AuthorityEvent::SwitchedWeapon { weapon_index } => {
                selection.weapon_index.set(weapon_index);
            }
            AuthorityEvent::SwitchedLoadout { loadout_index } => {
                selection.loadout_index.set(loadout_index);
            }
            AuthorityEvent::SwitchedCategory { category_index } => {
                selection.category_index.set(category_index);
            }
            AuthorityEvent::StartedShooting { weapon_index } => {
                selection.weapon_index.set(weapon_index);
                selection.shooting.set(true);
            }
            AuthorityEvent::StoppedShooting => {
                selection.shooting.set(false);
            }
        }
    }

    /// Decodes and applies one raw payload. Unknown tags and malformed
    /// payloads are logged and skipped.
    pub fn handle_line(&mut self, raw: &str) {
        match decode_event(raw) {
            Ok(DecodedEvent::Known(event)) => {
                debug!(event = event_name(&event), "authority_event_applied");
                self.apply(event);
                self.stats.applied += 1;
            }
            Ok(DecodedEvent::Unknown { tag }) => {
                warn!(tag = %tag, "authority_event_unknown_dropped");
                self.stats.unknown += 1;
            }
            Err(error) => {
                warn!(error = %error, "authority_event_malformed_dropped");
                self.stats.malformed += 1;
            }
        }
    }

    /// Consumes the subscription until the authority stops sending, then
    /// reports the closed stream on the error channel.
    pub fn run(mut self, subscription: EventSubscription) -> ConsumerStats {
        for raw in subscription {
            self.handle_line(&raw);
        }

        let stats = self.stats;
        let requested = self.shutdown.load(Ordering::Acquire);
        info!(
            applied = stats.applied,
            unknown = stats.unknown,
            malformed = stats.malformed,
            requested,
            "authority_event_stream_closed"
        );
        if !requested {
            self.state
                .errors
                .push(STREAM_CLOSED_CONTEXT, STREAM_CLOSED_REASON);
        }
        stats
    }
}

/// Running consumer thread. Call [`EventConsumerHandle::request_shutdown`]
/// before closing the connection on purpose, so the end of the stream is not
/// reported as an error.
#[derive(Debug)]
pub struct EventConsumerHandle {
    thread: JoinHandle<ConsumerStats>,
    shutdown: Arc<AtomicBool>,
}

impl EventConsumerHandle {
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn join(self) -> thread::Result<ConsumerStats> {
        self.thread.join()
    }
}

fn event_name(event: &AuthorityEvent) -> &'static str {
    match event {
        AuthorityEvent::UpdatedGames { .. } => "UpdatedGames",
        AuthorityEvent::SwitchedWeapon { .. } => "SwitchedWeapon",
        AuthorityEvent::SwitchedLoadout { .. } => "SwitchedLoadout",
        AuthorityEvent::SwitchedCategory { .. } => "SwitchedCategory",
        AuthorityEvent::StartedShooting { .. } => "StartedShooting",
        AuthorityEvent::StoppedShooting => "StoppedShooting",
    }
}

pub fn spawn_event_consumer(
    state: MirrorState,
    subscription: EventSubscription,
) -> io::Result<EventConsumerHandle> {
    let consumer = EventConsumer::new(state);
    let shutdown = Arc::clone(&consumer.shutdown);
    let thread = thread::Builder::new()
        .name("authority-events".to_string())
        .spawn(move || consumer.run(subscription))?;
    Ok(EventConsumerHandle { thread, shutdown })
}
