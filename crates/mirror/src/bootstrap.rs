use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::authority::Authority;
use crate::events::{spawn_event_consumer, EventConsumerHandle};
use crate::requests::Requests;
use crate::store::MirrorState;

pub(crate) const OPEN_EVENT_STREAM_CONTEXT: &str = "Open event stream failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    FetchVersion,
    LoadGames,
    FetchGames,
    FetchConfig,
    OpenEventStream,
}

impl BootstrapStage {
    pub const ORDER: [Self; 5] = [
        Self::FetchVersion,
        Self::LoadGames,
        Self::FetchGames,
        Self::FetchConfig,
        Self::OpenEventStream,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::FetchVersion => "fetch_version",
            Self::LoadGames => "load_games",
            Self::FetchGames => "fetch_games",
            Self::FetchConfig => "fetch_config",
            Self::OpenEventStream => "open_event_stream",
        }
    }
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What each startup stage did. Failed stages have already been reported on
/// the error channel.
#[derive(Debug)]
pub struct BootstrapReport {
    pub stages: Vec<(BootstrapStage, bool)>,
    /// Event consumer thread, present when the stream was opened.
    pub consumer: Option<EventConsumerHandle>,
}

impl BootstrapReport {
    pub fn succeeded(&self, stage: BootstrapStage) -> bool {
        self.stages
            .iter()
            .any(|(recorded, ok)| *recorded == stage && *ok)
    }

    pub fn failed_stages(&self) -> Vec<BootstrapStage> {
        self.stages
            .iter()
            .filter(|(_, ok)| !*ok)
            .map(|(stage, _)| *stage)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.stages.len() == BootstrapStage::ORDER.len() && self.failed_stages().is_empty()
    }
}

/// Startup ordering: version, authoritative load, games snapshot, config
/// snapshot, then the event stream. Every stage runs even when an earlier one
/// failed. Nothing is retried or rolled back.
pub struct Bootstrap {
    authority: Arc<dyn Authority>,
    requests: Requests,
}

impl Bootstrap {
    pub fn new(authority: Arc<dyn Authority>, state: MirrorState) -> Self {
        let requests = Requests::new(Arc::clone(&authority), state);
        Self {
            authority,
            requests,
        }
    }

    pub fn requests(&self) -> &Requests {
        &self.requests
    }

    /// Runs once. Consuming the sequencer keeps it to one event subscription.
    pub fn run(self) -> BootstrapReport {
        let mut stages = Vec::with_capacity(BootstrapStage::ORDER.len());
        let mut consumer = None;

        for stage in BootstrapStage::ORDER {
            let ok = match stage {
                BootstrapStage::FetchVersion => self.requests.fetch_version().is_some(),
                BootstrapStage::LoadGames => self.requests.load_games().is_some(),
                BootstrapStage::FetchGames => self.requests.refresh_games().is_some(),
                BootstrapStage::FetchConfig => self.requests.refresh_config().is_some(),
                BootstrapStage::OpenEventStream => {
                    consumer = self.open_event_stream();
                    consumer.is_some()
                }
            };
            if ok {
                info!(stage = stage.label(), "bootstrap_stage_complete");
            } else {
                warn!(stage = stage.label(), "bootstrap_stage_failed_continuing");
            }
            stages.push((stage, ok));
        }

        BootstrapReport { stages, consumer }
    }

    fn open_event_stream(&self) -> Option<EventConsumerHandle> {
        let state = self.requests.state();
        let subscription = match self.authority.subscribe() {
            Ok(subscription) => subscription,
            Err(error) => {
                warn!(error = %error, "authority_subscribe_failed");
                state.errors.push(OPEN_EVENT_STREAM_CONTEXT, &error);
                return None;
            }
        };
        match spawn_event_consumer(state.clone(), subscription) {
            Ok(handle) => Some(handle),
            Err(error) => {
                warn!(error = %error, "event_consumer_spawn_failed");
                state.errors.push(OPEN_EVENT_STREAM_CONTEXT, &error);
                None
            }
        }
    }
}
