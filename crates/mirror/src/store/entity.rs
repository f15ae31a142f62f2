use std::sync::Arc;

use crate::model::{Game, GlobalConfig};

use super::cell::{ObservableCell, Subscription};

/// Last-known-good hierarchy and global config reported by the authority.
///
/// Both aggregates are only ever replaced whole; there is no patch path.
#[derive(Debug, Clone)]
pub struct EntityModel {
    games: ObservableCell<Vec<Game>>,
    config: ObservableCell<GlobalConfig>,
}

impl Default for EntityModel {
    fn default() -> Self {
        Self {
            games: ObservableCell::new("games", Vec::new()),
            config: ObservableCell::new("config", GlobalConfig::default()),
        }
    }
}

impl EntityModel {
    pub fn games(&self) -> Arc<Vec<Game>> {
        self.games.snapshot()
    }

    pub fn config(&self) -> Arc<GlobalConfig> {
        self.config.snapshot()
    }

    pub fn replace_games(&self, games: Vec<Game>) -> Arc<Vec<Game>> {
        self.games.set(games)
    }

    pub fn replace_config(&self, config: GlobalConfig) -> Arc<GlobalConfig> {
        self.config.set(config)
    }

    pub fn games_revision(&self) -> u64 {
        self.games.revision()
    }

    pub fn config_revision(&self) -> u64 {
        self.config.revision()
    }

    pub fn subscribe_games<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Vec<Game>) + Send + Sync + 'static,
    {
        self.games.subscribe(observer)
    }

    pub fn subscribe_config<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&GlobalConfig) + Send + Sync + 'static,
    {
        self.config.subscribe(observer)
    }

    pub fn game_named(&self, name: &str) -> Option<Game> {
        self.games.snapshot().iter().find(|game| game.name == name).cloned()
    }
}
