//! Scripted in-process authority for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{mpsc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::{json, Value};

use crate::authority::{Authority, AuthorityCommand, AuthorityError, EventSubscription};
use crate::model::{
    Category, FullAutoStandardProfile, Game, GlobalConfig, KeyStatus, Loadout, SingleShotProfile,
    Weapon,
};

pub(crate) const VALID_KEY_TIMESTAMP: u64 = 1_900_000_000;

struct FakeState {
    games: Vec<Game>,
    config: GlobalConfig,
    game_index: usize,
    category_index: usize,
    loadout_index: usize,
    failures: HashMap<&'static str, VecDeque<String>>,
    raw_responses: HashMap<&'static str, Value>,
    calls: Vec<AuthorityCommand>,
    events: Option<mpsc::Sender<String>>,
    subscribed: bool,
}

/// Behaves like a small authority: clamps indices, mutates its own copy of
/// the hierarchy and answers with full snapshots. Failures can be queued per
/// command name.
pub(crate) struct FakeAuthority {
    state: Mutex<FakeState>,
}

impl Default for FakeAuthority {
    fn default() -> Self {
        Self::with_games(sample_games())
    }
}

impl FakeAuthority {
    pub(crate) fn with_games(games: Vec<Game>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                games,
                config: GlobalConfig::default(),
                game_index: 0,
                category_index: 0,
                loadout_index: 0,
                failures: HashMap::new(),
                raw_responses: HashMap::new(),
                calls: Vec::new(),
                events: None,
                subscribed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The next call of `command` is rejected with `message`.
    pub(crate) fn fail_next(&self, command: &'static str, message: &str) {
        self.lock()
            .failures
            .entry(command)
            .or_default()
            .push_back(message.to_string());
    }

    /// Every call of `command` answers `value` instead of the scripted result.
    pub(crate) fn respond_raw(&self, command: &'static str, value: Value) {
        self.lock().raw_responses.insert(command, value);
    }

    pub(crate) fn call_names(&self) -> Vec<&'static str> {
        self.lock().calls.iter().map(AuthorityCommand::name).collect()
    }

    pub(crate) fn games(&self) -> Vec<Game> {
        self.lock().games.clone()
    }

    pub(crate) fn set_games(&self, games: Vec<Game>) {
        self.lock().games = games;
    }

    pub(crate) fn push_event(&self, event: Value) {
        let state = self.lock();
        let sender = state.events.as_ref().expect("subscription open");
        sender.send(event.to_string()).expect("consumer alive");
    }

    /// Ends the event stream.
    pub(crate) fn close_events(&self) {
        self.lock().events = None;
    }

    fn take_failure(state: &mut FakeState, name: &'static str) -> Option<String> {
        let queue = state.failures.get_mut(name)?;
        queue.pop_front()
    }
}

impl Authority for FakeAuthority {
    fn call(&self, command: &AuthorityCommand) -> Result<Value, AuthorityError> {
        let mut state = self.lock();
        state.calls.push(command.clone());
        let name = command.name();
        if let Some(message) = Self::take_failure(&mut state, name) {
            return Err(AuthorityError::Rejected(message));
        }
        if let Some(value) = state.raw_responses.get(name) {
            return Ok(value.clone());
        }
        state.execute(command).map_err(AuthorityError::Rejected)
    }

    fn subscribe(&self) -> Result<EventSubscription, AuthorityError> {
        let mut state = self.lock();
        state.calls.push(AuthorityCommand::StartChannelReads);
        if let Some(message) = Self::take_failure(&mut state, "start_channel_reads") {
            return Err(AuthorityError::Rejected(message));
        }
        if state.subscribed {
            return Err(AuthorityError::AlreadySubscribed);
        }
        let (sender, subscription) = EventSubscription::channel();
        state.events = Some(sender);
        state.subscribed = true;
        Ok(subscription)
    }
}

impl FakeState {
    fn execute(&mut self, command: &AuthorityCommand) -> Result<Value, String> {
        match command {
            AuthorityCommand::GetVersion => Ok(json!("2.4.1")),
            AuthorityCommand::LoadGames
            | AuthorityCommand::StartChannelReads
            | AuthorityCommand::Restart
            | AuthorityCommand::Exit
            | AuthorityCommand::PerformUpdate => Ok(Value::Null),
            AuthorityCommand::GetGames | AuthorityCommand::ResetConfig => to_json(&self.games),
            AuthorityCommand::GetConfig => to_json(&self.config),
            AuthorityCommand::CheckForUpdates => Ok(json!(false)),
            AuthorityCommand::ChangeGame { new_game_index } => {
                self.game_index = clamp(*new_game_index, self.games.len());
                self.category_index = 0;
                self.loadout_index = 0;
                Ok(json!(self.game_index))
            }
            AuthorityCommand::ChangeCategory { new_category_index } => {
                let count = self.current_game()?.categories().len();
                self.category_index = clamp(*new_category_index, count);
                self.loadout_index = 0;
                Ok(json!(self.category_index))
            }
            AuthorityCommand::ChangeLoadout { new_loadout_index } => {
                let count = self
                    .current_game()?
                    .category(self.category_index)
                    .map_or(0, |category| category.loadouts.len());
                self.loadout_index = clamp(*new_loadout_index, count);
                Ok(json!(self.loadout_index))
            }
            AuthorityCommand::ChangePrimaryWeapon { new_primary_index } => {
                let loadout = self.current_loadout_mut()?;
                if *new_primary_index >= loadout.primary_weapon_ids.len() {
                    return Err(format!("Invalid primary index: {new_primary_index}"));
                }
                loadout.selected_primary = *new_primary_index;
                to_json(&self.games)
            }
            AuthorityCommand::ChangeSecondaryWeapon {
                new_secondary_index,
            } => {
                let loadout = self.current_loadout_mut()?;
                if *new_secondary_index >= loadout.secondary_weapon_ids.len() {
                    return Err(format!("Invalid secondary index: {new_secondary_index}"));
                }
                loadout.selected_secondary = *new_secondary_index;
                to_json(&self.games)
            }
            AuthorityCommand::ChangeHorizontalMultiplier { new_multiplier } => {
                self.config.mouse_config.horizontal_multiplier = *new_multiplier;
                to_json(&self.config)
            }
            AuthorityCommand::ChangeVerticalMultiplier { new_multiplier } => {
                self.config.mouse_config.vertical_multiplier = *new_multiplier;
                to_json(&self.config)
            }
            AuthorityCommand::ChangeAcogHorizontalMultiplier { new_multiplier } => {
                self.config.mouse_config.acog_horizontal_multiplier = Some(*new_multiplier);
                to_json(&self.config)
            }
            AuthorityCommand::ChangeAcogVerticalMultiplier { new_multiplier } => {
                self.config.mouse_config.acog_vertical_multiplier = Some(*new_multiplier);
                to_json(&self.config)
            }
            AuthorityCommand::ChangeSetting { setting, value } => {
                let mut config = to_json(&self.config)?;
                let section = ["mouse_config", "keybinds"]
                    .into_iter()
                    .find(|section| config[section].get(setting.as_str()).is_some())
                    .ok_or_else(|| format!("Unknown setting: {setting}"))?;
                config[section][setting.as_str()] = to_json(value)?;
                self.config = serde_json::from_value(config).map_err(|err| err.to_string())?;
                to_json(&self.config)
            }
            AuthorityCommand::SetWeaponField {
                weapon_id,
                field,
                new_value,
            } => {
                let weapon = self
                    .games
                    .get_mut(self.game_index)
                    .and_then(|game| game.weapons.as_mut())
                    .and_then(|weapons| weapons.get_mut(weapon_id))
                    .ok_or_else(|| format!("Unknown weapon: {weapon_id}"))?;
                let mut encoded = to_json(&*weapon)?;
                if encoded["config"].get(field.as_str()).is_none() {
                    return Err(format!("Unknown field: {field}"));
                }
                encoded["config"][field.as_str()] = new_value.clone();
                *weapon = serde_json::from_value(encoded).map_err(|err| err.to_string())?;
                to_json(&self.games)
            }
            AuthorityCommand::SubmitGameKey { game_name, key } => {
                let game = self
                    .games
                    .iter_mut()
                    .find(|game| &game.name == game_name)
                    .ok_or_else(|| format!("Unknown game: {game_name}"))?;
                game.license_key = Some(key.clone());
                if key.starts_with("VALID") {
                    game.key_status = Some(KeyStatus::Valid {
                        key: key.clone(),
                        timestamp: VALID_KEY_TIMESTAMP,
                    });
                    if game.categories.is_none() {
                        game.categories = Some(vec![category("General", &["default"])]);
                        game.weapons = Some(HashMap::new());
                    }
                } else {
                    game.key_status = Some(KeyStatus::Invalid { key: key.clone() });
                    game.categories = None;
                    game.weapons = None;
                }
                to_json(&self.games)
            }
            AuthorityCommand::UpdateLayout { loadouts_per_row } => {
                if *loadouts_per_row == 0 {
                    return Err("Loadouts per row must be positive".to_string());
                }
                Ok(Value::Null)
            }
        }
    }

    fn current_game(&self) -> Result<&Game, String> {
        self.games
            .get(self.game_index)
            .ok_or_else(|| "No game selected".to_string())
    }

    fn current_loadout_mut(&mut self) -> Result<&mut Loadout, String> {
        let (category_index, loadout_index) = (self.category_index, self.loadout_index);
        self.games
            .get_mut(self.game_index)
            .and_then(|game| game.categories.as_mut())
            .and_then(|categories| categories.get_mut(category_index))
            .and_then(|category| category.loadouts.get_mut(loadout_index))
            .ok_or_else(|| "No loadout selected".to_string())
    }
}

fn clamp(requested: usize, len: usize) -> usize {
    requested.min(len.saturating_sub(1))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|err| err.to_string())
}

pub(crate) fn loadout(name: &str, primaries: &[&str], secondaries: &[&str]) -> Loadout {
    Loadout {
        name: name.to_string(),
        icon_url: None,
        icon_only: false,
        primary_weapon_ids: primaries.iter().map(ToString::to_string).collect(),
        secondary_weapon_ids: secondaries.iter().map(ToString::to_string).collect(),
        selected_primary: 0,
        selected_secondary: 0,
    }
}

fn category(name: &str, loadouts: &[&str]) -> Category {
    Category {
        name: name.to_string(),
        loadouts: loadouts
            .iter()
            .map(|loadout_name| loadout(loadout_name, &["r4c", "m762"], &["p12"]))
            .collect(),
    }
}

/// Three games: an unlocked one with a full hierarchy, a locked one and a
/// second unlocked one.
pub(crate) fn sample_games() -> Vec<Game> {
    let weapons = HashMap::from([
        (
            "r4c".to_string(),
            Weapon::FullAutoStandard(FullAutoStandardProfile {
                name: "R4-C".to_string(),
                description: None,
                rpm: 860,
                first_shot_scale: 1.2,
                exponential_factor: 0.8,
                dx: 0.0,
                dy: 2.5,
                enabled: true,
            }),
        ),
        (
            "m762".to_string(),
            Weapon::FullAutoStandard(FullAutoStandardProfile {
                name: "M762".to_string(),
                description: Some("High recoil".to_string()),
                rpm: 730,
                first_shot_scale: 1.0,
                exponential_factor: 1.0,
                dx: 0.5,
                dy: 3.0,
                enabled: true,
            }),
        ),
        (
            "p12".to_string(),
            Weapon::SingleShot(SingleShotProfile {
                name: "P12".to_string(),
                description: None,
                recoil_completion_ms: 90,
                dx: 0.0,
                dy: 1.0,
                enabled: true,
            }),
        ),
    ]);

    vec![
        Game {
            name: "Siege".to_string(),
            license_key: Some("VALID-SIEGE".to_string()),
            key_status: Some(KeyStatus::Valid {
                key: "VALID-SIEGE".to_string(),
                timestamp: VALID_KEY_TIMESTAMP,
            }),
            categories: Some(vec![
                category("Attack", &["ash", "thermite"]),
                category("Defense", &["jager"]),
            ]),
            weapons: Some(weapons.clone()),
        },
        Game {
            name: "Apex".to_string(),
            license_key: Some("EXPIRED-APEX".to_string()),
            key_status: Some(KeyStatus::Expired {
                key: "EXPIRED-APEX".to_string(),
                timestamp: 1_600_000_000,
            }),
            categories: None,
            weapons: None,
        },
        Game {
            name: "Tarkov".to_string(),
            license_key: Some("VALID-TARKOV".to_string()),
            key_status: Some(KeyStatus::Valid {
                key: "VALID-TARKOV".to_string(),
                timestamp: VALID_KEY_TIMESTAMP,
            }),
            categories: Some(vec![category("Raid", &["pmc"])]),
            weapons: Some(weapons),
        },
    ]
}
