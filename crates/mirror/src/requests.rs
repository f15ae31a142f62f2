//! Outbound operations that propose changes to the authority.
//!
//! Every operation blocks until the authority answers, applies the answer as
//! the new source of truth and returns it. A failure leaves state untouched,
//! lands in the error channel as `"<context>: <error>"` and yields `None`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::authority::{Authority, AuthorityCommand, AuthorityError};
use crate::model::{Game, GlobalConfig, MouseMultiplier, SettingValue};
use crate::store::{MirrorState, ObservableCell};

pub(crate) const CHANGE_GAME_CONTEXT: &str = "Change to game failed";
pub(crate) const CHANGE_CATEGORY_CONTEXT: &str = "Change to category failed";
pub(crate) const CHANGE_LOADOUT_CONTEXT: &str = "Change to loadout failed";
pub(crate) const CHANGE_PRIMARY_CONTEXT: &str = "Change to primary weapon failed";
pub(crate) const CHANGE_SECONDARY_CONTEXT: &str = "Change to secondary weapon failed";
pub(crate) const CHANGE_SETTING_CONTEXT: &str = "Change to settings failed";
pub(crate) const SET_WEAPON_FIELD_CONTEXT: &str = "Set weapon config failed";
pub(crate) const SUBMIT_KEY_CONTEXT: &str = "Submit game key failed";
pub(crate) const RESET_CONFIG_CONTEXT: &str = "Reset configuration failed";
pub(crate) const CHANGE_LAYOUT_CONTEXT: &str = "Change to layout failed";
pub(crate) const RESTART_CONTEXT: &str = "Restart application failed";
pub(crate) const CHECK_UPDATES_CONTEXT: &str = "Check for updates failed";
pub(crate) const PERFORM_UPDATE_CONTEXT: &str = "Perform update failed";
pub(crate) const EXIT_CONTEXT: &str = "Exit application failed";
pub(crate) const FETCH_VERSION_CONTEXT: &str = "Fetch version failed";
pub(crate) const LOAD_GAMES_CONTEXT: &str = "Load games failed";
pub(crate) const FETCH_GAMES_CONTEXT: &str = "Fetch games failed";
pub(crate) const FETCH_CONFIG_CONTEXT: &str = "Fetch config failed";

pub(crate) fn multiplier_context(kind: MouseMultiplier) -> String {
    format!("Change to {} multiplier failed", kind.label())
}

/// Request layer bound to one authority and one state container.
#[derive(Clone)]
pub struct Requests {
    authority: Arc<dyn Authority>,
    state: MirrorState,
}

impl Requests {
    pub fn new(authority: Arc<dyn Authority>, state: MirrorState) -> Self {
        Self { authority, state }
    }

    pub fn state(&self) -> &MirrorState {
        &self.state
    }

    pub fn change_game(&self, index: usize) -> Option<usize> {
        let command = AuthorityCommand::ChangeGame {
            new_game_index: index,
        };
        self.change_index(command, CHANGE_GAME_CONTEXT, &self.state.selection.game_index)
    }

    pub fn change_category(&self, index: usize) -> Option<usize> {
        let command = AuthorityCommand::ChangeCategory {
            new_category_index: index,
        };
        self.change_index(
            command,
            CHANGE_CATEGORY_CONTEXT,
            &self.state.selection.category_index,
        )
    }

    pub fn change_loadout(&self, index: usize) -> Option<usize> {
        let command = AuthorityCommand::ChangeLoadout {
            new_loadout_index: index,
        };
        self.change_index(
            command,
            CHANGE_LOADOUT_CONTEXT,
            &self.state.selection.loadout_index,
        )
    }

    pub fn change_primary_weapon(&self, index: usize) -> Option<Arc<Vec<Game>>> {
        let command = AuthorityCommand::ChangePrimaryWeapon {
            new_primary_index: index,
        };
        self.replace_games_from(command, CHANGE_PRIMARY_CONTEXT)
    }

    pub fn change_secondary_weapon(&self, index: usize) -> Option<Arc<Vec<Game>>> {
        let command = AuthorityCommand::ChangeSecondaryWeapon {
            new_secondary_index: index,
        };
        self.replace_games_from(command, CHANGE_SECONDARY_CONTEXT)
    }

    pub fn change_mouse_multiplier(
        &self,
        kind: MouseMultiplier,
        value: f32,
    ) -> Option<Arc<GlobalConfig>> {
        let command = AuthorityCommand::mouse_multiplier(kind, value);
        self.replace_config_from(command, &multiplier_context(kind))
    }

    pub fn change_setting(
        &self,
        setting: &str,
        value: impl Into<SettingValue>,
    ) -> Option<Arc<GlobalConfig>> {
        let command = AuthorityCommand::ChangeSetting {
            setting: setting.to_string(),
            value: value.into(),
        };
        self.replace_config_from(command, CHANGE_SETTING_CONTEXT)
    }

    pub fn set_weapon_field(
        &self,
        weapon_id: &str,
        field: &str,
        new_value: Value,
    ) -> Option<Arc<Vec<Game>>> {
        let command = AuthorityCommand::SetWeaponField {
            weapon_id: weapon_id.to_string(),
            field: field.to_string(),
            new_value,
        };
        self.replace_games_from(command, SET_WEAPON_FIELD_CONTEXT)
    }

    /// The returned list lets the caller read the resulting key status
    /// without waiting for a pushed games update.
    pub fn submit_game_key(&self, game_name: &str, key: &str) -> Option<Arc<Vec<Game>>> {
        let command = AuthorityCommand::SubmitGameKey {
            game_name: game_name.to_string(),
            key: key.to_string(),
        };
        self.replace_games_from(command, SUBMIT_KEY_CONTEXT)
    }

    /// Reloads the hierarchy from the authority's persisted copy. Selection
    /// indices are left as they are.
    pub fn reset_config(&self) -> Option<Arc<Vec<Game>>> {
        self.replace_games_from(AuthorityCommand::ResetConfig, RESET_CONFIG_CONTEXT)
    }

    pub fn update_layout_parameter(&self, loadouts_per_row: usize) -> Option<()> {
        let command = AuthorityCommand::UpdateLayout { loadouts_per_row };
        self.fire(command, CHANGE_LAYOUT_CONTEXT)?;
        self.state.layout.set(Some(loadouts_per_row));
        Some(())
    }

    pub fn restart_process(&self) -> Option<()> {
        self.fire(AuthorityCommand::Restart, RESTART_CONTEXT)
    }

    pub fn exit_process(&self) -> Option<()> {
        self.fire(AuthorityCommand::Exit, EXIT_CONTEXT)
    }

    /// `Some(true)` when a newer build is available.
    pub fn check_for_updates(&self) -> Option<bool> {
        self.request(AuthorityCommand::CheckForUpdates, CHECK_UPDATES_CONTEXT)
    }

    pub fn perform_update(&self) -> Option<()> {
        self.fire(AuthorityCommand::PerformUpdate, PERFORM_UPDATE_CONTEXT)
    }

    pub fn refresh_games(&self) -> Option<Arc<Vec<Game>>> {
        self.replace_games_from(AuthorityCommand::GetGames, FETCH_GAMES_CONTEXT)
    }

    pub fn refresh_config(&self) -> Option<Arc<GlobalConfig>> {
        self.replace_config_from(AuthorityCommand::GetConfig, FETCH_CONFIG_CONTEXT)
    }

    pub fn fetch_version(&self) -> Option<String> {
        let version: String = self.request(AuthorityCommand::GetVersion, FETCH_VERSION_CONTEXT)?;
        self.state.version.set(Some(version.clone()));
        Some(version)
    }

    /// Asks the authority to (re)load game definitions from its persisted
    /// source. Nothing is applied locally; fetch the games afterwards.
    pub fn load_games(&self) -> Option<()> {
        self.fire(AuthorityCommand::LoadGames, LOAD_GAMES_CONTEXT)
    }

    pub fn clear_errors(&self) {
        self.state.errors.clear();
    }

    fn change_index(
        &self,
        command: AuthorityCommand,
        context: &str,
        cell: &ObservableCell<usize>,
    ) -> Option<usize> {
        let requested = index_argument(&command);
        let accepted: usize = self.request(command, context)?;
        if Some(accepted) != requested {
            debug!(cell = cell.name(), ?requested, accepted, "authority_clamped_index");
        }
        cell.set(accepted);
        Some(accepted)
    }

    fn replace_games_from(&self, command: AuthorityCommand, context: &str) -> Option<Arc<Vec<Game>>> {
        let games: Vec<Game> = self.request(command, context)?;
        Some(self.state.entities.replace_games(games))
    }

    fn replace_config_from(
        &self,
        command: AuthorityCommand,
        context: &str,
    ) -> Option<Arc<GlobalConfig>> {
        let config: GlobalConfig = self.request(command, context)?;
        Some(self.state.entities.replace_config(config))
    }

    /// For commands whose answer carries no value.
    fn fire(&self, command: AuthorityCommand, context: &str) -> Option<()> {
        self.request::<Value>(command, context).map(|_| ())
    }

    fn request<T: DeserializeOwned>(&self, command: AuthorityCommand, context: &str) -> Option<T> {
        let name = command.name();
        let outcome = self
            .authority
            .call(&command)
            .and_then(|value| decode_response(name, value));
        match outcome {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(command = name, error = %error, "authority_request_failed");
                self.state.errors.push(context, &error);
                None
            }
        }
    }
}

fn index_argument(command: &AuthorityCommand) -> Option<usize> {
    match command {
        AuthorityCommand::ChangeGame { new_game_index } => Some(*new_game_index),
        AuthorityCommand::ChangeCategory { new_category_index } => Some(*new_category_index),
        AuthorityCommand::ChangeLoadout { new_loadout_index } => Some(*new_loadout_index),
        _ => None,
    }
}

pub(crate) fn decode_response<T: DeserializeOwned>(
    command: &'static str,
    value: Value,
) -> Result<T, AuthorityError> {
    serde_path_to_error::deserialize(value).map_err(|error| AuthorityError::Decode {
        command,
        path: error.path().to_string(),
        message: error.into_inner().to_string(),
    })
}
