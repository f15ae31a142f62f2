use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{MouseMultiplier, SettingValue};

/// One request to the authority. Serializes as
/// `{"command": "<name>", "args": {...}}` with the authority's command names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum AuthorityCommand {
    GetVersion,
    #[serde(rename = "load_games_wrapper")]
    LoadGames,
    GetGames,
    GetConfig,
    /// Opens the event stream; sent by transports, not by the request layer.
    StartChannelReads,
    ChangeGame {
        new_game_index: usize,
    },
    ChangeCategory {
        new_category_index: usize,
    },
    ChangeLoadout {
        new_loadout_index: usize,
    },
    ChangePrimaryWeapon {
        new_primary_index: usize,
    },
    ChangeSecondaryWeapon {
        new_secondary_index: usize,
    },
    ChangeHorizontalMultiplier {
        new_multiplier: f32,
    },
    ChangeVerticalMultiplier {
        new_multiplier: f32,
    },
    ChangeAcogHorizontalMultiplier {
        new_multiplier: f32,
    },
    ChangeAcogVerticalMultiplier {
        new_multiplier: f32,
    },
    ChangeSetting {
        setting: String,
        value: SettingValue,
    },
    #[serde(rename = "change_weapon_config")]
    SetWeaponField {
        weapon_id: String,
        field: String,
        new_value: Value,
    },
    SubmitGameKey {
        game_name: String,
        key: String,
    },
    #[serde(rename = "reset_config_from_server")]
    ResetConfig,
    #[serde(rename = "change_grid_layout")]
    UpdateLayout {
        loadouts_per_row: usize,
    },
    #[serde(rename = "restart_app")]
    Restart,
    #[serde(rename = "exit_app")]
    Exit,
    CheckForUpdates,
    PerformUpdate,
}

impl AuthorityCommand {
    pub fn mouse_multiplier(kind: MouseMultiplier, new_multiplier: f32) -> Self {
        match kind {
            MouseMultiplier::Horizontal => Self::ChangeHorizontalMultiplier { new_multiplier },
            MouseMultiplier::Vertical => Self::ChangeVerticalMultiplier { new_multiplier },
            MouseMultiplier::AcogHorizontal => {
                Self::ChangeAcogHorizontalMultiplier { new_multiplier }
            }
            MouseMultiplier::AcogVertical => Self::ChangeAcogVerticalMultiplier { new_multiplier },
        }
    }

    /// Wire name, used in logs and decode errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetVersion => "get_version",
            Self::LoadGames => "load_games_wrapper",
            Self::GetGames => "get_games",
            Self::GetConfig => "get_config",
            Self::StartChannelReads => "start_channel_reads",
            Self::ChangeGame { .. } => "change_game",
            Self::ChangeCategory { .. } => "change_category",
            Self::ChangeLoadout { .. } => "change_loadout",
            Self::ChangePrimaryWeapon { .. } => "change_primary_weapon",
            Self::ChangeSecondaryWeapon { .. } => "change_secondary_weapon",
            Self::ChangeHorizontalMultiplier { .. } => "change_horizontal_multiplier",
            Self::ChangeVerticalMultiplier { .. } => "change_vertical_multiplier",
            Self::ChangeAcogHorizontalMultiplier { .. } => "change_acog_horizontal_multiplier",
            Self::ChangeAcogVerticalMultiplier { .. } => "change_acog_vertical_multiplier",
            Self::ChangeSetting { .. } => "change_setting",
            Self::SetWeaponField { .. } => "change_weapon_config",
            Self::SubmitGameKey { .. } => "submit_game_key",
            Self::ResetConfig => "reset_config_from_server",
            Self::UpdateLayout { .. } => "change_grid_layout",
            Self::Restart => "restart_app",
            Self::Exit => "exit_app",
            Self::CheckForUpdates => "check_for_updates",
            Self::PerformUpdate => "perform_update",
        }
    }
}
