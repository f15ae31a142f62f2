use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::weapon::{Weapon, WeaponId};

pub type WeaponMap = HashMap<WeaponId, Weapon>;

/// License state the authority last reported for a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KeyStatus {
    Invalid {
        key: String,
    },
    Valid {
        key: String,
        timestamp: u64,
    },
    Expired {
        key: String,
        timestamp: u64,
    },
    Banned {
        key: String,
    },
    /// The key is bound to a different machine.
    #[serde(rename = "HWIDMismatch")]
    HwidMismatch {
        key: String,
    },
}

impl KeyStatus {
    pub fn key(&self) -> &str {
        match self {
            Self::Invalid { key }
            | Self::Valid { key, .. }
            | Self::Expired { key, .. }
            | Self::Banned { key }
            | Self::HwidMismatch { key } => key,
        }
    }

    pub fn timestamp(&self) -> Option<u64> {
        match self {
            Self::Valid { timestamp, .. } | Self::Expired { timestamp, .. } => Some(*timestamp),
            _ => None,
        }
    }

    /// Every status except `Valid` withholds the game's categories and weapons.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::Valid { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "invalid",
            Self::Valid { .. } => "valid",
            Self::Expired { .. } => "expired",
            Self::Banned { .. } => "banned",
            Self::HwidMismatch { .. } => "hwid_mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub name: String,
    #[serde(default, rename = "key")]
    pub license_key: Option<String>,
    #[serde(default)]
    pub key_status: Option<KeyStatus>,
    #[serde(default)]
    pub categories: Option<Vec<Category>>,
    #[serde(default)]
    pub weapons: Option<WeaponMap>,
}

impl Game {
    pub fn is_unlocked(&self) -> bool {
        matches!(&self.key_status, Some(status) if !status.is_blocking())
    }

    pub fn categories(&self) -> &[Category] {
        self.categories.as_deref().unwrap_or_default()
    }

    pub fn category(&self, index: usize) -> Option<&Category> {
        self.categories().get(index)
    }

    pub fn loadout(&self, category_index: usize, loadout_index: usize) -> Option<&Loadout> {
        self.category(category_index)
            .and_then(|category| category.loadouts.get(loadout_index))
    }

    pub fn weapon(&self, id: &str) -> Option<&Weapon> {
        self.weapons.as_ref().and_then(|weapons| weapons.get(id))
    }

    pub fn weapon_count(&self) -> usize {
        self.weapons.as_ref().map_or(0, HashMap::len)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub loadouts: Vec<Loadout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub icon_only: bool,
    #[serde(default, rename = "primaries")]
    pub primary_weapon_ids: Vec<WeaponId>,
    #[serde(default, rename = "secondaries")]
    pub secondary_weapon_ids: Vec<WeaponId>,
    #[serde(default)]
    pub selected_primary: usize,
    #[serde(default)]
    pub selected_secondary: usize,
}

impl Loadout {
    pub fn selected_primary_index(&self) -> Option<usize> {
        selected_slot(self.selected_primary, self.primary_weapon_ids.len())
    }

    pub fn selected_secondary_index(&self) -> Option<usize> {
        selected_slot(self.selected_secondary, self.secondary_weapon_ids.len())
    }

    pub fn selected_primary_id(&self) -> Option<&str> {
        self.selected_primary_index()
            .map(|index| self.primary_weapon_ids[index].as_str())
    }

    pub fn selected_secondary_id(&self) -> Option<&str> {
        self.selected_secondary_index()
            .map(|index| self.secondary_weapon_ids[index].as_str())
    }
}

fn selected_slot(selected: usize, len: usize) -> Option<usize> {
    (selected < len).then_some(selected)
}
