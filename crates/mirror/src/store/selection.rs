use crate::model::{Category, Game, Loadout};

use super::cell::ObservableCell;

/// Navigation position and live firing status.
///
/// Every cell is written independently and nothing here is checked against
/// the hierarchy: an index may point past the sequence it refers to until the
/// matching games update arrives. Use [`SelectionSnapshot`] lookups, which
/// resolve indices against the hierarchy at the point of use.
#[derive(Debug, Clone)]
pub struct SelectionState {
    pub game_index: ObservableCell<usize>,
    pub category_index: ObservableCell<usize>,
    pub loadout_index: ObservableCell<usize>,
    /// Active weapon slot within the current loadout.
    pub weapon_index: ObservableCell<usize>,
    pub shooting: ObservableCell<bool>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            game_index: ObservableCell::new("game_index", 0),
            category_index: ObservableCell::new("category_index", 0),
            loadout_index: ObservableCell::new("loadout_index", 0),
            weapon_index: ObservableCell::new("weapon_index", 0),
            shooting: ObservableCell::new("shooting", false),
        }
    }
}

impl SelectionState {
    /// Reads each cell once. The values are not taken under a common lock.
    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            game_index: self.game_index.get(),
            category_index: self.category_index.get(),
            loadout_index: self.loadout_index.get(),
            weapon_index: self.weapon_index.get(),
            shooting: self.shooting.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionSnapshot {
    pub game_index: usize,
    pub category_index: usize,
    pub loadout_index: usize,
    pub weapon_index: usize,
    pub shooting: bool,
}

impl SelectionSnapshot {
    pub fn game<'a>(&self, games: &'a [Game]) -> Option<&'a Game> {
        games.get(self.game_index)
    }

    pub fn category<'a>(&self, games: &'a [Game]) -> Option<&'a Category> {
        self.game(games)
            .and_then(|game| game.category(self.category_index))
    }

    pub fn loadout<'a>(&self, games: &'a [Game]) -> Option<&'a Loadout> {
        self.category(games)
            .and_then(|category| category.loadouts.get(self.loadout_index))
    }

    /// Weapon id in the active slot: index 0 is the loadout's selected primary,
    /// index 1 its selected secondary.
    pub fn active_weapon_id<'a>(&self, games: &'a [Game]) -> Option<&'a str> {
        let loadout = self.loadout(games)?;
        match self.weapon_index {
            0 => loadout.selected_primary_id(),
            1 => loadout.selected_secondary_id(),
            _ => None,
        }
    }
}
