mod game;
mod settings;
mod weapon;

pub use game::{Category, Game, KeyStatus, Loadout, WeaponMap};
pub use settings::{GlobalConfig, KeybindConfig, MouseConfig, MouseMultiplier, SettingValue};
pub use weapon::{
    FullAutoStandardProfile, SingleFireProfile, SingleShotProfile, Weapon, WeaponId, WeaponKind,
};
