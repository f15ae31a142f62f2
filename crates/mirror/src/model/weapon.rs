use serde::{Deserialize, Serialize};

pub type WeaponId = String;

/// Behavior profile for one weapon, tagged the way the authority stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config")]
pub enum Weapon {
    SingleFire(SingleFireProfile),
    SingleShot(SingleShotProfile),
    FullAutoStandard(FullAutoStandardProfile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponKind {
    SingleFire,
    SingleShot,
    FullAutoStandard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleFireProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub trigger_delay_ms: u32,
    pub recoil_completion_ms: u32,
    pub release_delay_ms: u32,
    pub dx: f32,
    pub dy: f32,
    #[serde(default)]
    pub autofire: bool,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleShotProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub recoil_completion_ms: u32,
    pub dx: f32,
    pub dy: f32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullAutoStandardProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rpm: u64,
    pub first_shot_scale: f32,
    pub exponential_factor: f32,
    pub dx: f32,
    pub dy: f32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Weapon {
    pub fn kind(&self) -> WeaponKind {
        match self {
            Self::SingleFire(_) => WeaponKind::SingleFire,
            Self::SingleShot(_) => WeaponKind::SingleShot,
            Self::FullAutoStandard(_) => WeaponKind::FullAutoStandard,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::SingleFire(profile) => &profile.name,
            Self::SingleShot(profile) => &profile.name,
            Self::FullAutoStandard(profile) => &profile.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::SingleFire(profile) => profile.description.as_deref(),
            Self::SingleShot(profile) => profile.description.as_deref(),
            Self::FullAutoStandard(profile) => profile.description.as_deref(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Self::SingleFire(profile) => profile.enabled,
            Self::SingleShot(profile) => profile.enabled,
            Self::FullAutoStandard(profile) => profile.enabled,
        }
    }

    pub fn offset(&self) -> (f32, f32) {
        match self {
            Self::SingleFire(profile) => (profile.dx, profile.dy),
            Self::SingleShot(profile) => (profile.dx, profile.dy),
            Self::FullAutoStandard(profile) => (profile.dx, profile.dy),
        }
    }
}

impl WeaponKind {
    /// Field names the authority accepts in `change_weapon_config` for this kind.
    pub fn editable_fields(self) -> &'static [&'static str] {
        match self {
            Self::SingleFire => &[
                "name",
                "description",
                "trigger_delay_ms",
                "recoil_completion_ms",
                "release_delay_ms",
                "dx",
                "dy",
                "autofire",
                "enabled",
            ],
            Self::SingleShot => &[
                "name",
                "description",
                "recoil_completion_ms",
                "dx",
                "dy",
                "enabled",
            ],
            Self::FullAutoStandard => &[
                "name",
                "description",
                "rpm",
                "first_shot_scale",
                "exponential_factor",
                "dx",
                "dy",
                "enabled",
            ],
        }
    }

    pub fn accepts_field(self, field: &str) -> bool {
        self.editable_fields().contains(&field)
    }
}
