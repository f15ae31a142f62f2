use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub keybinds: KeybindConfig,
    #[serde(default)]
    pub mouse_config: MouseConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeybindConfig {
    pub require_right_hold: bool,
    #[serde(rename = "primary_weapon")]
    pub primary_weapon_key: char,
    #[serde(rename = "secondary_weapon")]
    pub secondary_weapon_key: char,
    #[serde(rename = "alternative_fire")]
    pub alternative_fire_key: char,
}

impl Default for KeybindConfig {
    fn default() -> Self {
        Self {
            require_right_hold: true,
            primary_weapon_key: '1',
            secondary_weapon_key: '2',
            alternative_fire_key: '3',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseConfig {
    pub horizontal_multiplier: f32,
    pub vertical_multiplier: f32,
    #[serde(default)]
    pub acog_horizontal_multiplier: Option<f32>,
    #[serde(default)]
    pub acog_vertical_multiplier: Option<f32>,
    #[serde(default)]
    pub scroll_wheel_weapon_swap: bool,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            horizontal_multiplier: 1.0,
            vertical_multiplier: 1.0,
            acog_horizontal_multiplier: None,
            acog_vertical_multiplier: None,
            scroll_wheel_weapon_swap: false,
        }
    }
}

impl MouseConfig {
    pub fn multiplier(&self, kind: MouseMultiplier) -> Option<f32> {
        match kind {
            MouseMultiplier::Horizontal => Some(self.horizontal_multiplier),
            MouseMultiplier::Vertical => Some(self.vertical_multiplier),
            MouseMultiplier::AcogHorizontal => self.acog_horizontal_multiplier,
            MouseMultiplier::AcogVertical => self.acog_vertical_multiplier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseMultiplier {
    Horizontal,
    Vertical,
    AcogHorizontal,
    AcogVertical,
}

impl MouseMultiplier {
    pub const ALL: [Self; 4] = [
        Self::Horizontal,
        Self::Vertical,
        Self::AcogHorizontal,
        Self::AcogVertical,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
            Self::AcogHorizontal => "ACOG horizontal",
            Self::AcogVertical => "ACOG vertical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "horizontal" => Some(Self::Horizontal),
            "vertical" => Some(Self::Vertical),
            "acog-horizontal" | "acog_horizontal" => Some(Self::AcogHorizontal),
            "acog-vertical" | "acog_vertical" => Some(Self::AcogVertical),
            _ => None,
        }
    }
}

/// Value accepted by the authority's `change_setting` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Settings the authority stores as single characters.
const KEYBIND_SETTINGS: [&str; 3] = ["primary_weapon", "secondary_weapon", "alternative_fire"];

impl SettingValue {
    /// Reads a console token as a JSON scalar, so `"4"` stays text. Anything
    /// that is not a JSON bool, number or string is taken as raw text.
    pub fn parse_token(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Bool(flag)) => Self::Bool(flag),
            Ok(Value::Number(number)) => match number.as_f64() {
                Some(number) if number.is_finite() => Self::Number(number),
                _ => Self::Text(raw.to_string()),
            },
            Ok(Value::String(text)) => Self::Text(text),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Like [`SettingValue::parse_token`], except keybind settings are always
    /// text: the default keys are the digits `1` to `3`.
    pub fn for_setting(name: &str, raw: &str) -> Self {
        if !KEYBIND_SETTINGS.contains(&name) {
            return Self::parse_token(raw);
        }
        match serde_json::from_str::<String>(raw) {
            Ok(text) => Self::Text(text),
            Err(_) => Self::Text(raw.to_string()),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<char> for SettingValue {
    fn from(value: char) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: GlobalConfig = serde_json::from_value(json!({})).expect("decode config");
        assert_eq!(config, GlobalConfig::default());
        assert!(config.keybinds.require_right_hold);
        assert_eq!(config.keybinds.primary_weapon_key, '1');
        assert_eq!(config.mouse_config.multiplier(MouseMultiplier::AcogVertical), None);
    }

    #[test]
    fn keybinds_use_authority_field_names() {
        let config: GlobalConfig = serde_json::from_value(json!({
            "keybinds": {
                "require_right_hold": false,
                "primary_weapon": "q",
                "secondary_weapon": "e",
                "alternative_fire": "x"
            },
            "mouse_config": {
                "horizontal_multiplier": 0.8,
                "vertical_multiplier": 1.5,
                "acog_vertical_multiplier": 2.0,
                "scroll_wheel_weapon_swap": true
            }
        }))
        .expect("decode config");

        assert_eq!(config.keybinds.secondary_weapon_key, 'e');
        assert_eq!(config.mouse_config.multiplier(MouseMultiplier::Vertical), Some(1.5));
        assert_eq!(
            config.mouse_config.multiplier(MouseMultiplier::AcogVertical),
            Some(2.0)
        );
        assert!(config.mouse_config.scroll_wheel_weapon_swap);
    }

    #[test]
    fn setting_tokens_prefer_bool_then_number() {
        assert_eq!(SettingValue::parse_token("true"), SettingValue::Bool(true));
        assert_eq!(SettingValue::parse_token("2.5"), SettingValue::Number(2.5));
        assert_eq!(SettingValue::parse_token("q"), SettingValue::Text("q".into()));
        assert_eq!(SettingValue::parse_token("NaN"), SettingValue::Text("NaN".into()));
        assert_eq!(SettingValue::parse_token("\"4\""), SettingValue::Text("4".into()));
        assert_eq!(
            serde_json::to_value(SettingValue::Bool(false)).expect("encode"),
            json!(false)
        );
    }

    #[test]
    fn keybind_settings_keep_digit_keys_as_text() {
        assert_eq!(
            SettingValue::for_setting("primary_weapon", "4"),
            SettingValue::Text("4".into())
        );
        assert_eq!(
            SettingValue::for_setting("alternative_fire", "\"x\""),
            SettingValue::Text("x".into())
        );
        assert_eq!(
            SettingValue::for_setting("vertical_multiplier", "4"),
            SettingValue::Number(4.0)
        );
        assert_eq!(
            serde_json::to_value(SettingValue::for_setting("secondary_weapon", "2"))
                .expect("encode"),
            json!("2")
        );
    }

    #[test]
    fn multiplier_names_parse_from_console_spelling() {
        assert_eq!(
            MouseMultiplier::parse("acog-horizontal"),
            Some(MouseMultiplier::AcogHorizontal)
        );
        assert_eq!(MouseMultiplier::parse("diagonal"), None);
    }
}
