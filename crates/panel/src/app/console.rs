use mirror::model::{MouseMultiplier, SettingValue};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConsoleCommand {
    Game(usize),
    Category(usize),
    Loadout(usize),
    Primary(usize),
    Secondary(usize),
    Multiplier(MouseMultiplier, f32),
    Setting { name: String, value: SettingValue },
    WeaponField {
        weapon_id: String,
        field: String,
        value: Value,
    },
    Key { game: String, key: String },
    Reset,
    Layout(usize),
    Restart,
    CheckUpdates,
    PerformUpdate,
    Exit,
    Errors,
    ClearErrors,
    State,
    Quit,
}

pub(crate) const HELP_TEXT: &str = "\
commands:
  game <i> | category <i> | loadout <i> | primary <i> | secondary <i>
  multiplier <horizontal|vertical|acog-horizontal|acog-vertical> <value>
  setting <name> <json scalar or text>  (keybinds are always text)
  weapon <id> <field> <json>
  key <game> <key>
  reset | layout <n> | restart | updates | update | exit
  errors | clear-errors | state | quit";

/// Parses one console line. Blank lines and `#` comments yield `Ok(None)`.
pub(crate) fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (trimmed, ""),
    };
    let args = rest.split_whitespace().collect::<Vec<_>>();

    let command = match word {
        "game" => ConsoleCommand::Game(single_index(word, &args)?),
        "category" => ConsoleCommand::Category(single_index(word, &args)?),
        "loadout" => ConsoleCommand::Loadout(single_index(word, &args)?),
        "primary" => ConsoleCommand::Primary(single_index(word, &args)?),
        "secondary" => ConsoleCommand::Secondary(single_index(word, &args)?),
        "layout" => {
            let per_row = single_index(word, &args)?;
            if per_row == 0 {
                return Err("layout requires a positive loadouts-per-row value".to_string());
            }
            ConsoleCommand::Layout(per_row)
        }
        "multiplier" => {
            let [kind, value] = args.as_slice() else {
                return Err("multiplier takes <kind> <value>".to_string());
            };
            let kind = MouseMultiplier::parse(kind)
                .ok_or_else(|| format!("unknown multiplier '{kind}'"))?;
            let value = value
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite() && *value > 0.0)
                .ok_or_else(|| {
                    format!("invalid multiplier value '{value}' (expected positive number)")
                })?;
            ConsoleCommand::Multiplier(kind, value)
        }
        "setting" => {
            let Some((name, value)) = rest.split_once(char::is_whitespace) else {
                return Err("setting takes <name> <value>".to_string());
            };
            ConsoleCommand::Setting {
                name: name.to_string(),
                value: SettingValue::for_setting(name, value.trim()),
            }
        }
        "weapon" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let (Some(weapon_id), Some(field), Some(raw_value)) =
                (parts.next(), parts.next(), parts.next())
            else {
                return Err("weapon takes <id> <field> <json>".to_string());
            };
            let value = serde_json::from_str::<Value>(raw_value.trim())
                .map_err(|error| format!("invalid weapon value '{}': {error}", raw_value.trim()))?;
            ConsoleCommand::WeaponField {
                weapon_id: weapon_id.to_string(),
                field: field.to_string(),
                value,
            }
        }
        "key" => {
            let [game, key] = args.as_slice() else {
                return Err("key takes <game> <key>".to_string());
            };
            ConsoleCommand::Key {
                game: game.to_string(),
                key: key.to_string(),
            }
        }
        "reset" => no_args(word, &args, ConsoleCommand::Reset)?,
        "restart" => no_args(word, &args, ConsoleCommand::Restart)?,
        "updates" => no_args(word, &args, ConsoleCommand::CheckUpdates)?,
        "update" => no_args(word, &args, ConsoleCommand::PerformUpdate)?,
        "exit" => no_args(word, &args, ConsoleCommand::Exit)?,
        "errors" => no_args(word, &args, ConsoleCommand::Errors)?,
        "clear-errors" => no_args(word, &args, ConsoleCommand::ClearErrors)?,
        "state" => no_args(word, &args, ConsoleCommand::State)?,
        "quit" => no_args(word, &args, ConsoleCommand::Quit)?,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}

fn single_index(word: &str, args: &[&str]) -> Result<usize, String> {
    let [value] = args else {
        return Err(format!("{word} takes exactly one index"));
    };
    value
        .parse::<usize>()
        .map_err(|_| format!("invalid {word} index '{value}' (expected usize)"))
}

fn no_args(word: &str, args: &[&str], command: ConsoleCommand) -> Result<ConsoleCommand, String> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(format!("{word} takes no arguments"))
    }
}
