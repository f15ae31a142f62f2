use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use mirror::{Authority, Bootstrap, EventConsumerHandle, Requests};
use tracing::{error, info, warn};

use super::bootstrap::AppWiring;
use super::console::{parse_command, ConsoleCommand, HELP_TEXT};
use super::render::{attach_observers, describe_state};

enum Flow {
    Continue,
    Quit,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let observers = attach_observers(&app.state);
    let bootstrap = Bootstrap::new(app.authority.clone(), app.state.clone());
    let requests = bootstrap.requests().clone();
    let report = bootstrap.run();
    let failed = report.failed_stages();
    if failed.is_empty() {
        info!("bootstrap_complete");
    } else {
        warn!(failed = ?failed, "bootstrap_incomplete");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!(error = %err, "console_read_failed");
                return ExitCode::FAILURE;
            }
        };
        match parse_command(&line) {
            Ok(Some(command)) => {
                if let Flow::Quit = execute(&requests, command, &mut stdout) {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => eprintln!("{message}\n{HELP_TEXT}"),
        }
    }

    info!(
        connected = app.authority.is_connected(),
        addr = app.authority.addr(),
        "panel_shutdown"
    );
    drop(observers);
    shut_down(requests, app.authority, report.consumer);
    ExitCode::SUCCESS
}

/// Closes the connection and waits for the event consumer. The consumer is
/// told first, so the closed stream is not reported as an error.
fn shut_down(
    requests: Requests,
    authority: Arc<dyn Authority>,
    consumer: Option<EventConsumerHandle>,
) {
    if let Some(consumer) = &consumer {
        consumer.request_shutdown();
    }
    drop(requests);
    drop(authority);
    let Some(consumer) = consumer else {
        return;
    };
    match consumer.join() {
        Ok(stats) => info!(
            applied = stats.applied,
            unknown = stats.unknown,
            malformed = stats.malformed,
            "event_consumer_stopped"
        ),
        Err(_) => error!("event_consumer_panicked"),
    }
}

fn execute<W: Write>(requests: &Requests, command: ConsoleCommand, out: &mut W) -> Flow {
    let state = requests.state();
    let outcome = match command {
        ConsoleCommand::Game(index) => requests
            .change_game(index)
            .map(|accepted| format!("game {accepted}")),
        ConsoleCommand::Category(index) => requests
            .change_category(index)
            .map(|accepted| format!("category {accepted}")),
        ConsoleCommand::Loadout(index) => requests
            .change_loadout(index)
            .map(|accepted| format!("loadout {accepted}")),
        ConsoleCommand::Primary(index) => requests
            .change_primary_weapon(index)
            .map(|_| format!("primary {index}")),
        ConsoleCommand::Secondary(index) => requests
            .change_secondary_weapon(index)
            .map(|_| format!("secondary {index}")),
        ConsoleCommand::Multiplier(kind, value) => requests
            .change_mouse_multiplier(kind, value)
            .map(|config| {
                let applied = config.mouse_config.multiplier(kind).unwrap_or(value);
                format!("{} multiplier {applied}", kind.label())
            }),
        ConsoleCommand::Setting { name, value } => requests
            .change_setting(&name, value)
            .map(|_| format!("setting {name} updated")),
        ConsoleCommand::WeaponField {
            weapon_id,
            field,
            value,
        } => requests
            .set_weapon_field(&weapon_id, &field, value)
            .map(|_| format!("weapon {weapon_id} {field} updated")),
        ConsoleCommand::Key { game, key } => requests.submit_game_key(&game, &key).map(|games| {
            let status = games
                .iter()
                .find(|candidate| candidate.name == game)
                .and_then(|candidate| candidate.key_status.as_ref())
                .map_or("unknown", |status| status.label());
            format!("key for {game}: {status}")
        }),
        ConsoleCommand::Reset => requests
            .reset_config()
            .map(|_| "configuration reset".to_string()),
        ConsoleCommand::Layout(per_row) => requests
            .update_layout_parameter(per_row)
            .map(|()| format!("layout {per_row} per row")),
        ConsoleCommand::Restart => requests.restart_process().map(|()| "restarting".to_string()),
        ConsoleCommand::CheckUpdates => requests.check_for_updates().map(|available| {
            if available {
                "update available".to_string()
            } else {
                "up to date".to_string()
            }
        }),
        ConsoleCommand::PerformUpdate => requests
            .perform_update()
            .map(|()| "updating".to_string()),
        ConsoleCommand::Exit => {
            let _ = requests.exit_process();
            return Flow::Quit;
        }
        ConsoleCommand::Errors => {
            let entries = state.errors.entries();
            let listing = if entries.is_empty() {
                "no errors".to_string()
            } else {
                entries.join("\n")
            };
            Some(listing)
        }
        ConsoleCommand::ClearErrors => {
            requests.clear_errors();
            Some("errors cleared".to_string())
        }
        ConsoleCommand::State => Some(describe_state(state)),
        ConsoleCommand::Quit => return Flow::Quit,
    };

    // Failures are already on the error channel and in the log.
    if let Some(message) = outcome {
        if let Err(err) = writeln!(out, "{message}") {
            warn!(error = %err, "console_write_failed");
        }
    }
    Flow::Continue
}
