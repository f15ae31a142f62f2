use std::fmt::Write as _;

use mirror::model::Game;
use mirror::{MirrorState, SelectionSnapshot, Subscription};
use tracing::info;

/// Registers the log-line observers. Dropping the returned handles stops
/// rendering.
pub(crate) fn attach_observers(state: &MirrorState) -> Vec<Subscription> {
    let selection = &state.selection;
    vec![
        state.entities.subscribe_games(|games| {
            let unlocked = games.iter().filter(|game| game.is_unlocked()).count();
            info!(games = games.len(), unlocked, "view_games_replaced");
        }),
        state.entities.subscribe_config(|config| {
            info!(
                horizontal = config.mouse_config.horizontal_multiplier,
                vertical = config.mouse_config.vertical_multiplier,
                wheel_swap = config.mouse_config.scroll_wheel_weapon_swap,
                "view_config_replaced"
            );
        }),
        selection
            .game_index
            .subscribe(|index| info!(index = *index, "view_game_selected")),
        selection
            .category_index
            .subscribe(|index| info!(index = *index, "view_category_selected")),
        selection
            .loadout_index
            .subscribe(|index| info!(index = *index, "view_loadout_selected")),
        selection
            .weapon_index
            .subscribe(|index| info!(index = *index, "view_weapon_selected")),
        selection
            .shooting
            .subscribe(|shooting| info!(shooting = *shooting, "view_shooting_changed")),
        state.errors.subscribe(|entries| {
            if let Some(latest) = entries.last() {
                info!(count = entries.len(), latest = %latest, "view_error_added");
            } else {
                info!("view_errors_cleared");
            }
        }),
        state.version.subscribe(|version| {
            info!(version = version.as_deref().unwrap_or("unknown"), "view_version")
        }),
    ]
}

/// Multi-line summary printed by the `state` console command. Indices that no
/// longer resolve against the current games are shown as stale.
pub(crate) fn describe_state(state: &MirrorState) -> String {
    let games = state.entities.games();
    let selection = state.selection.snapshot();
    let config = state.entities.config();
    let mut out = String::new();

    let version = state.version.get();
    let _ = writeln!(out, "version: {}", version.as_deref().unwrap_or("unknown"));
    for (index, game) in games.iter().enumerate() {
        let marker = if index == selection.game_index { '>' } else { ' ' };
        let _ = writeln!(out, "{marker} [{index}] {}", describe_game(game));
    }
    let _ = writeln!(out, "selection: {}", describe_selection(&selection, &games));
    let _ = writeln!(
        out,
        "mouse: horizontal={} vertical={} wheel_swap={}",
        config.mouse_config.horizontal_multiplier,
        config.mouse_config.vertical_multiplier,
        config.mouse_config.scroll_wheel_weapon_swap
    );
    if let Some(per_row) = state.layout.get() {
        let _ = writeln!(out, "layout: {per_row} loadouts per row");
    }
    let _ = write!(out, "errors: {}", state.errors.len());
    out
}

fn describe_game(game: &Game) -> String {
    match &game.key_status {
        Some(status) if game.is_unlocked() => format!(
            "{} ({}, {} categories, {} weapons)",
            game.name,
            status.label(),
            game.categories().len(),
            game.weapon_count()
        ),
        Some(status) => format!("{} ({}, locked)", game.name, status.label()),
        None => format!("{} (no key)", game.name),
    }
}

fn describe_selection(selection: &SelectionSnapshot, games: &[Game]) -> String {
    let category = selection
        .category(games)
        .map_or_else(|| "stale".to_string(), |category| category.name.clone());
    let loadout = selection
        .loadout(games)
        .map_or_else(|| "stale".to_string(), |loadout| loadout.name.clone());
    let weapon = selection.active_weapon_id(games).unwrap_or("none");
    format!(
        "category={category} loadout={loadout} weapon={weapon} shooting={}",
        selection.shooting
    )
}
