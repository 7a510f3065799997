use bevy::prelude::*;
use tokio::sync::oneshot;

use super::types::{EventsQuery, GameStatus, StartedGame};
use super::ApiChannels;
use crate::actions::ScoreBoard;
use crate::events::{GameEvent, GameEventBus, SceneDiagnostics};
use crate::registry::SceneRegistry;
use crate::scene::{current_game, start_with, stop_current, LoadedSpec, SceneClock, StartOptions};
use crate::spec::GameSpec;

const MAX_COMMANDS_PER_FRAME: usize = 32;

/// Commands sent from API -> Bevy
pub enum ApiCommand {
    StartGame(
        Box<GameSpec>,
        StartOptions,
        oneshot::Sender<Result<StartedGame, String>>,
    ),
    StopGame(oneshot::Sender<bool>),
    GetStatus(oneshot::Sender<GameStatus>),
    GetSpec(oneshot::Sender<Option<GameSpec>>),
    GetEvents(EventsQuery, oneshot::Sender<Vec<GameEvent>>),
}

pub(super) fn process_api_commands(world: &mut World) {
    let Some(receiver) = world.get_resource::<ApiChannels>().map(|c| c.receiver.clone()) else {
        return;
    };
    for cmd in receiver.try_iter().take(MAX_COMMANDS_PER_FRAME) {
        match cmd {
            ApiCommand::StartGame(spec, options, tx) => {
                let result = start_with(world, &spec, options)
                    .map(|game| StartedGame {
                        generation: game.generation,
                        scene: game.scene,
                        title: game.title,
                    })
                    .map_err(|e| e.to_string());
                if let Err(e) = &result {
                    warn!("[Playspec API] Start rejected: {e}");
                }
                let _ = tx.send(result);
            }
            ApiCommand::StopGame(tx) => {
                let _ = tx.send(stop_current(world));
            }
            ApiCommand::GetStatus(tx) => {
                let _ = tx.send(game_status(world));
            }
            ApiCommand::GetSpec(tx) => {
                let spec = world.get_resource::<LoadedSpec>().map(|s| s.0.clone());
                let _ = tx.send(spec);
            }
            ApiCommand::GetEvents(query, tx) => {
                let events = world
                    .get_resource::<GameEventBus>()
                    .map(|bus| {
                        bus.recent
                            .iter()
                            .filter(|e| query.since.map_or(true, |since| e.frame >= since))
                            .filter(|e| query.name.as_deref().map_or(true, |n| e.name == n))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                let _ = tx.send(events);
            }
        }
    }
}

pub(super) fn game_status(world: &World) -> GameStatus {
    let Some(game) = current_game(world) else {
        return GameStatus::default();
    };
    let board = world.get_resource::<ScoreBoard>();
    GameStatus {
        running: true,
        title: Some(game.title),
        scene: Some(game.scene),
        generation: Some(game.generation),
        score: board.map_or(0, |b| b.score),
        game_over: board.is_some_and(|b| b.game_over),
        objects: world
            .get_resource::<SceneRegistry>()
            .map_or(0, SceneRegistry::object_count),
        elapsed_ms: world.get_resource::<SceneClock>().map_or(0.0, |c| c.now_ms),
        diagnostics: world
            .get_resource::<SceneDiagnostics>()
            .map(|d| d.entries.clone())
            .unwrap_or_default(),
    }
}
