//! Designer-defined actions and the fallback callbacks.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::components::TextContent;
use crate::events::GameEventBus;
use crate::factory::create_entity;
use crate::physics::ArcadeWorld;
use crate::registry::SceneRegistry;
use crate::rules::SceneBindings;
use crate::spec::{ActionDefinition, ActionEffect, GameObject, ObjectType, TextProperties};
use crate::timers::RuleTimers;

pub const SCORE_TEXT_ID: &str = "scoreText";
pub const GAME_OVER_TEXT_ID: &str = "gameOverText";

/// Named effects declared by the scene.
#[derive(Resource, Default, Debug)]
pub struct ActionLibrary {
    actions: HashMap<String, ActionEffect>,
}

impl ActionLibrary {
    pub fn from_definitions(definitions: &[ActionDefinition]) -> Self {
        let actions = definitions
            .iter()
            .map(|d| (d.name.clone(), d.effect.clone()))
            .collect();
        Self { actions }
    }

    pub fn get(&self, name: &str) -> Option<&ActionEffect> {
        self.actions.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    Action(ActionEffect),
    /// `null`: physics response only.
    Nothing,
    GameOver,
    Destroy,
    Unknown,
}

impl Callback {
    /// Named actions shadow the built-in fallbacks.
    pub fn resolve(library: Option<&ActionLibrary>, name: &str) -> Self {
        if let Some(effect) = library.and_then(|l| l.get(name)) {
            return Callback::Action(effect.clone());
        }
        match name {
            "null" => Callback::Nothing,
            "gameOver" => Callback::GameOver,
            "destroy" => Callback::Destroy,
            _ => Callback::Unknown,
        }
    }
}

#[derive(Resource, Default, Debug, Clone)]
pub struct ScoreBoard {
    pub score: i64,
    pub game_over: bool,
}

pub fn execute(world: &mut World, effect: &ActionEffect, target: Option<Entity>) {
    match effect {
        ActionEffect::UpdateScore { points } => {
            let score = {
                let mut board = world.get_resource_or_insert_with(ScoreBoard::default);
                board.score += i64::from(*points);
                board.score
            };
            set_text(world, SCORE_TEXT_ID, format!("Score: {score}"));
            emit(
                world,
                "score_changed",
                serde_json::json!({ "score": score, "points": points }),
            );
            if let Some(target) = target {
                destroy(world, target);
            }
        }
        ActionEffect::GameOver => game_over(world),
        ActionEffect::Destroy => {
            if let Some(target) = target {
                destroy(world, target);
            }
        }
        ActionEffect::UpdateText { object_id, text } => {
            if set_text(world, object_id, text.clone()) {
                emit(
                    world,
                    "text_updated",
                    serde_json::json!({ "id": object_id, "text": text }),
                );
            }
        }
    }
}

fn emit(world: &mut World, name: &str, data: serde_json::Value) {
    if let Some(mut bus) = world.get_resource_mut::<GameEventBus>() {
        bus.emit(name, data, None);
    }
}

/// Returns false when `id` is not a live text object.
fn set_text(world: &mut World, id: &str, text: String) -> bool {
    let Some(entity) = world
        .get_resource::<SceneRegistry>()
        .and_then(|r| r.entity(id))
    else {
        return false;
    };
    match world.get_mut::<TextContent>(entity) {
        Some(mut content) => {
            content.0 = text;
            true
        }
        None => false,
    }
}

fn destroy(world: &mut World, entity: Entity) {
    if world.entities().contains(entity) {
        world.despawn(entity);
    }
}

fn game_over(world: &mut World) {
    {
        let mut board = world.get_resource_or_insert_with(ScoreBoard::default);
        if board.game_over {
            return;
        }
        board.game_over = true;
    }
    let center = match world.get_resource::<ArcadeWorld>() {
        Some(arcade) => Vec2::new(arcade.width / 2.0, arcade.height / 2.0),
        None => Vec2::ZERO,
    };
    let mut banner = GameObject::new(GAME_OVER_TEXT_ID, ObjectType::Text, center.x, center.y);
    banner.text = Some(TextProperties {
        text: "GAME OVER".to_string(),
        font_size: Some("64px".to_string()),
        fill: Some("#ff0000".to_string()),
    });
    if let Err(err) = create_entity(world, &banner, center) {
        warn!("[Playspec] Could not show game over text: {err}");
    }
    if let Some(mut arcade) = world.get_resource_mut::<ArcadeWorld>() {
        arcade.paused = true;
    }
    let score = world.get_resource::<ScoreBoard>().map_or(0, |b| b.score);
    emit(world, "game_over", serde_json::json!({ "score": score }));
    info!("[Playspec] Game over (score {score})");
}

/// Where a fired callback name lives.
#[derive(Debug, Clone, Copy)]
pub enum CallbackSource {
    Interaction(usize),
    Timer(usize),
}

/// Resolve the callback bound at `source` and run it against `target`.
/// Unknown names are a no-op, warned about once per binding.
pub fn run_callback(world: &mut World, source: CallbackSource, target: Option<Entity>) {
    let Some((name, rule)) = callback_site(world, source) else {
        return;
    };
    let callback = Callback::resolve(world.get_resource::<ActionLibrary>(), &name);
    match callback {
        Callback::Action(effect) => execute(world, &effect, target),
        Callback::GameOver => execute(world, &ActionEffect::GameOver, target),
        Callback::Destroy => execute(world, &ActionEffect::Destroy, target),
        Callback::Nothing => {}
        Callback::Unknown => {
            if mark_warned(world, source) {
                warn!("[Playspec] Unknown callback '{name}' in rule '{rule}', ignoring");
            }
        }
    }
}

/// Callback name and the rule line it came from.
fn callback_site(world: &World, source: CallbackSource) -> Option<(String, String)> {
    match source {
        CallbackSource::Interaction(i) => world
            .get_resource::<SceneBindings>()?
            .interactions
            .get(i)
            .map(|b| (b.callback.clone(), b.rule.clone())),
        CallbackSource::Timer(i) => world
            .get_resource::<RuleTimers>()?
            .0
            .get(i)
            .map(|t| (t.binding.rule.callback.clone(), t.binding.source.clone())),
    }
}

/// Returns true the first time it is called for `source`.
fn mark_warned(world: &mut World, source: CallbackSource) -> bool {
    let flag = match source {
        CallbackSource::Interaction(i) => world
            .get_resource_mut::<SceneBindings>()
            .and_then(|b| b.into_inner().interactions.get_mut(i).map(|b| &mut b.warned)),
        CallbackSource::Timer(i) => world
            .get_resource_mut::<RuleTimers>()
            .and_then(|t| t.into_inner().0.get_mut(i).map(|t| &mut t.binding.warned)),
    };
    match flag {
        Some(warned) if !*warned => {
            *warned = true;
            true
        }
        _ => false,
    }
}
