//! Per-frame movement strategies for objects with a `behavior`.

use std::collections::HashMap;
use std::f32::consts::TAU;

use bevy::prelude::*;
use rand::Rng;

use crate::components::{ArcadeBody, GamePosition, SceneObject, Velocity};
use crate::registry::{BehaviorState, SceneRegistry};
use crate::scene::SceneClock;
use crate::spawner::SceneRng;
use crate::spec::BehaviorType;

pub const PATROL_RANGE: f32 = 200.0;
pub const PATROL_SPEED: f32 = 50.0;
pub const FOLLOW_TARGET: &str = "player";
pub const FOLLOW_SPEED: f32 = 80.0;
pub const RANDOM_INTERVAL_MS: f64 = 1000.0;
pub const RANDOM_SPEED: f32 = 100.0;

fn param_f32(params: &serde_json::Value, key: &str) -> Option<f32> {
    params.get(key)?.as_f64().map(|v| v as f32)
}

fn param_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params.get(key)?.as_str()
}

/// New horizontal velocity for a patrolling body.
pub fn patrol_step(x: f32, vx: f32, anchor: f32, range: f32, speed: f32) -> f32 {
    let offset = x - anchor;
    let beyond = offset.abs() >= range;
    if vx == 0.0 {
        return if beyond { -offset.signum() * speed } else { speed };
    }
    let moving_away = vx.signum() == offset.signum();
    if beyond && moving_away {
        -vx
    } else {
        vx
    }
}

/// Constant-speed velocity along the angle from `from` to `to`.
pub fn follow_velocity(from: Vec2, to: Vec2, speed: f32) -> Vec2 {
    let delta = to - from;
    let angle = delta.y.atan2(delta.x);
    Vec2::new(angle.cos(), angle.sin()) * speed
}

/// A fresh heading is due on the first call and every `interval_ms` after.
pub fn random_due(last_change_ms: Option<f64>, now_ms: f64, interval_ms: f64) -> bool {
    last_change_ms.map_or(true, |last| now_ms - last >= interval_ms)
}

pub fn run_behaviors(
    clock: Res<SceneClock>,
    mut registry: ResMut<SceneRegistry>,
    mut rng: ResMut<SceneRng>,
    positions: Query<(Entity, &GamePosition), With<SceneObject>>,
    mut bodies: Query<(&ArcadeBody, &mut Velocity)>,
) {
    let position_cache: HashMap<Entity, Vec2> = positions
        .iter()
        .map(|(entity, pos)| (entity, pos.as_vec2()))
        .collect();

    let (objects, behaviors, states) = registry.behavior_tables();
    for (id, assignment) in behaviors {
        let Some(&entity) = objects.get(id) else {
            continue;
        };
        let Some(&position) = position_cache.get(&entity) else {
            continue;
        };
        let Ok((body, mut velocity)) = bodies.get_mut(entity) else {
            continue;
        };
        if !body.is_movable() {
            continue;
        }
        let params = &assignment.params;
        match assignment.kind {
            BehaviorType::Static => {}
            BehaviorType::Patrol => {
                let state = states.entry(id.clone()).or_insert_with(BehaviorState::default);
                let anchor = *state.anchor_x.get_or_insert(position.x);
                let range = param_f32(params, "range").unwrap_or(PATROL_RANGE);
                let speed = param_f32(params, "speed").unwrap_or(PATROL_SPEED);
                velocity.x = patrol_step(position.x, velocity.x, anchor, range, speed);
            }
            BehaviorType::Follow => {
                let target = param_str(params, "target").unwrap_or(FOLLOW_TARGET);
                let Some(target_pos) = objects
                    .get(target)
                    .and_then(|e| position_cache.get(e))
                else {
                    continue;
                };
                let speed = param_f32(params, "speed").unwrap_or(FOLLOW_SPEED);
                let v = follow_velocity(position, *target_pos, speed);
                *velocity = Velocity { x: v.x, y: v.y };
            }
            BehaviorType::Random => {
                let interval = param_f32(params, "interval")
                    .or_else(|| param_f32(params, "change_interval"))
                    .map_or(RANDOM_INTERVAL_MS, f64::from);
                let speed = param_f32(params, "speed").unwrap_or(RANDOM_SPEED);
                let state = states.entry(id.clone()).or_insert_with(BehaviorState::default);
                if random_due(state.last_change_ms, clock.now_ms, interval) {
                    let angle = rng.0.gen_range(0.0..TAU);
                    *velocity = Velocity {
                        x: angle.cos() * speed,
                        y: angle.sin() * speed,
                    };
                    state.last_change_ms = Some(clock.now_ms);
                }
            }
        }
    }
}
