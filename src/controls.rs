//! Keyboard bindings for player objects.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::components::{ArcadeBody, GamePosition, SceneObject, Velocity};
use crate::errors::BuildError;
use crate::events::report;
use crate::factory::{adopt_into_group, instantiate, Created};
use crate::registry::SceneRegistry;
use crate::scene::SceneClock;
use crate::spec::{Controls, GameObject};

pub const DEFAULT_MOVE_SPEED: f32 = 160.0;
pub const DEFAULT_JUMP_VELOCITY: f32 = 330.0;
pub const SHOT_COOLDOWN_MS: f64 = 200.0;
pub const PROJECTILE_GROUP: &str = "projectiles";

/// Arrow keys, direction words, space and shift.
pub fn conventional_key(name: &str) -> Option<KeyCode> {
    let lower = name.trim().to_ascii_lowercase();
    let key = match lower.as_str() {
        "left" | "arrowleft" => KeyCode::ArrowLeft,
        "right" | "arrowright" => KeyCode::ArrowRight,
        "up" | "arrowup" => KeyCode::ArrowUp,
        "down" | "arrowdown" => KeyCode::ArrowDown,
        "space" | "spacebar" => KeyCode::Space,
        "shift" | "shiftleft" => KeyCode::ShiftLeft,
        _ => return None,
    };
    Some(key)
}

const LETTERS: [KeyCode; 26] = [
    KeyCode::KeyA,
    KeyCode::KeyB,
    KeyCode::KeyC,
    KeyCode::KeyD,
    KeyCode::KeyE,
    KeyCode::KeyF,
    KeyCode::KeyG,
    KeyCode::KeyH,
    KeyCode::KeyI,
    KeyCode::KeyJ,
    KeyCode::KeyK,
    KeyCode::KeyL,
    KeyCode::KeyM,
    KeyCode::KeyN,
    KeyCode::KeyO,
    KeyCode::KeyP,
    KeyCode::KeyQ,
    KeyCode::KeyR,
    KeyCode::KeyS,
    KeyCode::KeyT,
    KeyCode::KeyU,
    KeyCode::KeyV,
    KeyCode::KeyW,
    KeyCode::KeyX,
    KeyCode::KeyY,
    KeyCode::KeyZ,
];

const DIGITS: [KeyCode; 10] = [
    KeyCode::Digit0,
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

fn single_char_key(c: char) -> Option<KeyCode> {
    if c.is_ascii_alphabetic() {
        let index = (c.to_ascii_lowercase() as u8 - b'a') as usize;
        return LETTERS.get(index).copied();
    }
    c.to_digit(10).and_then(|d| DIGITS.get(d as usize).copied())
}

fn custom_key(name: &str) -> Option<KeyCode> {
    let trimmed = name.trim();
    let tail = trimmed
        .strip_prefix("Key")
        .or_else(|| trimmed.strip_prefix("Digit"))
        .unwrap_or(trimmed);
    let mut chars = tail.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return single_char_key(c);
    }
    let key = match trimmed.to_ascii_lowercase().as_str() {
        "enter" | "return" => KeyCode::Enter,
        "escape" | "esc" => KeyCode::Escape,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "ctrl" | "control" | "controlleft" => KeyCode::ControlLeft,
        "alt" | "altleft" => KeyCode::AltLeft,
        "shiftright" => KeyCode::ShiftRight,
        _ => return None,
    };
    Some(key)
}

/// Memoized key-name lookups. Unresolvable names are cached too.
#[derive(Resource, Default, Debug)]
pub struct KeyCache {
    resolved: HashMap<String, Option<KeyCode>>,
}

impl KeyCache {
    pub fn resolve(&mut self, name: &str) -> Option<KeyCode> {
        if let Some(key) = conventional_key(name) {
            return Some(key);
        }
        *self
            .resolved
            .entry(name.to_string())
            .or_insert_with(|| custom_key(name))
    }

    pub fn cached(&self) -> usize {
        self.resolved.len()
    }
}

/// Resolved control settings of one object.
#[derive(Component, Debug, Clone)]
pub struct ObjectControls {
    pub left: Option<KeyCode>,
    pub right: Option<KeyCode>,
    pub up: Option<KeyCode>,
    pub down: Option<KeyCode>,
    pub jump: Option<KeyCode>,
    pub shoot: Option<KeyCode>,
    pub speed: f32,
    pub jump_velocity: f32,
    pub projectile: Option<GameObject>,
    pub last_shot_ms: Option<f64>,
}

impl ObjectControls {
    pub fn bind(controls: &Controls, keys: &mut KeyCache) -> Self {
        let mut lookup = |name: &Option<String>| {
            let name = name.as_deref()?;
            let key = keys.resolve(name);
            if key.is_none() {
                warn!("[Playspec] Unknown key name '{name}', binding ignored");
            }
            key
        };
        Self {
            left: lookup(&controls.left),
            right: lookup(&controls.right),
            up: lookup(&controls.up),
            down: lookup(&controls.down),
            jump: lookup(&controls.jump),
            shoot: lookup(&controls.shoot),
            speed: controls.speed.unwrap_or(DEFAULT_MOVE_SPEED),
            jump_velocity: controls.jump_velocity.unwrap_or(DEFAULT_JUMP_VELOCITY),
            projectile: controls.projectile.as_deref().cloned(),
            last_shot_ms: None,
        }
    }

    pub fn held(&self, input: &ButtonInput<KeyCode>) -> HeldKeys {
        let down = |key: Option<KeyCode>| key.is_some_and(|k| input.pressed(k));
        HeldKeys {
            left: down(self.left),
            right: down(self.right),
            up: down(self.up),
            down: down(self.down),
            jump: down(self.jump),
            shoot: down(self.shoot),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeldKeys {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub jump: bool,
    pub shoot: bool,
}

/// Velocity response to the held keys for one frame.
pub fn apply_controls(
    controls: &ObjectControls,
    held: HeldKeys,
    touching_down: bool,
    velocity: &mut Velocity,
) {
    if controls.left.is_some() || controls.right.is_some() {
        velocity.x = if held.left {
            -controls.speed
        } else if held.right {
            controls.speed
        } else {
            0.0
        };
    }

    if held.up {
        velocity.y = -controls.speed;
    }
    // Applied after `up`, so down wins when both are held.
    if held.down {
        velocity.y = controls.speed;
    }
    let vertical_mapped = controls.up.is_some() || controls.down.is_some();
    if !held.up && !held.down && vertical_mapped && controls.jump.is_none() {
        velocity.y = 0.0;
    }

    if held.jump && touching_down {
        velocity.y = -controls.jump_velocity;
    }
}

#[derive(Debug, Clone)]
pub struct PendingShot {
    pub owner: Entity,
    pub owner_id: String,
    pub origin: Vec2,
}

#[derive(Resource, Default, Debug)]
pub struct PendingShots(pub Vec<PendingShot>);

pub fn drive_controls(
    input: Option<Res<ButtonInput<KeyCode>>>,
    clock: Res<SceneClock>,
    mut shots: ResMut<PendingShots>,
    mut query: Query<(
        Entity,
        &SceneObject,
        &GamePosition,
        &ArcadeBody,
        &mut ObjectControls,
        &mut Velocity,
    )>,
) {
    let Some(input) = input else { return };
    for (entity, object, position, body, mut controls, mut velocity) in &mut query {
        if !body.is_movable() {
            continue;
        }
        let held = controls.held(&input);
        apply_controls(&controls, held, body.touching_down, &mut velocity);

        if !held.shoot || controls.projectile.is_none() {
            continue;
        }
        let ready = controls
            .last_shot_ms
            .map_or(true, |last| clock.now_ms - last >= SHOT_COOLDOWN_MS);
        if ready {
            controls.last_shot_ms = Some(clock.now_ms);
            shots.0.push(PendingShot {
                owner: entity,
                owner_id: object.id.clone(),
                origin: position.as_vec2(),
            });
        }
    }
}

/// Instantiate queued projectiles into the shared projectile group.
pub fn fire_projectiles(world: &mut World) {
    let shots = match world.get_resource_mut::<PendingShots>() {
        Some(mut pending) => std::mem::take(&mut pending.0),
        None => return,
    };
    for shot in shots {
        let Some(template) = world
            .get::<ObjectControls>(shot.owner)
            .and_then(|c| c.projectile.clone())
        else {
            continue;
        };
        let n = world
            .get_resource_or_insert_with(SceneRegistry::default)
            .next_projectile(&shot.owner_id);
        let id = format!("{}_projectile_{n}", shot.owner_id);
        match instantiate(world, &template, &id, shot.origin) {
            Ok(Created::Entity(entity)) => adopt_into_group(world, entity, PROJECTILE_GROUP),
            Ok(Created::Group(_)) => {}
            Err(err) => report(
                world,
                &BuildError::TemplateNotSpawnable {
                    spawner: format!("{}:projectile", shot.owner_id),
                    reason: err.to_string(),
                },
            ),
        }
    }
}
