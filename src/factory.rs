//! Turns spec objects into ECS entities.

use bevy::prelude::*;

use crate::color::{resolve_color, DEFAULT_SHAPE_COLOR, DEFAULT_TEXT_COLOR};
use crate::components::{
    ArcadeBody, BodyKind, Collider, GamePosition, SceneObject, SpawnedInstance, TextContent,
    Velocity, Visual,
};
use crate::controls::{KeyCache, ObjectControls};
use crate::errors::BuildError;
use crate::events::{report, GameEventBus};
use crate::registry::{BehaviorAssignment, SceneRegistry};
use crate::spec::{GameObject, ObjectKind, ObjectPhysics, PhysicsBody};

pub const SPRITE_SIZE: f32 = 32.0;
pub const DEFAULT_EMOJI_SIZE: f32 = 32.0;
/// Rough advance width of a glyph relative to the font size.
const GLYPH_WIDTH_RATIO: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    Entity(Entity),
    Group(String),
}

/// Create the object under its own id.
pub fn create_entity(
    world: &mut World,
    object: &GameObject,
    position: Vec2,
) -> Result<Created, BuildError> {
    instantiate(world, object, &object.id, position)
}

/// Create the object registered under `id`. Spawners and projectiles use
/// this to give each copy of a template its own id.
pub fn instantiate(
    world: &mut World,
    object: &GameObject,
    id: &str,
    position: Vec2,
) -> Result<Created, BuildError> {
    let kind = object.kind()?;
    let (visual, collider, text) = match kind {
        ObjectKind::Group => {
            world
                .get_resource_or_insert_with(SceneRegistry::default)
                .ensure_group(id);
            return Ok(Created::Group(id.to_string()));
        }
        ObjectKind::Rectangle {
            width,
            height,
            color,
        } => (
            Visual::Rectangle {
                width,
                height,
                color: resolve_color(color, DEFAULT_SHAPE_COLOR),
            },
            Collider { width, height },
            None,
        ),
        ObjectKind::Circle { radius, color } => (
            Visual::Circle {
                radius,
                color: resolve_color(color, DEFAULT_SHAPE_COLOR),
            },
            Collider {
                width: radius * 2.0,
                height: radius * 2.0,
            },
            None,
        ),
        ObjectKind::Text(props) => {
            let font_px = props.font_px();
            (
                Visual::Text {
                    font_px,
                    color: resolve_color(props.fill.as_deref(), DEFAULT_TEXT_COLOR),
                },
                text_extent(&props.text, font_px),
                Some(TextContent(props.text.clone())),
            )
        }
        ObjectKind::Emoji(props) => {
            let size = props.size.filter(|s| *s > 0.0).unwrap_or(DEFAULT_EMOJI_SIZE);
            (
                Visual::Emoji {
                    symbol: props.symbol.clone(),
                    size,
                },
                Collider {
                    width: size,
                    height: size,
                },
                None,
            )
        }
        ObjectKind::Sprite { texture } => (
            Visual::Sprite {
                key: texture.to_string(),
            },
            Collider {
                width: SPRITE_SIZE,
                height: SPRITE_SIZE,
            },
            None,
        ),
    };

    let mut entity = world.spawn((
        SceneObject {
            id: id.to_string(),
            group: None,
        },
        Name::new(id.to_string()),
        GamePosition {
            x: position.x,
            y: position.y,
        },
        collider,
        visual,
    ));
    if let Some(text) = text {
        entity.insert(text);
    }
    let entity = entity.id();

    let previous = world
        .get_resource_or_insert_with(SceneRegistry::default)
        .register(id, entity);
    if previous.is_some_and(|prev| prev != entity && world.entities().contains(prev)) {
        report(world, &BuildError::DuplicateObjectId(id.to_string()));
    }

    if let Some(physics) = object.physics.as_ref() {
        apply_physics(world, entity, physics);
    }

    if let Some(controls) = object.controls.as_ref() {
        let binding = {
            let mut keys = world.get_resource_or_insert_with(KeyCache::default);
            ObjectControls::bind(controls, &mut keys)
        };
        world.entity_mut(entity).insert(binding);
    }

    if let Some(kind) = object.behavior {
        let params = object
            .behavior_params
            .clone()
            .unwrap_or(serde_json::Value::Null);
        world
            .get_resource_or_insert_with(SceneRegistry::default)
            .assign_behavior(id, BehaviorAssignment { kind, params });
    }

    Ok(Created::Entity(entity))
}

fn text_extent(text: &str, font_px: f32) -> Collider {
    let chars = text.chars().count().max(1) as f32;
    Collider {
        width: GLYPH_WIDTH_RATIO * font_px * chars,
        height: font_px,
    }
}

/// Static bodies ignore bounce and velocity; `none` attaches nothing.
pub fn apply_physics(world: &mut World, entity: Entity, physics: &ObjectPhysics) {
    let collide_world_bounds = physics.collide_world_bounds.unwrap_or(false);
    let (body, velocity) = match physics.body {
        PhysicsBody::None => return,
        PhysicsBody::Static => (
            ArcadeBody {
                collide_world_bounds,
                ..ArcadeBody::fixed()
            },
            Velocity::default(),
        ),
        PhysicsBody::Dynamic => {
            let initial = physics.velocity.unwrap_or_default();
            (
                ArcadeBody {
                    kind: BodyKind::Dynamic,
                    bounce: physics.bounce.unwrap_or(0.0).max(0.0),
                    collide_world_bounds,
                    touching_down: false,
                },
                Velocity {
                    x: initial.x,
                    y: initial.y,
                },
            )
        }
    };
    world.entity_mut(entity).insert((body, velocity));
}

/// Mark a runtime copy as transient and file it under `group`.
pub fn adopt_into_group(world: &mut World, entity: Entity, group: &str) {
    let Some(mut object) = world.get_mut::<SceneObject>(entity) else {
        return;
    };
    object.group = Some(group.to_string());
    let id = object.id.clone();
    world.entity_mut(entity).insert(SpawnedInstance);
    world
        .get_resource_or_insert_with(SceneRegistry::default)
        .join_group(group, entity);
    if let Some(mut bus) = world.get_resource_mut::<GameEventBus>() {
        bus.emit(
            "object_spawned",
            serde_json::json!({ "id": id, "group": group }),
            Some(entity.to_bits()),
        );
    }
}
