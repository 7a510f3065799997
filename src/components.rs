use bevy::ecs::component::ComponentId;
use bevy::ecs::world::DeferredWorld;
use bevy::prelude::*;

use crate::events::GameEventBus;
use crate::registry::SceneRegistry;

/// Identity of an entity created from a spec object.
/// Removing it (usually by despawning) clears the entity from the registry.
#[derive(Component, Debug, Clone)]
#[component(on_remove = forget_scene_object)]
pub struct SceneObject {
    pub id: String,
    pub group: Option<String>,
}

fn forget_scene_object(mut world: DeferredWorld, entity: Entity, _: ComponentId) {
    let Some(object) = world.get::<SceneObject>(entity).cloned() else {
        return;
    };
    // Registry is removed before teardown despawns, so scene stop is silent here.
    let Some(mut registry) = world.get_resource_mut::<SceneRegistry>() else {
        return;
    };
    registry.forget(&object.id, entity, object.group.as_deref());
    if let Some(mut bus) = world.get_resource_mut::<GameEventBus>() {
        bus.emit(
            "object_destroyed",
            serde_json::json!({ "id": object.id, "group": object.group }),
            Some(entity.to_bits()),
        );
    }
}

/// Center position in screen space (origin top-left, y grows downward).
#[derive(Component, Clone, Copy, Default, Debug, PartialEq)]
pub struct GamePosition {
    pub x: f32,
    pub y: f32,
}

impl GamePosition {
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Velocity in pixels per second
#[derive(Component, Clone, Copy, Default, Debug, PartialEq)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned extent used for bounds and contact tests
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Static,
}

#[derive(Component, Clone, Copy, Debug)]
pub struct ArcadeBody {
    pub kind: BodyKind,
    pub bounce: f32,
    pub collide_world_bounds: bool,
    /// Resting on the bottom bound or on another body this step.
    pub touching_down: bool,
}

impl ArcadeBody {
    pub fn fixed() -> Self {
        Self {
            kind: BodyKind::Static,
            bounce: 0.0,
            collide_world_bounds: false,
            touching_down: false,
        }
    }

    pub fn is_movable(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }
}

/// What the render layer should draw for this entity.
#[derive(Component, Clone, Debug, PartialEq)]
pub enum Visual {
    Rectangle { width: f32, height: f32, color: u32 },
    Circle { radius: f32, color: u32 },
    Text { font_px: f32, color: u32 },
    Emoji { symbol: String, size: f32 },
    Sprite { key: String },
}

/// Current string of a text object.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct TextContent(pub String);

/// Created by a spawner or fired as a projectile.
/// These are cleaned up once they drift off-screen.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct SpawnedInstance;
