//! Declarative game description consumed by the interpreter.
//!
//! Field names follow the JSON produced by the authoring pipeline, so the
//! structs here double as the wire format. Everything is read-only once a
//! scene has been started from it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{BuildError, SpecError};

/// Complete game specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSpec {
    pub title: String,
    pub description: String,
    pub game: GameConfig,
    #[serde(default)]
    pub assets: Vec<Asset>,
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub controls_description: Vec<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
}

impl GameSpec {
    /// Parse and validate a spec in one step.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        let spec: GameSpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Shape-level checks. Data-level problems (bad payloads, dangling rule
    /// ids) are left to scene construction, which degrades instead of failing.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.scenes.is_empty() {
            return Err(SpecError::NoScenes);
        }
        if self.game.width == 0 || self.game.height == 0 {
            return Err(SpecError::ZeroDimensions {
                width: self.game.width,
                height: self.game.height,
            });
        }
        let mut names = HashSet::new();
        for scene in &self.scenes {
            if !names.insert(scene.name.as_str()) {
                return Err(SpecError::DuplicateScene(scene.name.clone()));
            }
        }
        let mut keys = HashSet::new();
        for asset in &self.assets {
            if !keys.insert(asset.key.as_str()) {
                return Err(SpecError::DuplicateAsset(asset.key.clone()));
            }
        }
        Ok(())
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_bg_color")]
    pub background_color: String,
    pub physics: PhysicsConfig,
}

fn default_bg_color() -> String {
    "#87CEEB".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    pub enabled: bool,
    pub gravity: GravityConfig,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GravityConfig {
    #[serde(default)]
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Sprite,
    Audio,
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub key: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub objects: Vec<GameObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_logic: Option<CustomLogic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicsBody {
    Dynamic,
    Static,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectPhysics {
    pub body: PhysicsBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounce: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collide_world_bounds: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<VelocityConfig>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VelocityConfig {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

/// Key bindings for a player-controlled object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Controls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoot: Option<String>,
    /// Template instantiated for every shot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projectile: Option<Box<GameObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump_velocity: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Sprite,
    Rectangle,
    Circle,
    Text,
    Emoji,
    Group,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Sprite => "sprite",
            ObjectType::Rectangle => "rectangle",
            ObjectType::Circle => "circle",
            ObjectType::Text => "text",
            ObjectType::Emoji => "emoji",
            ObjectType::Group => "group",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapeProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextProperties {
    pub text: String,
    /// CSS-like size such as `"32px"`; a bare number is accepted too.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

impl TextProperties {
    pub fn font_px(&self) -> f32 {
        self.font_size
            .as_deref()
            .map(|s| s.trim().trim_end_matches("px").trim())
            .and_then(|s| s.parse::<f32>().ok())
            .filter(|v| *v > 0.0)
            .unwrap_or(DEFAULT_FONT_PX)
    }
}

pub const DEFAULT_FONT_PX: f32 = 32.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmojiProperties {
    #[serde(alias = "char")]
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorType {
    Patrol,
    Follow,
    Static,
    Random,
}

/// Object in a scene, or a template for spawners and projectiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameObject {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<EmojiProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physics: Option<ObjectPhysics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls: Option<Controls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<BehaviorType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior_params: Option<serde_json::Value>,
}

/// Payload resolved against the declared type. Built once per instantiation
/// so the factory can match exhaustively instead of probing optionals.
#[derive(Debug, Clone, Copy)]
pub enum ObjectKind<'a> {
    Sprite { texture: &'a str },
    Rectangle { width: f32, height: f32, color: Option<&'a str> },
    Circle { radius: f32, color: Option<&'a str> },
    Text(&'a TextProperties),
    Emoji(&'a EmojiProperties),
    Group,
}

pub const DEFAULT_RECT_SIZE: f32 = 32.0;
pub const DEFAULT_RADIUS: f32 = 16.0;

impl GameObject {
    pub fn new(id: impl Into<String>, object_type: ObjectType, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            object_type,
            x,
            y,
            texture: None,
            shape: None,
            text: None,
            emoji: None,
            physics: None,
            controls: None,
            behavior: None,
            behavior_params: None,
        }
    }

    pub fn kind(&self) -> Result<ObjectKind<'_>, BuildError> {
        let missing = |field: &'static str| BuildError::MissingPayload {
            id: self.id.clone(),
            object_type: self.object_type,
            field,
        };
        match self.object_type {
            ObjectType::Sprite => self
                .texture
                .as_deref()
                .map(|texture| ObjectKind::Sprite { texture })
                .ok_or_else(|| missing("texture")),
            ObjectType::Rectangle => {
                let shape = self.shape.as_ref().ok_or_else(|| missing("shape"))?;
                Ok(ObjectKind::Rectangle {
                    width: shape.width.unwrap_or(DEFAULT_RECT_SIZE),
                    height: shape.height.unwrap_or(DEFAULT_RECT_SIZE),
                    color: shape.color.as_deref(),
                })
            }
            ObjectType::Circle => {
                let shape = self.shape.as_ref().ok_or_else(|| missing("shape"))?;
                Ok(ObjectKind::Circle {
                    radius: shape.radius.unwrap_or(DEFAULT_RADIUS),
                    color: shape.color.as_deref(),
                })
            }
            ObjectType::Text => self
                .text
                .as_ref()
                .map(ObjectKind::Text)
                .ok_or_else(|| missing("text")),
            ObjectType::Emoji => self
                .emoji
                .as_ref()
                .map(ObjectKind::Emoji)
                .ok_or_else(|| missing("emoji")),
            ObjectType::Group => Ok(ObjectKind::Group),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionVariance {
    pub x_min: f32,
    pub x_max: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_min: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_max: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spawner {
    pub id: String,
    pub template: Box<GameObject>,
    /// Milliseconds between spawns.
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
    pub spawn_area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_variance: Option<PositionVariance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionEffect {
    UpdateScore { points: i32 },
    GameOver,
    Destroy,
    UpdateText { object_id: String, text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub name: String,
    pub effect: ActionEffect,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomLogic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_collision: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_overlap: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawners: Option<Vec<Spawner>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionDefinition>>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn config(width: u32, height: u32) -> GameConfig {
        GameConfig {
            width,
            height,
            background_color: default_bg_color(),
            physics: PhysicsConfig {
                enabled: true,
                gravity: GravityConfig { x: 0.0, y: 0.0 },
                debug: false,
            },
        }
    }

    pub fn spec_with(objects: Vec<GameObject>, logic: CustomLogic) -> GameSpec {
        GameSpec {
            title: "Test".to_string(),
            description: "fixture".to_string(),
            game: config(800, 600),
            assets: vec![],
            scenes: vec![Scene {
                name: "main".to_string(),
                objects,
                custom_logic: Some(logic),
            }],
            controls_description: vec![],
            key_concepts: vec![],
        }
    }

    pub fn rect(id: &str, x: f32, y: f32) -> GameObject {
        let mut obj = GameObject::new(id, ObjectType::Rectangle, x, y);
        obj.shape = Some(ShapeProperties {
            width: Some(20.0),
            height: Some(20.0),
            radius: None,
            color: Some("#ff0000".to_string()),
        });
        obj
    }

    pub fn dynamic(mut obj: GameObject) -> GameObject {
        obj.physics = Some(ObjectPhysics {
            body: PhysicsBody::Dynamic,
            bounce: None,
            collide_world_bounds: None,
            velocity: None,
        });
        obj
    }

    pub fn text(id: &str, content: &str) -> GameObject {
        let mut obj = GameObject::new(id, ObjectType::Text, 16.0, 16.0);
        obj.text = Some(TextProperties {
            text: content.to_string(),
            font_size: Some("24px".to_string()),
            fill: None,
        });
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLATFORMER: &str = r##"{
        "title": "Coin Run",
        "description": "Collect coins",
        "game": {
            "width": 800,
            "height": 600,
            "physics": { "enabled": true, "gravity": { "y": 300 } }
        },
        "scenes": [{
            "name": "main",
            "objects": [
                { "id": "player", "type": "rectangle", "x": 100, "y": 450,
                  "shape": { "width": 32, "height": 48, "color": "#0066ff" },
                  "physics": { "body": "dynamic", "collide_world_bounds": true },
                  "controls": { "left": "ArrowLeft", "right": "ArrowRight", "jump": "Space" } },
                { "id": "scoreText", "type": "text", "x": 16, "y": 16,
                  "text": { "text": "Score: 0", "font_size": "32px" } }
            ],
            "custom_logic": {
                "on_overlap": ["player,coin_template -> collectCoin"],
                "spawners": [{
                    "id": "coins", "interval": 1500, "max_count": 5, "spawn_area": "top",
                    "template": { "id": "coin_template", "type": "circle",
                                  "shape": { "radius": 10, "color": "#ffd700" } }
                }],
                "actions": [
                    { "name": "collectCoin", "effect": { "type": "updateScore", "points": 10 } },
                    { "name": "lose", "effect": { "type": "gameOver" } }
                ]
            }
        }],
        "controls_description": ["Arrows to move"],
        "key_concepts": ["overlap"]
    }"##;

    #[test]
    fn parses_producer_json() {
        let spec = GameSpec::from_json(PLATFORMER).expect("spec should parse");
        assert_eq!(spec.game.background_color, "#87CEEB");
        assert_eq!(spec.game.physics.gravity.x, 0.0);
        let scene = spec.scene("main").expect("main scene");
        assert_eq!(scene.objects.len(), 2);
        let logic = scene.custom_logic.as_ref().expect("logic");
        let spawner = &logic.spawners.as_ref().expect("spawners")[0];
        assert_eq!(spawner.template.x, 0.0);
        let actions = logic.actions.as_ref().expect("actions");
        assert_eq!(actions[0].effect, ActionEffect::UpdateScore { points: 10 });
        assert_eq!(actions[1].effect, ActionEffect::GameOver);
    }

    #[test]
    fn rejects_zero_dimensions_and_empty_scenes() {
        let mut spec = GameSpec::from_json(PLATFORMER).expect("spec");
        spec.game.width = 0;
        assert!(matches!(
            spec.validate(),
            Err(SpecError::ZeroDimensions { width: 0, .. })
        ));

        let mut spec = GameSpec::from_json(PLATFORMER).expect("spec");
        spec.scenes.clear();
        assert!(matches!(spec.validate(), Err(SpecError::NoScenes)));
    }

    #[test]
    fn rejects_duplicate_scene_names() {
        let mut spec = GameSpec::from_json(PLATFORMER).expect("spec");
        let copy = spec.scenes[0].clone();
        spec.scenes.push(copy);
        assert!(matches!(spec.validate(), Err(SpecError::DuplicateScene(name)) if name == "main"));
    }

    #[test]
    fn kind_requires_matching_payload() {
        let mut obj = GameObject::new("hero", ObjectType::Sprite, 0.0, 0.0);
        let err = obj.kind().expect_err("sprite without texture");
        assert!(matches!(
            err,
            BuildError::MissingPayload { field: "texture", .. }
        ));

        obj.texture = Some("hero_png".to_string());
        assert!(matches!(
            obj.kind(),
            Ok(ObjectKind::Sprite { texture: "hero_png" })
        ));

        let group = GameObject::new("enemies", ObjectType::Group, 0.0, 0.0);
        assert!(matches!(group.kind(), Ok(ObjectKind::Group)));
    }

    #[test]
    fn shape_defaults_fill_missing_dimensions() {
        let mut obj = GameObject::new("ball", ObjectType::Circle, 0.0, 0.0);
        obj.shape = Some(ShapeProperties::default());
        match obj.kind() {
            Ok(ObjectKind::Circle { radius, color }) => {
                assert_eq!(radius, DEFAULT_RADIUS);
                assert!(color.is_none());
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn font_size_accepts_px_suffix_and_bare_numbers() {
        let mut props = TextProperties {
            text: "hi".to_string(),
            font_size: Some("48px".to_string()),
            fill: None,
        };
        assert_eq!(props.font_px(), 48.0);
        props.font_size = Some("20".to_string());
        assert_eq!(props.font_px(), 20.0);
        props.font_size = Some("huge".to_string());
        assert_eq!(props.font_px(), DEFAULT_FONT_PX);
    }

    #[test]
    fn emoji_payload_accepts_char_alias() {
        let obj: GameObject = serde_json::from_value(serde_json::json!({
            "id": "frog", "type": "emoji", "x": 10, "y": 20,
            "emoji": { "char": "🐸", "size": 48 }
        }))
        .expect("emoji object");
        assert!(matches!(obj.kind(), Ok(ObjectKind::Emoji(e)) if e.symbol == "🐸"));
    }
}
