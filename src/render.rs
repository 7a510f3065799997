use bevy::prelude::*;

use crate::assets::AssetManifest;
use crate::color::{resolve_color, to_bevy, DEFAULT_BACKGROUND};
use crate::components::{Collider, GamePosition, TextContent, Visual};
use crate::factory::SPRITE_SIZE;
use crate::physics::ArcadeWorld;
use crate::scene::LoadedSpec;

const MISSING_TEXTURE_COLOR: u32 = 0xFF00FF;

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_camera).add_systems(
            Update,
            (
                apply_scene_settings,
                attach_visuals,
                sync_game_position_to_transform,
                sync_text_content,
                draw_debug_bodies,
            )
                .chain(),
        );
    }
}

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

/// Screen space (origin top-left, y down) to Bevy world space (origin center, y up).
pub fn screen_to_world(position: GamePosition, width: f32, height: f32) -> Vec2 {
    Vec2::new(position.x - width / 2.0, height / 2.0 - position.y)
}

fn world_size(arcade: Option<&ArcadeWorld>) -> (f32, f32) {
    arcade.map_or((0.0, 0.0), |a| (a.width, a.height))
}

fn apply_scene_settings(
    spec: Option<Res<LoadedSpec>>,
    mut clear: ResMut<ClearColor>,
    mut windows: Query<&mut Window>,
) {
    let Some(spec) = spec else { return };
    if !spec.is_changed() {
        return;
    }
    let game = &spec.0.game;
    let background = resolve_color(Some(&game.background_color), DEFAULT_BACKGROUND);
    clear.0 = to_bevy(background);
    for mut window in &mut windows {
        window.title = spec.0.title.clone();
        window
            .resolution
            .set(game.width as f32, game.height as f32);
    }
}

fn attach_visuals(
    mut commands: Commands,
    asset_server: Option<Res<AssetServer>>,
    manifest: Option<Res<AssetManifest>>,
    arcade: Option<Res<ArcadeWorld>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    added: Query<(Entity, &Visual, &GamePosition, Option<&TextContent>), Added<Visual>>,
) {
    let (world_w, world_h) = world_size(arcade.as_deref());
    for (entity, visual, position, text) in &added {
        let at = screen_to_world(*position, world_w, world_h);
        let mut cmd = commands.entity(entity);
        match visual {
            Visual::Rectangle {
                width,
                height,
                color,
            } => {
                cmd.insert((
                    Sprite::from_color(to_bevy(*color), Vec2::new(*width, *height)),
                    Transform::from_xyz(at.x, at.y, 0.0),
                ));
            }
            Visual::Circle { radius, color } => {
                cmd.insert((
                    Mesh2d(meshes.add(Circle::new(*radius))),
                    MeshMaterial2d(materials.add(to_bevy(*color))),
                    Transform::from_xyz(at.x, at.y, 0.0),
                ));
            }
            Visual::Text { font_px, color } => {
                let content = text.map(|t| t.0.clone()).unwrap_or_default();
                cmd.insert((
                    Text2d::new(content),
                    TextFont {
                        font_size: *font_px,
                        ..default()
                    },
                    TextColor(to_bevy(*color)),
                    Transform::from_xyz(at.x, at.y, 10.0),
                ));
            }
            Visual::Emoji { symbol, size } => {
                cmd.insert((
                    Text2d::new(symbol.clone()),
                    TextFont {
                        font_size: *size,
                        ..default()
                    },
                    Transform::from_xyz(at.x, at.y, 5.0),
                ));
            }
            Visual::Sprite { key } => {
                let url = manifest.as_deref().and_then(|m| m.texture_url(key));
                let sprite = match (url, asset_server.as_deref()) {
                    (Some(url), Some(server)) => Sprite {
                        image: server.load(url.to_string()),
                        custom_size: Some(Vec2::splat(SPRITE_SIZE)),
                        ..default()
                    },
                    _ => {
                        warn!(
                            "[Playspec] Texture '{key}' is not a declared image asset, using placeholder"
                        );
                        Sprite::from_color(
                            to_bevy(MISSING_TEXTURE_COLOR),
                            Vec2::splat(SPRITE_SIZE),
                        )
                    }
                };
                cmd.insert((sprite, Transform::from_xyz(at.x, at.y, 1.0)));
            }
        }
    }
}

/// Sync GamePosition → Transform for entities that moved
fn sync_game_position_to_transform(
    arcade: Option<Res<ArcadeWorld>>,
    mut query: Query<(&GamePosition, &mut Transform), Changed<GamePosition>>,
) {
    let (width, height) = world_size(arcade.as_deref());
    for (pos, mut transform) in query.iter_mut() {
        let at = screen_to_world(*pos, width, height);
        transform.translation.x = at.x;
        transform.translation.y = at.y;
    }
}

fn sync_text_content(mut query: Query<(&TextContent, &mut Text2d), Changed<TextContent>>) {
    for (content, mut text) in query.iter_mut() {
        if text.0 != content.0 {
            text.0 = content.0.clone();
        }
    }
}

fn draw_debug_bodies(
    mut gizmos: Gizmos,
    arcade: Option<Res<ArcadeWorld>>,
    bodies: Query<(&GamePosition, &Collider)>,
) {
    let Some(arcade) = arcade else { return };
    if !arcade.debug {
        return;
    }
    for (pos, collider) in &bodies {
        let center = screen_to_world(*pos, arcade.width, arcade.height);
        gizmos.rect_2d(
            center,
            Vec2::new(collider.width, collider.height),
            Color::srgba(0.2, 1.0, 0.3, 0.8),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_origin_maps_to_top_left_corner() {
        let corner = screen_to_world(GamePosition { x: 0.0, y: 0.0 }, 800.0, 600.0);
        assert_eq!(corner, Vec2::new(-400.0, 300.0));
        let center = screen_to_world(GamePosition { x: 400.0, y: 300.0 }, 800.0, 600.0);
        assert_eq!(center, Vec2::ZERO);
    }
}
