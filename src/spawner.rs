//! Timed instantiation of templates.

use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::components::{Collider, GamePosition, SpawnedInstance};
use crate::errors::BuildError;
use crate::events::report;
use crate::factory::{adopt_into_group, instantiate, Created};
use crate::physics::{Aabb, ArcadeWorld};
use crate::registry::SceneRegistry;
use crate::scene::SceneClock;
use crate::spec::{PositionVariance, Spawner};
use crate::timers::ScheduledTimer;

/// How far past the world edge a transient object may drift before removal.
pub const OFFSCREEN_MARGIN: f32 = 100.0;

/// Scene-scoped random source, seedable for reproducible runs.
#[derive(Resource)]
pub struct SceneRng(pub SmallRng);

impl SceneRng {
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(SmallRng::seed_from_u64(seed)),
            None => Self(SmallRng::from_entropy()),
        }
    }
}

fn between(rng: &mut impl Rng, a: f32, b: f32) -> f32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if !(lo.is_finite() && hi.is_finite()) || lo == hi {
        return lo;
    }
    rng.gen_range(lo..=hi)
}

/// Where the next copy appears.
pub fn spawn_position(
    area: &str,
    variance: Option<&PositionVariance>,
    width: f32,
    height: f32,
    rng: &mut impl Rng,
) -> Vec2 {
    let mut position = match area {
        "top" => Vec2::new(between(rng, 0.0, width), 0.0),
        "bottom" => Vec2::new(between(rng, 0.0, width), height),
        "left" => Vec2::new(0.0, between(rng, 0.0, height)),
        "right" => Vec2::new(width, between(rng, 0.0, height)),
        "random" => Vec2::new(between(rng, 0.0, width), between(rng, 0.0, height)),
        _ => Vec2::ZERO,
    };
    if let Some(v) = variance {
        position.x = between(rng, v.x_min, v.x_max);
        if let (Some(y_min), Some(y_max)) = (v.y_min, v.y_max) {
            position.y = between(rng, y_min, y_max);
        }
    }
    position
}

pub struct SpawnerRuntime {
    pub spawner: Spawner,
    pub timer: ScheduledTimer,
}

#[derive(Resource, Default)]
pub struct SpawnerSet(pub Vec<SpawnerRuntime>);

impl SpawnerSet {
    pub fn add(&mut self, spawner: Spawner, now_ms: f64) {
        let timer = ScheduledTimer::repeating(spawner.interval, now_ms);
        self.0.push(SpawnerRuntime { spawner, timer });
    }
}

pub fn tick_spawners(world: &mut World) {
    if !world.contains_resource::<SpawnerSet>() {
        return;
    }
    let Some(now) = world.get_resource::<SceneClock>().map(|c| c.now_ms) else {
        return;
    };
    world.resource_scope(|world, mut set: Mut<SpawnerSet>| {
        for runtime in set.0.iter_mut() {
            let fired = runtime.timer.poll(now);
            for _ in 0..fired {
                if !spawn_one(world, &runtime.spawner) {
                    runtime.timer.cancel();
                    break;
                }
            }
        }
    });
}

/// Returns false once the spawner should stop.
fn spawn_one(world: &mut World, spawner: &Spawner) -> bool {
    let count = world
        .get_resource::<SceneRegistry>()
        .map_or(0, |r| r.spawn_count(&spawner.id));
    if spawner.max_count.is_some_and(|max| count >= max) {
        info!(
            "[Playspec] Spawner '{}' reached max_count {}, stopping",
            spawner.id, count
        );
        return false;
    }

    let (width, height) = world
        .get_resource::<ArcadeWorld>()
        .map_or((0.0, 0.0), |a| (a.width, a.height));
    let position = {
        let mut rng = world.get_resource_or_insert_with(|| SceneRng::new(None));
        spawn_position(
            &spawner.spawn_area,
            spawner.position_variance.as_ref(),
            width,
            height,
            &mut rng.0,
        )
    };

    let id = format!("{}_spawned_{count}", spawner.id);
    match instantiate(world, &spawner.template, &id, position) {
        Ok(Created::Entity(entity)) => {
            adopt_into_group(world, entity, &spawner.template.id);
            world
                .get_resource_or_insert_with(SceneRegistry::default)
                .next_spawn(&spawner.id);
            true
        }
        Ok(Created::Group(_)) => {
            report(
                world,
                &BuildError::TemplateNotSpawnable {
                    spawner: spawner.id.clone(),
                    reason: "group templates have no entity".to_string(),
                },
            );
            false
        }
        Err(err) => {
            report(
                world,
                &BuildError::TemplateNotSpawnable {
                    spawner: spawner.id.clone(),
                    reason: err.to_string(),
                },
            );
            false
        }
    }
}

/// Despawn spawned copies and projectiles that left the world.
pub fn cleanup_offscreen(
    mut commands: Commands,
    arcade: Res<ArcadeWorld>,
    transient: Query<(Entity, &GamePosition, &Collider), With<SpawnedInstance>>,
) {
    for (entity, position, collider) in &transient {
        let aabb = Aabb::new(*position, *collider);
        let (min, max) = (aabb.min(), aabb.max());
        let outside = max.x < -OFFSCREEN_MARGIN
            || max.y < -OFFSCREEN_MARGIN
            || min.x > arcade.width + OFFSCREEN_MARGIN
            || min.y > arcade.height + OFFSCREEN_MARGIN;
        if outside {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn named_areas_pin_one_axis() {
        let mut rng = rng();
        for _ in 0..20 {
            let top = spawn_position("top", None, 800.0, 600.0, &mut rng);
            assert_eq!(top.y, 0.0);
            assert!((0.0..=800.0).contains(&top.x));

            let right = spawn_position("right", None, 800.0, 600.0, &mut rng);
            assert_eq!(right.x, 800.0);
            assert!((0.0..=600.0).contains(&right.y));

            let random = spawn_position("random", None, 800.0, 600.0, &mut rng);
            assert!((0.0..=800.0).contains(&random.x));
            assert!((0.0..=600.0).contains(&random.y));
        }
        assert_eq!(
            spawn_position("bottom", None, 800.0, 600.0, &mut rng).y,
            600.0
        );
        assert_eq!(spawn_position("left", None, 800.0, 600.0, &mut rng).x, 0.0);
    }

    #[test]
    fn unknown_area_uses_origin_or_variance() {
        let mut rng = rng();
        assert_eq!(
            spawn_position("sky", None, 800.0, 600.0, &mut rng),
            Vec2::ZERO
        );

        let x_only = PositionVariance {
            x_min: 100.0,
            x_max: 200.0,
            y_min: Some(50.0),
            y_max: None,
        };
        let p = spawn_position("sky", Some(&x_only), 800.0, 600.0, &mut rng);
        assert!((100.0..=200.0).contains(&p.x));
        assert_eq!(p.y, 0.0);

        let reversed = PositionVariance {
            x_min: 300.0,
            x_max: 250.0,
            y_min: Some(40.0),
            y_max: Some(40.0),
        };
        let p = spawn_position("top", Some(&reversed), 800.0, 600.0, &mut rng);
        assert!((250.0..=300.0).contains(&p.x));
        assert_eq!(p.y, 40.0);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = SceneRng::new(Some(99));
        let mut b = SceneRng::new(Some(99));
        let pa = spawn_position("random", None, 640.0, 480.0, &mut a.0);
        let pb = spawn_position("random", None, 640.0, 480.0, &mut b.0);
        assert_eq!(pa, pb);
    }
}
