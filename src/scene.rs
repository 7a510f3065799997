//! Scene lifecycle and the per-frame interpreter schedule.
//!
//! `start_with` validates the spec, tears down any previous scene, inserts the
//! scene-scoped resources and builds the scene in a fixed order. `stop`
//! removes everything again. Interpreter systems only run while an
//! [`ActiveScene`] exists.

use bevy::prelude::*;

use crate::actions::{ActionLibrary, ScoreBoard};
use crate::assets::AssetManifest;
use crate::behavior::run_behaviors;
use crate::components::SceneObject;
use crate::controls::{
    drive_controls, fire_projectiles, KeyCache, PendingShots, PROJECTILE_GROUP,
};
use crate::errors::{SpecError, StartError};
use crate::events::{report, GameEventBus, GameEventsPlugin, SceneDiagnostics};
use crate::factory::create_entity;
use crate::physics::{
    detect_contacts, dispatch_contacts, integrate_bodies, ArcadeWorld, PendingContacts,
};
use crate::registry::SceneRegistry;
use crate::rules::{bind_interaction, parse_timer, InteractionKind, SceneBindings, TimerBinding};
use crate::spawner::{cleanup_offscreen, tick_spawners, SceneRng, SpawnerSet};
use crate::spec::{GameSpec, Scene};
use crate::timers::{tick_rule_timers, RuleTimers};

/// Milliseconds since the scene started, advanced once per fixed step.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SceneClock {
    pub now_ms: f64,
    pub delta_ms: f64,
}

#[derive(Resource, Debug, Clone)]
pub struct ActiveScene {
    pub generation: u64,
    pub scene: String,
    pub title: String,
}

/// The spec the active scene was built from.
#[derive(Resource, Debug, Clone)]
pub struct LoadedSpec(pub GameSpec);

#[derive(Resource, Default)]
struct NextSceneGeneration(u64);

/// Handle returned by `start`; stale handles make `stop` a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningGame {
    pub generation: u64,
    pub scene: String,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Scene to boot; the first scene when unset.
    pub scene: Option<String>,
    pub seed: Option<u64>,
}

pub fn start(world: &mut World, spec: &GameSpec) -> Result<RunningGame, StartError> {
    start_with(world, spec, StartOptions::default())
}

pub fn start_with(
    world: &mut World,
    spec: &GameSpec,
    options: StartOptions,
) -> Result<RunningGame, StartError> {
    spec.validate()?;
    let scene = match options.scene.as_deref() {
        Some(name) => spec
            .scene(name)
            .ok_or_else(|| StartError::UnknownScene(name.to_string()))?,
        None => spec.scenes.first().ok_or(SpecError::NoScenes)?,
    };

    if world.contains_resource::<ActiveScene>() {
        teardown(world);
    }

    let generation = {
        let mut next = world.get_resource_or_insert_with(NextSceneGeneration::default);
        next.0 += 1;
        next.0
    };

    world.init_resource::<GameEventBus>();
    world.init_resource::<KeyCache>();
    world.insert_resource(SceneRegistry::default());
    world.insert_resource(SceneDiagnostics::default());
    world.insert_resource(SceneClock::default());
    world.insert_resource(ArcadeWorld::from_config(&spec.game));
    world.insert_resource(ScoreBoard::default());
    world.insert_resource(AssetManifest::from_assets(&spec.assets));
    world.insert_resource(PendingShots::default());
    world.insert_resource(PendingContacts::default());
    world.insert_resource(SceneBindings::default());
    world.insert_resource(RuleTimers::default());
    world.insert_resource(SpawnerSet::default());
    world.insert_resource(SceneRng::new(options.seed));
    world.insert_resource(LoadedSpec(spec.clone()));

    build_scene(world, scene);

    world.insert_resource(ActiveScene {
        generation,
        scene: scene.name.clone(),
        title: spec.title.clone(),
    });
    world.resource_mut::<GameEventBus>().emit(
        "game_started",
        serde_json::json!({ "title": spec.title, "scene": scene.name, "generation": generation }),
        None,
    );
    info!(
        "[Playspec] Started '{}' (scene '{}', generation {generation})",
        spec.title, scene.name
    );

    Ok(RunningGame {
        generation,
        scene: scene.name.clone(),
        title: spec.title.clone(),
    })
}

/// Build order: actions, objects, spawners, projectile group, collisions,
/// overlaps, timers. Rules resolve against what exists at that point.
fn build_scene(world: &mut World, scene: &Scene) {
    let logic = scene.custom_logic.clone().unwrap_or_default();

    if let Some(actions) = logic.actions.as_deref() {
        world.insert_resource(ActionLibrary::from_definitions(actions));
    } else {
        world.insert_resource(ActionLibrary::default());
    }

    for object in &scene.objects {
        if let Err(err) = create_entity(world, object, Vec2::new(object.x, object.y)) {
            report(world, &err);
        }
    }

    for spawner in logic.spawners.iter().flatten() {
        world
            .resource_mut::<SceneRegistry>()
            .ensure_group(&spawner.template.id);
        world.resource_mut::<SpawnerSet>().add(spawner.clone(), 0.0);
    }

    let shoots = scene
        .objects
        .iter()
        .any(|o| o.controls.as_ref().is_some_and(|c| c.projectile.is_some()));
    if shoots {
        world
            .resource_mut::<SceneRegistry>()
            .ensure_group(PROJECTILE_GROUP);
    }

    let rules = [
        (InteractionKind::Collision, logic.on_collision.as_deref()),
        (InteractionKind::Overlap, logic.on_overlap.as_deref()),
    ];
    for (kind, lines) in rules {
        for line in lines.unwrap_or_default() {
            let bound = bind_interaction(world.resource::<SceneRegistry>(), kind, line);
            match bound {
                Ok(binding) => world.resource_mut::<SceneBindings>().interactions.push(binding),
                Err(err) => report(world, &err),
            }
        }
    }

    for line in logic.timers.iter().flatten() {
        match parse_timer(line) {
            Ok(rule) => world.resource_mut::<RuleTimers>().add(
                TimerBinding {
                    rule,
                    source: line.clone(),
                    warned: false,
                },
                0.0,
            ),
            Err(err) => report(world, &err),
        }
    }
}

/// Tear down the scene `game` refers to. Stale or repeated calls do nothing.
pub fn stop(world: &mut World, game: &RunningGame) {
    let current = world.get_resource::<ActiveScene>().map(|a| a.generation);
    if current != Some(game.generation) {
        return;
    }
    teardown(world);
}

pub fn current_game(world: &World) -> Option<RunningGame> {
    world.get_resource::<ActiveScene>().map(|a| RunningGame {
        generation: a.generation,
        scene: a.scene.clone(),
        title: a.title.clone(),
    })
}

fn teardown(world: &mut World) {
    let Some(active) = world.remove_resource::<ActiveScene>() else {
        return;
    };
    // Without a registry the removal hook has nothing to update.
    world.remove_resource::<SceneRegistry>();
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<SceneObject>>()
        .iter(world)
        .collect();
    for entity in entities {
        world.despawn(entity);
    }
    world.remove_resource::<SceneBindings>();
    world.remove_resource::<RuleTimers>();
    world.remove_resource::<SpawnerSet>();
    world.remove_resource::<PendingShots>();
    world.remove_resource::<PendingContacts>();
    world.remove_resource::<ActionLibrary>();
    world.remove_resource::<ScoreBoard>();
    world.remove_resource::<SceneDiagnostics>();
    world.remove_resource::<SceneClock>();
    world.remove_resource::<ArcadeWorld>();
    world.remove_resource::<AssetManifest>();
    world.remove_resource::<SceneRng>();
    world.remove_resource::<LoadedSpec>();

    if let Some(mut bus) = world.get_resource_mut::<GameEventBus>() {
        bus.emit(
            "game_stopped",
            serde_json::json!({ "scene": active.scene, "generation": active.generation }),
            None,
        );
    }
    info!("[Playspec] Stopped scene '{}'", active.scene);
}

/// Stop whatever is running.
pub fn stop_current(world: &mut World) -> bool {
    match current_game(world) {
        Some(game) => {
            stop(world, &game);
            true
        }
        None => false,
    }
}

/// Spec waiting to be started on the next frame, from disk or the file watcher.
#[derive(Resource)]
pub struct PendingSpec {
    pub spec: GameSpec,
    pub options: StartOptions,
}

fn apply_pending_spec(world: &mut World) {
    let Some(pending) = world.remove_resource::<PendingSpec>() else {
        return;
    };
    if let Err(err) = start_with(world, &pending.spec, pending.options) {
        error!("[Playspec] Failed to start game: {err}");
    }
}

fn advance_clock(time: Res<Time<Fixed>>, mut clock: ResMut<SceneClock>) {
    let delta_ms = time.delta_secs_f64() * 1000.0;
    clock.delta_ms = delta_ms;
    clock.now_ms += delta_ms;
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterpreterSet {
    Clock,
    Controls,
    Projectiles,
    Behaviors,
    Spawners,
    Timers,
    Physics,
    Dispatch,
    Cleanup,
}

pub struct InterpreterPlugin;

impl Plugin for InterpreterPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<GameEventsPlugin>() {
            app.add_plugins(GameEventsPlugin);
        }
        app.init_resource::<KeyCache>()
            .configure_sets(
                FixedUpdate,
                (
                    InterpreterSet::Clock,
                    InterpreterSet::Controls,
                    InterpreterSet::Projectiles,
                    InterpreterSet::Behaviors,
                    InterpreterSet::Spawners,
                    InterpreterSet::Timers,
                    InterpreterSet::Physics,
                    InterpreterSet::Dispatch,
                    InterpreterSet::Cleanup,
                )
                    .chain()
                    .run_if(resource_exists::<ActiveScene>),
            )
            .add_systems(
                FixedUpdate,
                (
                    advance_clock.in_set(InterpreterSet::Clock),
                    drive_controls.in_set(InterpreterSet::Controls),
                    fire_projectiles.in_set(InterpreterSet::Projectiles),
                    run_behaviors.in_set(InterpreterSet::Behaviors),
                    tick_spawners.in_set(InterpreterSet::Spawners),
                    tick_rule_timers.in_set(InterpreterSet::Timers),
                    (integrate_bodies, detect_contacts)
                        .chain()
                        .in_set(InterpreterSet::Physics),
                    dispatch_contacts.in_set(InterpreterSet::Dispatch),
                    cleanup_offscreen.in_set(InterpreterSet::Cleanup),
                ),
            )
            .add_systems(Update, apply_pending_spec);
    }
}
