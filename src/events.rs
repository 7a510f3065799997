use std::collections::VecDeque;

use bevy::prelude::*;
use serde::Serialize;

use crate::errors::BuildError;

const MAX_EVENTS: usize = 500;
const MAX_DIAGNOSTICS: usize = 200;

#[derive(Serialize, Clone, Debug)]
pub struct GameEvent {
    pub name: String,
    pub data: serde_json::Value,
    pub frame: u64,
    pub source_entity: Option<u64>,
}

#[derive(Resource, Default)]
pub struct GameEventBus {
    pub recent: VecDeque<GameEvent>,
    pub frame: u64,
    pub dropped_events: u64,
    last_overflow_log_frame: u64,
}

impl GameEventBus {
    pub fn emit(
        &mut self,
        name: impl Into<String>,
        data: serde_json::Value,
        source_entity: Option<u64>,
    ) {
        self.recent.push_back(GameEvent {
            name: name.into(),
            data,
            frame: self.frame,
            source_entity,
        });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            self.recent.drain(..excess);
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if self.frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = self.frame;
                warn!(
                    "[Playspec events] Dropped {} buffered events (total dropped: {})",
                    excess, self.dropped_events
                );
            }
        }
    }

    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a GameEvent> + 'a {
        self.recent.iter().filter(move |e| e.name == name)
    }
}

/// Non-fatal construction problems of the running scene, newest last.
#[derive(Resource, Default, Debug)]
pub struct SceneDiagnostics {
    pub entries: Vec<String>,
}

/// Log a recoverable build problem and keep a copy for the status API.
pub fn report(world: &mut World, err: &BuildError) {
    let message = err.to_string();
    warn!("[Playspec] {message}");
    if let Some(mut bus) = world.get_resource_mut::<GameEventBus>() {
        bus.emit("diagnostic", serde_json::json!({ "message": message }), None);
    }
    let mut diagnostics = world.get_resource_or_insert_with(SceneDiagnostics::default);
    if diagnostics.entries.len() >= MAX_DIAGNOSTICS {
        diagnostics.entries.remove(0);
    }
    diagnostics.entries.push(message);
}

pub struct GameEventsPlugin;

impl Plugin for GameEventsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameEventBus>().add_systems(
            FixedUpdate,
            tick_event_frame.run_if(resource_exists::<crate::scene::ActiveScene>),
        );
    }
}

fn tick_event_frame(mut bus: ResMut<GameEventBus>) {
    bus.frame = bus.frame.saturating_add(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_bus_tracks_dropped_events() {
        let mut bus = GameEventBus::default();
        for i in 0..(MAX_EVENTS + 25) {
            bus.emit("spawned", serde_json::json!({ "i": i }), None);
        }
        assert_eq!(bus.recent.len(), MAX_EVENTS);
        assert_eq!(bus.dropped_events, 25);
        assert_eq!(bus.recent[0].data["i"], 25);
    }

    #[test]
    fn report_records_diagnostic_and_event() {
        let mut world = World::new();
        world.init_resource::<GameEventBus>();
        report(&mut world, &BuildError::MalformedRule("nope".into()));

        let diagnostics = world.resource::<SceneDiagnostics>();
        assert_eq!(diagnostics.entries.len(), 1);
        assert!(diagnostics.entries[0].contains("nope"));
        assert_eq!(world.resource::<GameEventBus>().named("diagnostic").count(), 1);
    }
}
