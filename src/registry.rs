use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;

use crate::rules::Target;
use crate::spec::BehaviorType;

#[derive(Debug, Clone)]
pub struct BehaviorAssignment {
    pub kind: BehaviorType,
    pub params: serde_json::Value,
}

/// Mutable per-id behavior memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BehaviorState {
    pub anchor_x: Option<f32>,
    pub last_change_ms: Option<f64>,
}

/// Id-keyed lookup tables for the running scene.
///
/// Created at scene start and removed at stop. Entities reach the registry
/// through the factory, and leave it through the `SceneObject` removal hook.
#[derive(Resource, Default, Debug)]
pub struct SceneRegistry {
    objects: HashMap<String, Entity>,
    groups: HashMap<String, Vec<Entity>>,
    spawn_counters: HashMap<String, u32>,
    projectile_counters: HashMap<String, u32>,
    // Ordered so behaviors run in a stable order each frame.
    pub behaviors: BTreeMap<String, BehaviorAssignment>,
    pub behavior_state: HashMap<String, BehaviorState>,
}

impl SceneRegistry {
    /// Returns the entity previously registered under `id`, if any.
    pub fn register(&mut self, id: &str, entity: Entity) -> Option<Entity> {
        self.objects.insert(id.to_string(), entity)
    }

    pub fn entity(&self, id: &str) -> Option<Entity> {
        self.objects.get(id).copied()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn ensure_group(&mut self, name: &str) {
        self.groups.entry(name.to_string()).or_default();
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn join_group(&mut self, name: &str, entity: Entity) {
        let members = self.groups.entry(name.to_string()).or_default();
        if !members.contains(&entity) {
            members.push(entity);
        }
    }

    pub fn group(&self, name: &str) -> &[Entity] {
        self.groups.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn members(&self, target: &Target) -> Vec<Entity> {
        match target {
            Target::Entity(entity) => vec![*entity],
            Target::Group(name) => self.group(name).to_vec(),
        }
    }

    pub fn spawn_count(&self, spawner: &str) -> u32 {
        self.spawn_counters.get(spawner).copied().unwrap_or(0)
    }

    /// Bumps the spawner's counter and returns the new value.
    pub fn next_spawn(&mut self, spawner: &str) -> u32 {
        let counter = self.spawn_counters.entry(spawner.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Returns the owner's current shot number, then advances it.
    pub fn next_projectile(&mut self, owner: &str) -> u32 {
        let counter = self.projectile_counters.entry(owner.to_string()).or_insert(0);
        *counter += 1;
        *counter - 1
    }

    /// Object ids, behavior assignments and mutable behavior state at once.
    pub fn behavior_tables(
        &mut self,
    ) -> (
        &HashMap<String, Entity>,
        &BTreeMap<String, BehaviorAssignment>,
        &mut HashMap<String, BehaviorState>,
    ) {
        (&self.objects, &self.behaviors, &mut self.behavior_state)
    }

    pub fn assign_behavior(&mut self, id: &str, assignment: BehaviorAssignment) {
        self.behavior_state.remove(id);
        self.behaviors.insert(id.to_string(), assignment);
    }

    /// Drop every trace of a destroyed entity. The id mapping and its
    /// behavior tables are only cleared while `id` still points at `entity`,
    /// so a later object that reused the id keeps its entries.
    pub fn forget(&mut self, id: &str, entity: Entity, group: Option<&str>) {
        if self.objects.get(id) == Some(&entity) {
            self.objects.remove(id);
            self.behaviors.remove(id);
            self.behavior_state.remove(id);
        }
        if let Some(members) = group.and_then(|g| self.groups.get_mut(g)) {
            members.retain(|e| *e != entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patrol() -> BehaviorAssignment {
        BehaviorAssignment {
            kind: BehaviorType::Patrol,
            params: serde_json::Value::Null,
        }
    }

    #[test]
    fn forget_clears_id_behavior_and_group() {
        let mut world = World::new();
        let e = world.spawn_empty().id();
        let mut registry = SceneRegistry::default();
        registry.register("coin_spawned_1", e);
        registry.join_group("coin", e);
        registry.assign_behavior("coin_spawned_1", patrol());
        registry
            .behavior_state
            .insert("coin_spawned_1".into(), BehaviorState::default());

        registry.forget("coin_spawned_1", e, Some("coin"));

        assert_eq!(registry.entity("coin_spawned_1"), None);
        assert!(registry.behaviors.is_empty());
        assert!(registry.behavior_state.is_empty());
        assert!(registry.group("coin").is_empty());
        assert!(registry.has_group("coin"));
    }

    #[test]
    fn forget_keeps_newer_owner_of_reused_id() {
        let mut world = World::new();
        let old = world.spawn_empty().id();
        let new = world.spawn_empty().id();
        let mut registry = SceneRegistry::default();
        registry.register("enemy", old);
        assert_eq!(registry.register("enemy", new), Some(old));
        registry.assign_behavior("enemy", patrol());

        registry.forget("enemy", old, None);

        assert_eq!(registry.entity("enemy"), Some(new));
        assert!(registry.behaviors.contains_key("enemy"));
    }

    #[test]
    fn counters_are_per_key() {
        let mut registry = SceneRegistry::default();
        assert_eq!(registry.next_spawn("a"), 1);
        assert_eq!(registry.next_spawn("a"), 2);
        assert_eq!(registry.next_spawn("b"), 1);
        assert_eq!(registry.spawn_count("a"), 2);
        assert_eq!(registry.next_projectile("player"), 0);
        assert_eq!(registry.next_projectile("player"), 1);
    }

    #[test]
    fn join_group_is_idempotent() {
        let mut world = World::new();
        let e = world.spawn_empty().id();
        let mut registry = SceneRegistry::default();
        registry.join_group("projectiles", e);
        registry.join_group("projectiles", e);
        assert_eq!(registry.group("projectiles"), &[e]);
        assert_eq!(registry.members(&Target::Entity(e)), vec![e]);
    }
}
