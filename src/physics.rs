//! Minimal arcade physics: gravity, world bounds and AABB contacts.

use bevy::prelude::*;

use crate::actions::{run_callback, CallbackSource};
use crate::components::{ArcadeBody, Collider, GamePosition, Velocity};
use crate::registry::SceneRegistry;
use crate::rules::{InteractionKind, SceneBindings};
use crate::scene::SceneClock;
use crate::spec::GameConfig;

#[derive(Resource, Debug, Clone)]
pub struct ArcadeWorld {
    pub width: f32,
    pub height: f32,
    /// Pixels per second squared, positive y pulls down.
    pub gravity: Vec2,
    pub enabled: bool,
    pub paused: bool,
    pub debug: bool,
}

impl ArcadeWorld {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            gravity: Vec2::ZERO,
            enabled: true,
            paused: false,
            debug: false,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            gravity: Vec2::new(config.physics.gravity.x, config.physics.gravity.y),
            enabled: config.physics.enabled,
            debug: config.physics.debug,
            ..Self::new(config.width as f32, config.height as f32)
        }
    }

    pub fn is_running(&self) -> bool {
        self.enabled && !self.paused
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec2,
    pub half: Vec2,
}

impl Aabb {
    pub fn new(position: GamePosition, collider: Collider) -> Self {
        Self {
            center: position.as_vec2(),
            half: Vec2::new(collider.width, collider.height) / 2.0,
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        let d = (other.center - self.center).abs();
        d.x < self.half.x + other.half.x && d.y < self.half.y + other.half.y
    }

    pub fn min(&self) -> Vec2 {
        self.center - self.half
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.half
    }
}

/// Displacements that push `a` and `b` apart along the axis of least
/// penetration. Immovable bodies get no share of the push.
pub fn separate(a: &Aabb, b: &Aabb, a_movable: bool, b_movable: bool) -> Option<(Vec2, Vec2)> {
    let (share_a, share_b) = match (a_movable, b_movable) {
        (true, true) => (0.5, 0.5),
        (true, false) => (1.0, 0.0),
        (false, true) => (0.0, 1.0),
        (false, false) => return None,
    };
    let d = b.center - a.center;
    let overlap = a.half + b.half - d.abs();
    if overlap.x <= 0.0 || overlap.y <= 0.0 {
        return None;
    }
    let push = if overlap.x < overlap.y {
        let dir = if d.x > 0.0 { -1.0 } else { 1.0 };
        Vec2::new(dir * overlap.x, 0.0)
    } else {
        let dir = if d.y > 0.0 { -1.0 } else { 1.0 };
        Vec2::new(0.0, dir * overlap.y)
    };
    Some((push * share_a, -push * share_b))
}

/// Clamp inside `bounds` and reflect velocity. Returns true on the floor.
pub fn resolve_bounds(
    center: &mut Vec2,
    velocity: &mut Vec2,
    half: Vec2,
    bounds: Vec2,
    bounce: f32,
) -> bool {
    if center.x - half.x < 0.0 {
        center.x = half.x;
        if velocity.x < 0.0 {
            velocity.x = -velocity.x * bounce;
        }
    } else if center.x + half.x > bounds.x {
        center.x = bounds.x - half.x;
        if velocity.x > 0.0 {
            velocity.x = -velocity.x * bounce;
        }
    }

    let mut on_floor = false;
    if center.y - half.y < 0.0 {
        center.y = half.y;
        if velocity.y < 0.0 {
            velocity.y = -velocity.y * bounce;
        }
    } else if center.y + half.y >= bounds.y {
        center.y = bounds.y - half.y;
        if velocity.y > 0.0 {
            velocity.y = -velocity.y * bounce;
        }
        on_floor = true;
    }
    on_floor
}

pub fn integrate_bodies(
    arcade: Res<ArcadeWorld>,
    clock: Res<SceneClock>,
    mut bodies: Query<(&mut GamePosition, &mut Velocity, &mut ArcadeBody, &Collider)>,
) {
    if !arcade.is_running() {
        return;
    }
    let dt = (clock.delta_ms / 1000.0) as f32;
    let bounds = Vec2::new(arcade.width, arcade.height);
    for (mut position, mut velocity, mut body, collider) in &mut bodies {
        body.touching_down = false;
        if !body.is_movable() {
            continue;
        }
        let mut v = Vec2::new(velocity.x, velocity.y) + arcade.gravity * dt;
        let mut c = position.as_vec2() + v * dt;
        if body.collide_world_bounds {
            let half = Vec2::new(collider.width, collider.height) / 2.0;
            body.touching_down = resolve_bounds(&mut c, &mut v, half, bounds, body.bounce);
        }
        *position = GamePosition { x: c.x, y: c.y };
        *velocity = Velocity { x: v.x, y: v.y };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub binding: usize,
    pub first: Entity,
    pub second: Entity,
}

/// Hits found this step, dispatched after detection finishes.
#[derive(Resource, Default, Debug)]
pub struct PendingContacts(pub Vec<Contact>);

type ContactQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static mut GamePosition,
        &'static Collider,
        Option<&'static mut ArcadeBody>,
        Option<&'static mut Velocity>,
    ),
>;

pub fn detect_contacts(
    arcade: Res<ArcadeWorld>,
    registry: Res<SceneRegistry>,
    bindings: Res<SceneBindings>,
    mut contacts: ResMut<PendingContacts>,
    mut bodies: ContactQuery,
) {
    if !arcade.is_running() {
        return;
    }
    for (index, binding) in bindings.interactions.iter().enumerate() {
        let pairs = candidate_pairs(
            &registry.members(&binding.first),
            &registry.members(&binding.second),
            binding.first == binding.second,
        );
        for (a, b) in pairs {
            let Ok([mut qa, mut qb]) = bodies.get_many_mut([a, b]) else {
                continue;
            };
            let box_a = Aabb::new(*qa.0, *qa.1);
            let box_b = Aabb::new(*qb.0, *qb.1);
            if !box_a.overlaps(&box_b) {
                continue;
            }
            if binding.kind == InteractionKind::Collision {
                if let (Some(body_a), Some(body_b)) = (qa.2.as_deref_mut(), qb.2.as_deref_mut()) {
                    let push = separate(&box_a, &box_b, body_a.is_movable(), body_b.is_movable());
                    if let Some((push_a, push_b)) = push {
                        settle(&mut qa.0, qa.3.as_deref_mut(), body_a, push_a);
                        settle(&mut qb.0, qb.3.as_deref_mut(), body_b, push_b);
                    }
                }
            }
            contacts.0.push(Contact {
                binding: index,
                first: a,
                second: b,
            });
        }
    }
}

/// Entity pairs one binding checks. When both sides name the same target
/// each unordered pair appears once.
pub fn candidate_pairs(
    firsts: &[Entity],
    seconds: &[Entity],
    same_side: bool,
) -> Vec<(Entity, Entity)> {
    let mut pairs = Vec::new();
    for &a in firsts {
        for &b in seconds {
            if a == b || (same_side && b < a) {
                continue;
            }
            pairs.push((a, b));
        }
    }
    pairs
}

fn settle(
    position: &mut GamePosition,
    velocity: Option<&mut Velocity>,
    body: &mut ArcadeBody,
    push: Vec2,
) {
    if push == Vec2::ZERO {
        return;
    }
    position.x += push.x;
    position.y += push.y;
    if let Some(v) = velocity {
        if push.x * v.x < 0.0 {
            v.x = -v.x * body.bounce;
        }
        if push.y * v.y < 0.0 {
            v.y = -v.y * body.bounce;
        }
    }
    if push.y < 0.0 {
        body.touching_down = true;
    }
}

/// Run the callbacks of this step's hits in binding order.
pub fn dispatch_contacts(world: &mut World) {
    let mut contacts = match world.get_resource_mut::<PendingContacts>() {
        Some(mut pending) => std::mem::take(&mut pending.0),
        None => return,
    };
    contacts.sort_by_key(|c| c.binding);
    for contact in contacts {
        if !world.contains_resource::<SceneBindings>() {
            return;
        }
        let alive = world.entities().contains(contact.first)
            && world.entities().contains(contact.second);
        if alive {
            run_callback(
                world,
                CallbackSource::Interaction(contact.binding),
                Some(contact.second),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(x: f32, y: f32, w: f32, h: f32) -> Aabb {
        Aabb {
            center: Vec2::new(x, y),
            half: Vec2::new(w / 2.0, h / 2.0),
        }
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = aabb(0.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&aabb(10.0, 0.0, 10.0, 10.0)));
        assert!(a.overlaps(&aabb(9.0, 3.0, 10.0, 10.0)));
        assert_eq!(a.min(), Vec2::new(-5.0, -5.0));
    }

    #[test]
    fn static_body_takes_no_push() {
        let player = aabb(100.0, 92.0, 20.0, 20.0);
        let ground = aabb(100.0, 110.0, 200.0, 20.0);
        let (push_player, push_ground) =
            separate(&player, &ground, true, false).expect("overlapping");
        assert_eq!(push_ground, Vec2::ZERO);
        assert!((push_player.y + 2.0).abs() < 1e-4);
        assert_eq!(push_player.x, 0.0);
    }

    #[test]
    fn dynamic_pair_shares_push_on_shallow_axis() {
        let a = aabb(0.0, 0.0, 10.0, 10.0);
        let b = aabb(8.0, 1.0, 10.0, 10.0);
        let (pa, pb) = separate(&a, &b, true, true).expect("overlapping");
        assert!((pa.x + 1.0).abs() < 1e-4);
        assert!((pb.x - 1.0).abs() < 1e-4);
        assert_eq!(separate(&a, &b, false, false), None);
    }

    #[test]
    fn bounds_clamp_reflect_and_report_floor() {
        let bounds = Vec2::new(800.0, 600.0);
        let mut c = Vec2::new(400.0, 605.0);
        let mut v = Vec2::new(0.0, 200.0);
        let floor = resolve_bounds(&mut c, &mut v, Vec2::splat(10.0), bounds, 0.5);
        assert!(floor);
        assert_eq!(c.y, 590.0);
        assert_eq!(v.y, -100.0);

        let mut c = Vec2::new(-3.0, 100.0);
        let mut v = Vec2::new(-50.0, 0.0);
        assert!(!resolve_bounds(&mut c, &mut v, Vec2::splat(10.0), bounds, 0.0));
        assert_eq!(c.x, 10.0);
        assert_eq!(v.x, 0.0);
    }

    #[test]
    fn same_group_rule_pairs_each_member_once() {
        let mut world = World::new();
        let members: Vec<Entity> = (0..3).map(|_| world.spawn_empty().id()).collect();

        let pairs = candidate_pairs(&members, &members, true);
        assert_eq!(pairs.len(), 3);
        for (a, b) in &pairs {
            assert!(!pairs.contains(&(*b, *a)));
        }

        let player = world.spawn_empty().id();
        let crossed = candidate_pairs(&[player], &members, false);
        assert_eq!(crossed.len(), 3);
        assert!(candidate_pairs(&[player], &[player], true).is_empty());
    }

    #[test]
    fn settle_lands_body_on_top() {
        let mut position = GamePosition { x: 0.0, y: 10.0 };
        let mut velocity = Velocity { x: 5.0, y: 40.0 };
        let mut body = ArcadeBody {
            kind: crate::components::BodyKind::Dynamic,
            bounce: 0.0,
            collide_world_bounds: false,
            touching_down: false,
        };
        settle(&mut position, Some(&mut velocity), &mut body, Vec2::new(0.0, -3.0));
        assert_eq!(position.y, 7.0);
        assert_eq!(velocity, Velocity { x: 5.0, y: 0.0 });
        assert!(body.touching_down);
    }
}
