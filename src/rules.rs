//! Custom-logic rule strings and their resolved bindings.
//!
//! Interaction rules look like `"player, coin -> collect"` and timer rules like
//! `"every 500ms -> tick"`. Parsing is pure; resolution against live ids needs
//! the scene registry.

use bevy::prelude::*;

use crate::errors::BuildError;
use crate::registry::SceneRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionRule {
    pub first: String,
    pub second: String,
    pub callback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    Every,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRule {
    pub mode: TimerMode,
    pub interval_ms: u32,
    pub callback: String,
}

fn split_callback(line: &str) -> Option<(&str, &str)> {
    let (lhs, rhs) = line.split_once("->")?;
    let callback = rhs.trim();
    if callback.is_empty() {
        return None;
    }
    Some((lhs.trim(), callback))
}

pub fn parse_interaction(line: &str) -> Result<InteractionRule, BuildError> {
    let malformed = || BuildError::MalformedRule(line.to_string());
    let (pair, callback) = split_callback(line).ok_or_else(malformed)?;
    let (first, second) = pair.split_once(',').ok_or_else(malformed)?;
    let (first, second) = (first.trim(), second.trim());
    if first.is_empty() || second.is_empty() || second.contains(',') {
        return Err(malformed());
    }
    Ok(InteractionRule {
        first: first.to_string(),
        second: second.to_string(),
        callback: callback.to_string(),
    })
}

pub fn parse_timer(line: &str) -> Result<TimerRule, BuildError> {
    let malformed = || BuildError::MalformedTimer(line.to_string());
    let (schedule, callback) = split_callback(line).ok_or_else(malformed)?;
    let (word, amount) = schedule
        .split_once(char::is_whitespace)
        .ok_or_else(malformed)?;
    let mode = match word {
        "every" => TimerMode::Every,
        "after" => TimerMode::After,
        _ => return Err(malformed()),
    };
    let interval_ms = amount
        .trim()
        .strip_suffix("ms")
        .map(str::trim)
        .and_then(|n| n.parse::<u32>().ok())
        .ok_or_else(malformed)?;
    Ok(TimerRule {
        mode,
        interval_ms,
        callback: callback.to_string(),
    })
}

/// One side of an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Entity(Entity),
    /// Group key; membership is read live so spawned members are included.
    Group(String),
}

/// Live entities take precedence over group and template ids.
pub fn resolve_target(registry: &SceneRegistry, id: &str) -> Option<Target> {
    if let Some(entity) = registry.entity(id) {
        return Some(Target::Entity(entity));
    }
    registry
        .has_group(id)
        .then(|| Target::Group(id.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Collision,
    Overlap,
}

#[derive(Debug, Clone)]
pub struct InteractionBinding {
    pub kind: InteractionKind,
    pub first: Target,
    pub second: Target,
    pub callback: String,
    pub rule: String,
    /// Set after the first "unknown callback" warning for this binding.
    pub warned: bool,
}

#[derive(Debug, Clone)]
pub struct TimerBinding {
    pub rule: TimerRule,
    pub source: String,
    pub warned: bool,
}

/// Parse and resolve one interaction line in a single step.
pub fn bind_interaction(
    registry: &SceneRegistry,
    kind: InteractionKind,
    line: &str,
) -> Result<InteractionBinding, BuildError> {
    let rule = parse_interaction(line)?;
    let resolve = |side: &str| {
        resolve_target(registry, side).ok_or_else(|| BuildError::UnresolvedTarget {
            rule: line.to_string(),
            side: side.to_string(),
        })
    };
    let first = resolve(&rule.first)?;
    let second = resolve(&rule.second)?;
    Ok(InteractionBinding {
        kind,
        first,
        second,
        callback: rule.callback,
        rule: line.to_string(),
        warned: false,
    })
}

/// Resolved rules of the running scene.
#[derive(Resource, Default, Debug)]
pub struct SceneBindings {
    pub interactions: Vec<InteractionBinding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_whitespace_is_insignificant() {
        let rule = parse_interaction("  player ,enemy->   destroy ").expect("valid rule");
        assert_eq!(
            rule,
            InteractionRule {
                first: "player".into(),
                second: "enemy".into(),
                callback: "destroy".into(),
            }
        );
    }

    #[test]
    fn interaction_rejects_malformed_lines() {
        for line in [
            "player enemy -> destroy",
            "player,enemy destroy",
            "player, -> destroy",
            "player,enemy ->",
            "a,b,c -> destroy",
        ] {
            assert!(
                matches!(parse_interaction(line), Err(BuildError::MalformedRule(_))),
                "{line} should be rejected"
            );
        }
    }

    #[test]
    fn timer_forms() {
        let every = parse_timer("every 1500ms -> spawnWave").expect("every");
        assert_eq!(every.mode, TimerMode::Every);
        assert_eq!(every.interval_ms, 1500);
        assert_eq!(every.callback, "spawnWave");

        let after = parse_timer("after   200 ms->gameOver").expect("after");
        assert_eq!(after.mode, TimerMode::After);
        assert_eq!(after.interval_ms, 200);
    }

    #[test]
    fn timer_rejects_malformed_lines() {
        for line in [
            "sometimes 100ms -> x",
            "every 100 -> x",
            "every -5ms -> x",
            "every ms -> x",
            "every 100ms",
        ] {
            assert!(
                matches!(parse_timer(line), Err(BuildError::MalformedTimer(_))),
                "{line} should be rejected"
            );
        }
    }

    #[test]
    fn resolution_prefers_entities_over_groups() {
        let mut world = World::new();
        let entity = world.spawn_empty().id();
        let mut registry = SceneRegistry::default();
        registry.ensure_group("coin");
        registry.register("player", entity);

        assert_eq!(resolve_target(&registry, "player"), Some(Target::Entity(entity)));
        assert_eq!(
            resolve_target(&registry, "coin"),
            Some(Target::Group("coin".into()))
        );
        assert_eq!(resolve_target(&registry, "ghost"), None);

        registry.register("coin", entity);
        assert_eq!(resolve_target(&registry, "coin"), Some(Target::Entity(entity)));
    }

    #[test]
    fn binding_reports_the_unresolved_side() {
        let registry = SceneRegistry::default();
        let err = bind_interaction(&registry, InteractionKind::Overlap, "a,b -> x")
            .expect_err("nothing registered");
        assert_eq!(
            err,
            BuildError::UnresolvedTarget {
                rule: "a,b -> x".into(),
                side: "a".into()
            }
        );
    }
}
