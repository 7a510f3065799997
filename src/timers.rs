use bevy::prelude::*;

use crate::actions::{run_callback, CallbackSource};
use crate::rules::{TimerBinding, TimerMode};
use crate::scene::SceneClock;

/// Firings allowed per frame when a timer has fallen behind.
pub const MAX_CATCH_UP: u32 = 4;

/// Millisecond timer driven by the scene clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTimer {
    interval_ms: f64,
    next_due_ms: f64,
    repeating: bool,
    finished: bool,
}

impl ScheduledTimer {
    pub fn repeating(interval_ms: u32, now_ms: f64) -> Self {
        Self::new(interval_ms, now_ms, true)
    }

    pub fn once(delay_ms: u32, now_ms: f64) -> Self {
        Self::new(delay_ms, now_ms, false)
    }

    fn new(interval_ms: u32, now_ms: f64, repeating: bool) -> Self {
        let interval_ms = f64::from(interval_ms.max(1));
        Self {
            interval_ms,
            next_due_ms: now_ms + interval_ms,
            repeating,
            finished: false,
        }
    }

    /// Number of times the timer fires at `now_ms`.
    pub fn poll(&mut self, now_ms: f64) -> u32 {
        if self.finished || now_ms < self.next_due_ms {
            return 0;
        }
        if !self.repeating {
            self.finished = true;
            return 1;
        }
        let mut fired = 0;
        while now_ms >= self.next_due_ms && fired < MAX_CATCH_UP {
            self.next_due_ms += self.interval_ms;
            fired += 1;
        }
        // Drop the backlog instead of replaying it over later frames.
        if now_ms >= self.next_due_ms {
            let missed = ((now_ms - self.next_due_ms) / self.interval_ms).floor() + 1.0;
            self.next_due_ms += missed * self.interval_ms;
        }
        fired
    }

    pub fn cancel(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

pub struct RuleTimer {
    pub binding: TimerBinding,
    pub timer: ScheduledTimer,
}

/// Timers declared by the scene's `timers` rules.
#[derive(Resource, Default)]
pub struct RuleTimers(pub Vec<RuleTimer>);

impl RuleTimers {
    pub fn add(&mut self, binding: TimerBinding, now_ms: f64) {
        let timer = match binding.rule.mode {
            TimerMode::Every => ScheduledTimer::repeating(binding.rule.interval_ms, now_ms),
            TimerMode::After => ScheduledTimer::once(binding.rule.interval_ms, now_ms),
        };
        self.0.push(RuleTimer { binding, timer });
    }
}

pub fn tick_rule_timers(world: &mut World) {
    let Some(now) = world.get_resource::<SceneClock>().map(|c| c.now_ms) else {
        return;
    };
    let due: Vec<(usize, u32)> = match world.get_resource_mut::<RuleTimers>() {
        Some(mut timers) => timers
            .0
            .iter_mut()
            .enumerate()
            .filter_map(|(i, t)| {
                let fired = t.timer.poll(now);
                (fired > 0).then_some((i, fired))
            })
            .collect(),
        None => return,
    };
    for (index, fired) in due {
        for _ in 0..fired {
            // A callback may end the scene; stop firing once the timers are gone.
            if !world.contains_resource::<RuleTimers>() {
                return;
            }
            run_callback(world, CallbackSource::Timer(index), None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeating_timer_fires_each_interval() {
        let mut timer = ScheduledTimer::repeating(100, 0.0);
        assert_eq!(timer.poll(99.0), 0);
        assert_eq!(timer.poll(100.0), 1);
        assert_eq!(timer.poll(150.0), 0);
        assert_eq!(timer.poll(205.0), 1);
    }

    #[test]
    fn catch_up_is_capped_and_backlog_dropped() {
        let mut timer = ScheduledTimer::repeating(10, 0.0);
        assert_eq!(timer.poll(1000.0), MAX_CATCH_UP);
        assert_eq!(timer.poll(1000.0), 0);
        assert_eq!(timer.poll(1010.0), 1);
    }

    #[test]
    fn one_shot_fires_once() {
        let mut timer = ScheduledTimer::once(50, 10.0);
        assert_eq!(timer.poll(59.0), 0);
        assert_eq!(timer.poll(60.0), 1);
        assert!(timer.is_finished());
        assert_eq!(timer.poll(500.0), 0);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut timer = ScheduledTimer::repeating(0, 0.0);
        timer.cancel();
        assert_eq!(timer.poll(1e6), 0);
    }
}
