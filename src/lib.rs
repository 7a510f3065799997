//! Turns a declarative JSON game spec into a running Bevy scene.
//!
//! Add [`InterpreterPlugin`] to an app, then call [`start`] with a parsed
//! [`GameSpec`]. The returned [`RunningGame`] handle tears the scene down
//! again through [`stop`].

pub mod actions;
#[cfg(not(target_arch = "wasm32"))]
pub mod api;
pub mod assets;
pub mod behavior;
pub mod color;
pub mod components;
pub mod config;
pub mod controls;
pub mod errors;
pub mod events;
pub mod factory;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_watcher;
pub mod physics;
pub mod registry;
pub mod render;
pub mod rules;
pub mod scene;
pub mod spawner;
pub mod spec;
pub mod timers;

pub use errors::{BuildError, ConfigError, SpecError, StartError};
pub use scene::{
    current_game, start, start_with, stop, stop_current, InterpreterPlugin, PendingSpec,
    RunningGame, StartOptions,
};
pub use spec::GameSpec;
