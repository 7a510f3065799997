use thiserror::Error;

use crate::spec::ObjectType;

/// Shape-level problems with a spec document.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("invalid spec JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("spec declares no scenes")]
    NoScenes,
    #[error("game dimensions must be positive (got {width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },
    #[error("duplicate scene name '{0}'")]
    DuplicateScene(String),
    #[error("duplicate asset key '{0}'")]
    DuplicateAsset(String),
}

/// Recoverable construction failures. Scene building records these and
/// keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("object '{id}' of type {object_type} is missing its '{field}' payload")]
    MissingPayload {
        id: String,
        object_type: ObjectType,
        field: &'static str,
    },
    #[error("rule '{rule}' references unknown id '{side}'")]
    UnresolvedTarget { rule: String, side: String },
    #[error("malformed interaction rule '{0}'")]
    MalformedRule(String),
    #[error("malformed timer rule '{0}'")]
    MalformedTimer(String),
    #[error("object id '{0}' declared more than once; latest declaration wins")]
    DuplicateObjectId(String),
    #[error("spawner '{spawner}' cannot instantiate its template: {reason}")]
    TemplateNotSpawnable { spawner: String, reason: String },
}

/// Failures that prevent a game from starting at all.
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error("scene '{0}' not found in spec")]
    UnknownScene(String),
}

/// Problems with the command line or startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("usage: playspec <spec.json> [--headless] [--watch] [--no-api] [--scene <name>] [--seed <n>]")]
    MissingSpecPath,
    #[error("unknown argument '{0}'")]
    UnknownArgument(String),
    #[error("{0} expects a value")]
    MissingValue(&'static str),
    #[error("invalid seed '{0}'")]
    InvalidSeed(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Spec(#[from] SpecError),
}
