use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn err(msg: impl Into<String>) -> ApiResponse<String> {
        ApiResponse::failure(msg)
    }
}

#[derive(Deserialize, Default)]
pub struct StartGameQuery {
    pub scene: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Default)]
pub struct EventsQuery {
    /// Only events emitted on or after this frame.
    pub since: Option<u64>,
    pub name: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct StartedGame {
    pub generation: u64,
    pub scene: String,
    pub title: String,
}

#[derive(Serialize, Clone, Debug, Default)]
pub struct GameStatus {
    pub running: bool,
    pub title: Option<String>,
    pub scene: Option<String>,
    pub generation: Option<u64>,
    pub score: i64,
    pub game_over: bool,
    pub objects: usize,
    pub elapsed_ms: f64,
    pub diagnostics: Vec<String>,
}
