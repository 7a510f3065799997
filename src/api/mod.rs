//! HTTP control surface. Requests become `ApiCommand`s that the Bevy side
//! drains once per frame, so the game world is only touched from the app thread.

mod commands;
mod routes;
mod security;
pub mod types;

use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};

pub use commands::ApiCommand;
use commands::process_api_commands;
use routes::build_router;
use security::ApiSecurity;

use crate::config::DEFAULT_API_ADDR;

#[derive(Resource)]
pub struct ApiChannels {
    pub receiver: Receiver<ApiCommand>,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub sender: Sender<ApiCommand>,
}

pub struct ApiPlugin {
    pub addr: String,
}

impl Default for ApiPlugin {
    fn default() -> Self {
        Self {
            addr: DEFAULT_API_ADDR.to_string(),
        }
    }
}

impl Plugin for ApiPlugin {
    fn build(&self, app: &mut App) {
        let (tx, rx) = crossbeam_channel::unbounded::<ApiCommand>();
        app.insert_resource(ApiChannels { receiver: rx })
            .add_systems(Update, process_api_commands);

        let state = AppState { sender: tx };
        let security = ApiSecurity::from_env();
        if security.required_token.is_none() {
            println!("[Playspec API] No PLAYSPEC_API_TOKEN set, API is unauthenticated");
        }
        let addr = self.addr.clone();
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("[Playspec API] Failed to start runtime: {e}");
                    return;
                }
            };
            rt.block_on(async {
                let app = build_router(state, security);
                let listener = match tokio::net::TcpListener::bind(&addr).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        eprintln!("[Playspec API] Failed to bind {addr}: {e}");
                        return;
                    }
                };
                println!("[Playspec API] Listening on http://{addr}");
                if let Err(e) = axum::serve(listener, app).await {
                    eprintln!("[Playspec API] Server stopped: {e}");
                }
            });
        });
    }
}
