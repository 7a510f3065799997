use axum::{
    extract::{Query, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use tokio::sync::oneshot;

use super::commands::ApiCommand;
use super::security::{api_guard, ApiSecurity};
use super::types::*;
use super::AppState;
use crate::events::GameEvent;
use crate::scene::StartOptions;
use crate::spec::GameSpec;

pub(super) fn build_router(state: AppState, security: ApiSecurity) -> Router {
    Router::new()
        .route("/game", post(start_game))
        .route("/game/stop", post(stop_game))
        .route("/game/state", get(get_status))
        .route("/game/spec", get(get_spec))
        .route("/events", get(get_events))
        .layer(middleware::from_fn_with_state(security, api_guard))
        .with_state(state)
}

/// Send a command and wait for the Bevy side to answer.
async fn ask<T>(
    state: &AppState,
    make: impl FnOnce(oneshot::Sender<T>) -> ApiCommand,
) -> Result<T, String> {
    let (tx, rx) = oneshot::channel();
    state
        .sender
        .send(make(tx))
        .map_err(|_| "Game loop not running".to_string())?;
    rx.await.map_err(|_| "Channel closed".to_string())
}

async fn start_game(
    State(state): State<AppState>,
    Query(query): Query<StartGameQuery>,
    body: String,
) -> Json<ApiResponse<StartedGame>> {
    let spec = match GameSpec::from_json(&body) {
        Ok(spec) => spec,
        Err(e) => return Json(ApiResponse::failure(format!("Invalid spec: {e}"))),
    };
    let options = StartOptions {
        scene: query.scene,
        seed: query.seed,
    };
    match ask(&state, |tx| {
        ApiCommand::StartGame(Box::new(spec), options, tx)
    })
    .await
    {
        Ok(Ok(started)) => Json(ApiResponse::success(started)),
        Ok(Err(e)) | Err(e) => Json(ApiResponse::failure(e)),
    }
}

async fn stop_game(State(state): State<AppState>) -> Json<ApiResponse<bool>> {
    match ask(&state, ApiCommand::StopGame).await {
        Ok(stopped) => Json(ApiResponse::success(stopped)),
        Err(e) => Json(ApiResponse::failure(e)),
    }
}

async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<GameStatus>> {
    match ask(&state, ApiCommand::GetStatus).await {
        Ok(status) => Json(ApiResponse::success(status)),
        Err(e) => Json(ApiResponse::failure(e)),
    }
}

async fn get_spec(State(state): State<AppState>) -> Json<ApiResponse<GameSpec>> {
    match ask(&state, ApiCommand::GetSpec).await {
        Ok(Some(spec)) => Json(ApiResponse::success(spec)),
        Ok(None) => Json(ApiResponse::failure("No game running")),
        Err(e) => Json(ApiResponse::failure(e)),
    }
}

async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<ApiResponse<Vec<GameEvent>>> {
    match ask(&state, |tx| ApiCommand::GetEvents(query, tx)).await {
        Ok(events) => Json(ApiResponse::success(events)),
        Err(e) => Json(ApiResponse::failure(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request as HttpRequest, StatusCode};
    use tower::util::ServiceExt;

    fn router() -> (Router, crossbeam_channel::Receiver<ApiCommand>) {
        let (tx, rx) = crossbeam_channel::unbounded::<ApiCommand>();
        let app = build_router(AppState { sender: tx }, ApiSecurity::new(None, 1000));
        (app, rx)
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn invalid_spec_is_rejected_before_reaching_the_game() {
        let (app, rx) = router();
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/game")
            .body(axum::body::Body::from("{ not json"))
            .expect("request");
        let res = app.oneshot(req).await.expect("response");
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["ok"], false);
        assert!(json["error"].as_str().unwrap_or("").starts_with("Invalid spec"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn status_is_answered_by_the_game_loop() {
        let (app, rx) = router();
        let responder = std::thread::spawn(move || {
            if let Ok(ApiCommand::GetStatus(tx)) = rx.recv() {
                let _ = tx.send(GameStatus {
                    running: true,
                    score: 30,
                    ..GameStatus::default()
                });
            }
        });

        let req = HttpRequest::builder()
            .uri("/game/state")
            .body(axum::body::Body::empty())
            .expect("request");
        let res = app.oneshot(req).await.expect("response");
        let json = body_json(res).await;
        responder.join().expect("responder");
        assert_eq!(json["ok"], true);
        assert_eq!(json["data"]["running"], true);
        assert_eq!(json["data"]["score"], 30);
    }

    #[tokio::test]
    async fn start_forwards_scene_and_seed() {
        let (app, rx) = router();
        let responder = std::thread::spawn(move || match rx.recv() {
            Ok(ApiCommand::StartGame(spec, options, tx)) => {
                let _ = tx.send(Ok(StartedGame {
                    generation: 1,
                    scene: options.scene.clone().unwrap_or_default(),
                    title: spec.title.clone(),
                }));
                (options.scene, options.seed)
            }
            _ => (None, None),
        });

        let body = r#"{
            "title": "Demo",
            "description": "two scenes",
            "game": {
                "width": 320,
                "height": 240,
                "physics": { "enabled": false, "gravity": { "y": 0 } }
            },
            "scenes": [{ "name": "intro", "objects": [] }, { "name": "level", "objects": [] }]
        }"#;
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/game?scene=level&seed=42")
            .body(axum::body::Body::from(body))
            .expect("request");
        let res = app.oneshot(req).await.expect("response");
        let json = body_json(res).await;
        let forwarded = responder.join().expect("responder");
        assert_eq!(forwarded, (Some("level".to_string()), Some(42)));
        assert_eq!(json["data"]["scene"], "level");
        assert_eq!(json["data"]["title"], "Demo");
    }

    #[tokio::test]
    async fn closed_game_loop_reports_an_error() {
        let (app, rx) = router();
        drop(rx);
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/game/stop")
            .body(axum::body::Body::empty())
            .expect("request");
        let res = app.oneshot(req).await.expect("response");
        let json = body_json(res).await;
        assert_eq!(json["ok"], false);
    }
}
