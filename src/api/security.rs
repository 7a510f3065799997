use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    Json,
};

use super::types::ApiResponse;

pub(super) const DEFAULT_API_RATE_LIMIT_PER_SEC: u32 = 120;
const MAX_TRACKED_CLIENTS: usize = 4096;

#[derive(Clone)]
pub(super) struct ApiSecurity {
    pub required_token: Option<String>,
    pub rate_limit_per_sec: u32,
    pub buckets: Arc<Mutex<HashMap<String, RateBucket>>>,
}

#[derive(Clone)]
pub(super) struct RateBucket {
    pub window_start: Instant,
    pub count: u32,
}

impl ApiSecurity {
    pub(super) fn new(required_token: Option<String>, rate_limit_per_sec: u32) -> Self {
        Self {
            required_token,
            rate_limit_per_sec: rate_limit_per_sec.max(1),
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(super) fn from_env() -> Self {
        let required_token = std::env::var("PLAYSPEC_API_TOKEN")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let rate_limit_per_sec = std::env::var("PLAYSPEC_API_RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_API_RATE_LIMIT_PER_SEC);
        Self::new(required_token, rate_limit_per_sec)
    }

    fn authorized(&self, req: &Request) -> bool {
        let Some(expected) = self.required_token.as_deref() else {
            return true;
        };
        let auth = header(req, "authorization");
        let bearer = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .unwrap_or(auth);
        bearer == expected || header(req, "x-api-key") == expected
    }

    /// Counts one request for `client`; false once its per-second budget is spent.
    fn admit(&self, client: String) -> bool {
        // A poisoned lock only means another request panicked mid-update.
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        let entry = buckets.entry(client).or_insert(RateBucket {
            window_start: now,
            count: 0,
        });
        if now.duration_since(entry.window_start).as_secs_f32() >= 1.0 {
            entry.window_start = now;
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);
        let admitted = entry.count <= self.rate_limit_per_sec;

        if buckets.len() > MAX_TRACKED_CLIENTS {
            buckets.retain(|_, v| now.duration_since(v.window_start).as_secs_f32() < 10.0);
        }
        admitted
    }
}

fn header<'a>(req: &'a Request, name: &str) -> &'a str {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("")
}

pub(super) async fn api_guard(
    State(security): State<ApiSecurity>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    if !security.authorized(&req) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::err(
                "Unauthorized: send Authorization: Bearer <PLAYSPEC_API_TOKEN>",
            )),
        )
            .into_response();
    }

    let client = req
        .headers()
        .get("x-forwarded-for")
        .or_else(|| req.headers().get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("local")
        .to_string();
    if !security.admit(client) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::err("Rate limit exceeded")),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::Request as HttpRequest, middleware, routing::get, Router};
    use tower::util::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    fn guarded(security: ApiSecurity) -> Router {
        Router::new()
            .route("/", get(ok_handler))
            .layer(middleware::from_fn_with_state(security, api_guard))
    }

    #[tokio::test]
    async fn open_when_no_token_configured() {
        let app = guarded(ApiSecurity::new(None, 10));
        let req = HttpRequest::builder()
            .uri("/")
            .body(axum::body::Body::empty())
            .expect("request");
        let res = app.oneshot(req).await.expect("response");
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_token_and_accepts_api_key() {
        let app = guarded(ApiSecurity::new(Some("secret".to_string()), 100));

        let req = HttpRequest::builder()
            .uri("/")
            .body(axum::body::Body::empty())
            .expect("request");
        let res = app.clone().oneshot(req).await.expect("response");
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req_bad = HttpRequest::builder()
            .uri("/")
            .header("authorization", "Bearer nope")
            .body(axum::body::Body::empty())
            .expect("request");
        let res_bad = app.clone().oneshot(req_bad).await.expect("response");
        assert_eq!(res_bad.status(), StatusCode::UNAUTHORIZED);

        let req_key = HttpRequest::builder()
            .uri("/")
            .header("x-api-key", "secret")
            .body(axum::body::Body::empty())
            .expect("request");
        let res_key = app.oneshot(req_key).await.expect("response");
        assert_eq!(res_key.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limit_is_per_client() {
        let app = guarded(ApiSecurity::new(None, 1));
        let request = |ip: &str| {
            HttpRequest::builder()
                .uri("/")
                .header("x-real-ip", ip)
                .body(axum::body::Body::empty())
                .expect("request")
        };

        let first = app.clone().oneshot(request("10.0.0.1")).await.expect("response");
        assert_eq!(first.status(), StatusCode::OK);
        let second = app.clone().oneshot(request("10.0.0.1")).await.expect("response");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let other = app.oneshot(request("10.0.0.2")).await.expect("response");
        assert_eq!(other.status(), StatusCode::OK);
    }
}
