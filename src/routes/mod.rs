//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod error;
pub mod http;

/// Build the application router with:
/// - Oracle proxy under `/api/ai/...`
/// - Scoring, sessions, constellation and vault under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // Oracle proxy
        .route("/api/ai/explain", post(http::http_post_explain))
        .route("/api/ai/evaluate", post(http::http_post_evaluate))
        .route("/api/ai/quiz", post(http::http_post_quiz))
        .route("/api/ai/lightning", post(http::http_post_lightning))
        .route("/api/ai/vault", post(http::http_post_vault))
        .route("/api/ai/categorize", post(http::http_post_categorize))
        // Lookups and scoring
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/difficulties", get(http::http_get_difficulties))
        .route("/api/v1/rarity/styles", get(http::http_get_rarity_styles))
        .route("/api/v1/rarity/styles/:label", get(http::http_get_rarity_style))
        .route("/api/v1/rarity/classify", post(http::http_post_classify))
        // Sessions and vault
        .route("/api/v1/sessions", post(http::http_post_session).get(http::http_get_sessions))
        .route("/api/v1/sessions/:id", get(http::http_get_session))
        .route("/api/v1/sessions/:id/export", get(http::http_get_session_export))
        .route("/api/v1/sessions/:id/vault", put(http::http_put_session_vault))
        .route("/api/v1/constellation", get(http::http_get_constellation))
        .route("/api/v1/stats", get(http::http_get_stats))
        .route("/api/v1/vault/export", get(http::http_get_vault_export))
        .route("/api/v1/vault", axum::routing::delete(http::http_delete_vault))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        build_router(Arc::new(AppState::offline()))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        app.clone()
            .oneshot(req.body(body).expect("request"))
            .await
            .expect("response")
    }

    async fn json_body(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    fn full_marks() -> Value {
        json!({
            "articulation": { "score": 10.0, "text": "Cells make energy.", "feedback": "Great" },
            "gauntlet": { "correctCount": 10, "totalQuestions": 10, "answers": [true, true, true, true, true, true, true, true, true, true] },
            "lightning": { "correctCount": 20, "totalQuestions": 20, "answers": [], "timeBonus": 0 }
        })
    }

    #[tokio::test]
    async fn health_reports_offline_oracle() {
        let res = send(&app(), Method::GET, "/api/v1/health", None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await, json!({ "ok": true, "oracleEnabled": false }));
    }

    #[tokio::test]
    async fn classify_returns_rarity_and_breakdown() {
        let body = json!({
            "trials": {
                "articulation": { "score": 5.0, "text": "", "feedback": "" },
                "gauntlet": { "correctCount": 5, "totalQuestions": 10, "answers": [] },
                "lightning": { "correctCount": 10, "totalQuestions": 20, "answers": [], "timeBonus": 10 }
            },
            "difficulty": 3
        });
        let res = send(&app(), Method::POST, "/api/v1/rarity/classify", Some(body)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let v = json_body(res).await;
        assert_eq!(v["rarity"], "rare");
        assert_eq!(v["finalScore"], 7.5);
        assert!(v["breakdown"].is_object());
    }

    #[tokio::test]
    async fn classify_counts_questions_from_answers() {
        let mut halves = vec![json!(true); 10];
        halves.extend(vec![json!(false); 10]);
        let body = json!({
            "trials": {
                "articulation": { "score": 5 },
                "gauntlet": { "score": 5, "answers": &halves[5..15] },
                "lightning": { "score": 10, "timeBonus": 0, "answers": halves }
            },
            "difficulty": 3
        });
        let res = send(&app(), Method::POST, "/api/v1/rarity/classify", Some(body)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let v = json_body(res).await;
        assert_eq!(v["finalScore"], 6.5);
        assert_eq!(v["rarity"], "normal");
    }

    #[tokio::test]
    async fn vault_entry_accepts_any_category_label() {
        let session = json!({
            "id": "s1",
            "topic": "Sourdough",
            "date": "2024-03-01",
            "difficulty": 2,
            "difficultyName": "Hey, Not Too Rough",
            "category": "Cooking",
            "trials": full_marks(),
            "rarity": "rare",
            "finalScore": 7.1
        });
        let res = send(&app(), Method::POST, "/api/ai/vault", Some(json!({ "session": session }))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(json_body(res).await["content"].as_str().is_some_and(|c| c.contains("Skills")));
    }

    #[tokio::test]
    async fn classify_rejects_out_of_range_difficulty() {
        let res = send(
            &app(),
            Method::POST,
            "/api/v1/rarity/classify",
            Some(json!({ "trials": full_marks(), "difficulty": 6 })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let v = json_body(res).await;
        assert_eq!(v["error"], "bad_request");
        assert!(v["requestId"].as_str().is_some_and(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn session_lifecycle_over_http() {
        let app = app();
        let res = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({
                "topic": "Photosynthesis",
                "difficulty": 2,
                "category": "Sciences",
                "trials": full_marks(),
                "aiExplanation": "Light becomes sugar."
            })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let session = json_body(res).await;
        let id = session["id"].as_str().expect("id").to_string();
        assert_eq!(session["rarity"], "unique");
        assert_eq!(session["difficultyName"], "Hey, Not Too Rough");

        let res = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = send(&app, Method::GET, "/api/v1/sessions?q=photo", None).await;
        assert_eq!(json_body(res).await.as_array().map(Vec::len), Some(1));
        let res = send(&app, Method::GET, "/api/v1/sessions?q=jazz", None).await;
        assert_eq!(json_body(res).await.as_array().map(Vec::len), Some(0));

        let res = send(
            &app,
            Method::PUT,
            &format!("/api/v1/sessions/{id}/vault"),
            Some(json!({ "content": "# My notes" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = send(&app, Method::GET, &format!("/api/v1/sessions/{id}/export"), None).await;
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&bytes[..], b"# My notes");

        let res = send(&app, Method::GET, "/api/v1/constellation", None).await;
        let nodes = json_body(res).await;
        assert_eq!(nodes[0]["id"], id.as_str());
        assert_eq!(nodes[0]["fillColor"], "#3b82f6");
        assert_eq!(nodes[0]["borderWidth"], 4);

        let res = send(&app, Method::GET, "/api/v1/stats", None).await;
        let stats = json_body(res).await;
        assert_eq!(stats["totalNodes"], 1);
        assert_eq!(stats["uniqueNodes"], 1);

        let res = send(&app, Method::DELETE, "/api/v1/vault", None).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let res = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_trial_record_is_rejected() {
        let mut trials = full_marks();
        trials["gauntlet"]["correctCount"] = json!(11);
        let res = send(
            &app(),
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "topic": "X", "difficulty": 1, "trials": trials })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oracle_proxy_falls_back_offline() {
        let app = app();
        let res = send(&app, Method::POST, "/api/ai/quiz", Some(json!({ "topic": "Rust", "difficulty": 3 }))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["questions"].as_array().map(Vec::len), Some(10));

        let res = send(&app, Method::POST, "/api/ai/categorize", Some(json!({ "topic": "Jazz piano" }))).await;
        assert_eq!(json_body(res).await["category"], "Arts");
    }

    #[tokio::test]
    async fn lookup_tables_are_served() {
        let app = app();
        let res = send(&app, Method::GET, "/api/v1/difficulties", None).await;
        let levels = json_body(res).await;
        assert_eq!(levels.as_array().map(Vec::len), Some(5));
        assert_eq!(levels[4]["name"], "Nightmare");

        let res = send(&app, Method::GET, "/api/v1/rarity/styles", None).await;
        let styles = json_body(res).await;
        assert_eq!(styles[0]["rarity"], "normal");
        assert_eq!(styles[3]["glowClass"], "rarity-glow-unique");

        let res = send(&app, Method::GET, "/api/v1/rarity/styles/Legendary", None).await;
        let style = json_body(res).await;
        assert_eq!(style["rarity"], "legendary");
        assert_eq!(style["color"], "var(--rarity-legendary)");
        assert_eq!(style["borderWidth"], 3);

        let res = send(&app, Method::GET, "/api/v1/rarity/styles/mythic", None).await;
        assert_eq!(json_body(res).await["glowClass"], "rarity-glow-normal");
    }
}
