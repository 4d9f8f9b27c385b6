mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{json_body, post_json, setup, setup_with, StubAnalytics};

const PREVIEW: &str = "/api/dashboards/dash_1/funnels/preview";

fn preview_body(editor: Option<(&str, u64)>) -> Value {
    let mut body = json!({
        "query_filters": [
            { "column": "url", "operator": "=", "value": "/" },
            { "column": "url", "operator": "=", "value": "" },
            { "column": "url", "operator": "!=", "value": "/blog*" }
        ]
    });
    if let Some((editor_id, sequence)) = editor {
        body["editor_id"] = json!(editor_id);
        body["sequence"] = json!(sequence);
    }
    body
}

#[tokio::test(start_paused = true)]
async fn preview_skips_unfinished_steps_and_covers_last_day() {
    let (analytics, app) = setup().await;
    let response = post_json(&app, PREVIEW, &preview_body(None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["data"]["name"], "Funnel");
    assert!(json["data"].get("id").is_none());
    assert_eq!(json["data"]["step_count"], 2);
    assert_eq!(json["data"]["steps"][1]["filter"], "URL is not /blog*");

    let calls = analytics.funnel_calls();
    assert_eq!(calls[0].query_filters.len(), 2);
    let range = calls[0].range.expect("preview range");
    assert_eq!((range.end - range.start).num_hours(), 24);
    assert!(!calls[0].is_strict);
}

#[tokio::test]
async fn preview_of_no_steps_uses_empty_analysis() {
    let (_, app) = setup().await;
    let response = post_json(&app, PREVIEW, &json!({ "query_filters": [] })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["steps"], json!([]));
    assert_eq!(json["data"]["biggest_drop_off"]["filter"], "");
    assert_eq!(json["data"]["visitor_count"], json!({"min": 1, "max": 1}));
}

#[tokio::test]
async fn editor_id_requires_sequence() {
    let (_, app) = setup().await;
    let mut body = preview_body(None);
    body["editor_id"] = json!("editor");
    let response = post_json(&app, PREVIEW, &body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_only_query_the_latest() {
    let (analytics, app) = setup().await;

    let first = {
        let app = app.clone();
        tokio::spawn(async move { post_json(&app, PREVIEW, &preview_body(Some(("ed", 1)))).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = {
        let app = app.clone();
        tokio::spawn(async move { post_json(&app, PREVIEW, &preview_body(Some(("ed", 2)))).await })
    };

    let first = first.await.expect("first request");
    assert_eq!(first.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(first).await["error"]["code"], "superseded");

    let second = second.await.expect("second request");
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(analytics.funnel_calls().len(), 1);

    let late = post_json(&app, PREVIEW, &preview_body(Some(("ed", 1)))).await;
    assert_eq!(late.status(), StatusCode::CONFLICT);
}

#[tokio::test(start_paused = true)]
async fn result_overtaken_in_flight_is_discarded() {
    let analytics = StubAnalytics::default();
    analytics
        .delays
        .lock()
        .expect("lock")
        .extend([Duration::from_secs(1), Duration::ZERO]);
    let (analytics, app) = setup_with(analytics).await;

    let first = {
        let app = app.clone();
        tokio::spawn(async move { post_json(&app, PREVIEW, &preview_body(Some(("ed", 1)))).await })
    };
    // Past the first request's debounce, while its query is still running.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let second = {
        let app = app.clone();
        tokio::spawn(async move { post_json(&app, PREVIEW, &preview_body(Some(("ed", 2)))).await })
    };

    assert_eq!(first.await.expect("first").status(), StatusCode::CONFLICT);
    assert_eq!(second.await.expect("second").status(), StatusCode::OK);
    assert_eq!(analytics.funnel_calls().len(), 2);
}

#[tokio::test]
async fn overlong_editor_id_is_rejected() {
    let (analytics, app) = setup().await;
    let editor = "e".repeat(129);
    let response = post_json(&app, PREVIEW, &preview_body(Some((&editor, 1)))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(analytics.funnel_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn editor_ids_are_scoped_per_dashboard() {
    let (analytics, app) = setup().await;

    let on_first = {
        let app = app.clone();
        tokio::spawn(async move { post_json(&app, PREVIEW, &preview_body(Some(("ed", 5)))).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let on_second = {
        let app = app.clone();
        tokio::spawn(async move {
            post_json(
                &app,
                "/api/dashboards/dash_2/funnels/preview",
                &preview_body(Some(("ed", 1))),
            )
            .await
        })
    };

    assert_eq!(on_first.await.expect("dash_1").status(), StatusCode::OK);
    assert_eq!(on_second.await.expect("dash_2").status(), StatusCode::OK);
    assert_eq!(analytics.funnel_calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn idle_editor_starts_over_after_ttl() {
    let (analytics, app) = setup().await;

    let response = post_json(&app, PREVIEW, &preview_body(Some(("ed", 7)))).await;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    let late = post_json(&app, PREVIEW, &preview_body(Some(("ed", 3)))).await;
    assert_eq!(late.status(), StatusCode::CONFLICT);

    // A fresh editor session may restart its numbering once the old one has gone idle.
    tokio::time::sleep(Duration::from_secs(11 * 60)).await;
    let restarted = post_json(&app, PREVIEW, &preview_body(Some(("ed", 1)))).await;
    assert_eq!(restarted.status(), StatusCode::OK);
    assert_eq!(analytics.funnel_calls().len(), 2);
}
