use serde_json::{Value, json};

use crate::helpers::{NEWSLETTER, spawn_app};

#[tokio::test]
async fn subscribe_returns_201_and_the_pending_subscriber() {
    let app = spawn_app().await;

    let response = app
        .post_subscription(NEWSLETTER, json!({ "email": "Ursula_Le_Guin@Gmail.com" }))
        .await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "ursula_le_guin@gmail.com");
    assert_eq!(body["newsletter_id"], NEWSLETTER);
    assert_eq!(body["status"], "pending");
    assert!(body["id"].as_str().is_some());

    let sent = app.core.last_confirmation();
    assert_eq!(body["id"], sent.subscriber_id.to_string());
}

#[tokio::test]
async fn subscribe_returns_400_for_invalid_payloads() {
    let app = spawn_app().await;
    let test_cases = vec![
        (json!({}), "missing the email"),
        (json!({ "email": "" }), "empty email"),
        (json!({ "email": "definitely-not-an-email" }), "invalid email"),
        (json!({ "email": "someone@localhost" }), "email without a dotted domain"),
    ];

    for (body, description) in test_cases {
        let response = app.post_subscription(NEWSLETTER, body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not return a 400 Bad Request when the payload was {description}."
        );
    }
    assert!(app.core.store.subscribers().is_empty());
}

#[tokio::test]
async fn subscribe_returns_404_for_an_unknown_newsletter() {
    let app = spawn_app().await;

    let response = app
        .post_subscription("no-such-letter", json!({ "email": "reader@example.com" }))
        .await;

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn subscribing_twice_returns_409() {
    let app = spawn_app().await;
    app.subscribe("reader@example.com").await;

    let response = app
        .post_subscription(NEWSLETTER, json!({ "email": "reader@example.com" }))
        .await;

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn a_failed_dispatch_returns_a_generic_500() {
    let app = spawn_app().await;
    app.core.notifier.fail_dispatch(true);

    let response = app
        .post_subscription(NEWSLETTER, json!({ "email": "reader@example.com" }))
        .await;

    assert_eq!(500, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "internal server error" }));
}

#[tokio::test]
async fn confirm_returns_200_then_409() {
    let app = spawn_app().await;
    let sent = app.subscribe("reader@example.com").await;

    let first = app.get_confirm(sent.confirm_token.as_ref()).await;
    let second = app.get_confirm(sent.confirm_token.as_ref()).await;

    assert_eq!(200, first.status().as_u16());
    assert_eq!(409, second.status().as_u16());
}

#[tokio::test]
async fn confirm_without_a_valid_token_returns_400() {
    let app = spawn_app().await;
    let sent = app.subscribe("reader@example.com").await;

    let missing = app
        .api_client
        .get(format!("{}/subscribers/confirm", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(400, missing.status().as_u16());

    for token in ["abcdefghijklmnopqrstuvwxy", sent.unsubscribe_token.as_ref()] {
        let response = app.get_confirm(token).await;
        assert_eq!(400, response.status().as_u16());
    }
}
