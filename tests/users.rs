use crate::common::{spawn_app, spawn_app_with, Reply};
use serde_json::{json, Value};
use std::time::Duration;

mod common;

#[tokio::test]
async fn user_crud_works() {
    let app = spawn_app().await;

    let user = app.create_user("dora").await;
    assert_eq!(user["username"], "dora");
    assert!(user["createdAt"].is_string());

    let fetched: Value = app
        .get(&format!("/users/{}", user["id"]))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["username"], "dora");

    app.create_user("eve").await;
    let listed: Value = app.get("/users?per_page=1&page=2").await.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["username"], "eve");

    let response = app.delete(&format!("/users/{}", user["id"])).await;
    assert_eq!(204, response.status().as_u16());
    assert_eq!(404, app.get(&format!("/users/{}", user["id"])).await.status().as_u16());
    assert_eq!(404, app.delete(&format!("/users/{}", user["id"])).await.status().as_u16());
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = spawn_app().await;
    app.create_user("frank").await;

    let response = app.post("/users", &json!({ "username": "frank" })).await;

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["statusCode"], 409);
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn username_length_is_checked() {
    let app = spawn_app().await;

    let too_long = "u".repeat(26);
    for username in ["", "   ", too_long.as_str()] {
        let response = app.post("/users", &json!({ "username": username })).await;
        assert_eq!(400, response.status().as_u16(), "username {:?}", username);
    }
    assert_eq!(app.count("users").await, 0);
}

#[tokio::test]
async fn deleting_a_user_keeps_their_quizzes_and_attempts() {
    let app = spawn_app().await;
    let user = app.create_user("grace").await;

    let quiz: Value = app
        .post_quiz(&json!({
            "subject": "Logic",
            "creatorId": user["id"],
            "questionCount": 5,
            "choiceCount": 2
        }))
        .await
        .json()
        .await
        .unwrap();
    let attempt: Value = app
        .post(
            &format!("/quizzes/{}/attempts", quiz["id"]),
            &json!({ "userId": user["id"] }),
        )
        .await
        .json()
        .await
        .unwrap();

    let response = app.delete(&format!("/users/{}", user["id"])).await;
    assert_eq!(204, response.status().as_u16());

    let kept_quiz: Value = app
        .get(&format!("/quizzes/{}", quiz["id"]))
        .await
        .json()
        .await
        .unwrap();
    assert!(kept_quiz["creator"].is_null());
    assert_eq!(kept_quiz["questionCount"], 5);

    let kept_attempt: Value = app
        .get(&format!("/attempts/{}", attempt["id"]))
        .await
        .json()
        .await
        .unwrap();
    assert!(kept_attempt["userId"].is_null());
    assert_eq!(kept_attempt["quizId"], quiz["id"]);
}

#[tokio::test]
async fn creator_deleted_during_generation_is_a_bad_request() {
    let app = spawn_app_with(Reply::Slow(Duration::from_millis(150))).await;
    let user = app.create_user("heidi").await;

    let body = json!({
        "subject": "Topology",
        "creatorId": user["id"],
        "questionCount": 5,
        "choiceCount": 2
    });
    let create = app.post_quiz(&body);
    let remove = async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        app.delete(&format!("/users/{}", user["id"])).await
    };
    let (created, removed) = futures::join!(create, remove);

    assert_eq!(204, removed.status().as_u16());
    assert_eq!(400, created.status().as_u16());
    let body: Value = created.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("creator"));
    assert_eq!(app.count("quizzes").await, 0);
    assert_eq!(app.count("questions").await, 0);
}
