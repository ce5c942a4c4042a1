use quizdeck::{build_state, config::Config, routes::build_router};
use serde_json::{json, Value};

async fn spawn_server(config: Config) -> (String, reqwest::Client) {
    let state = build_state(&config).await;
    let app = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), reqwest::Client::new())
}

fn sqlite_config() -> Config {
    Config {
        database_url: Some("sqlite::memory:".into()),
        db_max_connections: 1,
        ..Config::default()
    }
}

fn sample_quiz_payload() -> Value {
    json!({
        "title": "Warm-up",
        "brief": "A bit of everything",
        "category": "general",
        "shuffle": false,
        "questions": [
            {
                "index": 1,
                "type": "si",
                "content": "2+2=?",
                "options": ["3", "4", "5"],
                "answer": ["4"]
            },
            {
                "index": 2,
                "type": "mu",
                "content": "Pick the even numbers",
                "options": ["1", "2", "3", "4"],
                "answer": ["2", "4"]
            },
            {
                "index": 3,
                "type": "ma",
                "content": "Match the capitals",
                "options": ["France", "Italy"],
                "matchings": ["Paris", "Rome"],
                "answer": ["France", "Italy"]
            },
            {
                "index": "4",
                "type": "fi",
                "content": "Water boils at ___ degrees",
                "options": [],
                "answer": ["100"]
            }
        ]
    })
}

async fn create(base: &str, client: &reqwest::Client, payload: &Value) -> i64 {
    let resp = client
        .post(format!("{}/api/v1/quizzes", base))
        .json(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    resp.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
}

#[tokio::test]
async fn create_read_update_delete_flow() {
    for config in [Config::default(), sqlite_config()] {
        let (base, client) = spawn_server(config).await;
        let quiz_id = create(&base, &client, &sample_quiz_payload()).await;

        let taking = client
            .get(format!("{}/api/v1/quizzes/{}", base, quiz_id))
            .send()
            .await
            .unwrap();
        assert_eq!(taking.status(), 200);
        let taking = taking.json::<Value>().await.unwrap();
        assert_eq!(
            taking["questions"][0],
            json!({"index": 1, "type": "si", "content": "2+2=?", "options": ["3", "4", "5"]})
        );
        assert_eq!(taking["questions"][2]["matchings"], json!(["Paris", "Rome"]));
        assert!(taking["questions"][1].get("matchings").is_none());

        let review = client
            .get(format!("{}/api/v1/quizzes/{}?mode=review", base, quiz_id))
            .send()
            .await
            .unwrap()
            .json::<Value>()
            .await
            .unwrap();
        assert_eq!(review["questions"][0]["answer"], json!(["4"]));
        assert_eq!(review["questions"][3]["index"], json!(4));

        let updated = client
            .put(format!("{}/api/v1/quizzes/{}", base, quiz_id))
            .json(&json!({
                "shuffle": true,
                "questions": [
                    {"index": 1, "type": "si", "content": "3+3=?", "options": ["6", "7"], "answer": ["6"]}
                ]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(updated.status(), 200);
        let updated = updated.json::<Value>().await.unwrap();
        assert_eq!(updated["title"], "Warm-up");
        assert_eq!(updated["shuffle"], true);
        assert_eq!(updated["questions"].as_array().unwrap().len(), 1);

        let list = client
            .get(format!("{}/api/v1/quizzes?category=general", base))
            .send()
            .await
            .unwrap()
            .json::<Value>()
            .await
            .unwrap();
        assert_eq!(list["total"], 1);
        assert_eq!(list["items"][0]["question_count"], 1);
        assert!(list["items"][0].get("shuffle").is_none());

        let deleted = client
            .delete(format!("{}/api/v1/quizzes/{}", base, quiz_id))
            .send()
            .await
            .unwrap();
        assert_eq!(deleted.status(), 204);

        let missing = client
            .get(format!("{}/api/v1/quizzes/{}", base, quiz_id))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);
        assert_eq!(missing.json::<Value>().await.unwrap()["error"]["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn invalid_questions_return_field_keyed_errors() {
    let (base, client) = spawn_server(Config::default()).await;
    let mut payload = sample_quiz_payload();
    payload["questions"][0]["answer"] = json!(["4", "5"]);
    payload["questions"][2]["matchings"] = json!(["Paris", "Rome", "Madrid"]);

    let resp = client
        .post(format!("{}/api/v1/quizzes", base))
        .header("x-request-id", "req-42")
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body = resp.json::<Value>().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["request_id"], "req-42");
    let details = body["error"]["details"].as_array().unwrap();
    assert!(details
        .iter()
        .any(|d| d["field"] == "answer" && d["question_index"] == "1"));
    assert!(details
        .iter()
        .any(|d| d["field"] == "options, matchings, answer" && d["question_index"] == "3"));

    let list = client
        .get(format!("{}/api/v1/quizzes", base))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn rejected_update_keeps_stored_questions() {
    let (base, client) = spawn_server(sqlite_config()).await;
    let quiz_id = create(&base, &client, &sample_quiz_payload()).await;

    let mut payload = sample_quiz_payload();
    payload["title"] = json!("Changed");
    payload["questions"][1]["answer"] = json!(["7"]);
    let resp = client
        .put(format!("{}/api/v1/quizzes/{}", base, quiz_id))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let review = client
        .get(format!("{}/api/v1/quizzes/{}?mode=review", base, quiz_id))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(review["title"], "Warm-up");
    assert_eq!(review["questions"].as_array().unwrap().len(), 4);
    assert_eq!(review["questions"][1]["answer"], json!(["2", "4"]));
}

#[tokio::test]
async fn validate_endpoint_previews_single_question() {
    let (base, client) = spawn_server(Config::default()).await;

    let ok = client
        .post(format!("{}/api/v1/questions/validate", base))
        .json(&json!({"index": 1, "type": "si", "content": "2+2=?", "options": ["3", "4", "5"], "answer": ["4"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);
    assert_eq!(ok.json::<Value>().await.unwrap()["answer"], json!(["4"]));

    let unknown = client
        .post(format!("{}/api/v1/questions/validate", base))
        .json(&json!({"index": 1, "type": "essay", "content": "Explain", "options": [], "answer": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 400);
    let body = unknown.json::<Value>().await.unwrap();
    assert_eq!(body["error"]["details"][0]["code"], "UNKNOWN_TYPE");
}

#[tokio::test]
async fn mistyped_bodies_get_the_error_envelope() {
    let (base, client) = spawn_server(Config::default()).await;

    let mut cases = Vec::new();
    let mut payload = sample_quiz_payload();
    payload["shuffle"] = json!("yes");
    cases.push((payload, "shuffle"));
    let mut payload = sample_quiz_payload();
    payload["questions"] = json!("not a list");
    cases.push((payload, "questions"));
    let mut payload = sample_quiz_payload();
    payload["title"] = json!(5);
    cases.push((payload, "title"));

    for (payload, field) in cases {
        let resp = client
            .post(format!("{}/api/v1/quizzes", base))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body = resp.json::<Value>().await.unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        let details = body["error"]["details"].as_array().unwrap();
        assert!(details
            .iter()
            .any(|d| d["field"] == field && d["code"] == "WRONG_SHAPE"));
    }

    for path in ["/api/v1/quizzes", "/api/v1/questions/validate"] {
        let resp = client
            .post(format!("{}{}", base, path))
            .header("content-type", "application/json")
            .header("x-request-id", "req-bad-json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body = resp.json::<Value>().await.unwrap();
        assert_eq!(body["error"]["request_id"], "req-bad-json");
        assert_eq!(body["error"]["details"][0]["field"], "body");
        assert_eq!(body["error"]["details"][0]["code"], "WRONG_SHAPE");
    }

    let list = client
        .get(format!("{}/api/v1/quizzes", base))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(list["total"], 0);
}
