use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use engine::Engine;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use server::{ServerState, router};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    engine: Arc<Engine>,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Arc::new(Engine::builder().database(db).build().await.unwrap());
        let router = router(ServerState {
            engine: engine.clone(),
        });
        Self { router, engine }
    }

    async fn user(&self, email: &str) -> String {
        self.engine.create_user(email, email).await.unwrap().1
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), &[], None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), &[], Some(body))
            .await
    }

    async fn create_household(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post("/households", token, json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }
}

fn encode_component(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect()
}

#[tokio::test]
async fn requests_without_valid_token_are_unauthorized() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(Method::GET, "/households", None, &[], None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/households", "hl_unknown").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app
        .send(
            Method::GET,
            "/households",
            None,
            &[("authorization", "Basic YWxpY2U6c2VjcmV0")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_endpoints() {
    let app = TestApp::new().await;
    let token = app.user("alice@example.com").await;

    let (status, body) = app.get("/users/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");

    let (status, body) = app
        .send(
            Method::PATCH,
            "/users/me",
            Some(&token),
            &[],
            Some(json!({ "display_name": "Alice" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "Alice");

    app.create_household(&token, "Home").await;
    let (status, body) = app.get("/users/me/households", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["households"][0]["role"], "owner");
}

#[tokio::test]
async fn household_crud_and_non_member_denied() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let mallory = app.user("mallory@example.com").await;

    let (status, body) = app
        .post(
            "/households",
            &alice,
            json!({ "name": "Home", "currency": "CHF", "settings": { "locale": "de-CH" } }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["currency"], "CHF");
    assert_eq!(body["role"], "owner");
    assert_eq!(body["settings"]["locale"], "de-CH");
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = app.get(&format!("/households/{id}"), &mallory).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/households/{id}"),
            Some(&alice),
            &[],
            Some(json!({ "name": "Casa" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/households", &alice, json!({ "name": "Bad", "settings": [1] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/households/{id}"),
            Some(&alice),
            &[],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/households/{id}"), &alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_input_is_a_json_bad_request() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;

    for payload in [
        json!({}),
        json!({ "name": 5 }),
        json!({ "name": "Home", "currency": "XYZ" }),
    ] {
        let (status, body) = app.post("/households", &alice, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    let (status, body) = app.get("/receipts?limit=abc", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.get("/households/not-a-uuid", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app
        .send(
            Method::POST,
            "/households",
            Some(&alice),
            &[("content-type", "application/json")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let id = app.create_household(&alice, "Home").await;

    let (status, body) = app
        .post(
            &format!("/households/{id}/categories"),
            &alice,
            json!({ "name": "Food", "color": "#00ff00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["color"], "#00FF00");

    let missing = uuid::Uuid::new_v4();
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/households/{id}/categories/{missing}"),
            Some(&alice),
            &[],
            Some(json!({ "name": "Groceries" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            &format!("/households/{id}/categories"),
            &alice,
            json!({ "name": " food " }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invitation_flow_over_http() {
    let app = TestApp::new().await;
    let u1 = app.user("u1@example.com").await;
    let u2 = app.user("u2@example.com").await;
    let id = app.create_household(&u1, "Flat").await;

    let (status, invitation) = app
        .post(
            "/invitations",
            &u1,
            json!({ "household_id": id, "email": "u2@example.com", "role": "member" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let invitation_id = invitation["id"].as_str().unwrap().to_string();

    let (status, body) = app.get("/users/me/invitations", &u2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invitations"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .post(&format!("/invitations/{invitation_id}/accept"), &u2, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);

    let (status, _) = app
        .post(&format!("/invitations/{invitation_id}/accept"), &u2, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/invitations",
            &u2,
            json!({ "household_id": id, "email": "u3@example.com", "role": "viewer" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, members) = app.get(&format!("/households/{id}/members"), &u1).await;
    let u2_id = members["members"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["email"] == "u2@example.com")
        .map(|m| m["user_id"].as_str().unwrap().to_string())
        .unwrap();

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/households/{id}/members/{u2_id}"),
            Some(&u1),
            &[],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .post(&format!("/households/{id}/leave"), &u1, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn transactions_and_receipts() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let home = app.create_household(&alice, "Home").await;
    let office = app.create_household(&alice, "Office").await;

    for (household, amount) in [(&home, 1200), (&home, 800), (&office, 500)] {
        let (status, _) = app
            .post(
                "/receipts",
                &alice,
                json!({
                    "household_id": household,
                    "amount_minor": amount,
                    "occurred_at": "2025-05-02T09:30:00+02:00",
                    "merchant": "Bakery",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, income) = app
        .post(
            &format!("/households/{home}/transactions"),
            &alice,
            json!({
                "kind": "income",
                "amount_minor": 300000,
                "occurred_at": "2025-05-01T08:00:00Z",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(income["kind"], "income");

    let (status, body) = app
        .get(
            &format!("/households/{home}/transactions?limit=2&kind=expense"),
            &alice,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);
    assert!(body["next_cursor"].is_null());

    let (status, body) = app.get("/receipts", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 3);

    let (status, body) = app
        .send(
            Method::GET,
            "/receipts",
            Some(&alice),
            &[("x-household-ids", office.as_str())],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(
            Method::GET,
            "/receipts",
            Some(&alice),
            &[("x-household-ids", "nope")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app
        .get(&format!("/households/{home}/reports/summary"), &alice)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_income_minor"], 300000);
    assert_eq!(body["total_expenses_minor"], 2000);
    assert_eq!(body["net_minor"], 298000);
}

#[tokio::test]
async fn budgets_over_http() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;
    let home = app.create_household(&alice, "Home").await;

    let (status, budget) = app
        .post(
            "/budgets",
            &alice,
            json!({
                "household_id": home,
                "name": "Everything",
                "amount_minor": 10000,
                "period": "monthly",
                "start_date": "2025-01-01",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let budget_id = budget["id"].as_str().unwrap().to_string();

    app.post(
        "/receipts",
        &alice,
        json!({
            "household_id": home,
            "amount_minor": 2500,
            "occurred_at": "2025-03-10T12:00:00Z",
        }),
    )
    .await;

    let (status, progress) = app
        .get(&format!("/budgets/{budget_id}/progress?at=2025-03-15"), &alice)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["window_start"], "2025-03-01");
    assert_eq!(progress["spent_minor"], 2500);
    assert_eq!(progress["percentage"], 25.0);

    let (status, body) = app
        .get(&format!("/budgets?household_id={home}"), &alice)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["budgets"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .post(
            "/budgets",
            &alice,
            json!({
                "household_id": home,
                "name": "Trip",
                "amount_minor": 10000,
                "period": "custom",
                "start_date": "2025-01-01",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rpc_router() {
    let app = TestApp::new().await;
    let alice = app.user("alice@example.com").await;

    let (status, body) = app
        .post("/trpc/households.create", &alice, json!({ "name": "Home" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["result"]["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.get("/trpc/households.list", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["households"][0]["name"], "Home");

    let input = encode_component(&json!({ "household_id": id }).to_string());
    let (status, body) = app
        .get(&format!("/trpc/households.get?input={input}"), &alice)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["role"], "owner");

    let (status, body) = app
        .post(
            "/trpc/transactions.create",
            &alice,
            json!({
                "household_id": id,
                "kind": "expense",
                "amount_minor": 450,
                "occurred_at": "2025-02-01T10:00:00Z",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["amount_minor"], 450);

    let input = encode_component(&json!({ "household_id": id, "limit": 10 }).to_string());
    let (status, body) = app
        .get(&format!("/trpc/transactions.list?input={input}"), &alice)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["result"]["data"]["transactions"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    let (status, body) = app.get("/trpc/nope.nothing", &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = app.get("/trpc/households.create", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = app
        .post("/trpc/categories.create", &alice, json!({ "name": "Food" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = app
        .send(Method::GET, "/trpc/households.list", None, &[], None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let bob = app.user("bob@example.com").await;
    let input = encode_component(&json!({ "household_id": id }).to_string());
    let (status, body) = app
        .get(&format!("/trpc/categories.list?input={input}"), &bob)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}
