//! End-to-end binding tests through the in-memory router.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tessera::prelude::*;
use tessera_test::TestClient;

#[derive(Debug, Deserialize)]
struct NewItem {
    name: String,
    price: f64,
}

impl JsonSchema for NewItem {
    fn schema() -> Schema {
        Schema::object()
            .required_property("name", Schema::string())
            .required_property("price", Schema::number())
    }

    fn schema_name() -> Option<&'static str> {
        Some("NewItem")
    }
}

type Log = Arc<Mutex<Vec<String>>>;

fn scoped(name: &'static str, log: &Log) -> Dependency {
    let acquire_log = Arc::clone(log);
    let release_log = Arc::clone(log);
    Dependency::scoped(
        move || {
            let log = Arc::clone(&acquire_log);
            async move {
                log.lock().unwrap().push(format!("acquire {name}"));
                Ok::<_, anyhow::Error>(name.to_string())
            }
        },
        move |_value: Arc<String>| {
            let log = Arc::clone(&release_log);
            async move {
                log.lock().unwrap().push(format!("release {name}"));
                Ok(())
            }
        },
    )
    .named(name)
}

fn items_app() -> App {
    let mut app = App::new().title("Inventory");
    app.get(
        "/items/{id}",
        Signature::new("read_item")
            .param(Param::typed::<i64>("id"))
            .param(Param::scalar("q", ScalarType::String).optional()),
        |args: BoundArgs| async move {
            Ok(json!({
                "id": args.get::<i64>("id")?,
                "q": args.get_opt::<String>("q")?,
            }))
        },
    )
    .unwrap();
    app.post(
        "/items",
        Signature::new("create_item").param(Param::body::<NewItem>("item")),
        |args: BoundArgs| async move {
            let item = args.body::<NewItem>("item")?;
            Ok(Response::json(
                StatusCode::CREATED,
                json!({ "name": item.name, "price": item.price }),
            ))
        },
    )
    .unwrap();
    app
}

#[tokio::test]
async fn test_path_and_query_are_bound() {
    let client = TestClient::new(items_app().into_router().unwrap());

    client
        .get("/items/42")
        .query("q", "shoe")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_eq(&json!({ "id": 42, "q": "shoe" }));

    client
        .get("/items/42")
        .send()
        .await
        .assert_json_eq(&json!({ "id": 42, "q": null }));

    client
        .get("/items/%34%32")
        .send()
        .await
        .assert_json_field("id", &json!(42));

    client
        .get("/items/abc")
        .send()
        .await
        .assert_error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid path: id");
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let client = TestClient::new(items_app().into_router().unwrap());

    client
        .post("/items")
        .json(&json!({ "name": "shoe", "price": 9.5 }))
        .send()
        .await
        .assert_status(StatusCode::CREATED)
        .assert_json_field("name", &json!("shoe"));

    let response = client.post("/items").body("{\"name\": ").send().await;
    response.assert_error(StatusCode::UNPROCESSABLE_ENTITY, "Validation Error");
    assert!(response.body()["detail"].is_string());

    client
        .post("/items")
        .send()
        .await
        .assert_error(StatusCode::UNPROCESSABLE_ENTITY, "Validation Error");
}

#[tokio::test]
async fn test_scoped_teardown_runs_once_after_handler_error() {
    let log: Log = Arc::default();

    let mut app = App::new();
    app.get(
        "/orders",
        Signature::new("list_orders").param(Param::depends("db", scoped("db", &log))),
        |_args: BoundArgs| async { Err::<(), _>(anyhow::anyhow!("query failed")) },
    )
    .unwrap();
    let client = TestClient::new(app.into_router().unwrap());

    client
        .get("/orders")
        .send()
        .await
        .assert_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");

    assert_eq!(*log.lock().unwrap(), vec!["acquire db", "release db"]);
}

#[tokio::test]
async fn test_teardowns_run_in_reverse_order_even_when_a_dependency_fails() {
    let log: Log = Arc::default();
    let denied = Dependency::sync(|| Err::<i64, _>(HttpError::forbidden("no access").into()));

    let mut app = App::new();
    app.get(
        "/report",
        Signature::new("report")
            .param(Param::depends("db", scoped("db", &log)))
            .param(Param::depends("cache", scoped("cache", &log)))
            .param(Param::depends("user", denied)),
        |_args: BoundArgs| async { Ok(()) },
    )
    .unwrap();
    app.get(
        "/ok",
        Signature::new("ok")
            .param(Param::depends("db", scoped("db", &log)))
            .param(Param::depends("cache", scoped("cache", &log))),
        |args: BoundArgs| async move { Ok(json!(args.dependency::<String>("cache")?.as_str())) },
    )
    .unwrap();
    let client = TestClient::new(app.into_router().unwrap());

    client
        .get("/report")
        .send()
        .await
        .assert_error(StatusCode::FORBIDDEN, "no access");
    assert_eq!(
        *log.lock().unwrap(),
        vec!["acquire db", "acquire cache", "release cache", "release db"]
    );

    log.lock().unwrap().clear();
    client.get("/ok").send().await.assert_json_eq(&json!("cache"));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["acquire db", "acquire cache", "release cache", "release db"]
    );
}

#[tokio::test]
async fn test_missing_query_never_calls_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut app = App::new();
    app.get(
        "/search",
        Signature::new("search").param(Param::typed::<String>("q")),
        move |_args: BoundArgs| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        },
    )
    .unwrap();
    let client = TestClient::new(app.into_router().unwrap());

    client
        .get("/search")
        .send()
        .await
        .assert_error(StatusCode::BAD_REQUEST, "Missing query: q");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_background_tasks_run_in_order_after_response() {
    let log: Log = Arc::default();
    let handler_log = Arc::clone(&log);

    let mut app = App::new();
    app.post(
        "/signup",
        Signature::new("signup")
            .param(Param::typed::<String>("email"))
            .param(Param::background_tasks("tasks")),
        move |args: BoundArgs| {
            let log = Arc::clone(&handler_log);
            async move {
                let email = args.get::<String>("email")?;
                let tasks = args.background_tasks("tasks")?;

                let first = Arc::clone(&log);
                let to = email.clone();
                tasks.add_task(move || {
                    first.lock().unwrap().push(format!("welcome {to}"));
                    Ok(())
                });

                let second = Arc::clone(&log);
                tasks.add_async_task(move || async move {
                    second.lock().unwrap().push(format!("audit {email}"));
                    Ok(())
                });

                log.lock().unwrap().push("handler".to_string());
                Ok(json!({ "queued": tasks.len() }))
            }
        },
    )
    .unwrap();
    app.post(
        "/quiet",
        Signature::new("quiet").param(Param::background_tasks("tasks")),
        |_args: BoundArgs| async { Ok(()) },
    )
    .unwrap();
    let client = TestClient::new(app.into_router().unwrap());

    client
        .post("/signup")
        .query("email", "a@b.c")
        .send()
        .await
        .assert_json_eq(&json!({ "queued": 2 }))
        .assert_post_send(true);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["handler", "welcome a@b.c", "audit a@b.c"]
    );

    client.post("/quiet").send().await.assert_post_send(false);
}

#[tokio::test]
async fn test_boolean_query_never_fails() {
    let mut app = App::new();
    app.get(
        "/flags",
        Signature::new("flags").param(Param::scalar("on", ScalarType::Boolean).with_default(false)),
        |args: BoundArgs| async move { Ok(json!(args.get::<bool>("on")?)) },
    )
    .unwrap();
    let client = TestClient::new(app.into_router().unwrap());

    for (raw, expected) in [("true", true), ("TRUE", true), ("1", false), ("yes", false)] {
        client
            .get("/flags")
            .query("on", raw)
            .send()
            .await
            .assert_status(StatusCode::OK)
            .assert_json_eq(&json!(expected));
    }
    client.get("/flags").send().await.assert_json_eq(&json!(false));
}

#[test]
fn test_path_param_mismatch_fails_registration() {
    let mut app = App::new();
    let err = app
        .get(
            "/items/{id}",
            Signature::new("read_item").param(Param::typed::<i64>("item_id")),
            |_args: BoundArgs| async { Ok(()) },
        )
        .err()
        .unwrap();

    assert_eq!(
        err,
        ConfigurationError::PathParamMismatch {
            route: "read_item".to_string(),
            missing: vec!["id".to_string()],
            unexpected: vec!["item_id".to_string()],
        }
    );
}

#[tokio::test]
async fn test_schema_is_stable_and_served() {
    let app = items_app();
    let first = app.openapi().unwrap().to_value().unwrap();
    let second = app.openapi().unwrap().to_value().unwrap();
    assert_eq!(first, second);

    assert_eq!(first["openapi"], "3.0.3");
    assert_eq!(first["info"], json!({ "title": "Inventory", "version": "1.0.0" }));

    let read = &first["paths"]["/items/{id}"]["get"];
    assert_eq!(read["summary"], "Read Item");
    assert_eq!(read["operationId"], "read_item");
    assert_eq!(
        read["parameters"],
        json!([
            { "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } },
            { "name": "q", "in": "query", "required": false, "schema": { "type": "string" } },
        ])
    );

    let create = &first["paths"]["/items"]["post"];
    assert_eq!(
        create["requestBody"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/NewItem"
    );
    assert!(first["components"]["schemas"]["NewItem"].is_object());

    let client = TestClient::new(app.into_router().unwrap());
    let served = client.get("/openapi.json").send().await;
    served.assert_status(StatusCode::OK).assert_json_eq(&first);
}
