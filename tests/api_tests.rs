use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use inventario::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A single pooled connection keeps the in-memory database alive and
    // shared across requests.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    // Cheap Argon2 params to keep the test suite fast.
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = inventario::api::create_app_state(config)
        .await
        .expect("Failed to create app state");
    inventario::api::router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}

/// Register the default test user and return a fresh access token.
async fn auth_token(app: &Router) -> String {
    let credentials = json!({"username": "testuser", "password": "password"});

    let (status, _) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(credentials.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(app, Method::POST, "/auth/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);

    body["access_token"].as_str().unwrap().to_string()
}

async fn create_device(app: &Router, token: &str, payload: Value) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/dispositivos",
        Some(token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_health_check_probes_database() {
    let app = spawn_app().await;

    let (status, body) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Dispositivos"));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = spawn_app().await;

    let (status, _) = send(&app, Method::GET, "/categorias", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::GET,
        "/dispositivos",
        Some("not-a-real-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_aggregates_field_errors() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"username": "ab", "password": "short"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["username"].is_string());
    assert!(body["errors"]["password"].is_string());
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let app = spawn_app().await;
    let _token = auth_token(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"username": "testuser", "password": "password"})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["msg"].as_str().unwrap().contains("usuário"));
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = spawn_app().await;
    let _token = auth_token(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"username": "testuser", "password": "wrong-password"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Credenciais inválidas");
}

#[tokio::test]
async fn test_end_to_end_inventory_flow() {
    let app = spawn_app().await;
    let token = auth_token(&app).await;

    let (status, categoria) = send(
        &app,
        Method::POST,
        "/categorias",
        Some(&token),
        Some(json!({"nome": "Servidores"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(categoria["id"], 1);
    assert_eq!(categoria["nome"], "Servidores");

    let dispositivo = create_device(
        &app,
        &token,
        json!({"nome": "Server 01", "serial": "SRV-001", "categoria_id": 1}),
    )
    .await;
    assert_eq!(dispositivo["status"], "ativo");
    assert_eq!(dispositivo["categoria_nome"], "Servidores");

    // Delete is blocked while a device still references the category.
    let (status, body) = send(&app, Method::DELETE, "/categorias/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["msg"].as_str().unwrap().contains("vinculados"));

    // A second device with the same serial is rejected.
    let (status, _) = send(
        &app,
        Method::POST,
        "/dispositivos",
        Some(&token),
        Some(json!({"nome": "Server 02", "serial": "SRV-001"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Removing the device first unblocks the category delete.
    let device_id = dispositivo["id"].as_i64().unwrap();
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/dispositivos/{device_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, "/categorias/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/categorias/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "Categoria 1 não encontrada");
}

#[tokio::test]
async fn test_categoria_crud() {
    let app = spawn_app().await;
    let token = auth_token(&app).await;

    for nome in ["Roteadores", "Switches"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/categorias",
            Some(&token),
            Some(json!({"nome": nome, "descricao": "rede"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = send(
        &app,
        Method::POST,
        "/categorias",
        Some(&token),
        Some(json!({"nome": "Roteadores"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::GET, "/categorias", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Renaming over another category's name is a conflict.
    let (status, _) = send(
        &app,
        Method::PATCH,
        "/categorias/2",
        Some(&token),
        Some(json!({"nome": "Roteadores"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Re-submitting the current name is not a collision with itself.
    let (status, _) = send(
        &app,
        Method::PUT,
        "/categorias/2",
        Some(&token),
        Some(json!({"nome": "Switches", "descricao": "core"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // An explicit null clears descricao.
    let (status, body) = send(
        &app,
        Method::PATCH,
        "/categorias/2",
        Some(&token),
        Some(json!({"descricao": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["descricao"].is_null());
    assert_eq!(body["nome"], "Switches");
}

#[tokio::test]
async fn test_device_partial_update_null_clearing() {
    let app = spawn_app().await;
    let token = auth_token(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/categorias",
        Some(&token),
        Some(json!({"nome": "Impressoras"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let device = create_device(
        &app,
        &token,
        json!({"nome": "HP LaserJet", "serial": "PRN-001", "categoria_id": 1}),
    )
    .await;
    let id = device["id"].as_i64().unwrap();

    // Omitting categoria_id leaves the link unchanged.
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/dispositivos/{id}"),
        Some(&token),
        Some(json!({"nome": "HP LaserJet Pro"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categoria_id"], 1);
    assert_eq!(body["categoria_nome"], "Impressoras");

    // An explicit null clears it.
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/dispositivos/{id}"),
        Some(&token),
        Some(json!({"categoria_id": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["categoria_id"].is_null());
    assert!(body["categoria_nome"].is_null());
}

#[tokio::test]
async fn test_device_update_business_rules() {
    let app = spawn_app().await;
    let token = auth_token(&app).await;

    create_device(&app, &token, json!({"nome": "A", "serial": "SN-A"})).await;
    let device_b = create_device(&app, &token, json!({"nome": "B", "serial": "SN-B"})).await;
    let id = device_b["id"].as_i64().unwrap();

    // Taking another device's serial is a conflict.
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/dispositivos/{id}"),
        Some(&token),
        Some(json!({"serial": "SN-A"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Keeping the current serial is fine.
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/dispositivos/{id}"),
        Some(&token),
        Some(json!({"serial": "SN-B", "status": "inativo"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Linking to a category that does not exist is rejected.
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/dispositivos/{id}"),
        Some(&token),
        Some(json!({"categoria_id": 999})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["msg"].as_str().unwrap().contains("Categoria_id"));

    // A status outside the enum is a validation error on writes.
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/dispositivos/{id}"),
        Some(&token),
        Some(json!({"status": "quebrado"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["status"].is_string());

    let (status, body) = send(&app, Method::GET, "/dispositivos/9999", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "Dispositivo 9999 não encontrado");
}

#[tokio::test]
async fn test_concurrent_duplicate_serial_creates() {
    let app = spawn_app().await;
    let token = auth_token(&app).await;

    // Two identical creates racing: whichever ordering the scheduler
    // produces, the loser must see a conflict, never a server error.
    let payload = json!({"nome": "Gemeo", "serial": "SN-RACE"});
    let (first, second) = tokio::join!(
        send(
            &app,
            Method::POST,
            "/dispositivos",
            Some(&token),
            Some(payload.clone()),
        ),
        send(
            &app,
            Method::POST,
            "/dispositivos",
            Some(&token),
            Some(payload),
        ),
    );

    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let (_, body) = send(&app, Method::GET, "/dispositivos", Some(&token), None).await;
    assert_eq!(body["pagination"]["total_records"], 1);
}

#[tokio::test]
async fn test_device_list_pagination_boundaries() {
    let app = spawn_app().await;
    let token = auth_token(&app).await;

    create_device(&app, &token, json!({"nome": "A", "serial": "SN-A"})).await;
    create_device(&app, &token, json!({"nome": "B", "serial": "SN-B"})).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/dispositivos?page=9999&limit=10",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total_records"], 2);
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert_eq!(body["pagination"]["current_page"], 9999);
    assert_eq!(body["pagination"]["limit"], 10);

    let (status, body) = send(
        &app,
        Method::GET,
        "/dispositivos?page=2&limit=1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total_pages"], 2);
}

#[tokio::test]
async fn test_device_list_filters_and_search() {
    let app = spawn_app().await;
    let token = auth_token(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/categorias",
        Some(&token),
        Some(json!({"nome": "Servidores"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    create_device(
        &app,
        &token,
        json!({"nome": "Server 01", "serial": "SRV-001", "categoria_id": 1}),
    )
    .await;
    create_device(
        &app,
        &token,
        json!({"nome": "Notebook 01", "serial": "NTB-001", "status": "inativo"}),
    )
    .await;

    // Unknown status values are ignored, not an error.
    let (status, body) = send(
        &app,
        Method::GET,
        "/dispositivos?status=foo",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_records"], 2);

    let (_, body) = send(
        &app,
        Method::GET,
        "/dispositivos?status=inativo",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["pagination"]["total_records"], 1);
    assert_eq!(body["items"][0]["serial"], "NTB-001");

    let (_, body) = send(
        &app,
        Method::GET,
        "/dispositivos?categoria_id=1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["pagination"]["total_records"], 1);
    assert_eq!(body["items"][0]["nome"], "Server 01");

    // Case-insensitive substring match over nome and serial.
    let (_, body) = send(
        &app,
        Method::GET,
        "/dispositivos?busca=srv",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["pagination"]["total_records"], 1);
    assert_eq!(body["items"][0]["serial"], "SRV-001");

    let (_, body) = send(
        &app,
        Method::GET,
        "/dispositivos?busca=01",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["pagination"]["total_records"], 2);
}

#[tokio::test]
async fn test_device_list_sort_fallback() {
    let app = spawn_app().await;
    let token = auth_token(&app).await;

    create_device(&app, &token, json!({"nome": "Zebra", "serial": "SN-1"})).await;
    create_device(&app, &token, json!({"nome": "Alpha", "serial": "SN-2"})).await;

    let (_, body) = send(
        &app,
        Method::GET,
        "/dispositivos?sort=nome",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["items"][0]["nome"], "Alpha");

    let (_, body) = send(
        &app,
        Method::GET,
        "/dispositivos?sort=nome&order=DESC",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["items"][0]["nome"], "Zebra");

    // Unrecognized sort fields fall back to id ascending.
    let (status, body) = send(
        &app,
        Method::GET,
        "/dispositivos?sort=nonexistent_field",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["nome"], "Zebra");

    // Anything that is not "desc" sorts ascending.
    let (_, body) = send(
        &app,
        Method::GET,
        "/dispositivos?sort=nome&order=sideways",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["items"][0]["nome"], "Alpha");
}

#[tokio::test]
async fn test_unknown_payload_fields_discarded() {
    let app = spawn_app().await;
    let token = auth_token(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/categorias",
        Some(&token),
        Some(json!({"nome": "Racks", "cor": "azul"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.get("cor").is_none());
}
