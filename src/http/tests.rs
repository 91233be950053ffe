use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{cors_layer, router, AppState};
use crate::services::fixtures::{harness, Harness};

const BOUNDARY: &str = "marketplace-test-boundary";

fn app(h: &Harness) -> Router {
    let state = AppState { services: h.services.clone(), tokens: h.tokens.clone(), media: h.media.clone() };
    router(state, cors_layer(None))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder().uri(uri).header(header::AUTHORIZATION, format!("Bearer {}", token)).body(Body::empty()).unwrap()
}

/// `fields` are text parts; `image` is `(content type, bytes)`.
fn multipart_request(method: Method, uri: &str, token: &str, fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes());
    }
    if let Some((content_type, bytes)) = image {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"pic\"\r\nContent-Type: {content_type}\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn register(app: &Router, username: &str, role: &str) -> (String, i64) {
    let (status, body) = send(
        app,
        json_request(Method::POST, "/api/users/register", None, json!({"username": username, "password": "secret1", "role": role})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (body["accessToken"].as_str().unwrap().to_string(), body["user"]["id"].as_i64().unwrap())
}

async fn add_product(app: &Router, token: &str, name: &str, price: &str) -> Value {
    let request = multipart_request(
        Method::POST, "/api/seller/add-product", token,
        &[("name", name), ("description", "Handmade"), ("price", price)], Some(("image/png", b"\x89PNG bytes")),
    );
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["product"].clone()
}

#[tokio::test]
async fn test_health() {
    let h = harness();
    let (status, body) = send(&app(&h), Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let h = harness();
    let app = app(&h);
    let (status, body) = send(&app, Request::builder().uri("/api/customer/cart").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");

    let (status, _) = send(&app, get("/api/customer/cart", "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dashboard_echoes_caller() {
    let h = harness();
    let app = app(&h);
    let (status, _) = send(&app, Request::builder().uri("/api/dashboard").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (token, id) = register(&app, "dora", "seller").await;
    let (status, body) = send(&app, get("/api/dashboard", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "You have access to this route!");
    assert_eq!(body["user"], json!({"id": id, "username": "dora", "role": "seller"}));
}

#[tokio::test]
async fn test_checkout_flow_over_http() {
    let h = harness();
    let app = app(&h);
    let (seller, _) = register(&app, "maker", "seller").await;
    let (customer, _) = register(&app, "buyer", "customer").await;
    let product = add_product(&app, &seller, "Notebook", "9.99").await;
    let product_id = product["id"].as_i64().unwrap();
    assert!(product["image"].as_str().unwrap().starts_with("/media/"));

    let add = |qty: i64| json_request(Method::POST, "/api/customer/cart", Some(&customer), json!({"productId": product_id, "quantity": qty}));
    let (status, body) = send(&app, add(1)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["cart"][0]["quantity"], 1);
    let (status, body) = send(&app, add(2)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"].as_array().unwrap().len(), 1);
    assert_eq!(body["cart"][0]["quantity"], 3);

    let (status, body) = send(&app, json_request(Method::POST, "/api/customer/buy", Some(&customer), json!({}))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["order"]["totalPrice"].as_f64(), Some(29.97));
    assert_eq!(body["order"]["items"][0]["productName"], "Notebook");

    let (status, body) = send(&app, get("/api/customer/cart", &customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"], json!([]));

    let (status, body) = send(&app, get("/api/customer/orders", &customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, json_request(Method::POST, "/api/customer/buy", Some(&customer), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "cart is empty");
}

#[tokio::test]
async fn test_role_and_ownership_gates() {
    let h = harness();
    let app = app(&h);
    let (seller, seller_id) = register(&app, "maker", "seller").await;
    let (rival, _) = register(&app, "rival", "seller").await;
    let (alice, _) = register(&app, "alice", "customer").await;
    let (bob, _) = register(&app, "bob", "customer").await;
    let product = add_product(&app, &seller, "Vase", "20").await;
    let product_id = product["id"].as_i64().unwrap();

    let (status, _) = send(&app, multipart_request(Method::POST, "/api/seller/add-product", &alice, &[("name", "x"), ("description", "y"), ("price", "1")], None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let set_price = |token: &str| json_request(Method::PUT, "/api/seller/set-price", Some(token), json!({"productId": product_id, "newPrice": 25.5}));
    assert_eq!(send(&app, set_price(&rival)).await.0, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, set_price(&seller)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["price"].as_f64(), Some(25.5));

    let (status, body) = send(&app, get(&format!("/api/seller/products/{}", seller_id), &alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, json_request(Method::POST, "/api/customer/cart", Some(&alice), json!({"productId": product_id, "quantity": 1}))).await;
    let line_id = body["cart"][0]["cartItemId"].as_i64().unwrap();
    let edit = json_request(Method::POST, "/api/customer/cart/edit", Some(&bob), json!({"cartItemId": line_id, "action": "increase"}));
    let (status, body) = send(&app, edit).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Cart item not found or unauthorized");
    let remove = json_request(Method::DELETE, "/api/customer/cart", Some(&bob), json!({"cartItemId": line_id}));
    assert_eq!(send(&app, remove).await.0, StatusCode::NOT_FOUND);

    let decrease = json_request(Method::POST, "/api/customer/cart/edit", Some(&alice), json!({"cartItemId": line_id, "action": "decrease"}));
    let (status, body) = send(&app, decrease).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "quantity can't be less than 1");

    let delete = |token: &str| Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/seller/delete-product/{}", product_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, delete(&rival)).await.0, StatusCode::FORBIDDEN);
    assert_eq!(send(&app, delete(&seller)).await.0, StatusCode::OK);
    let (_, body) = send(&app, get("/api/customer/cart", &alice)).await;
    assert_eq!(body["cart"], json!([]));
}

#[tokio::test]
async fn test_malformed_bodies_are_json_errors() {
    let h = harness();
    let app = app(&h);
    let (customer, _) = register(&app, "buyer", "customer").await;
    let (status, body) = send(&app, json_request(Method::POST, "/api/customer/cart", Some(&customer), json!({"quantity": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
    let (status, _) = send(&app, json_request(Method::POST, "/api/customer/cart/edit", Some(&customer), json!({"cartItemId": 1, "action": "sideways"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, get("/api/seller/products/abc", &customer)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_lifecycle() {
    let h = harness();
    let app = app(&h);
    let (_, body) = send(
        &app,
        json_request(Method::POST, "/api/users/register", None, json!({"username": "dana", "password": "secret1", "role": "customer"})),
    )
    .await;
    let refresh = body["refreshToken"].as_str().unwrap().to_string();

    let (status, _) = send(&app, json_request(Method::POST, "/api/users/login", None, json!({"username": "dana", "password": "nope!!"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = send(&app, json_request(Method::POST, "/api/users/login", None, json!({"username": "dana", "password": "secret1"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "customer");

    let (status, body) = send(&app, json_request(Method::POST, "/api/users/refresh", None, json!({"refreshToken": refresh}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].is_string());
    let logout = || json_request(Method::POST, "/api/users/logout", None, json!({"refreshToken": refresh}));
    assert_eq!(send(&app, logout()).await.0, StatusCode::OK);
    assert_eq!(send(&app, logout()).await.0, StatusCode::UNAUTHORIZED);
}
