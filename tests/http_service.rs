//! HTTP anchor client against a local stub of the anchor service

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use beacon_sync::api::{AnchorRecord, NewAnchorRequest, NewAnchorResponse, WireTransform};
use beacon_sync::{AnchorService, HttpAnchorService, StoreError, Transform};
use nalgebra::Translation3;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

type Anchors = Arc<Mutex<HashMap<String, Vec<AnchorRecord>>>>;

async fn create(
    State(anchors): State<Anchors>,
    Path(name): Path<String>,
    Json(body): Json<NewAnchorRequest>,
) -> Result<Json<NewAnchorResponse>, StatusCode> {
    if name == "broken" {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let id = Uuid::new_v4();
    anchors.lock().unwrap().entry(name).or_default().push(AnchorRecord {
        id,
        relative_transform: body.relative_transform,
    });
    Ok(Json(NewAnchorResponse { id }))
}

async fn list(State(anchors): State<Anchors>, Path(name): Path<String>) -> Json<Vec<AnchorRecord>> {
    Json(anchors.lock().unwrap().get(&name).cloned().unwrap_or_default())
}

/// 200 with a body that is not an anchor list
async fn garbled() -> &'static str {
    "{\"not\": \"a list\"}"
}

async fn serve() -> SocketAddr {
    let anchors: Anchors = Arc::default();
    let app = Router::new()
        .route("/UWBAnchor/garbled/list", get(garbled))
        .route("/UWBAnchor/:name/new", post(create))
        .route("/UWBAnchor/:name/list", get(list))
        .with_state(anchors);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> HttpAnchorService {
    HttpAnchorService::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_create_then_list() {
    let service = client(serve().await);
    let relative: Transform = Translation3::new(0.25, -1.0, 3.5).to_homogeneous();

    let id = service.create_anchor("lobby", &relative).await.unwrap();
    let listed = service.list_anchors("lobby").await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    assert_eq!(WireTransform::from(&listed[0].relative_transform), WireTransform::from(&relative));
    assert!(service.list_anchors("stairs").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_200_is_http_error() {
    let service = client(serve().await);
    let result = service.create_anchor("broken", &Transform::identity()).await;
    assert_eq!(result, Err(StoreError::Http { status: 500 }));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let service = client(serve().await);
    let result = service.list_anchors("garbled").await;
    assert!(matches!(result, Err(StoreError::Decode { .. })));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(addr).list_anchors("lobby").await;
    assert!(matches!(result, Err(StoreError::Transport { .. })));
}
