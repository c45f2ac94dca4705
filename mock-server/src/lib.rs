//! Local stand-in for the public `/posts` service.
//!
//! Like the public service it imitates, writes are echoed but never stored:
//! the seeded list is the same before and after any PUT, PATCH or DELETE.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub body: String,
    #[serde(rename = "userId")]
    pub user_id: u64,
}

#[derive(Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<u64>,
}

pub type Db = Arc<Vec<Post>>;

pub const DEFAULT_POST_COUNT: u64 = 100;

/// `count` posts with ids `1..=count`, ten per user.
pub fn seed(count: u64) -> Vec<Post> {
    (1..=count)
        .map(|id| Post {
            id,
            title: format!("post {id}"),
            body: format!("body of post {id}"),
            user_id: (id - 1) / 10 + 1,
        })
        .collect()
}

pub fn app() -> Router {
    app_with_posts(DEFAULT_POST_COUNT)
}

pub fn app_with_posts(count: u64) -> Router {
    let db: Db = Arc::new(seed(count));
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(replace_post).patch(patch_post).delete(delete_post),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, app()).await
}

pub async fn run_with(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

async fn list_posts(State(db): State<Db>) -> Json<Vec<Post>> {
    debug!(count = db.len(), "list posts");
    Json(db.as_ref().clone())
}

async fn create_post(
    State(db): State<Db>,
    Json(input): Json<Map<String, Value>>,
) -> (StatusCode, Json<Value>) {
    let mut created = input;
    created.insert("id".to_string(), json!(db.len() as u64 + 1));
    debug!(id = db.len() + 1, "create post");
    (StatusCode::CREATED, Json(Value::Object(created)))
}

async fn get_post(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Post>, StatusCode> {
    find(&db, id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn replace_post(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<Map<String, Value>>,
) -> Result<Json<Value>, StatusCode> {
    find(&db, id).ok_or(StatusCode::NOT_FOUND)?;
    let mut replaced = input;
    replaced.insert("id".to_string(), json!(id));
    debug!(id, "replace post");
    Ok(Json(Value::Object(replaced)))
}

async fn patch_post(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<PostPatch>,
) -> Result<Json<Post>, StatusCode> {
    let mut post = find(&db, id).cloned().ok_or(StatusCode::NOT_FOUND)?;
    if let Some(title) = input.title {
        post.title = title;
    }
    if let Some(body) = input.body {
        post.body = body;
    }
    if let Some(user_id) = input.user_id {
        post.user_id = user_id;
    }
    debug!(id, "patch post");
    Ok(Json(post))
}

async fn delete_post(Path(id): Path<u64>) -> Json<Value> {
    debug!(id, "delete post");
    Json(json!({}))
}

fn find(db: &Db, id: u64) -> Option<&Post> {
    db.iter().find(|post| post.id == id)
}
