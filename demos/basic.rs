//! Minimal tsumugi example: an in-memory user store behind JSON endpoints.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3323/users
//!   curl http://localhost:3323/users/1
//!   curl -X POST http://localhost:3323/users \
//!        -H 'x-api-key: s3cret' \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"carol"}'
//!   curl -X DELETE http://localhost:3323/users/1
//!   curl http://localhost:3323/healthz

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tsumugi::middleware::ApiKey;
use tsumugi::{App, Config, Fault, HandlerError, Json, Method, Request, RouteOptions, Server, Status};

#[derive(Clone, Serialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

type Store = Arc<Mutex<BTreeMap<u64, User>>>;

#[tokio::main]
async fn main() -> Result<(), tsumugi::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::load("demos/application.yaml") {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("{e}, using defaults");
            Config::default()
        }
    };

    let store: Store = Arc::new(Mutex::new(BTreeMap::from([
        (1, User { id: 1, name: "alice".into() }),
        (2, User { id: 2, name: "bob".into() }),
    ])));

    let mut app = App::from_config(&config)?;
    let key = app.context().get_str("API_KEY").unwrap_or("s3cret").to_owned();

    let s = store.clone();
    app.get("/users", move |req| list_users(req, s.clone()))?;
    let s = store.clone();
    app.get("/users/{id}", move |req| get_user(req, s.clone()))?;
    let s = store.clone();
    app.on(
        Method::Post,
        "/users",
        move |req| create_user(req, s.clone()),
        RouteOptions::new().middleware(ApiKey::new(key)),
    )?;
    let s = store.clone();
    app.delete("/users/{id}", move |req| delete_user(req, s.clone()))?;
    app.on(Method::Get, "/healthz", healthz, RouteOptions::new().forbid("logger"))?;

    Server::from_config(&config).serve(app.build()).await
}

fn lock(store: &Store) -> Result<std::sync::MutexGuard<'_, BTreeMap<u64, User>>, HandlerError> {
    store.lock().map_err(|_| HandlerError::internal("user store lock poisoned"))
}

fn user_id(req: &Request) -> Result<u64, Fault> {
    req.param("id")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| Fault::new(Status::BadRequest).with_message("id must be a number"))
}

// GET /users?name=alice
async fn list_users(req: Request, store: Store) -> Result<Json<Vec<User>>, HandlerError> {
    let users = lock(&store)?;
    let filter = req.query("name");
    let list = users
        .values()
        .filter(|u| filter.is_none_or(|name| u.name == name))
        .cloned()
        .collect();
    Ok(Json(list))
}

// GET /users/{id}
async fn get_user(req: Request, store: Store) -> Result<Json<User>, HandlerError> {
    let id = user_id(&req)?;
    let users = lock(&store)?;
    let user = users
        .get(&id)
        .cloned()
        .ok_or_else(|| Fault::new(Status::NotFound).with_message(format!("no user {id}")))?;
    Ok(Json(user))
}

// POST /users → 201
async fn create_user(req: Request, store: Store) -> Result<(Status, Json<User>), HandlerError> {
    let input: NewUser = req.json()?;
    let mut users = lock(&store)?;
    let id = users.keys().next_back().map_or(1, |last| last + 1);
    let user = User { id, name: input.name };
    users.insert(id, user.clone());
    Ok((Status::Created, Json(user)))
}

// DELETE /users/{id} → 204
async fn delete_user(req: Request, store: Store) -> Result<Status, HandlerError> {
    let id = user_id(&req)?;
    match lock(&store)?.remove(&id) {
        Some(_) => Ok(Status::NoContent),
        None => Err(Fault::new(Status::NotFound).into()),
    }
}

async fn healthz(_req: Request) -> &'static str {
    "ok"
}
