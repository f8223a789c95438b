use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Records per entity segment, in insertion order.
#[derive(Default)]
pub struct Store {
    collections: HashMap<String, Vec<Value>>,
}

#[derive(Clone)]
pub struct AppState {
    token: Arc<str>,
    db: Arc<RwLock<Store>>,
    next_id: Arc<AtomicU64>,
}

pub fn app(token: &str) -> Router {
    let state = AppState {
        token: Arc::from(token),
        db: Arc::new(RwLock::new(Store::default())),
        next_id: Arc::new(AtomicU64::new(1)),
    };
    Router::new()
        .route("/v1/{segment}", get(list).post(create))
        .route("/v1/{segment}/find", get(find_by_name))
        .route("/v1/{segment}/{id}", get(fetch).put(update).delete(remove))
        .route("/v1/{segment}/{id}/deals", get(related_deals))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

type Params = Query<HashMap<String, String>>;

async fn require_token(
    State(state): State<AppState>,
    Query(params): Params,
    request: Request,
    next: Next,
) -> Response {
    if params.get("api_token").map(String::as_str) != Some(&*state.token) {
        tracing::debug!(uri = %request.uri().path(), "rejected request without valid api_token");
        return failure(StatusCode::UNAUTHORIZED, "unauthorized access");
    }
    next.run(request).await
}

fn failure(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({"success": false, "error": error}))).into_response()
}

fn not_found() -> Response {
    failure(StatusCode::NOT_FOUND, "not found")
}

/// Split `12:(a,b)` into the id and the selected fields.
fn split_fields(raw: &str) -> (&str, Option<Vec<&str>>) {
    match raw.split_once(':') {
        Some((id, selector)) => {
            let fields = selector
                .trim_start_matches('(')
                .trim_end_matches(')')
                .split(',')
                .filter(|f| !f.is_empty())
                .collect();
            (id, Some(fields))
        }
        None => (raw, None),
    }
}

fn id_matches(record: &Value, id: &str) -> bool {
    match &record["id"] {
        Value::String(s) => s == id,
        Value::Number(n) => n.to_string() == id,
        _ => false,
    }
}

fn page(records: Vec<Value>, params: &HashMap<String, String>) -> Response {
    let start: usize = params.get("start").and_then(|s| s.parse().ok()).unwrap_or(0);
    let limit: usize = params
        .get("limit")
        .and_then(|s| s.parse().ok())
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE);

    let total = records.len();
    let data: Vec<Value> = records.into_iter().skip(start).take(limit).collect();
    let more = start + data.len() < total;
    let mut pagination = json!({
        "start": start,
        "limit": limit,
        "more_items_in_collection": more,
    });
    if more {
        pagination["next_start"] = json!(start + limit);
    }

    let data = if data.is_empty() { Value::Null } else { Value::Array(data) };
    Json(json!({
        "success": true,
        "data": data,
        "additional_data": {"pagination": pagination},
    }))
    .into_response()
}

async fn list(State(state): State<AppState>, Path(segment): Path<String>, Query(params): Params) -> Response {
    let (segment, _) = split_fields(&segment);
    let db = state.db.read().await;
    let records = db.collections.get(segment).cloned().unwrap_or_default();
    page(records, &params)
}

async fn create(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Json(input): Json<Map<String, Value>>,
) -> Response {
    let id = if segment == "leads" {
        json!(Uuid::new_v4())
    } else {
        json!(state.next_id.fetch_add(1, Ordering::Relaxed))
    };

    let mut record = input;
    record.insert("id".to_string(), id);
    let record = Value::Object(record);

    state
        .db
        .write()
        .await
        .collections
        .entry(segment.clone())
        .or_default()
        .push(record.clone());
    tracing::info!(%segment, id = %&record["id"], "created record");

    (StatusCode::CREATED, Json(json!({"success": true, "data": record}))).into_response()
}

async fn fetch(State(state): State<AppState>, Path((segment, raw_id)): Path<(String, String)>) -> Response {
    let (id, fields) = split_fields(&raw_id);
    let db = state.db.read().await;
    let Some(record) = db
        .collections
        .get(&segment)
        .and_then(|records| records.iter().find(|r| id_matches(r, id)))
    else {
        return not_found();
    };

    let data = match (fields, record) {
        (Some(fields), Value::Object(map)) => Value::Object(
            map.iter()
                .filter(|(k, _)| fields.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        _ => record.clone(),
    };
    Json(json!({"success": true, "data": data})).into_response()
}

async fn update(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    Json(input): Json<Map<String, Value>>,
) -> Response {
    let mut db = state.db.write().await;
    let Some(Value::Object(record)) = db
        .collections
        .get_mut(&segment)
        .and_then(|records| records.iter_mut().find(|r| id_matches(r, &id)))
    else {
        return not_found();
    };

    for (key, value) in input {
        if key != "id" {
            record.insert(key, value);
        }
    }
    Json(json!({"success": true, "data": record.clone()})).into_response()
}

async fn remove(State(state): State<AppState>, Path((segment, id)): Path<(String, String)>) -> Response {
    let mut db = state.db.write().await;
    let Some(records) = db.collections.get_mut(&segment) else {
        return not_found();
    };
    let Some(pos) = records.iter().position(|r| id_matches(r, &id)) else {
        return not_found();
    };
    let removed = records.remove(pos);
    Json(json!({"success": true, "data": {"id": removed["id"]}})).into_response()
}

async fn find_by_name(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(params): Params,
) -> Response {
    let Some(term) = params.get("term").map(|t| t.to_lowercase()) else {
        return failure(StatusCode::BAD_REQUEST, "term is missing");
    };
    let by_email = params.get("search_by_email").is_some_and(|v| v == "1");

    let db = state.db.read().await;
    let matches: Vec<Value> = db
        .collections
        .get(&segment)
        .map(|records| {
            records
                .iter()
                .filter(|r| {
                    let field = if by_email { &r["email"] } else { &r["name"] };
                    field.as_str().is_some_and(|v| v.to_lowercase().contains(&term))
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    page(matches, &params)
}

async fn related_deals(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    Query(params): Params,
) -> Response {
    let key = match segment.as_str() {
        "persons" => "person_id",
        "organizations" => "org_id",
        _ => return not_found(),
    };

    let db = state.db.read().await;
    let owner_exists = db
        .collections
        .get(&segment)
        .is_some_and(|records| records.iter().any(|r| id_matches(r, &id)));
    if !owner_exists {
        return not_found();
    }

    let deals: Vec<Value> = db
        .collections
        .get("deals")
        .map(|records| {
            records
                .iter()
                .filter(|deal| match &deal[key] {
                    Value::Number(n) => n.to_string() == id,
                    Value::String(s) => *s == id,
                    _ => false,
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    page(deals, &params)
}
