//! HTTP surface: routing, request handlers, and response rendering.
//!
//! Handlers are thin glue: negotiate the response format first (so even
//! failures come back in the format the client asked for), decode the
//! payload per Content-Type, and delegate to the store.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::negotiate::{parse_body, payload_format, response_format, BodyFormat};
use crate::record::JsonMap;
use crate::store::ReservationStore;
use crate::validate::{ApprovedLists, ReservationSchema, Validator};
use crate::xml;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReservationStore>,
}

/// Builds the application router. Both `/reservations...` and
/// `/api/reservations...` resolve to the same handlers.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/reservations", get(list_reservations).post(create_reservation))
        .route(
            "/reservations/{id}",
            get(get_reservation)
                .put(update_reservation)
                .delete(delete_reservation),
        );

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .route("/health", get(health_check))
        .with_state(state)
}

/// Loads the schema (fatal when missing or corrupt), opens the store, and
/// serves the API until shutdown.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let schema = ReservationSchema::from_file(&config.schema_file)?;
    let validator = Validator::new(schema, ApprovedLists::default());
    let store = ReservationStore::open(&config.data_file, validator)?;

    info!(
        reservations = store.count(),
        next_id = store.next_id(),
        data_file = %config.data_file.display(),
        "store opened"
    );
    info!(resorts = ?store.validator().approved().resorts, "approved resorts");
    info!(gateways = ?store.validator().approved().gateways, "approved payment gateways");

    let app = router(AppState {
        store: Arc::new(store),
    })
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "resort reservation API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_reservations(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let format = response_format(&params, &headers);
    let records = state.store.list(params.get("q").map(String::as_str));
    let maps: Vec<JsonMap> = records.iter().map(|record| record.to_map()).collect();
    render_list(format, &maps)
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let format = response_format(&params, &headers);
    match state.store.get(&id) {
        Ok(record) => render(format, StatusCode::OK, &record.to_map(), "reservation"),
        Err(err) => render_error(format, err),
    }
}

async fn create_reservation(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let format = response_format(&params, &headers);
    let result = parse_body(payload_format(&headers), &body)
        .and_then(|payload| state.store.create(payload));
    match result {
        Ok(record) => render(format, StatusCode::CREATED, &record.to_map(), "reservation"),
        Err(err) => render_error(format, err),
    }
}

async fn update_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let format = response_format(&params, &headers);
    let result = parse_body(payload_format(&headers), &body)
        .and_then(|payload| state.store.update(&id, payload));
    match result {
        Ok(record) => render(format, StatusCode::OK, &record.to_map(), "reservation"),
        Err(err) => render_error(format, err),
    }
}

async fn delete_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let format = response_format(&params, &headers);
    match state.store.delete(&id) {
        Ok(deleted_id) => {
            let body = to_map(json!({
                "message": format!("Reservation {deleted_id} deleted successfully"),
                "status": "success",
                "deleted_id": deleted_id,
            }));
            render(format, StatusCode::OK, &body, "response")
        }
        Err(err) => render_error(format, err),
    }
}

async fn health_check(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let format = response_format(&params, &headers);
    let approved = state.store.validator().approved();
    let body = to_map(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        "data_count": state.store.count(),
        "next_id": state.store.next_id(),
        "endpoints": [
            { "method": "GET", "path": "/reservations", "description": "List all reservations" },
            { "method": "POST", "path": "/reservations", "description": "Create reservation" },
            { "method": "GET", "path": "/reservations/{id}", "description": "Get specific reservation" },
            { "method": "PUT", "path": "/reservations/{id}", "description": "Update reservation" },
            { "method": "DELETE", "path": "/reservations/{id}", "description": "Delete reservation" },
        ],
        "supported_formats": ["json", "xml"],
        "approved_resorts": &approved.resorts,
        "approved_payment_gateways": &approved.gateways,
    }));
    render(format, StatusCode::OK, &body, "health")
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn to_map(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        _ => JsonMap::new(),
    }
}

fn render(format: BodyFormat, status: StatusCode, body: &JsonMap, root: &str) -> Response {
    match format {
        BodyFormat::Json => (status, Json(Value::Object(body.clone()))).into_response(),
        BodyFormat::Xml => match xml::record_to_xml(body, root) {
            Ok(document) => xml_response(status, document),
            Err(err) => render_error(BodyFormat::Xml, ApiError::Internal(err.to_string())),
        },
    }
}

fn render_list(format: BodyFormat, records: &[JsonMap]) -> Response {
    match format {
        BodyFormat::Json => {
            let values: Vec<Value> = records.iter().cloned().map(Value::Object).collect();
            (StatusCode::OK, Json(Value::Array(values))).into_response()
        }
        BodyFormat::Xml => match xml::records_to_xml(records, "reservations", "reservation") {
            Ok(document) => xml_response(StatusCode::OK, document),
            Err(err) => render_error(BodyFormat::Xml, ApiError::Internal(err.to_string())),
        },
    }
}

fn render_error(format: BodyFormat, err: ApiError) -> Response {
    if let ApiError::Internal(detail) = &err {
        error!(%detail, "request failed");
    }
    let status = err.status();
    let message = err.public_message();

    match format {
        BodyFormat::Json => (status, Json(json!({ "error": message }))).into_response(),
        BodyFormat::Xml => {
            let body = to_map(json!({ "error": message }));
            match xml::record_to_xml(&body, "error") {
                Ok(document) => xml_response(status, document),
                // Falls back to JSON rather than recursing.
                Err(_) => (status, Json(json!({ "error": message }))).into_response(),
            }
        }
    }
}

fn xml_response(status: StatusCode, document: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/xml")],
        document,
    )
        .into_response()
}
