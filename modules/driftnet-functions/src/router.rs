//! HTTP surface for the registry: `/functions/{name}`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::FunctionError;
use crate::registry::{FunctionOutput, FunctionRegistry, Method};

pub fn function_router(registry: Arc<FunctionRegistry>) -> Router {
    Router::new()
        .route("/functions", get(list_functions))
        .route("/functions/{name}", get(call_get).post(call_post))
        .with_state(registry)
}

async fn list_functions(State(registry): State<Arc<FunctionRegistry>>) -> impl IntoResponse {
    Json(json!({ "functions": registry.specs() }))
}

async fn call_get(
    State(registry): State<Arc<FunctionRegistry>>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let args: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    dispatch(&registry, &name, Method::Get, Value::Object(args)).await
}

async fn call_post(
    State(registry): State<Arc<FunctionRegistry>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let args = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(v @ Value::Object(_)) => v,
            Ok(_) => return error(StatusCode::BAD_REQUEST, "request body must be a JSON object"),
            Err(e) => return error(StatusCode::BAD_REQUEST, &format!("invalid JSON body: {e}")),
        }
    };
    dispatch(&registry, &name, Method::Post, args).await
}

async fn dispatch(registry: &FunctionRegistry, name: &str, method: Method, args: Value) -> Response {
    let Some(function) = registry.get(name) else {
        return error(StatusCode::NOT_FOUND, &format!("unknown function {name}"));
    };
    if function.spec.method != method {
        return error(
            StatusCode::METHOD_NOT_ALLOWED,
            &format!("{name} must be called with {}", function.spec.method),
        );
    }

    let Ok(_permit) = function.permits.acquire().await else {
        return error(StatusCode::SERVICE_UNAVAILABLE, "function is shutting down");
    };

    match function.handler.call(args).await {
        Ok(output) if output.kind() != function.spec.response => {
            warn!(function = name, "Handler returned the wrong response kind");
            error(StatusCode::INTERNAL_SERVER_ERROR, "handler returned the wrong response kind")
        }
        Ok(FunctionOutput::Json(value)) => Json(value).into_response(),
        Ok(FunctionOutput::Html(html)) => Html(html).into_response(),
        Err(FunctionError::BadArgs(msg)) => {
            info!(function = name, error = %msg, "Rejected arguments");
            error(StatusCode::BAD_REQUEST, &msg)
        }
        Err(FunctionError::NotFound(msg)) => error(StatusCode::NOT_FOUND, &msg),
        Err(FunctionError::Internal(e)) => {
            warn!(function = name, error = %e, "Function failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
