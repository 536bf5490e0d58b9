//! Request handlers for the instance CRUD endpoints.

use crate::server::{AppState, ServerConfig};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use typereg::{Context, RegistryError, TypeInfo};

/// One instance addressed by type id and name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Write operation requested by a setter [`Instance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    RegisterAny,
    SetAny,
}

impl Operation {
    /// Anything other than `register_any` falls back to `set_any`.
    fn parse(operation: Option<&str>) -> Self {
        match operation {
            Some("register_any") => Operation::RegisterAny,
            _ => Operation::SetAny,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Operation::RegisterAny => "register_any",
            Operation::SetAny => "set_any",
        }
    }
}

/// Error rendered as a plain-text body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn registry(err: RegistryError) -> Self {
        let status = match err.root() {
            RegistryError::TypeNotFound { .. } | RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
            RegistryError::AlreadyExists { .. } | RegistryError::IdentifierCollision { .. } => StatusCode::CONFLICT,
            RegistryError::InvalidCacheKind { .. }
            | RegistryError::Structural { .. }
            | RegistryError::Json { .. } => StatusCode::BAD_REQUEST,
            RegistryError::Timeout(_) | RegistryError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("Request failed ({}): {}", self.status, self.message);
        (self.status, self.message).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Every registered type keyed by its identifier.
pub async fn handle_types(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, TypeInfo>> {
    let types = state
        .registry
        .types()
        .into_iter()
        .map(|(type_id, entry)| (type_id, entry.info()))
        .collect();
    Json(types)
}

/// Fill in the current value of every requested instance.
pub async fn handle_get(
    State(state): State<Arc<AppState>>,
    Json(mut instances): Json<Vec<Instance>>,
) -> ApiResult<Json<Vec<Instance>>> {
    run_blocking(move || {
        let ctx = request_context();
        for (index, instance) in instances.iter_mut().enumerate() {
            state.require_type(index, &instance.type_id)?;
            let value = state
                .registry
                .get_json(&ctx, &instance.type_id, &instance.name)
                .map_err(ApiError::registry)?;
            instance.value = Some(value);
        }
        debug!("Served {} instances", instances.len());
        Ok(Json(instances))
    })
    .await
}

/// Register or overwrite each instance in order, stopping at the first failure.
pub async fn handle_set(
    State(state): State<Arc<AppState>>,
    Json(instances): Json<Vec<Instance>>,
) -> ApiResult<&'static str> {
    run_blocking(move || {
        let ctx = request_context();
        for (index, instance) in instances.into_iter().enumerate() {
            state.require_type(index, &instance.type_id)?;
            let operation = Operation::parse(instance.operation.as_deref());
            let value = instance.value.unwrap_or(Value::Null);
            let registry = &state.registry;
            let written = match operation {
                Operation::RegisterAny => registry.register_json(&ctx, &instance.type_id, &instance.name, value),
                Operation::SetAny => registry.set_json(&ctx, &instance.type_id, &instance.name, value),
            };
            written.map_err(ApiError::registry)?;
            debug!("{} {} {:?}", operation.as_str(), instance.type_id, instance.name);
        }
        Ok("success")
    })
    .await
}

/// Delete each named instance.
pub async fn handle_delete(
    State(state): State<Arc<AppState>>,
    Json(instances): Json<Vec<Instance>>,
) -> ApiResult<&'static str> {
    run_blocking(move || {
        let ctx = request_context();
        for (index, instance) in instances.iter().enumerate() {
            state.require_type(index, &instance.type_id)?;
            state
                .registry
                .delete_any(&ctx, &instance.type_id, &instance.name)
                .map_err(ApiError::registry)?;
        }
        Ok("success")
    })
    .await
}

/// Run registry work off the async workers; loaders may block.
async fn run_blocking<R, F>(work: F) -> ApiResult<R>
where
    F: FnOnce() -> ApiResult<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("registry task failed: {}", err),
    })?
}

fn request_context() -> Context {
    Context::with_timeout(ServerConfig::REQUEST_TIMEOUT)
}

impl AppState {
    fn require_type(&self, index: usize, type_id: &str) -> ApiResult<()> {
        if type_id.is_empty() {
            return Err(ApiError::bad_request(format!("instance {} type id is empty", index)));
        }
        if self.registry.get_type_by_id(type_id).is_none() {
            return Err(ApiError::bad_request(format!("type {} not registered", type_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_defaults_to_set() {
        assert_eq!(Operation::parse(Some("register_any")), Operation::RegisterAny);
        assert_eq!(Operation::parse(Some("set_any")), Operation::SetAny);
        assert_eq!(Operation::parse(Some("upsert")), Operation::SetAny);
        assert_eq!(Operation::parse(None), Operation::SetAny);
    }

    #[test]
    fn test_registry_errors_map_to_status() {
        let status = |err: RegistryError| ApiError::registry(err).status;
        assert_eq!(
            status(RegistryError::not_found("map", "a").context("get", "String", "", "a")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(RegistryError::AlreadyExists { what: "a".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(status(RegistryError::structural("a.b", "missing")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(RegistryError::Other("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_instance_omits_empty_fields() {
        let instance = Instance {
            type_id: "String".into(),
            operation: None,
            name: "greeting".into(),
            value: None,
        };
        assert_eq!(
            serde_json::to_value(&instance).unwrap(),
            json!({"type_id": "String", "name": "greeting"})
        );
    }
}
