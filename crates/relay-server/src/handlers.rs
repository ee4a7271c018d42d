use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Local, Utc};
use relay_auth::{AuthError, AuthRecord, Credential, LoginRequest};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::body::{json_object, read_body};
use crate::bridge::{self, BridgeSession};
use crate::completion::normalize;
use crate::server::AppState;
use crate::{BridgeError, ClientAddr};

type Params = HashMap<String, String>;

pub async fn ping() -> Json<Value> {
    Json(json!({
        "message": "pong",
        "time_utc": Utc::now().format("%Y-%m-%d %H:%M:%S%.3f %a").to_string(),
        "time_now": Local::now().format("%Y-%m-%d %H:%M:%S%.3f %z %Z %a").to_string(),
    }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientAddr,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let params = match login_params(query.as_deref(), &headers, body).await {
        Ok(params) => params,
        Err(e) => return e.into_response(),
    };

    let Some(idx) = params.get("idx") else {
        return BridgeError::LoginParams("Key: 'idx' is required".into()).into_response();
    };
    let device_uid = params
        .get("device_uid")
        .or_else(|| params.get("device_id"))
        .cloned()
        .unwrap_or_default();
    debug!(idx = %idx, name = ?params.get("name"), "Login request");

    let request = LoginRequest {
        idx: idx.clone(),
        device_uid,
        ip_address: client.as_string(),
    };
    match state.auth.login(request).await {
        Ok(grant) => Json(grant).into_response(),
        Err(e) => BridgeError::from(e).into_response(),
    }
}

pub async fn models(
    State(state): State<Arc<AppState>>,
    client: ClientAddr,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let params = query_params(query.as_deref());
    match credential(&headers, &params) {
        Ok(Some(credential)) => {
            if let Err(e) = authenticate(&state, &credential, &params, &client).await {
                return BridgeError::from(e).into_response();
            }
        }
        Ok(None) => {}
        Err(e) => return BridgeError::from(e).into_response(),
    }

    if state.models.is_empty() {
        return BridgeError::ModelsUnavailable.into_response();
    }
    Json(state.models.to_list()).into_response()
}

pub async fn completions(
    State(state): State<Arc<AppState>>,
    client: ClientAddr,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let mut session = BridgeSession::new();

    let payload = match read_body(&headers, body)
        .await
        .and_then(|bytes| json_object(&bytes))
    {
        Ok(payload) => payload,
        Err(e) => return session.fail(e),
    };

    let params = query_params(query.as_deref());
    let credential = match credential(&headers, &params) {
        Ok(Some(credential)) => credential,
        Ok(None) => return session.fail(AuthError::Missing.into()),
        Err(e) => return session.fail(e.into()),
    };
    let record = match authenticate(&state, &credential, &params, &client).await {
        Ok(record) => record,
        Err(e) => return session.fail(e.into()),
    };
    session.authenticated(&record.idx);

    let completion = normalize(payload, &state.models);
    info!(
        idx = %record.idx,
        user = %completion.user,
        model = %completion.model,
        count = record.auth_count,
        ip = %record.ip_address,
        location = %record.ip_localized,
        "Completions request"
    );
    bridge::relay(session, &state.upstream, completion).await
}

/// Verifies by the issued `auth_code` when one is sent, else by token.
async fn authenticate(
    state: &AppState,
    credential: &Credential,
    params: &Params,
    client: &ClientAddr,
) -> Result<AuthRecord, AuthError> {
    let remote = client.as_string();
    match params.get("auth_code") {
        Some(code) => state.auth.verify_by_code(credential, code, &remote).await,
        None => state.auth.verify(credential, &remote).await,
    }
}

/// Credential from the `Authorization` header, else from `authorization` or
/// `idx` + `auth_token` query parameters. `Ok(None)` when nothing was sent.
fn credential(headers: &HeaderMap, params: &Params) -> Result<Option<Credential>, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(value) = header.or_else(|| params.get("authorization").map(String::as_str)) {
        return Credential::parse(value).map(Some);
    }

    let idx = params.get("idx").map(String::as_str).unwrap_or_default();
    let token = params
        .get("auth_token")
        .map(String::as_str)
        .unwrap_or_default();
    match Credential::from_parts(idx, token) {
        Ok(credential) => Ok(Some(credential)),
        Err(AuthError::Missing) => Ok(None),
        Err(e) => Err(e),
    }
}

fn query_params(query: Option<&str>) -> Params {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Query parameters overlaid with a JSON or form-encoded body.
async fn login_params(
    query: Option<&str>,
    headers: &HeaderMap,
    body: Body,
) -> Result<Params, BridgeError> {
    let mut params = query_params(query);
    let bytes = read_body(headers, body)
        .await
        .map_err(|e| BridgeError::LoginParams(e.to_string()))?;
    if bytes.is_empty() {
        return Ok(params);
    }

    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("json"))
        || bytes.first() == Some(&b'{');
    if !is_json {
        params.extend(url::form_urlencoded::parse(&bytes).into_owned());
        return Ok(params);
    }

    let object = json_object(&bytes).map_err(|e| BridgeError::LoginParams(e.to_string()))?;
    for (key, value) in object {
        let text = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        params.insert(key, text);
    }
    Ok(params)
}
