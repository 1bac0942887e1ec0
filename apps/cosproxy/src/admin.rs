use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use cosproxy_storage::AccountStorage;

#[derive(Clone)]
struct AdminState {
    storage: AccountStorage,
    admin_key: Arc<String>,
}

pub(crate) fn admin_router(storage: AccountStorage, admin_key: String) -> Router {
    let state = AdminState {
        storage,
        admin_key: Arc::new(admin_key),
    };

    Router::new()
        .route("/admin/accounts", get(list_accounts).post(create_account))
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateAccountRequest {
    auth: String,
    team_id: String,
    #[serde(default)]
    donor: Option<String>,
}

/// Listing never includes the auth secret.
#[derive(Serialize)]
struct AccountView {
    id: i64,
    team_id: String,
    donor: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

async fn list_accounts(State(state): State<AdminState>, headers: HeaderMap) -> Response {
    if let Err(denied) = check_admin_key(&state, &headers) {
        return denied;
    }

    match state.storage.list_accounts().await {
        Ok(accounts) => {
            let views: Vec<AccountView> = accounts
                .into_iter()
                .map(|account| AccountView {
                    id: account.id,
                    team_id: account.team_id,
                    donor: account.donor,
                    is_active: account.is_active,
                    created_at: rfc3339(account.created_at),
                    updated_at: rfc3339(account.updated_at),
                })
                .collect();
            Json(json!({ "accounts": views })).into_response()
        }
        Err(err) => storage_error(err),
    }
}

async fn create_account(
    State(state): State<AdminState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    if let Err(denied) = check_admin_key(&state, &headers) {
        return denied;
    }

    let request: CreateAccountRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid request: {err}") })),
            )
                .into_response();
        }
    };
    if request.auth.is_empty() || request.team_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "auth and team_id are required" })),
        )
            .into_response();
    }

    match state
        .storage
        .insert_account(request.auth, request.team_id, request.donor)
        .await
    {
        Ok(account) => (
            StatusCode::OK,
            Json(json!({
                "message": "account registered",
                "account": AccountView {
                    id: account.id,
                    team_id: account.team_id,
                    donor: account.donor,
                    is_active: account.is_active,
                    created_at: rfc3339(account.created_at),
                    updated_at: rfc3339(account.updated_at),
                },
            })),
        )
            .into_response(),
        Err(err) => storage_error(err),
    }
}

fn check_admin_key(state: &AdminState, headers: &HeaderMap) -> Result<(), Response> {
    let presented = headers
        .get("x-admin-key")
        .and_then(|value| value.to_str().ok());
    if presented == Some(state.admin_key.as_str()) {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid admin key" })),
        )
            .into_response())
    }
}

fn storage_error(err: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

fn rfc3339(when: OffsetDateTime) -> String {
    when.format(&Rfc3339).unwrap_or_default()
}
