use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use referral_types::api::{MarkReadResponse, SendMessageRequest, UnreadCountResponse};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/referrals/{referral_id}/messages",
            get(get_messages).post(send_message),
        )
        .route("/messages/{message_id}/read", post(mark_read))
        .route("/users/{user_id}/unread", get(unread_count))
        .with_state(state)
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(referral_id): Path<i64>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.messages.send(&req.into_form(referral_id)).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(referral_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.messages.list_by_referral(referral_id).await?;
    Ok(Json(messages))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let matched = state.messages.mark_read(&message_id).await?;
    Ok(Json(MarkReadResponse { matched }))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.messages.count_unread(&user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use referral_db::MemoryStore;

    use crate::access::MessageAccess;
    use crate::state::AppStateInner;

    fn app() -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::new());
        let state = AppStateInner::new(MessageAccess::new(store.clone()));
        (store, router(state))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn send_then_list() {
        let (_, app) = app();

        let (status, sent) = call(
            &app,
            "POST",
            "/referrals/42/messages",
            Some(json!({ "content": "Hello", "sender_id": "u1", "recipient_id": "u2" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(sent["referral_id"], 42);
        assert_eq!(sent["read"], false);
        assert!(sent["id"].as_str().is_some_and(|id| !id.is_empty()));

        let (status, listed) = call(&app, "GET", "/referrals/42/messages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(listed[0]["content"], "Hello");
    }

    #[tokio::test]
    async fn read_tracking_round_trip() {
        let (_, app) = app();
        let (_, sent) = call(
            &app,
            "POST",
            "/referrals/7/messages",
            Some(json!({ "content": "ping", "sender_id": "u1", "recipient_id": "u2" })),
        )
        .await;
        let id = sent["id"].as_str().unwrap().to_string();

        let (_, unread) = call(&app, "GET", "/users/u2/unread", None).await;
        assert_eq!(unread["count"], 1);

        let (status, marked) = call(&app, "POST", &format!("/messages/{id}/read"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(marked["matched"], 1);

        let (_, unread) = call(&app, "GET", "/users/u2/unread", None).await;
        assert_eq!(unread["count"], 0);

        let (_, missing) = call(&app, "POST", "/messages/nonexistent-id/read", None).await;
        assert_eq!(missing["matched"], 0);
    }

    #[tokio::test]
    async fn store_failure_is_bad_gateway() {
        let (store, app) = app();
        store.fail_requests(true);

        let (status, body) = call(&app, "GET", "/referrals/42/messages", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "store_unavailable");
        assert_eq!(body["error"]["message"], "message list_by_referral failed");
    }

    #[tokio::test]
    async fn unknown_fields_are_rejected() {
        let (_, app) = app();
        let (status, _) = call(
            &app,
            "POST",
            "/referrals/42/messages",
            Some(json!({ "content": "x", "sender_id": "u1", "read": true })),
        )
        .await;
        assert!(status.is_client_error());
    }
}
