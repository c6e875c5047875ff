use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::AppState;
use crate::services::mailchimp::{MailChimpList, MailChimpMember, SyncError};

/// Read the request body as an attribute map
///
/// An empty body is an empty map so that a bare POST is reported field by
/// field instead of as a parse error.
fn parse_attributes(body: &Bytes) -> Result<Map<String, Value>, SyncError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(attributes)) => Ok(attributes),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(SyncError::MalformedBody(
            "Request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(SyncError::MalformedBody(format!(
            "Malformed JSON body: {}",
            e
        ))),
    }
}

pub async fn create_list(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MailChimpList>, SyncError> {
    let attributes = parse_attributes(&body)?;
    state.lists.create(&attributes).await.map(Json)
}

pub async fn show_list(
    State(state): State<Arc<AppState>>,
    Path(list_id): Path<String>,
) -> Result<Json<MailChimpList>, SyncError> {
    state.lists.show(&list_id).await.map(Json)
}

pub async fn update_list(
    State(state): State<Arc<AppState>>,
    Path(list_id): Path<String>,
    body: Bytes,
) -> Result<Json<MailChimpList>, SyncError> {
    let attributes = parse_attributes(&body)?;
    state.lists.update(&list_id, &attributes).await.map(Json)
}

pub async fn remove_list(
    State(state): State<Arc<AppState>>,
    Path(list_id): Path<String>,
) -> Result<Json<Value>, SyncError> {
    state.lists.remove(&list_id).await?;
    Ok(Json(json!({})))
}

/// Subscribe a member to a MailChimp list, addressed by its MailChimp id
pub async fn create_member(
    State(state): State<Arc<AppState>>,
    Path(mail_chimp_list_id): Path<String>,
    body: Bytes,
) -> Result<Json<MailChimpMember>, SyncError> {
    let attributes = parse_attributes(&body)?;
    state
        .members
        .create(&mail_chimp_list_id, &attributes)
        .await
        .map(Json)
}

pub async fn show_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<String>,
) -> Result<Json<MailChimpMember>, SyncError> {
    state.members.show(&member_id).await.map(Json)
}

pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<String>,
    body: Bytes,
) -> Result<Json<MailChimpMember>, SyncError> {
    let attributes = parse_attributes(&body)?;
    state.members.update(&member_id, &attributes).await.map(Json)
}

pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<String>,
) -> Result<Json<Value>, SyncError> {
    state.members.remove(&member_id).await?;
    Ok(Json(json!({})))
}
