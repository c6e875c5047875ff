use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::AppState;

mod mailchimp;

async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    // Test database connection
    let db_connected = sqlx::query("SELECT 1")
        .fetch_one(&state.db_pool)
        .await
        .is_ok();

    if !db_connected {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "database": {
                    "connected": false,
                    "error": "Database connection failed"
                }
            })),
        ));
    }

    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "database": {
            "connected": true,
            "pool_size": state.db_pool.size(),
            "idle_connections": state.db_pool.num_idle()
        }
    })))
}

pub fn create_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(health_check))
        // MailChimp lists
        .route("/mailchimp/lists", post(mailchimp::create_list))
        .route(
            "/mailchimp/lists/{list_id}",
            get(mailchimp::show_list)
                .put(mailchimp::update_list)
                .delete(mailchimp::remove_list),
        )
        // MailChimp members: POST takes the MailChimp list id, the rest the member id
        .route(
            "/mailchimp/members/{id}",
            post(mailchimp::create_member)
                .get(mailchimp::show_member)
                .put(mailchimp::update_member)
                .delete(mailchimp::remove_member),
        )
        .with_state(state)
}
