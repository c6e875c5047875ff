use axum::{Router, http::HeaderValue};
use mailchimp_sync::{AppState, routes, utils::env::EnvVars};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let env_vars = EnvVars::from_env()?;
    let state = Arc::new(AppState::new(&env_vars).await?);

    let app = Router::new()
        .merge(routes::create_routes(state))
        .layer(cors_layer(&env_vars.cors_allowed_origins));

    let addr = format!("0.0.0.0:{}", env_vars.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("Server running on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
