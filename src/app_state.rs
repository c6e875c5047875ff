use sqlx::PgPool;
use std::time::Duration;

use crate::{
    services::mailchimp::{ListSynchronizer, MailChimpClient, MemberSynchronizer},
    utils::env::EnvVars,
};

pub struct AppState {
    pub db_pool: PgPool,
    pub lists: ListSynchronizer<MailChimpClient>,
    pub members: MemberSynchronizer<MailChimpClient>,
}

impl AppState {
    /// Initialize the application state with database connection and migrations
    pub async fn new(env_vars: &EnvVars) -> Result<AppState, Box<dyn std::error::Error>> {
        // Database connection
        log::info!("Connecting to database...");
        let db_pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(env_vars.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&env_vars.database_url)
            .await?;

        log::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;

        log::info!("Database connection established successfully");

        let http_client = reqwest::Client::new();

        // Use custom base URL if provided (for testing with mock server)
        let mailchimp = if let Some(base_url) = &env_vars.mailchimp_api_base_url {
            log::info!("Using custom MailChimp base URL: {}", base_url);
            MailChimpClient::with_base_url(
                http_client,
                env_vars.mailchimp_api_key.clone(),
                base_url.clone(),
            )
        } else {
            let client = MailChimpClient::new(http_client, env_vars.mailchimp_api_key.clone())?;
            log::info!("MailChimp client targets {}", client.base_url());
            client
        };

        Ok(Self::with_client(db_pool, mailchimp))
    }

    /// Build the state around an existing pool, as `#[sqlx::test]` hands one out
    pub fn with_client(db_pool: PgPool, mailchimp: MailChimpClient) -> AppState {
        AppState {
            lists: ListSynchronizer::new(db_pool.clone(), mailchimp.clone()),
            members: MemberSynchronizer::new(db_pool.clone(), mailchimp),
            db_pool,
        }
    }
}
