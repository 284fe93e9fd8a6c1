use org_hierarchy_api::config::AppConfig;
use org_hierarchy_api::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET_KEY, etc.
    let _ = dotenvy::dotenv();
    server::init_tracing();

    let config = AppConfig::from_env();
    server::serve(config, false).await
}
