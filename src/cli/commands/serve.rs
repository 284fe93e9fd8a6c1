use clap::Args;

use crate::config::AppConfig;
use crate::server;

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Port to listen on (overrides PORT/API_PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Use the in-memory store instead of Postgres")]
    pub in_memory: bool,
}

pub async fn handle(args: ServeArgs, mut config: AppConfig) -> anyhow::Result<()> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    server::serve(config, args.in_memory).await
}
