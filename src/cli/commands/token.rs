use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{Claims, JwtManager};
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::hierarchy::Role;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(long, help = "Subject user id (random if omitted)")]
    pub user_id: Option<Uuid>,

    #[arg(long, default_value = "dev", help = "Username claim")]
    pub username: String,

    #[arg(long, help = "manager, region_manager, branch_manager, head_of_department or employee")]
    pub role: Role,

    #[arg(long)]
    pub shop_id: Uuid,

    #[arg(long)]
    pub region_id: Option<Uuid>,

    #[arg(long)]
    pub branch_id: Option<Uuid>,

    #[arg(long)]
    pub department_id: Option<Uuid>,

    #[arg(long, help = "Lifetime in seconds (defaults to JWT_ACCESS_DURATION)")]
    pub ttl: Option<u64>,
}

pub fn handle(args: TokenArgs, config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let ttl = args.ttl.unwrap_or(config.security.jwt_access_duration);
    let jwt = JwtManager::new(&config.security.jwt_secret, ttl)?;
    let claims = build_claims(&args, ttl);
    let token = jwt.sign(&claims)?;

    match output_format {
        OutputFormat::Text => {
            println!("{token}");
            Ok(())
        }
        OutputFormat::Json => output_success(
            output_format,
            "Token issued",
            Some(json!({ "token": token, "claims": claims })),
        ),
    }
}

fn build_claims(args: &TokenArgs, ttl: u64) -> Claims {
    let now = chrono::Utc::now();
    Claims {
        sub: args.user_id.unwrap_or_else(Uuid::new_v4),
        username: args.username.clone(),
        role: args.role,
        shop_id: Some(args.shop_id),
        region_id: args.region_id,
        branch_id: args.branch_id,
        department_id: args.department_id,
        exp: now.timestamp() + ttl as i64,
        iat: now.timestamp(),
    }
}
