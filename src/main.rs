mod bot;
mod config;
mod dispatcher;
mod error;
mod event;
mod moderation;
mod session;
mod slack;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,blockbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Settings may also come from a .env file next to the binary's working dir
    dotenvy::dotenv().ok();

    let config_path = std::env::args().nth(1).map(PathBuf::from);

    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::from(1));
        }
    };

    info!("Configuration loaded successfully");
    info!("  Slack API: {}", config.slack.api_url);
    info!("  Moderated channels: {:?}", config.policy.channels());
    info!("  Restricted users: {:?}", config.policy.restricted_users());
    info!("  User matching: {}", config.policy.match_mode());

    tokio::select! {
        result = bot::run(&config) => {
            if let Err(e) = &result {
                if e.is_auth() {
                    error!("Slack rejected the API token: {}", e);
                }
            }
            result.context("Moderation session failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested, exiting");
        }
    }

    Ok(ExitCode::SUCCESS)
}
