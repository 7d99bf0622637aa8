use anyhow::Result;
use chat_theme_generator::app::App;
use chat_theme_generator::models::Config;
use clap::Parser;
use std::num::NonZeroU16;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "chat-theme-generator")]
#[command(about = "Serve AI-generated chat overlay themes")]
struct CliArgs {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "THEME_LISTEN_ADDRESS", default_value = "127.0.0.1")]
    listen_address: String,

    #[arg(short, long, env = "PORT", default_value = "8091")]
    port: NonZeroU16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_theme_generator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting chat-theme-generator");

    let args = CliArgs::parse();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app = App::new(&config);
    if let Err(e) = app.serve(&args.listen_address, args.port).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
