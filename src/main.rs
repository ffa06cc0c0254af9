//! RAX Chat Server - Entry Point
//!
//! A text-broadcast chat server: authenticated clients' messages are fanned
//! out to every other connected client.

use clap::Parser;
use log::{error, info};

use rax_chat_server::auth::CredentialStore;
use rax_chat_server::error::ServerError;
use rax_chat_server::error::handlers::{SETUP_FAILURE_EXIT_CODE, handle_error};
use rax_chat_server::{Server, ServerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to listen on
    port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG, defaulting to info)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Launching chat server...");

    if let Err(e) = run(args.port).await {
        handle_error(&e);
        std::process::exit(SETUP_FAILURE_EXIT_CODE);
    }
}

async fn run(port: u16) -> Result<(), ServerError> {
    let config = ServerConfig::load()?;

    let credentials = CredentialStore::load(
        &config.credentials_path,
        config.max_credentials,
        config.max_field_length,
    )?;
    info!(
        "Loaded {} credential(s) from {}",
        credentials.len(),
        config.credentials_path.display()
    );

    let server = Server::bind(port, config, credentials).await?;

    info!("=== WELCOME TO THE RAX CHAT SERVER ===");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await;

    Ok(())
}
