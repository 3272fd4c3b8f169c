#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod channel;
mod cli;
mod config;
mod db;
mod discord;
mod mirror;
mod translation;
mod utils;

use channel::ChannelDirectory;
use cli::{Cli, Command};
use config::Config;
use db::ChatLogStore as _;
use mirror::MirrorEngine;
use translation::{DeepLTranslator, TranslationService};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Arc::new(Config::load_from_file(&cli.config)?);
    utils::logging::init_tracing(&config.logging);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Logs { user, limit } => print_logs(&config, user.as_deref(), limit).await,
    }
}

async fn run(config: Arc<Config>) -> Result<()> {
    info!("community translator starting up");

    let db_manager = Arc::new(db::DatabaseManager::new(&config.database).await?);
    db_manager.migrate().await?;

    let directory = ChannelDirectory::new(&config.channels);
    let translator = Arc::new(DeepLTranslator::new(&config.translation));
    let translation = Arc::new(TranslationService::new(translator, directory.clone()));

    let discord_client = Arc::new(discord::DiscordClient::new(config.clone()).await?);

    let engine = Arc::new(MirrorEngine::new(
        directory,
        translation,
        discord_client.clone(),
        db_manager.chat_log_store(),
        db_manager.mirror_link_store(),
        config.mirror.loop_marker.clone(),
    ));
    discord_client.set_engine(engine).await;

    discord_client.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("community translator shutting down");
    discord_client.stop().await?;
    Ok(())
}

async fn print_logs(config: &Config, user: Option<&str>, limit: i64) -> Result<()> {
    let db_manager = db::DatabaseManager::new(&config.database).await?;
    db_manager.migrate().await?;

    let store = db_manager.chat_log_store();
    let entries = match user {
        Some(user) => store.find_by_user(user, limit).await?,
        None => store.find_recent(limit).await?,
    };

    for entry in entries {
        println!(
            "[{}] {} ({}) {}: {} -> {}",
            entry.created_at.to_rfc3339(),
            entry.discord_username,
            entry.discord_user_id,
            entry.channel_side,
            entry.original_message,
            entry
                .translated_message
                .as_deref()
                .unwrap_or("(not translated)"),
        );
    }

    Ok(())
}
