use clap::{Parser, Subcommand};
use std::path::PathBuf;

use roastery::commands::{
    ConfigCommand, ContentCommand, NavCommand, ProductCommand, RecommendCommand,
};
use roastery::config::{Config, SourceKind};
use roastery::repository::build_repository;

#[derive(Parser)]
#[command(name = "roastery")]
#[command(version)]
#[command(about = "Edit and publish the roastery storefront content", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Content source: local, remote, api or memory (overrides config)
    #[arg(long, global = true)]
    source: Option<SourceKind>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and edit site content
    Content(ContentCommand),

    /// Manage the product catalog
    Product(ProductCommand),

    /// Manage header navigation links
    Nav(NavCommand),

    /// Ask for a coffee recommendation
    Recommend(RecommendCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config)?;
    if let Some(source) = cli.source {
        config = config.with_source(source);
    }
    let message = config.github.commit_message.clone();

    match cli.command {
        Some(Commands::Content(cmd)) => {
            let repository = build_repository(&config.content_source())?;
            cmd.run(repository, &message).await?;
        }
        Some(Commands::Product(cmd)) => {
            let repository = build_repository(&config.content_source())?;
            cmd.run(repository, &message).await?;
        }
        Some(Commands::Nav(cmd)) => {
            let repository = build_repository(&config.content_source())?;
            cmd.run(repository, &message).await?;
        }
        Some(Commands::Recommend(cmd)) => {
            let repository = build_repository(&config.content_source())?;
            cmd.run(repository, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
