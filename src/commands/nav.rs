use clap::{Args, Subcommand};
use roastery_core::NavLink;
use std::sync::Arc;

use super::{finish, warn_notice, OutputFormat};
use crate::repository::ContentRepository;
use crate::session::ContentStore;

#[derive(Args)]
pub struct NavCommand {
    #[command(subcommand)]
    pub command: NavSubcommand,
}

#[derive(Subcommand)]
pub enum NavSubcommand {
    /// List header navigation links
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Append a navigation link and save
    Add {
        /// Link label
        name: String,

        /// Link target (e.g. `#shop`)
        href: String,

        /// Commit message
        #[arg(long, short)]
        message: Option<String>,

        /// Apply the change without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove the navigation link at a position and save
    Remove {
        /// Position as shown by `nav list`
        index: usize,

        /// Commit message
        #[arg(long, short)]
        message: Option<String>,

        /// Apply the change without saving
        #[arg(long)]
        dry_run: bool,
    },
}

impl NavCommand {
    pub async fn run(
        &self,
        repository: Arc<dyn ContentRepository>,
        default_message: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut store = ContentStore::open(repository).await;
        warn_notice(&store);

        match &self.command {
            NavSubcommand::List { format } => {
                let links = &store.document().navigation;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(links)?);
                    }
                    OutputFormat::Text => {
                        for (i, link) in links.iter().enumerate() {
                            println!("[{}] {}", i, link);
                        }
                    }
                }
                Ok(())
            }

            NavSubcommand::Add {
                name,
                href,
                message,
                dry_run,
            } => {
                if name.trim().is_empty() {
                    return Err("Link name cannot be empty".into());
                }
                let link = NavLink::new(name.trim(), href.trim());
                println!("Added link: {}", link);
                store.add_nav_link(link);

                let message = message.as_deref().unwrap_or(default_message);
                finish(&mut store, message, *dry_run).await
            }

            NavSubcommand::Remove {
                index,
                message,
                dry_run,
            } => {
                let removed = store.remove_nav_link(*index).ok_or_else(|| {
                    format!(
                        "No navigation link at {} ({} link(s))",
                        index,
                        store.document().navigation.len()
                    )
                })?;
                println!("Removed link: {}", removed);

                let message = message.as_deref().unwrap_or(default_message);
                finish(&mut store, message, *dry_run).await
            }
        }
    }
}
