mod config_cmd;
mod content;
mod nav;
mod product;
mod recommend;

pub use config_cmd::ConfigCommand;
pub use content::ContentCommand;
pub use nav::NavCommand;
pub use product::ProductCommand;
pub use recommend::RecommendCommand;

use clap::ValueEnum;

use crate::session::{ContentStore, SessionError};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Saves the session's edits, or reports what would be saved.
pub(crate) async fn finish(
    store: &mut ContentStore,
    message: &str,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if dry_run {
        println!("Dry run: nothing saved");
        return Ok(());
    }
    if store.revision().is_none() {
        return Err(format!(
            "{}; refusing to save over content that was not loaded",
            store.notice().unwrap_or("content was not loaded")
        )
        .into());
    }

    match store.commit(message).await {
        Ok(result) => {
            println!("{}", store.status());
            for file in &result.files {
                println!("  {}", file);
            }
            Ok(())
        }
        Err(SessionError::Repository(_)) => Err(store.status().to_string().into()),
        Err(e) => Err(e.into()),
    }
}

/// Prints the fallback notice, if the session is running on bundled content.
pub(crate) fn warn_notice(store: &ContentStore) {
    if let Some(notice) = store.notice() {
        eprintln!("Warning: {}", notice);
    }
}
