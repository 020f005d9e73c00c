use clap::{Args, Subcommand};
use roastery_core::{ContentDocument, Path};
use serde_json::Value;
use std::sync::Arc;

use super::{finish, warn_notice, OutputFormat};
use crate::repository::ContentRepository;
use crate::session::ContentStore;

#[derive(Args)]
pub struct ContentCommand {
    #[command(subcommand)]
    pub command: ContentSubcommand,
}

#[derive(Subcommand)]
pub enum ContentSubcommand {
    /// Show the current content
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the value at a path (e.g. `products[0].price`)
    Get {
        /// Path into the content tree
        path: Path,
    },

    /// Replace values at paths and save
    Set {
        /// Assignments as PATH=VALUE; VALUE is JSON, or a string if it is not
        #[arg(required = true, value_name = "PATH=VALUE")]
        assignments: Vec<String>,

        /// Commit message
        #[arg(long, short)]
        message: Option<String>,

        /// Apply the edits without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the bundled content to the source
    Init {
        /// Commit message
        #[arg(long, short)]
        message: Option<String>,
    },
}

/// Splits `PATH=VALUE` into a path and a JSON value.
pub(crate) fn parse_assignment(assignment: &str) -> Result<(Path, Value), String> {
    let (path, raw) = assignment
        .split_once('=')
        .ok_or_else(|| format!("Expected PATH=VALUE, got '{}'", assignment))?;
    let path: Path = path
        .trim()
        .parse()
        .map_err(|e| format!("Invalid path '{}': {}", path.trim(), e))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((path, value))
}

fn print_summary(store: &ContentStore) {
    let doc = store.document();
    println!("Source:   {}", store.repository().describe());
    match store.revision() {
        Some(rev) => println!("Revision: {}", rev),
        None => println!("Revision: (bundled)"),
    }
    println!();

    println!("Site:  {}", doc.site.site.title);
    println!("Hero:  {}", doc.site.hero.title_lines().join(" / "));
    let sections: Vec<&str> = doc.site.sections.keys().map(String::as_str).collect();
    if !sections.is_empty() {
        println!("Sections: {}", sections.join(", "));
    }
    println!();

    println!("Navigation:");
    for (i, link) in doc.navigation.iter().enumerate() {
        println!("  [{}] {}", i, link);
    }
    println!();

    println!("{:<36}  {:<28}  {:<10}  PRICE", "ID", "NAME", "CATEGORY");
    println!("{}", "-".repeat(90));
    for product in &doc.products {
        println!(
            "{:<36}  {:<28}  {:<10}  {}",
            product.id,
            product.name,
            product.category.as_str(),
            product.price
        );
    }
    println!("\nTotal: {} product(s)", doc.products.len());
}

impl ContentCommand {
    pub async fn run(
        &self,
        repository: Arc<dyn ContentRepository>,
        default_message: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let ContentSubcommand::Init { message } = &self.command {
            let message = message.as_deref().unwrap_or("Initial content");
            let result = repository
                .save(&ContentDocument::bundled(), message, None)
                .await?;
            println!("Wrote bundled content as {}", result.revision.short());
            for file in &result.files {
                println!("  {}", file);
            }
            return Ok(());
        }

        let mut store = ContentStore::open(repository).await;
        warn_notice(&store);

        match &self.command {
            ContentSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(store.document())?);
                    }
                    OutputFormat::Text => print_summary(&store),
                }
                Ok(())
            }

            ContentSubcommand::Get { path } => {
                let value = store.field(path)?;
                match value {
                    Value::String(s) => println!("{}", s),
                    other => println!("{}", serde_json::to_string_pretty(&other)?),
                }
                Ok(())
            }

            ContentSubcommand::Set {
                assignments,
                message,
                dry_run,
            } => {
                let edits = assignments
                    .iter()
                    .map(|a| parse_assignment(a))
                    .collect::<Result<Vec<_>, _>>()?;

                for (path, value) in edits {
                    store.apply_field_change(&path, value)?;
                    println!("Set {}", path);
                }

                let message = message.as_deref().unwrap_or(default_message);
                finish(&mut store, message, *dry_run).await
            }

            ContentSubcommand::Init { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_assignment_json_value() {
        let (path, value) = parse_assignment("products[0].price=500000").unwrap();
        assert_eq!(path.to_string(), "products[0].price");
        assert_eq!(value, json!(500000));
    }

    #[test]
    fn test_parse_assignment_bare_string() {
        let (_, value) = parse_assignment("site.site.title=Gilka Coffee").unwrap();
        assert_eq!(value, json!("Gilka Coffee"));
    }

    #[test]
    fn test_parse_assignment_keeps_equals_in_value() {
        let (_, value) = parse_assignment("site.hero.primaryCta.href=/shop?a=b").unwrap();
        assert_eq!(value, json!("/shop?a=b"));
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(parse_assignment("no-equals").is_err());
        assert!(parse_assignment("products[x]=1").is_err());
    }
}
