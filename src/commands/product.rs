use clap::{Args, Subcommand};
use roastery_core::{filter_by_category, Category, RoastLevel};
use std::io::{self, Write};
use std::sync::Arc;

use super::{finish, warn_notice, OutputFormat};
use crate::repository::ContentRepository;
use crate::session::{ContentStore, NewProduct};

#[derive(Args)]
pub struct ProductCommand {
    #[command(subcommand)]
    pub command: ProductSubcommand,
}

#[derive(Subcommand)]
pub enum ProductSubcommand {
    /// List products in the catalog
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show one category (coffee, equipment, merch)
        #[arg(long)]
        category: Option<Category>,
    },

    /// Add a product and save
    Add {
        /// Product name
        #[arg(long)]
        name: String,

        /// Price in the smallest currency unit
        #[arg(long)]
        price: u64,

        /// Category (coffee, equipment, merch)
        #[arg(long, default_value = "coffee")]
        category: Category,

        /// Short description
        #[arg(long)]
        description: Option<String>,

        /// Origin (farm, region, country)
        #[arg(long)]
        origin: Option<String>,

        /// Tasting note (can be repeated)
        #[arg(long = "note", value_name = "NOTE")]
        notes: Vec<String>,

        /// Roast level (light, medium, dark)
        #[arg(long)]
        roast: Option<RoastLevel>,

        /// Image URL
        #[arg(long)]
        image_url: Option<String>,

        /// Commit message
        #[arg(long, short)]
        message: Option<String>,

        /// Apply the change without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove a product and save
    Remove {
        /// Product ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,

        /// Commit message
        #[arg(long, short)]
        message: Option<String>,

        /// Apply the change without saving
        #[arg(long)]
        dry_run: bool,
    },
}

impl ProductCommand {
    pub async fn run(
        &self,
        repository: Arc<dyn ContentRepository>,
        default_message: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut store = ContentStore::open(repository).await;
        warn_notice(&store);

        match &self.command {
            ProductSubcommand::List { format, category } => {
                let products = filter_by_category(&store.document().products, *category);

                if products.is_empty() {
                    println!("No products found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&products)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<36}  {:<28}  {:<10}  {:<7}  PRICE",
                            "ID", "NAME", "CATEGORY", "ROAST"
                        );
                        println!("{}", "-".repeat(100));
                        for product in &products {
                            let name = if product.name.chars().count() > 28 {
                                format!("{}...", product.name.chars().take(25).collect::<String>())
                            } else {
                                product.name.clone()
                            };
                            println!(
                                "{:<36}  {:<28}  {:<10}  {:<7}  {}",
                                product.id,
                                name,
                                product.category.as_str(),
                                product.roast_level.as_str(),
                                product.price
                            );
                        }
                        println!("\nTotal: {} product(s)", products.len());
                    }
                }
                Ok(())
            }

            ProductSubcommand::Add {
                name,
                price,
                category,
                description,
                origin,
                notes,
                roast,
                image_url,
                message,
                dry_run,
            } => {
                if name.trim().is_empty() {
                    return Err("Product name cannot be empty".into());
                }

                let mut product = NewProduct::new(name.trim(), *price, *category);
                if let Some(description) = description {
                    product.description = description.clone();
                }
                if let Some(origin) = origin {
                    product.origin = origin.clone();
                }
                if let Some(roast) = roast {
                    product.roast_level = *roast;
                }
                if let Some(image_url) = image_url {
                    product.image_url = image_url.clone();
                }
                product.notes = notes.clone();

                let id = store.add_product(product);
                if let Some(added) = store.document().find_product(&id) {
                    println!("Added product:");
                    println!("{}", added);
                }

                let message = message.as_deref().unwrap_or(default_message);
                finish(&mut store, message, *dry_run).await
            }

            ProductSubcommand::Remove {
                id,
                force,
                message,
                dry_run,
            } => {
                let name = match store.document().find_product(id) {
                    Some(p) => p.name.clone(),
                    None => return Err(format!("Product not found: {}", id).into()),
                };

                // Confirm removal unless --force is used
                if !force {
                    print!("Remove product '{}'? [y/N] ", name);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Removal cancelled.");
                        return Ok(());
                    }
                }

                store.remove_product(id);
                println!("Removed product: {}", name);

                let message = message.as_deref().unwrap_or(default_message);
                finish(&mut store, message, *dry_run).await
            }
        }
    }
}
