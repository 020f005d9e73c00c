use clap::{Args, Subcommand};

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn secret_state(value: Option<&str>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "set",
        _ => "not set",
    }
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("source: {}", config.source.value);
                        println!("  source: {}", config.source.source);
                        println!();

                        println!("content_dir: {}", config.content_dir.value.display());
                        println!("  source: {}", config.content_dir.source);
                        println!();

                        println!("api_url: {}", config.api_url.value);
                        println!("  source: {}", config.api_url.source);
                        println!();

                        println!("request_timeout_secs: {}", config.request_timeout_secs.value);
                        println!("  source: {}", config.request_timeout_secs.source);
                        println!();

                        let github = &config.github;
                        println!("github:");
                        println!(
                            "  configured: {}",
                            if github.is_configured() { "yes" } else { "no" }
                        );
                        println!("  repository: {}/{}", github.owner, github.repo);
                        println!("  branch: {}", github.branch);
                        println!("  api_url: {}", github.api_url);
                        println!("  strategy: {}", github.strategy);
                        println!("  token: {}", secret_state(github.token.as_deref()));
                        println!();

                        println!("server:");
                        println!("  port: {}", config.server.port);
                        println!(
                            "  admin_token: {}",
                            secret_state(config.server.admin_token.as_deref())
                        );
                        println!();

                        println!("recommend:");
                        println!("  model: {}", config.recommend.model);
                        println!("  api_key: {}", secret_state(config.recommend.api_key.as_deref()));
                    }
                }
                Ok(())
            }
        }
    }
}
