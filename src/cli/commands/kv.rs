//! Key-value store CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::commands::AppContext;
use crate::cli::output::{self, print_json, truncate};
use crate::domain::ports::DEFAULT_NAMESPACE;

#[derive(Args, Debug)]
pub struct KvArgs {
    #[command(subcommand)]
    pub command: KvCommands,
}

#[derive(Subcommand, Debug)]
pub enum KvCommands {
    /// Store a JSON value
    Store {
        /// Key
        key: String,
        /// JSON value
        value: String,
        /// Namespace
        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
    /// Retrieve a value
    Get {
        /// Key
        key: String,
        /// Namespace
        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
    /// Search keys (`*` matches all, otherwise substring)
    Search {
        /// Pattern
        pattern: String,
        /// Namespace
        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
    /// Delete a key
    Delete {
        /// Key
        key: String,
        /// Namespace
        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
    /// List namespaces
    Namespaces,
    /// Show store statistics
    Stats,
}

pub async fn handle(ctx: &AppContext, args: KvArgs, json: bool) -> Result<()> {
    match args.command {
        KvCommands::Store {
            key,
            value,
            namespace,
        } => {
            let value = serde_json::from_str(&value).context("value must be valid JSON")?;
            let receipt = ctx.kv.store(&key, value, &namespace).await;
            if json {
                print_json(&receipt)?;
            } else if receipt.is_success() {
                output::success(&format!("stored {namespace}/{key}"));
            } else {
                output::failure(&format!(
                    "store failed: {}",
                    receipt.error.unwrap_or_default()
                ));
            }
        }
        KvCommands::Get { key, namespace } => {
            match ctx.kv.retrieve(&key, &namespace).await? {
                Some(value) => print_json(&value)?,
                None => output::note(&format!("{namespace}/{key} not found")),
            }
        }
        KvCommands::Search { pattern, namespace } => {
            let matches = ctx.kv.search(&pattern, &namespace).await?;
            if json {
                print_json(&matches)?;
            } else {
                let mut table = output::table(&["key", "value"]);
                let mut keys: Vec<&String> = matches.keys().collect();
                keys.sort();
                for key in keys {
                    table.add_row(vec![
                        key.clone(),
                        truncate(&matches[key].to_string(), 60),
                    ]);
                }
                println!("{table}");
            }
        }
        KvCommands::Delete { key, namespace } => {
            let deleted = ctx.kv.delete(&key, &namespace).await?;
            if json {
                print_json(&serde_json::json!({ "deleted": deleted }))?;
            } else if deleted {
                output::success(&format!("deleted {namespace}/{key}"));
            } else {
                output::note(&format!("{namespace}/{key} was not present"));
            }
        }
        KvCommands::Namespaces => {
            let namespaces = ctx.kv.list_namespaces().await?;
            if json {
                print_json(&namespaces)?;
            } else if namespaces.is_empty() {
                output::note("store is empty");
            } else {
                for namespace in namespaces {
                    println!("{namespace}");
                }
            }
        }
        KvCommands::Stats => {
            let stats = ctx.kv.stats().await?;
            if json {
                print_json(&stats)?;
            } else {
                println!("entries:       {}", stats.entries);
                println!("size:          {} bytes", stats.size_bytes);
                println!(
                    "last modified: {}",
                    stats
                        .last_modified
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string())
                );
                println!("namespaces:    {}", stats.namespaces.join(", "));
            }
        }
    }
    Ok(())
}
