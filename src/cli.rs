use crate::config::{self, Config};
use crate::llm::{probe, ProviderRegistry, ReqwestTransport, SummarizeError, Transport};
use crate::pipeline::Summarizer;
use crate::search::{Category, Query};
use crate::search_log::SearchLog;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "seeker", version, about = "Search the web and summarize the results with an LLM")]
pub struct Cli {
    /// Config file (default: ~/.config/seeker/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search and summarize
    Search {
        /// Query text
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// web, image, video, place, news, shopping, scholarly or patent
        #[arg(short, long, default_value = "web")]
        category: Category,

        /// Provider to try first (default: preferred_provider from config)
        #[arg(short, long)]
        provider: Option<String>,

        /// Also print the raw search results
        #[arg(long)]
        show_results: bool,

        /// Save the summary as a Markdown file in this directory
        #[arg(long, value_name = "DIR")]
        save: Option<PathBuf>,
    },
    /// List configured providers in failover order
    Providers,
    /// Check which providers are reachable
    Probe,
    /// Show recently logged queries
    History {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => config::load_from_path(path)?,
        None => config::load_or_create_config()?,
    };
    let _log_guard = crate::logging::init(&config)?;

    match cli.command {
        Command::Search {
            query,
            category,
            provider,
            show_results,
            save,
        } => {
            let preferred = provider.unwrap_or_else(|| config.preferred_provider.clone());
            let query = Query::new(query.join(" "), category);
            search(&config, query, &preferred, show_results, save.as_deref()).await
        }
        Command::Providers => providers(&config),
        Command::Probe => probe_all(&config).await,
        Command::History { limit } => history(&config, limit),
    }
}

async fn search(
    config: &Config,
    query: Query,
    preferred: &str,
    show_results: bool,
    save: Option<&Path>,
) -> Result<()> {
    let summarizer = Summarizer::from_config(config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match summarizer.summarize(&query, preferred, &cancel).await {
        Ok(summary) => {
            if show_results {
                for (idx, result) in summary.results.iter().enumerate() {
                    println!("{}. {}\n   {}", idx + 1, result.title, result.link);
                    if let Some(snippet) = result.snippet() {
                        println!("   {snippet}");
                    }
                }
                println!();
            }
            println!("{}", summary.response.text);
            eprintln!("\n(summarized by {})", summary.response.provider);
            if let Some(dir) = save {
                let path = summary.save_markdown(dir)?;
                eprintln!("Saved to {}", path.display());
            }
            Ok(())
        }
        Err(SummarizeError::Cancelled) => {
            eprintln!("Cancelled.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn providers(config: &Config) -> Result<()> {
    let registry = ProviderRegistry::from_settings(&config.providers)
        .context("Invalid provider configuration")?;

    for provider in registry.providers() {
        let marker = if provider.name == config.preferred_provider { "*" } else { " " };
        let status = if provider.enabled() {
            "enabled"
        } else {
            "disabled (missing API key)"
        };
        println!(
            "{marker} {:<10} {:<40} {:<24} {status}",
            provider.name, provider.endpoint_base_url, provider.default_model
        );
    }
    Ok(())
}

async fn probe_all(config: &Config) -> Result<()> {
    let registry = ProviderRegistry::from_settings(&config.providers)
        .context("Invalid provider configuration")?;
    let transport = ReqwestTransport::new();
    let transport: &dyn Transport = &transport;

    let enabled: Vec<_> = registry.providers().iter().filter(|p| p.enabled()).collect();
    let results = futures::future::join_all(enabled.iter().map(|p| probe(transport, p))).await;

    for provider in registry.providers().iter().filter(|p| !p.enabled()) {
        println!("{:<10} disabled (missing API key)", provider.name);
    }
    for (provider, availability) in enabled.iter().zip(results) {
        println!("{:<10} {availability}", provider.name);
    }
    Ok(())
}

fn history(config: &Config, limit: usize) -> Result<()> {
    let log = SearchLog::from_config(config)?;
    let entries = log.entries()?;
    if entries.is_empty() {
        println!("No queries logged yet ({}).", log.path().display());
        return Ok(());
    }

    for entry in entries.iter().take(limit) {
        println!(
            "{}  {:<9} {:<10} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.source,
            entry.ai_provider,
            entry.query
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_command() {
        let cli = Cli::try_parse_from([
            "seeker", "search", "rust", "async", "-c", "scholar", "-p", "groq",
        ])
        .unwrap();

        match cli.command {
            Command::Search {
                query,
                category,
                provider,
                show_results,
                save,
            } => {
                assert_eq!(query, ["rust", "async"]);
                assert!(save.is_none());
                assert_eq!(category, Category::Scholarly);
                assert_eq!(provider.as_deref(), Some("groq"));
                assert!(!show_results);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_save_directory() {
        let cli = Cli::try_parse_from(["seeker", "search", "q", "--save", "notes"]).unwrap();
        match cli.command {
            Command::Search { save, .. } => assert_eq!(save, Some(PathBuf::from("notes"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_category() {
        assert!(Cli::try_parse_from(["seeker", "search", "q", "-c", "podcasts"]).is_err());
    }

    #[test]
    fn history_default_limit() {
        let cli = Cli::try_parse_from(["seeker", "history"]).unwrap();
        assert!(matches!(cli.command, Command::History { limit: 20 }));
    }
}
