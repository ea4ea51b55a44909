use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

mod app;
mod cli;
mod config;
mod enrich;
mod providers;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use app::AppFactory;
use enrich::EnrichedItem;
use semantic::{Corpus, ScoredItem};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchOutput {
    result: Vec<EnrichedItem>,
    recommended_ad: Option<EnrichedItem>,
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Daemon { listen } => {
            let config = AppFactory::create_config()?;
            let listen = listen.unwrap_or_else(|| config.listen.clone());
            let service = AppFactory::create_service(&config)?;

            web::start_daemon(service, &listen)
        }

        cli::Command::Search {
            term,
            count,
            enrich_args,
        } => {
            let config = AppFactory::create_config()?;
            let service = AppFactory::create_service(&config)?;
            let page_size = count.unwrap_or_else(|| service.default_page_size());

            if enrich_args.no_enrich {
                let items: Vec<ScoredItem> = service.search(&term, page_size);
                println!("{}", serde_json::to_string_pretty(&items)?);
                return Ok(());
            }

            let deadline = enrich_args
                .deadline_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| service.default_deadline());

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            let enrichment = runtime.block_on(service.search_and_enrich(&term, page_size, deadline));

            let output = SearchOutput {
                result: enrichment.items,
                recommended_ad: enrichment.recommendation,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }

        cli::Command::GenCorpus { count, output } => {
            let corpus = Corpus::generate(count);
            corpus
                .save(Path::new(&output))
                .with_context(|| format!("Failed to write corpus to {output}"))?;

            log::info!("wrote {} products to {output}", corpus.len());
            Ok(())
        }
    }
}
