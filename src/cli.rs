use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct EnrichArgs {
    /// Print ranked items without fetching details and stock
    #[clap(long, default_value = "false")]
    pub no_enrich: bool,

    /// Override enrichment deadline in milliseconds
    #[clap(long)]
    pub deadline_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the search api over http
    Daemon {
        /// Address to listen on. Defaults to `listen` from config.yaml
        #[clap(short, long)]
        listen: Option<String>,
    },
    /// Search the catalog and print results as json
    Search {
        /// Query text
        term: String,

        /// Number of results. Defaults to `search.default_page_size`
        #[clap(short = 'c', long)]
        count: Option<usize>,

        #[clap(flatten)]
        enrich_args: EnrichArgs,
    },
    /// Write a generated corpus as json
    GenCorpus {
        /// Number of products
        #[clap(short = 'n', long, default_value = "10000")]
        count: usize,

        /// Output file
        #[clap(short, long)]
        output: String,
    },
}
