use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "reviewbot", about = "Automated LLM-driven merge/pull request review bot")]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, global = true, default_value = "./reviewbot.yaml")]
    pub config: String,

    /// `trace|debug|info|warn|error`, forwarded to the `tracing` subscriber.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve webhooks until terminated.
    Run,
    /// Poll a project periodically for open merge/pull requests.
    Poll {
        project_id: String,
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },
    /// Review a single merge/pull request once, synchronously.
    Review {
        project_id: String,
        iid: u64,
        /// Review even if the merge/pull request is closed or merged.
        #[arg(long)]
        force: bool,
    },
}
