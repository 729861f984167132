use clap::{Parser, Subcommand};

use aerial_sync::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "aerial-sync")]
#[command(about = "Download or delete macOS aerial wallpapers", long_about = None)]
pub struct Cli {
    /// Fetch the manifest from this URL instead of the local entries.json
    #[arg(long, global = true)]
    pub manifest_url: Option<String>,

    /// Number of concurrent downloads
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Flags win over file and environment configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.manifest_url {
            config.manifest_url = Some(url.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print categories, or the assets of one category ("all" for every asset)
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Print configuration values
    PrintConfig,
}
