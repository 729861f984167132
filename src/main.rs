mod commands;
mod logging;
mod reporter;

use std::io;
use std::process::ExitCode;

use aerial_sync::manifest;
use aerial_sync::notifier::Killall;
use aerial_sync::session::{self, parse_category};
use aerial_sync::storage::DiskSpace;
use aerial_sync::transport::UreqTransport;
use aerial_sync::{
    ActionExecutor, AppConfig, Catalog, PresenceMap, Scope, Session, StorageLocator, StorageRoot,
};
use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use reporter::CliReporter;
use tracing::{error, info};

fn main() -> ExitCode {
    dotenv().ok();

    let guard = logging::init_logger();

    let code = match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    };

    // Flushes the file log before the process ends.
    drop(guard);
    code
}

fn run(args: Cli) -> anyhow::Result<()> {
    let mut config =
        aerial_sync::config::load_configuration().context("Error loading configuration")?;
    args.apply(&mut config);

    match &args.command {
        Some(Commands::PrintConfig) => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Some(Commands::List { category }) => run_list(&config, category.as_deref()),
        None => run_session(&config),
    }
}

fn load(config: &AppConfig, reporter: &CliReporter) -> anyhow::Result<(StorageRoot, Catalog)> {
    let root = StorageLocator::from_config(config).resolve()?;
    info!(
        "Storage mode: {} ({})",
        format!("{}", root.mode()).cyan(),
        root.base().display()
    );

    let transport = UreqTransport::new(config.timeout());
    let source = manifest::source_from_config(config, &root);
    let catalog = manifest::fetch_catalog(source.as_ref(), &transport, config, reporter)?;
    Ok((root, catalog))
}

fn run_session(config: &AppConfig) -> anyhow::Result<()> {
    println!("Aerial wallpaper download/delete");
    println!("--------------------------------\n");

    let reporter = CliReporter::new();
    let (root, catalog) = load(config, &reporter)?;
    if catalog.is_empty() {
        println!("No assets available to process.");
        return Ok(());
    }

    let transport = UreqTransport::new(config.timeout());
    let executor = ActionExecutor::new(&root, &transport, &DiskSpace, config);
    let stdin = io::stdin();
    let mut session = Session::new(
        stdin.lock(),
        io::stdout(),
        &catalog,
        &root,
        executor,
        &Killall,
        config,
        &reporter,
    );
    session.run()?;

    let everything = catalog.list_assets(Scope::All).asset_refs();
    let present = session.presence().count_complete(&everything);
    info!(
        "{} of {} assets downloaded",
        format!("{}", present).green(),
        format!("{}", catalog.len()).cyan(),
    );
    Ok(())
}

fn run_list(config: &AppConfig, category: Option<&str>) -> anyhow::Result<()> {
    let reporter = CliReporter::new();
    let (root, catalog) = load(config, &reporter)?;
    let mut stdout = io::stdout();

    let Some(answer) = category else {
        session::render_categories(&mut stdout, &catalog)?;
        return Ok(());
    };
    let Some(scope) = parse_category(answer, catalog.categories().len()) else {
        anyhow::bail!("unknown category '{}'", answer);
    };
    let listing = catalog.list_assets(scope);
    let presence = PresenceMap::probe(&catalog, &root);
    session::render_listing(&mut stdout, &catalog, &listing, &presence)?;
    Ok(())
}
