mod cli;

use clap::Parser;
use owo_colors::OwoColorize;

use flickrfs_daemon::{logging, AppConfig};

use cli::{Cli, Op, OpContext};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.cache_path {
        let path = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()?.join(path)
        };
        config.cache.path = Some(path);
    }
    if let Some(capacity) = cli.cache_capacity {
        config.cache.capacity = capacity;
    }
    config.validate()?;

    // one-shot commands only report problems
    if !cli.command.is_daemon() {
        config.log.level = "warn".to_string();
        config.log.dir = None;
    }
    let _log_guard = logging::init(&config.log)?;

    let ctx = OpContext { config };
    let output = cli.command.execute(&ctx).await?;
    println!("{}", output);
    Ok(())
}
