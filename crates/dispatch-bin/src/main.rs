//! Message dispatcher - periodically forwards pending messages to a webhook.

mod app;
mod server;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dispatch_config_and_utils::{init_logging, Config, Paths, MAX_DISPATCH_INTERVAL_SECS};

/// Message dispatcher command-line interface.
#[derive(Parser)]
#[command(name = "message-dispatcher")]
#[command(about = "Store-and-forward message dispatcher")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Base directory for config, database and logs. Defaults to ~/.message-dispatcher
    #[arg(long, env = "DISPATCH_HOME", global = true)]
    base_dir: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Redis URL for the delivery cache
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Webhook URL messages are POSTed to
    #[arg(long, global = true)]
    webhook_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler and HTTP control surface
    Serve {
        /// Leave the scheduler stopped until started over HTTP
        #[arg(long)]
        no_autostart: bool,

        /// Address for the HTTP control surface
        #[arg(long)]
        bind: Option<String>,

        /// Seconds between dispatch cycles
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_DISPATCH_INTERVAL_SECS))]
        interval_secs: Option<u64>,

        /// Pending messages per cycle
        #[arg(long, value_parser = parse_batch_size)]
        batch_size: Option<usize>,
    },
    /// Add a pending message to the store
    Enqueue {
        #[arg(long)]
        to: String,

        #[arg(long)]
        content: String,
    },
    /// Run one dispatch cycle and print the report
    RunOnce {
        #[arg(long, value_parser = parse_batch_size)]
        batch_size: Option<usize>,
    },
    /// Print delivered messages as JSON
    Sent,
}

fn parse_batch_size(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("batch size must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        if let Some(path) = &self.db_path {
            config.database_path = Some(path.clone());
        }
        if let Some(url) = &self.redis_url {
            config.redis_url = url.clone();
        }
        if let Some(url) = &self.webhook_url {
            config.webhook_url = url.clone();
        }
        if let Some(Commands::Serve {
            bind,
            interval_secs,
            batch_size,
            ..
        }) = &self.command
        {
            if let Some(bind) = bind {
                config.bind_addr = bind.clone();
            }
            if let Some(secs) = interval_secs {
                config.dispatch_interval_secs = *secs;
            }
            if let Some(size) = batch_size {
                config.dispatch_batch_size = *size;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.base_dir {
        Some(base) => Paths::with_base_dir(base.clone()),
        None => Paths::new()?,
    };
    let (mut config, ignored_env) = Config::load(&paths)?;
    cli.apply_overrides(&mut config);

    // Only the long-running server writes a log file.
    let serving = matches!(cli.command, None | Some(Commands::Serve { .. }));
    let log_file = serving.then(|| paths.log_file());
    init_logging(&config.log_level, config.log_format()?, log_file)?;

    for ignored in &ignored_env {
        ignored.log();
    }
    config.validate()?;

    match cli.command {
        Some(Commands::Serve { no_autostart, .. }) => {
            let autostart = config.autostart && !no_autostart;
            app::run_server(config, paths, autostart).await?;
        }
        None => {
            let autostart = config.autostart;
            app::run_server(config, paths, autostart).await?;
        }
        Some(Commands::Enqueue { to, content }) => {
            app::enqueue(&config, &paths, &to, &content).await?;
        }
        Some(Commands::RunOnce { batch_size }) => {
            app::run_once(&config, &paths, batch_size).await?;
        }
        Some(Commands::Sent) => {
            app::sent(&config, &paths).await?;
        }
    }

    Ok(())
}
