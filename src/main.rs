use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use thaiflash::app::render;
use thaiflash::{App, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "thaiflash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Seed for reproducible card order
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Directory holding progress records
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Practice with adaptive flashcards (default)
    Practice,
    /// Drill the items flagged as unfamiliar
    Drill,
    /// Show stage progress, trouble items and today's counters
    Stats,
    /// Flag an item as unfamiliar
    Flag {
        /// Item id, as listed by `items`
        id: String,
    },
    /// Remove the unfamiliar flag from an item
    Unflag {
        /// Item id, as listed by `items`
        id: String,
    },
    /// List every item in the catalog
    Items,
    /// Forget all item and stage progress
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, cards go to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thaiflash=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    let mut app = App::new(config, cli.seed)?;

    match cli.command.unwrap_or(Commands::Practice) {
        Commands::Practice => app.run().await?,
        Commands::Drill => {
            if let Err(e) = app.trainer_mut().start_unfamiliar_drill() {
                bail!(e.user_message());
            }
            app.run().await?;
        }
        Commands::Stats => print!("{}", render::stats(app.trainer())),
        Commands::Flag { id } => {
            app.trainer_mut().set_manual_flag(&id, true)?;
            println!("Flagged {}", id);
        }
        Commands::Unflag { id } => {
            app.trainer_mut().set_manual_flag(&id, false)?;
            println!("Unflagged {}", id);
        }
        Commands::Items => print!("{}", render::items(app.trainer())),
        Commands::Reset => {
            app.trainer_mut().reset_all_progress();
            println!("Progress reset. Flags and daily streak were kept.");
        }
    }

    Ok(())
}
