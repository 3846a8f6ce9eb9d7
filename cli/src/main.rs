mod config;
mod launcher;
mod ui;

use clap::{Parser, Subcommand};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = ui::app_name())]
#[command(about = ui::build_banner())]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the relay hub
    Run {
        /// Path to config.toml file
        #[arg(short, long, default_value = "config.toml")]
        config: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = tools::setup_application(env!("CARGO_PKG_NAME")) {
        eprintln!("Failed to initialize application: {e:?}");
        #[allow(clippy::exit)]
        std::process::exit(1);
    }

    let cli = Cli::parse();

    let result = match cli.commands {
        Commands::Version => {
            ui::print_version();
            Ok(())
        }
        Commands::Run { config } => launcher::start(config).await,
    };

    if let Err(e) = result {
        tracing::error!("Application failed: {e:?}");
        #[allow(clippy::exit)]
        std::process::exit(1);
    }
}
