//! Point d'entrée CLI pour cadastral-export

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use cadastral_export::cli::{self, Commands};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Exporter les objets cadastraux de PostgreSQL vers GeoPackage ou GeoJSON
#[derive(Parser)]
#[command(name = "cadastral-export")]
#[command(author, version)]
#[command(about = "Exporter les objets cadastraux de PostgreSQL vers GeoPackage ou GeoJSON WGS84")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Gpkg { output, db, report } => {
            info!(output = %output.display(), "Export vers GeoPackage");
            cli::cmd_gpkg(output, db, report).await?;
        }
        Commands::Geojson {
            output,
            group_by,
            db,
            report,
        } => {
            info!(output = %output.display(), group_by = ?group_by, "Export vers GeoJSON");
            cli::cmd_geojson(output, group_by, db, report).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
