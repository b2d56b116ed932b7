//! Définition et implémentation des commandes CLI
//!
//! - `gpkg`: PostgreSQL → GeoPackage (Web Mercator)
//! - `geojson`: PostgreSQL → GeoJSON WGS84, éventuellement un fichier par
//!   valeur de propriété

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::{info, warn};

use crate::pipeline;
use crate::report::ExportReport;
use crate::source::{create_pool, fetch_objects, test_connection, CadastralObject, DatabaseConfig};

#[derive(Subcommand)]
pub enum Commands {
    /// Export cadastral objects to a GeoPackage file
    Gpkg {
        /// Output GeoPackage file (replaced if it exists)
        #[arg(short, long, default_value = "cadastral_objects.gpkg")]
        output: PathBuf,

        #[command(flatten)]
        db: DatabaseArgs,

        /// Write the export report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Export cadastral objects to WGS84 GeoJSON
    Geojson {
        /// Output GeoJSON file, or directory/base name when grouping
        #[arg(short, long, default_value = "cadastral_objects.geojson")]
        output: PathBuf,

        /// Write one file per value of this property
        #[arg(short, long)]
        group_by: Option<String>,

        #[command(flatten)]
        db: DatabaseArgs,

        /// Write the export report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// Paramètres de connexion, prioritaires sur l'environnement
#[derive(Args, Debug, Default, Clone)]
pub struct DatabaseArgs {
    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// PostgreSQL database name (défaut : env PGDATABASE / postgres)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,
}

/// Exécute la commande gpkg
pub async fn cmd_gpkg(output: PathBuf, db: DatabaseArgs, report_path: Option<PathBuf>) -> Result<()> {
    let start = Instant::now();
    let mut report = ExportReport::new("gpkg");
    let objects = load_objects(db, &mut report).await?;

    let (export, mut report) = tokio::task::spawn_blocking(move || -> Result<_> {
        let export = pipeline::export_gpkg(&output, &objects, &mut report)?;
        Ok((export, report))
    })
    .await
    .context("GeoPackage writer task failed")??;

    if let Some(extent) = export.extent {
        info!(
            min_x = extent.min_x,
            min_y = extent.min_y,
            max_x = extent.max_x,
            max_y = extent.max_y,
            "Layer extent"
        );
    }
    finish(&mut report, start, report_path.as_deref())
}

/// Exécute la commande geojson
pub async fn cmd_geojson(
    output: PathBuf,
    group_by: Option<String>,
    db: DatabaseArgs,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let start = Instant::now();
    let mut report = ExportReport::new("geojson");
    let objects = load_objects(db, &mut report).await?;

    let (_, mut report) = tokio::task::spawn_blocking(move || -> Result<_> {
        let files = pipeline::export_geojson(&output, group_by.as_deref(), &objects, &mut report)?;
        Ok((files, report))
    })
    .await
    .context("GeoJSON writer task failed")??;

    finish(&mut report, start, report_path.as_deref())
}

/// Connexion à la base et lecture des objets exportables
async fn load_objects(db: DatabaseArgs, report: &mut ExportReport) -> Result<Vec<CadastralObject>> {
    let mut db_config = DatabaseConfig::from_env();
    apply_database_overrides(&mut db_config, db);
    info!(
        user = %db_config.user,
        host = %db_config.host,
        port = db_config.port,
        database = %db_config.dbname,
        ssl = ?db_config.ssl_mode,
        "Connecting to PostgreSQL"
    );

    let pool = create_pool(&db_config).await?;
    test_connection(&pool).await?;

    let fetched = fetch_objects(&pool).await?;
    report.record_fetched(fetched.objects.len() + fetched.rejected.len());
    for (_, message) in &fetched.rejected {
        report.record_skip(None, "RowDecode", message);
    }
    Ok(fetched.objects)
}

fn finish(report: &mut ExportReport, start: Instant, report_path: Option<&Path>) -> Result<()> {
    report.set_duration(start.elapsed());
    report.finalize();
    report.display();

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report saved");
    }
    info!("{}", report.summary());
    Ok(())
}

/// Applique les options de connexion de la ligne de commande
pub fn apply_database_overrides(config: &mut DatabaseConfig, args: DatabaseArgs) {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(database) = args.database {
        config.dbname = database;
    }
    if let Some(user) = args.user {
        config.user = user;
    }
    if let Some(password) = args.password {
        config.password = Some(password);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(ssl) = args.ssl {
        match ssl.parse() {
            Ok(mode) => config.ssl_mode = mode,
            Err(e) => warn!("{}; keeping {:?}", e, config.ssl_mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SslMode;

    #[test]
    fn test_overrides_applied() {
        let mut config = DatabaseConfig::default();
        apply_database_overrides(
            &mut config,
            DatabaseArgs {
                host: Some("pg.kazan.local".into()),
                port: Some(5433),
                database: Some("cadastre".into()),
                user: None,
                password: Some("pw".into()),
                ssl: Some("require".into()),
            },
        );
        assert_eq!(config.host, "pg.kazan.local");
        assert_eq!(config.port, 5433);
        assert_eq!(config.dbname, "cadastre");
        assert_eq!(config.user, "postgres");
        assert_eq!(config.password.as_deref(), Some("pw"));
        assert_eq!(config.ssl_mode, SslMode::Require);
    }

    #[test]
    fn test_invalid_ssl_keeps_mode() {
        let mut config = DatabaseConfig {
            ssl_mode: SslMode::Prefer,
            ..Default::default()
        };
        apply_database_overrides(
            &mut config,
            DatabaseArgs {
                ssl: Some("sometimes".into()),
                ..Default::default()
            },
        );
        assert_eq!(config.ssl_mode, SslMode::Prefer);
    }
}
