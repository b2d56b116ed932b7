//! Rapport d'export
//!
//! Les erreurs par ligne ne sont pas fatales : la ligne est écartée et
//! comptée ici, l'export continue.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

/// Nombre d'erreurs détaillées affichées sur la console
const DISPLAYED_ERRORS: usize = 20;

/// Statut global de l'export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportStatus {
    /// Tous les objets ont été exportés
    Success,
    /// Des objets ont été écartés
    PartialSuccess,
    /// Aucun objet exporté alors que des lignes ont été écartées
    Failed,
}

/// Ligne écartée
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    /// Code de l'objet, absent si la ligne n'a pas pu être décodée
    pub code: Option<i64>,
    pub kind: String,
    pub message: String,
}

/// Rapport complet d'un export
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    /// Format de sortie (`gpkg`, `geojson`)
    pub format: String,
    pub duration_secs: f64,
    pub status: ExportStatus,

    /// Lignes lues en base
    pub rows_fetched: usize,
    pub objects_exported: usize,
    pub objects_skipped: usize,
    /// Lignes écartées par catégorie d'erreur
    pub skipped_by_kind: BTreeMap<String, usize>,

    /// Fichiers produits
    pub files: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

impl ExportReport {
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
            duration_secs: 0.0,
            status: ExportStatus::Success,
            rows_fetched: 0,
            objects_exported: 0,
            objects_skipped: 0,
            skipped_by_kind: BTreeMap::new(),
            files: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn record_fetched(&mut self, rows: usize) {
        self.rows_fetched += rows;
    }

    /// Enregistre un objet exporté
    pub fn record_exported(&mut self) {
        self.objects_exported += 1;
    }

    /// Enregistre une ligne écartée
    pub fn record_skip(&mut self, code: Option<i64>, kind: &str, message: &str) {
        self.objects_skipped += 1;
        *self.skipped_by_kind.entry(kind.to_string()).or_default() += 1;
        self.skipped.push(SkippedRow {
            code,
            kind: kind.to_string(),
            message: message.to_string(),
        });
    }

    pub fn record_file(&mut self, path: &Path) {
        self.files.push(path.display().to_string());
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = match (self.objects_exported, self.objects_skipped) {
            (_, 0) => ExportStatus::Success,
            (0, _) => ExportStatus::Failed,
            _ => ExportStatus::PartialSuccess,
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("EXPORT REPORT - {}", self.format.to_uppercase());
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Objects: {} fetched, {} exported, {} skipped",
            self.rows_fetched, self.objects_exported, self.objects_skipped
        );

        if !self.skipped_by_kind.is_empty() {
            println!("\n--- SKIPPED BY KIND ---");
            for (kind, count) in &self.skipped_by_kind {
                println!("  {}: {}", kind, count);
            }
        }

        if !self.files.is_empty() {
            println!("\n--- FILES ({}) ---", self.files.len());
            for file in &self.files {
                println!("  {}", file);
            }
        }

        if !self.skipped.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.skipped.len());
            for row in self.skipped.iter().take(DISPLAYED_ERRORS) {
                let location = row.code.map(|c| format!("[{}] ", c)).unwrap_or_default();
                println!("  {}{}: {}", location, row.kind, row.message);
            }
            if self.skipped.len() > DISPLAYED_ERRORS {
                println!("  ... and {} more", self.skipped.len() - DISPLAYED_ERRORS);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} exported, {} skipped, {} file(s)",
            self.format,
            self.objects_exported,
            self.objects_skipped,
            self.files.len()
        )
    }
}
