//! Input file reading: typed CSV rows per stage.
//!
//! The transformation stage owns column naming; this module trusts the
//! documented columns but a deserialize failure (missing required column,
//! unparsable value) is a structural `Validation` error that aborts the
//! stage before any row is staged.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::file_label;
use crate::error::{LoadError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct RegionRow {
    pub id_region: String,
    pub code_insee: String,
    pub nom_region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartementRow {
    pub id_departement: String,
    pub id_region: String,
    pub code_insee: String,
    pub nom_departement: String,
    #[serde(default)]
    pub population: Option<i64>,
    #[serde(default)]
    pub chef_lieu: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommuneRow {
    pub id_commune: String,
    pub id_departement: String,
    pub code_insee: String,
    pub nom_commune: String,
    #[serde(default)]
    pub population: Option<i64>,
}

/// Unique-candidate referential row.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateRefRow {
    pub nom: String,
    pub prenom: String,
}

/// One participation record per territory and round.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipationRow {
    pub annee: i32,
    pub tour: i32,
    pub id_territoire: String,
    /// Defaults to COMMUNE downstream when absent.
    #[serde(default)]
    pub type_territoire: Option<String>,
    pub nombre_inscrits: i64,
    pub nombre_abstentions: i64,
    pub nombre_votants: i64,
    pub nombre_blancs_nuls: i64,
    pub nombre_exprimes: i64,
}

/// One candidate result per territory, round and candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateResultRow {
    pub annee: i32,
    pub tour: i32,
    pub id_territoire: String,
    #[serde(default)]
    pub type_territoire: Option<String>,
    pub nom: String,
    pub prenom: String,
    pub nombre_voix: i64,
    #[serde(default)]
    pub pourcentage_voix_inscrits: Option<f64>,
    #[serde(default)]
    pub pourcentage_voix_exprimes: Option<f64>,
}

/// One EAV indicator row.
#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorRow {
    pub id_territoire: String,
    #[serde(default)]
    pub type_territoire: Option<String>,
    pub code_type: String,
    pub annee: i32,
    #[serde(default)]
    pub periode: Option<String>,
    pub valeur_numerique: f64,
    #[serde(default)]
    pub valeur_texte: Option<String>,
    #[serde(default)]
    pub source_detail: Option<String>,
    #[serde(default)]
    pub fiabilite: Option<String>,
}

/// Read a whole CSV file into typed rows. Fails with `MissingFile` when the
/// path does not exist and with `Validation` on the first malformed row.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.is_file() {
        return Err(LoadError::MissingFile(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    // UTF-8 BOM shows up in files exported from spreadsheet tools.
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<T>().enumerate() {
        let row = result.map_err(|e| {
            LoadError::validation(
                file_label(path),
                // +2: 1-indexed plus header line
                format!("line {}: {}", idx + 2, e),
            )
        })?;
        rows.push(row);
    }

    Ok(rows)
}
