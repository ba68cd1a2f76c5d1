//! Indicator type catalog stage. The catalog is static and small; rows are
//! get-or-created in a single transaction.

use sqlx::SqlitePool;
use tracing::debug;

use crate::config::INDICATOR_TYPES;
use crate::engine::LoadStats;
use crate::error::Result;
use crate::report::StageReport;

pub async fn run(pool: &SqlitePool) -> Result<StageReport> {
    let mut stats = LoadStats {
        rows_read: INDICATOR_TYPES.len() as u64,
        ..LoadStats::default()
    };

    let mut tx = pool.begin().await?;

    for def in INDICATOR_TYPES {
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id_type FROM type_indicateur WHERE code_type = ?1")
                .bind(def.code_type)
                .fetch_optional(&mut *tx)
                .await?;

        if existing.is_some() {
            stats.skipped_duplicate += 1;
            continue;
        }

        sqlx::query(
            "INSERT INTO type_indicateur
               (code_type, categorie, nom_affichage, description, unite_mesure,
                source_officielle, frequence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(def.code_type)
        .bind(def.categorie)
        .bind(def.nom_affichage)
        .bind(def.description)
        .bind(def.unite_mesure)
        .bind(def.source_officielle)
        .bind(def.frequence)
        .execute(&mut *tx)
        .await?;

        debug!(code_type = def.code_type, "indicator type created");
        stats.inserted += 1;
    }

    tx.commit().await?;
    stats.batches = 1;

    Ok(StageReport::new(
        "types_indicateurs",
        "static catalog (SSMSI)",
        stats,
    ))
}
