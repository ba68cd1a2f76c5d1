//! Socio-economic indicator stage. Indicators are attribute-value rows
//! keyed by `(territoire, type, annee, periode)`; the type referential must
//! already exist.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

use crate::cache;
use crate::config::{file_label, LoadConfig};
use crate::domain::TerritoryType;
use crate::engine::{self, RowOutcome, RowSink};
use crate::error::{LoadError, Result};
use crate::input::{self, IndicatorRow};
use crate::report::StageReport;
use crate::validate;

struct IndicatorSink {
    types: HashMap<String, i64>,
    seen: HashSet<(String, String, i64, i64, Option<String>)>,
    file: String,
}

#[async_trait]
impl RowSink for IndicatorSink {
    type Row = IndicatorRow;

    fn describe(row: &IndicatorRow) -> String {
        format!(
            "indicateur territoire={} type={} annee={} periode={:?}",
            row.id_territoire, row.code_type, row.annee, row.periode
        )
    }

    async fn stage(
        &mut self,
        conn: &mut SqliteConnection,
        row: &IndicatorRow,
    ) -> Result<RowOutcome> {
        let tt = TerritoryType::parse_or_commune(row.type_territoire.as_deref())
            .map_err(|e| LoadError::validation(&self.file, e))?;

        let id_type = self
            .types
            .get(row.code_type.trim())
            .copied()
            .ok_or_else(|| LoadError::MissingDependency {
                entity: "type_indicateur",
                key: row.code_type.clone(),
            })?;

        let key = (
            row.id_territoire.clone(),
            tt.as_str().to_string(),
            id_type,
            i64::from(row.annee),
            row.periode.clone(),
        );
        if self.seen.contains(&key) {
            return Ok(RowOutcome::Duplicate);
        }

        sqlx::query(
            "INSERT INTO indicateur
               (id_territoire, type_territoire, id_type, annee, periode,
                valeur_numerique, valeur_texte, source_detail, fiabilite)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&row.id_territoire)
        .bind(tt.as_str())
        .bind(id_type)
        .bind(i64::from(row.annee))
        .bind(&row.periode)
        .bind(row.valeur_numerique)
        .bind(&row.valeur_texte)
        .bind(&row.source_detail)
        .bind(row.fiabilite.as_deref().unwrap_or("CONFIRME"))
        .execute(&mut *conn)
        .await?;

        self.seen.insert(key);
        Ok(RowOutcome::Inserted { corrections: 0 })
    }
}

pub async fn run(pool: &SqlitePool, config: &LoadConfig) -> Result<StageReport> {
    let path = config.securite_csv();
    let label = file_label(&path);
    let rows: Vec<IndicatorRow> = input::read_rows(&path)?;
    validate::validate_indicators(&label, &rows)?;

    let mut sink = IndicatorSink {
        types: cache::indicator_type_ids(pool).await?,
        seen: cache::indicator_keys(pool).await?,
        file: label.clone(),
    };
    let stats = engine::load_in_batches(pool, &mut sink, &rows, config.batch_size).await?;

    Ok(StageReport::new("indicateurs", label, stats))
}
