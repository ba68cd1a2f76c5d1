//! Geographic hierarchy stage: region -> departement -> commune, in
//! foreign-key order. Each level runs through the batch engine with the
//! parent id set preloaded; a row referencing a missing parent is skipped,
//! not fatal.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

use crate::cache;
use crate::config::{file_label, LoadConfig};
use crate::engine::{self, LoadStats, RowOutcome, RowSink};
use crate::error::{LoadError, Result};
use crate::input::{self, CommuneRow, DepartementRow, RegionRow};
use crate::report::StageReport;
use crate::validate;

struct RegionSink {
    seen: HashSet<String>,
}

#[async_trait]
impl RowSink for RegionSink {
    type Row = RegionRow;

    fn describe(row: &RegionRow) -> String {
        format!("region {}", row.id_region)
    }

    async fn stage(&mut self, conn: &mut SqliteConnection, row: &RegionRow) -> Result<RowOutcome> {
        if self.seen.contains(&row.id_region) {
            return Ok(RowOutcome::Duplicate);
        }

        sqlx::query("INSERT INTO region (id_region, code_insee, nom_region) VALUES (?1, ?2, ?3)")
            .bind(&row.id_region)
            .bind(&row.code_insee)
            .bind(&row.nom_region)
            .execute(&mut *conn)
            .await?;

        self.seen.insert(row.id_region.clone());
        Ok(RowOutcome::Inserted { corrections: 0 })
    }
}

struct DepartementSink {
    regions: HashSet<String>,
    seen: HashSet<String>,
}

#[async_trait]
impl RowSink for DepartementSink {
    type Row = DepartementRow;

    fn describe(row: &DepartementRow) -> String {
        format!("departement {}", row.id_departement)
    }

    async fn stage(
        &mut self,
        conn: &mut SqliteConnection,
        row: &DepartementRow,
    ) -> Result<RowOutcome> {
        if !self.regions.contains(&row.id_region) {
            return Err(LoadError::MissingDependency {
                entity: "region",
                key: row.id_region.clone(),
            });
        }
        if self.seen.contains(&row.id_departement) {
            return Ok(RowOutcome::Duplicate);
        }

        sqlx::query(
            "INSERT INTO departement
               (id_departement, id_region, code_insee, nom_departement, population, chef_lieu)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&row.id_departement)
        .bind(&row.id_region)
        .bind(&row.code_insee)
        .bind(&row.nom_departement)
        .bind(row.population)
        .bind(&row.chef_lieu)
        .execute(&mut *conn)
        .await?;

        self.seen.insert(row.id_departement.clone());
        Ok(RowOutcome::Inserted { corrections: 0 })
    }
}

struct CommuneSink {
    departements: HashSet<String>,
    seen: HashSet<String>,
}

#[async_trait]
impl RowSink for CommuneSink {
    type Row = CommuneRow;

    fn describe(row: &CommuneRow) -> String {
        format!("commune {}", row.id_commune)
    }

    async fn stage(&mut self, conn: &mut SqliteConnection, row: &CommuneRow) -> Result<RowOutcome> {
        if !self.departements.contains(&row.id_departement) {
            return Err(LoadError::MissingDependency {
                entity: "departement",
                key: row.id_departement.clone(),
            });
        }
        if self.seen.contains(&row.id_commune) {
            return Ok(RowOutcome::Duplicate);
        }

        sqlx::query(
            "INSERT INTO commune
               (id_commune, id_departement, code_insee, nom_commune, population)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&row.id_commune)
        .bind(&row.id_departement)
        .bind(&row.code_insee)
        .bind(&row.nom_commune)
        .bind(row.population)
        .execute(&mut *conn)
        .await?;

        self.seen.insert(row.id_commune.clone());
        Ok(RowOutcome::Inserted { corrections: 0 })
    }
}

pub async fn run(pool: &SqlitePool, config: &LoadConfig) -> Result<StageReport> {
    let mut stats = LoadStats::default();

    let path = config.regions_csv();
    let rows: Vec<RegionRow> = input::read_rows(&path)?;
    validate::validate_regions(&file_label(&path), &rows)?;
    let mut sink = RegionSink {
        seen: cache::region_ids(pool).await?,
    };
    stats.merge(&engine::load_in_batches(pool, &mut sink, &rows, config.batch_size).await?);

    // Parent sets are re-read after each level so this run's inserts count.
    let path = config.departements_csv();
    let rows: Vec<DepartementRow> = input::read_rows(&path)?;
    validate::validate_departements(&file_label(&path), &rows)?;
    let mut sink = DepartementSink {
        regions: cache::region_ids(pool).await?,
        seen: cache::departement_ids(pool).await?,
    };
    stats.merge(&engine::load_in_batches(pool, &mut sink, &rows, config.batch_size).await?);

    let path = config.communes_csv();
    let rows: Vec<CommuneRow> = input::read_rows(&path)?;
    validate::validate_communes(&file_label(&path), &rows)?;
    let mut sink = CommuneSink {
        departements: cache::departement_ids(pool).await?,
        seen: cache::commune_ids(pool).await?,
    };
    stats.merge(&engine::load_in_batches(pool, &mut sink, &rows, config.batch_size).await?);

    Ok(StageReport::new(
        "geographie",
        format!(
            "{}, {}, {}",
            file_label(&config.regions_csv()),
            file_label(&config.departements_csv()),
            file_label(&config.communes_csv())
        ),
        stats,
    ))
}
