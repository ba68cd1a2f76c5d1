//! Electoral referential stage: type_election -> election -> candidat ->
//! parti -> candidat_parti, in foreign-key order. The election calendar,
//! party nomenclature and candidate-party mapping are static catalogs; the
//! candidate referential comes from an optional CSV.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::cache;
use crate::config::{self, file_label, LoadConfig, ELECTIONS, ELECTION_KIND_PRES};
use crate::engine::{self, LoadStats, RowOutcome, RowSink};
use crate::error::{LoadError, Result};
use crate::input::{self, CandidateRefRow};
use crate::report::StageReport;

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| LoadError::validation("election calendar", format!("bad date '{s}': {e}")))
}

/// Get-or-create the presidential election type, returning its id.
async fn ensure_election_kind(conn: &mut SqliteConnection, stats: &mut LoadStats) -> Result<i64> {
    stats.rows_read += 1;
    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id_type_election FROM type_election WHERE code_type = ?1")
            .bind(ELECTION_KIND_PRES.code_type)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some((id,)) = existing {
        stats.skipped_duplicate += 1;
        return Ok(id);
    }

    let result = sqlx::query(
        "INSERT INTO type_election
           (code_type, nom_type, mode_scrutin, niveau_geographique, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(ELECTION_KIND_PRES.code_type)
    .bind(ELECTION_KIND_PRES.nom_type)
    .bind(ELECTION_KIND_PRES.mode_scrutin)
    .bind(ELECTION_KIND_PRES.niveau_geographique)
    .bind(ELECTION_KIND_PRES.description)
    .execute(&mut *conn)
    .await?;

    stats.inserted += 1;
    Ok(result.last_insert_rowid())
}

async fn load_elections(
    conn: &mut SqliteConnection,
    id_type_election: i64,
    stats: &mut LoadStats,
) -> Result<()> {
    for def in ELECTIONS {
        stats.rows_read += 1;
        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT id_election FROM election WHERE id_type_election = ?1 AND annee = ?2",
        )
        .bind(id_type_election)
        .bind(i64::from(def.annee))
        .fetch_optional(&mut *conn)
        .await?;

        if existing.is_some() {
            stats.skipped_duplicate += 1;
            continue;
        }

        sqlx::query(
            "INSERT INTO election
               (id_type_election, annee, date_tour1, date_tour2, nombre_tours, contexte)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(id_type_election)
        .bind(i64::from(def.annee))
        .bind(parse_date(def.date_tour1)?)
        .bind(parse_date(def.date_tour2)?)
        .bind(def.nombre_tours)
        .bind(def.contexte)
        .execute(&mut *conn)
        .await?;

        debug!(annee = def.annee, "election created");
        stats.inserted += 1;
    }
    Ok(())
}

struct CandidateSink {
    seen: HashSet<(String, String)>,
}

#[async_trait]
impl RowSink for CandidateSink {
    type Row = CandidateRefRow;

    fn describe(row: &CandidateRefRow) -> String {
        format!("candidat {} {}", row.prenom, row.nom)
    }

    async fn stage(
        &mut self,
        conn: &mut SqliteConnection,
        row: &CandidateRefRow,
    ) -> Result<RowOutcome> {
        let nom = row.nom.trim().to_string();
        let prenom = row.prenom.trim().to_string();
        if nom.is_empty() || prenom.is_empty() {
            return Ok(RowOutcome::Incoherent("blank candidate name"));
        }

        let key = (nom.clone(), prenom.clone());
        if self.seen.contains(&key) {
            return Ok(RowOutcome::Duplicate);
        }

        sqlx::query("INSERT INTO candidat (nom, prenom) VALUES (?1, ?2)")
            .bind(&nom)
            .bind(&prenom)
            .execute(&mut *conn)
            .await?;

        self.seen.insert(key);
        Ok(RowOutcome::Inserted { corrections: 0 })
    }
}

async fn load_parties(conn: &mut SqliteConnection, stats: &mut LoadStats) -> Result<()> {
    // Only nuances actually referenced by the candidate mapping are created.
    let mut codes: Vec<&str> = config::CANDIDATE_PARTY_MAP
        .iter()
        .map(|(_, code)| *code)
        .collect();
    codes.sort_unstable();
    codes.dedup();

    for code in codes {
        stats.rows_read += 1;
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id_parti FROM parti WHERE code_parti = ?1")
                .bind(code)
                .fetch_optional(&mut *conn)
                .await?;

        if existing.is_some() {
            stats.skipped_duplicate += 1;
            continue;
        }

        let (classification, nom_officiel) = config::classify_nuance(code);
        sqlx::query(
            "INSERT INTO parti (code_parti, nom_officiel, nom_court, classification_ideologique)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(code)
        .bind(&nom_officiel)
        .bind(code)
        .bind(classification)
        .execute(&mut *conn)
        .await?;

        stats.inserted += 1;
    }
    Ok(())
}

/// Affiliation date is the January 1st preceding the first loaded election,
/// by convention of the upstream nomenclature.
const AFFILIATION_DATE: &str = "2017-01-01";

async fn load_affiliations(conn: &mut SqliteConnection, stats: &mut LoadStats) -> Result<()> {
    let candidates: Vec<(i64, String, String)> =
        sqlx::query_as("SELECT id_candidat, nom, prenom FROM candidat")
            .fetch_all(&mut *conn)
            .await?;
    let date_debut = parse_date(AFFILIATION_DATE)?;

    for (id_candidat, nom, prenom) in candidates {
        stats.rows_read += 1;
        let code = match config::nuance_for_candidate(&nom) {
            Some(code) => code,
            None => {
                warn!(candidat = %format!("{prenom} {nom}"), "no party mapping, skipped");
                stats.skipped_unresolvable += 1;
                continue;
            }
        };

        let party: Option<(i64,)> =
            sqlx::query_as("SELECT id_parti FROM parti WHERE code_parti = ?1")
                .bind(code)
                .fetch_optional(&mut *conn)
                .await?;
        let Some((id_parti,)) = party else {
            stats.skipped_unresolvable += 1;
            continue;
        };

        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT id_candidat_parti FROM candidat_parti
             WHERE id_candidat = ?1 AND id_parti = ?2 AND date_debut = ?3",
        )
        .bind(id_candidat)
        .bind(id_parti)
        .bind(date_debut)
        .fetch_optional(&mut *conn)
        .await?;

        if existing.is_some() {
            stats.skipped_duplicate += 1;
            continue;
        }

        sqlx::query(
            "INSERT INTO candidat_parti (id_candidat, id_parti, date_debut, fonction)
             VALUES (?1, ?2, ?3, 'Candidat')",
        )
        .bind(id_candidat)
        .bind(id_parti)
        .bind(date_debut)
        .execute(&mut *conn)
        .await?;

        stats.inserted += 1;
    }
    Ok(())
}

pub async fn run(pool: &SqlitePool, config: &LoadConfig) -> Result<StageReport> {
    let mut stats = LoadStats::default();

    let mut tx = pool.begin().await?;
    let id_type_election = ensure_election_kind(&mut tx, &mut stats).await?;
    load_elections(&mut tx, id_type_election, &mut stats).await?;
    tx.commit().await?;
    stats.batches += 1;

    // Candidate referential is optional context: warn and move on when the
    // transformation stage has not produced it.
    let path = config.referentiel_candidats_csv();
    match input::read_rows::<CandidateRefRow>(&path) {
        Ok(rows) => {
            let mut sink = CandidateSink {
                seen: cache::candidate_keys(pool).await?,
            };
            stats.merge(&engine::load_in_batches(pool, &mut sink, &rows, config.batch_size).await?);
        }
        Err(LoadError::MissingFile(path)) => {
            warn!(file = %path.display(), "candidate referential absent, sub-stage skipped");
        }
        Err(e) => return Err(e),
    }

    let mut tx = pool.begin().await?;
    load_parties(&mut tx, &mut stats).await?;
    load_affiliations(&mut tx, &mut stats).await?;
    tx.commit().await?;
    stats.batches += 1;

    Ok(StageReport::new(
        "referentiels",
        format!("{} + static catalogs", file_label(&path)),
        stats,
    ))
}
