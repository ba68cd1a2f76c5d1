//! Election results stage: participation records, then per-candidate
//! results. Both resolve their election-territory link through the
//! `LinkResolver`; participation additionally passes through the coherence
//! corrector before staging.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

use crate::cache;
use crate::coherence;
use crate::config::{file_label, LoadConfig};
use crate::domain::{ParticipationCounts, TerritoryType};
use crate::engine::{self, LoadStats, RowOutcome, RowSink};
use crate::error::{LoadError, Result};
use crate::input::{self, CandidateResultRow, ParticipationRow};
use crate::report::StageReport;
use crate::resolve::{CandidateResolver, LinkResolver};
use crate::validate;

fn territory_type(file: &str, tag: Option<&str>) -> Result<TerritoryType> {
    // Tags are validated before staging; this is the typed conversion.
    TerritoryType::parse_or_commune(tag).map_err(|e| LoadError::validation(file, e))
}

struct ParticipationSink {
    links: LinkResolver,
    seen: HashSet<(i64, String, String, i64)>,
    file: String,
}

#[async_trait]
impl RowSink for ParticipationSink {
    type Row = ParticipationRow;

    fn describe(row: &ParticipationRow) -> String {
        format!(
            "participation annee={} tour={} territoire={}",
            row.annee, row.tour, row.id_territoire
        )
    }

    async fn stage(
        &mut self,
        conn: &mut SqliteConnection,
        row: &ParticipationRow,
    ) -> Result<RowOutcome> {
        let tt = territory_type(&self.file, row.type_territoire.as_deref())?;
        let id_election = self.links.election_id(row.annee)?;

        // Reconcile before touching the store: a rejected row must not
        // leave a link behind.
        let reconciled = match coherence::reconcile(ParticipationCounts {
            inscrits: row.nombre_inscrits,
            abstentions: row.nombre_abstentions,
            votants: row.nombre_votants,
            blancs_nuls: row.nombre_blancs_nuls,
            exprimes: row.nombre_exprimes,
        }) {
            Ok(r) => r,
            Err(incoherence) => return Ok(RowOutcome::Incoherent(incoherence.reason())),
        };

        let key = (
            id_election,
            row.id_territoire.clone(),
            tt.as_str().to_string(),
            i64::from(row.tour),
        );
        if self.seen.contains(&key) {
            return Ok(RowOutcome::Duplicate);
        }

        self.links
            .resolve(conn, row.annee, &row.id_territoire, tt)
            .await?;

        let c = reconciled.counts;
        sqlx::query(
            "INSERT INTO resultat_participation
               (id_election, id_territoire, type_territoire, tour,
                nombre_inscrits, nombre_abstentions, nombre_votants,
                nombre_blancs_nuls, nombre_exprimes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(id_election)
        .bind(&row.id_territoire)
        .bind(tt.as_str())
        .bind(i64::from(row.tour))
        .bind(c.inscrits)
        .bind(c.abstentions)
        .bind(c.votants)
        .bind(c.blancs_nuls)
        .bind(c.exprimes)
        .execute(&mut *conn)
        .await?;

        self.seen.insert(key);
        Ok(RowOutcome::Inserted {
            corrections: reconciled.corrections,
        })
    }
}

struct CandidateResultSink {
    links: LinkResolver,
    candidates: CandidateResolver,
    seen: HashSet<(i64, i64, String, String, i64)>,
    file: String,
}

#[async_trait]
impl RowSink for CandidateResultSink {
    type Row = CandidateResultRow;

    fn describe(row: &CandidateResultRow) -> String {
        format!(
            "resultat annee={} tour={} territoire={} candidat={} {}",
            row.annee, row.tour, row.id_territoire, row.prenom, row.nom
        )
    }

    async fn stage(
        &mut self,
        conn: &mut SqliteConnection,
        row: &CandidateResultRow,
    ) -> Result<RowOutcome> {
        let tt = territory_type(&self.file, row.type_territoire.as_deref())?;
        // Candidate first: an unknown candidate must not create a link row.
        let id_candidat = self.candidates.resolve(&row.nom, &row.prenom)?;

        self.links
            .resolve(conn, row.annee, &row.id_territoire, tt)
            .await?;
        let id_election = self.links.election_id(row.annee)?;

        let key = (
            id_election,
            id_candidat,
            row.id_territoire.clone(),
            tt.as_str().to_string(),
            i64::from(row.tour),
        );
        if self.seen.contains(&key) {
            return Ok(RowOutcome::Duplicate);
        }

        sqlx::query(
            "INSERT INTO resultat_candidat
               (id_election, id_candidat, id_territoire, type_territoire, tour,
                nombre_voix, pourcentage_voix_inscrits, pourcentage_voix_exprimes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(id_election)
        .bind(id_candidat)
        .bind(&row.id_territoire)
        .bind(tt.as_str())
        .bind(i64::from(row.tour))
        .bind(row.nombre_voix)
        .bind(row.pourcentage_voix_inscrits)
        .bind(row.pourcentage_voix_exprimes)
        .execute(&mut *conn)
        .await?;

        self.seen.insert(key);
        Ok(RowOutcome::Inserted { corrections: 0 })
    }
}

pub async fn run(pool: &SqlitePool, config: &LoadConfig) -> Result<StageReport> {
    let mut stats = LoadStats::default();

    // Participation first: it declares most links before candidate results
    // reference them.
    let path = config.participation_csv();
    let label = file_label(&path);
    let rows: Vec<ParticipationRow> = input::read_rows(&path)?;
    validate::validate_participation(&label, &rows)?;

    let mut sink = ParticipationSink {
        links: LinkResolver::new(
            cache::election_ids_by_year(pool).await?,
            cache::link_ids(pool).await?,
            label.clone(),
        ),
        seen: cache::participation_keys(pool).await?,
        file: label,
    };
    let mut s = engine::load_in_batches(pool, &mut sink, &rows, config.batch_size).await?;
    s.parents_created = sink.links.created;
    stats.merge(&s);

    let path = config.candidats_csv();
    let label = file_label(&path);
    let rows: Vec<CandidateResultRow> = input::read_rows(&path)?;
    validate::validate_candidate_results(&label, &rows)?;

    let mut sink = CandidateResultSink {
        links: LinkResolver::new(
            cache::election_ids_by_year(pool).await?,
            cache::link_ids(pool).await?,
            label.clone(),
        ),
        candidates: CandidateResolver::new(cache::candidate_ids(pool).await?),
        seen: cache::candidate_result_keys(pool).await?,
        file: label,
    };
    let mut s = engine::load_in_batches(pool, &mut sink, &rows, config.batch_size).await?;
    s.parents_created = sink.links.created;
    stats.merge(&s);

    Ok(StageReport::new(
        "resultats",
        format!(
            "{}, {}",
            file_label(&config.participation_csv()),
            file_label(&config.candidats_csv())
        ),
        stats,
    ))
}
