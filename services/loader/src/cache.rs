//! Reference cache builders.
//!
//! Each builder performs exactly one full-table read and returns an
//! in-memory lookup keyed by natural key, so per-row resolution during a
//! bulk load never issues point queries. Caches are rebuilt at the start of
//! every loader invocation; earlier stages in the same run may have written
//! the tables.

use std::collections::{HashMap, HashSet};

use sqlx::SqlitePool;

use crate::error::{LoadError, Result};
use crate::resolve::LinkKey;

/// `annee -> id_election`. Fails fast when no election master rows exist:
/// nothing referencing an election can be resolved in that state.
pub async fn election_ids_by_year(pool: &SqlitePool) -> Result<HashMap<i32, i64>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as("SELECT annee, id_election FROM election")
        .fetch_all(pool)
        .await?;

    if rows.is_empty() {
        return Err(LoadError::EmptyDependency {
            table: "election",
            hint: "run the referentiels stage first",
        });
    }

    Ok(rows
        .into_iter()
        .map(|(annee, id)| (annee as i32, id))
        .collect())
}

/// `(nom, prenom) -> id_candidat`. Fails fast when the candidate
/// referential has not been loaded.
pub async fn candidate_ids(pool: &SqlitePool) -> Result<HashMap<(String, String), i64>> {
    let rows: Vec<(String, String, i64)> =
        sqlx::query_as("SELECT nom, prenom, id_candidat FROM candidat")
            .fetch_all(pool)
            .await?;

    if rows.is_empty() {
        return Err(LoadError::EmptyDependency {
            table: "candidat",
            hint: "run the referentiels stage first",
        });
    }

    Ok(rows
        .into_iter()
        .map(|(nom, prenom, id)| ((nom, prenom), id))
        .collect())
}

/// Existing `(nom, prenom)` pairs, for loading the candidate referential
/// itself (an empty table is a valid starting state here).
pub async fn candidate_keys(pool: &SqlitePool) -> Result<HashSet<(String, String)>> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT nom, prenom FROM candidat")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

/// `code_type -> id_type` for indicator types.
pub async fn indicator_type_ids(pool: &SqlitePool) -> Result<HashMap<String, i64>> {
    let rows: Vec<(String, i64)> = sqlx::query_as("SELECT code_type, id_type FROM type_indicateur")
        .fetch_all(pool)
        .await?;

    if rows.is_empty() {
        return Err(LoadError::EmptyDependency {
            table: "type_indicateur",
            hint: "run the types_indicateurs stage first",
        });
    }

    Ok(rows.into_iter().collect())
}

/// Existing election-territory links by natural key.
pub async fn link_ids(pool: &SqlitePool) -> Result<HashMap<LinkKey, i64>> {
    let rows: Vec<(i64, String, String, i64)> = sqlx::query_as(
        "SELECT id_election, id_territoire, type_territoire, id_election_territoire
         FROM election_territoire",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id_election, id_territoire, type_territoire, id)| {
            (
                LinkKey {
                    id_election,
                    id_territoire,
                    type_territoire,
                },
                id,
            )
        })
        .collect())
}

/// Natural keys of participation rows already present in the store.
pub async fn participation_keys(pool: &SqlitePool) -> Result<HashSet<(i64, String, String, i64)>> {
    let rows: Vec<(i64, String, String, i64)> = sqlx::query_as(
        "SELECT id_election, id_territoire, type_territoire, tour FROM resultat_participation",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Natural keys of candidate result rows already present in the store.
pub async fn candidate_result_keys(
    pool: &SqlitePool,
) -> Result<HashSet<(i64, i64, String, String, i64)>> {
    let rows: Vec<(i64, i64, String, String, i64)> = sqlx::query_as(
        "SELECT id_election, id_candidat, id_territoire, type_territoire, tour
         FROM resultat_candidat",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Natural keys of indicator rows already present in the store.
pub async fn indicator_keys(
    pool: &SqlitePool,
) -> Result<HashSet<(String, String, i64, i64, Option<String>)>> {
    let rows: Vec<(String, String, i64, i64, Option<String>)> = sqlx::query_as(
        "SELECT id_territoire, type_territoire, id_type, annee, periode FROM indicateur",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

pub async fn region_ids(pool: &SqlitePool) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT id_region FROM region")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn departement_ids(pool: &SqlitePool) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT id_departement FROM departement")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn commune_ids(pool: &SqlitePool) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT id_commune FROM commune")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// `code_parti -> id_parti`.
pub async fn party_ids(pool: &SqlitePool) -> Result<HashMap<String, i64>> {
    let rows: Vec<(String, i64)> = sqlx::query_as("SELECT code_parti, id_parti FROM parti")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}
