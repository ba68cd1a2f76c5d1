//! Referential resolution for election-territory links.
//!
//! A fact row references its election-territory declaration by natural key;
//! the resolver returns the surrogate id, lazily creating the link inside
//! the open batch transaction so dependent rows staged in the same batch
//! can reference it before commit.

use std::collections::HashMap;

use sqlx::SqliteConnection;
use tracing::debug;

use crate::domain::{TerritoryType, ValidationStatus};
use crate::error::{LoadError, Result};

/// Natural key of an election-territory link. `type_territoire` is stored
/// as its tag so keys read back from the store compare without reparsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub id_election: i64,
    pub id_territoire: String,
    pub type_territoire: String,
}

pub struct LinkResolver {
    elections: HashMap<i32, i64>,
    links: HashMap<LinkKey, i64>,
    source_file: String,
    /// Links created during this invocation, for the stage report.
    pub created: u64,
}

impl LinkResolver {
    pub fn new(
        elections: HashMap<i32, i64>,
        links: HashMap<LinkKey, i64>,
        source_file: impl Into<String>,
    ) -> Self {
        LinkResolver {
            elections,
            links,
            source_file: source_file.into(),
            created: 0,
        }
    }

    pub fn election_id(&self, annee: i32) -> Result<i64> {
        self.elections
            .get(&annee)
            .copied()
            .ok_or(LoadError::MissingDependency {
                entity: "election",
                key: annee.to_string(),
            })
    }

    /// Resolve or lazily create the link for `(annee, territoire, type)`.
    /// Safe to call repeatedly for the same key within a batch: the local
    /// map is updated immediately on creation, not after commit.
    pub async fn resolve(
        &mut self,
        conn: &mut SqliteConnection,
        annee: i32,
        id_territoire: &str,
        type_territoire: TerritoryType,
    ) -> Result<i64> {
        let id_election = self.election_id(annee)?;

        let key = LinkKey {
            id_election,
            id_territoire: id_territoire.to_string(),
            type_territoire: type_territoire.as_str().to_string(),
        };
        if let Some(id) = self.links.get(&key) {
            return Ok(*id);
        }

        let metadata = serde_json::json!({
            "source": self.source_file,
            "created_by": "loader",
        });

        let result = sqlx::query(
            "INSERT INTO election_territoire
               (id_election, id_territoire, type_territoire, granularite_source,
                source_fichier, statut_validation, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(id_election)
        .bind(id_territoire)
        .bind(type_territoire.as_str())
        .bind(type_territoire.as_str())
        .bind(&self.source_file)
        .bind(ValidationStatus::EnCours.as_str())
        .bind(metadata)
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        debug!(
            id_election,
            territoire = id_territoire,
            type_territoire = %type_territoire,
            link_id = id,
            "created election-territory link"
        );
        self.links.insert(key, id);
        self.created += 1;
        Ok(id)
    }
}

/// Candidate lookup over the preloaded referential. Candidates are never
/// created from fact files; an unknown name is a row-level skip.
pub struct CandidateResolver {
    candidates: HashMap<(String, String), i64>,
}

impl CandidateResolver {
    pub fn new(candidates: HashMap<(String, String), i64>) -> Self {
        CandidateResolver { candidates }
    }

    pub fn resolve(&self, nom: &str, prenom: &str) -> Result<i64> {
        self.candidates
            .get(&(nom.trim().to_string(), prenom.trim().to_string()))
            .copied()
            .ok_or_else(|| LoadError::MissingDependency {
                entity: "candidat",
                key: format!("{} {}", prenom.trim(), nom.trim()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_election_year_is_a_missing_dependency() {
        let resolver = LinkResolver::new(
            HashMap::from([(2022, 1i64)]),
            HashMap::new(),
            "participation.csv",
        );
        let err = resolver.election_id(2017).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingDependency { entity: "election", .. }
        ));
    }

    #[test]
    fn candidate_resolution_trims_whitespace() {
        let resolver = CandidateResolver::new(HashMap::from([(
            ("Dupont".to_string(), "Marie".to_string()),
            7i64,
        )]));
        assert_eq!(resolver.resolve(" Dupont ", "Marie ").unwrap(), 7);
        assert!(resolver.resolve("Durand", "Paul").is_err());
    }
}
