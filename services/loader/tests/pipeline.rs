//! End-to-end pipeline tests against an in-memory store with the real
//! schema applied.

use std::fs;
use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

use loader::config::LoadConfig;
use loader::error::LoadError;
use loader::pipeline::{Pipeline, Stage};
use loader::stages;

const SCHEMA: &str = include_str!("../../../db/schema.sql");

async fn store() -> SqlitePool {
    // One connection: every handle of an in-memory database must see the
    // same data, and the loader serializes its writes anyway.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::raw_sql(SCHEMA).execute(&pool).await.unwrap();
    pool
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A small but complete data tree: two regions, one unresolvable
/// departement, one incoherent participation row, one duplicated candidate
/// referential row, one unknown candidate in the results.
fn data_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let d = dir.path();

    write(
        d,
        "geographie/regions.csv",
        "id_region,code_insee,nom_region\n\
         R75,75,Nouvelle-Aquitaine\n\
         R76,76,Occitanie\n",
    );
    write(
        d,
        "geographie/departements.csv",
        "id_departement,id_region,code_insee,nom_departement,population,chef_lieu\n\
         33,R75,33,Gironde,1623749,Bordeaux\n\
         99,R99,99,Atlantide,,\n",
    );
    write(
        d,
        "geographie/communes.csv",
        "id_commune,id_departement,code_insee,nom_commune,population\n\
         33063,33,33063,Bordeaux,260958\n\
         33075,33,33075,Bègles,30088\n",
    );
    write(
        d,
        "elections/referentiel_candidats.csv",
        "nom,prenom\n\
         MACRON,Emmanuel\n\
         LE PEN,Marine\n\
         Dupont,Marie\n\
         Dupont,Marie\n",
    );
    // Row 1 has wrong abstentions (repairable), row 2 is coherent, row 3 is
    // all-zero (coherent), row 4 is unrepairable.
    write(
        d,
        "elections/participation.csv",
        "annee,tour,id_territoire,type_territoire,nombre_inscrits,nombre_abstentions,nombre_votants,nombre_blancs_nuls,nombre_exprimes\n\
         2022,1,33063,COMMUNE,100,25,80,5,75\n\
         2022,1,33075,COMMUNE,200,50,150,10,140\n\
         2022,1,33099,COMMUNE,0,0,0,0,0\n\
         2022,1,33100,COMMUNE,0,5,10,0,10\n",
    );
    write(
        d,
        "elections/candidats.csv",
        "annee,tour,id_territoire,type_territoire,nom,prenom,nombre_voix,pourcentage_voix_inscrits,pourcentage_voix_exprimes\n\
         2022,1,33063,COMMUNE,MACRON,Emmanuel,30,30.0,40.0\n\
         2022,1,33063,COMMUNE,LE PEN,Marine,25,25.0,33.3\n\
         2022,1,33063,COMMUNE,ZORRO,Diego,10,10.0,13.3\n\
         2022,1,33063,COMMUNE,MACRON,Emmanuel,30,30.0,40.0\n",
    );
    write(
        d,
        "indicateurs/securite.csv",
        "id_territoire,type_territoire,code_type,annee,periode,valeur_numerique,valeur_texte,source_detail,fiabilite\n\
         33063,COMMUNE,CRIMINALITE_TOTALE,2022,,504,,SSMSI open data,CONFIRME\n\
         33075,COMMUNE,CRIMINALITE_TOTALE,2022,,87,,SSMSI open data,\n",
    );

    dir
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap();
    n
}

#[tokio::test]
async fn fresh_load_runs_every_stage() {
    let pool = store().await;
    let data = data_tree();
    let config = LoadConfig::new(data.path(), 2);

    let report = Pipeline::new(pool.clone(), config).run(None).await;
    assert!(report.is_success(), "report: {report}");
    assert_eq!(report.stages.len(), 5);

    let geo = &report.stages[0].stats;
    assert_eq!(geo.inserted, 5); // 2 regions, 1 departement, 2 communes
    assert_eq!(geo.skipped_unresolvable, 1); // departement under unknown region

    let results = &report.stages[3].stats;
    assert_eq!(results.inserted, 5); // 3 participation + 2 candidate rows
    assert_eq!(results.corrections, 1);
    assert_eq!(results.skipped_incoherent, 1);
    assert_eq!(results.skipped_unresolvable, 1); // unknown candidate
    assert_eq!(results.skipped_duplicate, 1); // repeated candidate row
    assert_eq!(results.parents_created, 3); // one link per participation territory

    assert_eq!(count(&pool, "region").await, 2);
    assert_eq!(count(&pool, "departement").await, 1);
    assert_eq!(count(&pool, "commune").await, 2);
    assert_eq!(count(&pool, "candidat").await, 3); // duplicate collapsed
    assert_eq!(count(&pool, "election").await, 2);
    assert_eq!(count(&pool, "election_territoire").await, 3);
    assert_eq!(count(&pool, "resultat_participation").await, 3);
    assert_eq!(count(&pool, "resultat_candidat").await, 2);
    assert_eq!(count(&pool, "type_indicateur").await, 5);
    assert_eq!(count(&pool, "indicateur").await, 2);

    // Every committed candidate result has its election-territory link.
    let (orphans,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM resultat_candidat rc
         LEFT JOIN election_territoire et
           ON et.id_election = rc.id_election
          AND et.id_territoire = rc.id_territoire
          AND et.type_territoire = rc.type_territoire
         WHERE et.id_election_territoire IS NULL",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn repaired_tallies_satisfy_store_invariants() {
    let pool = store().await;
    let data = data_tree();
    let config = LoadConfig::new(data.path(), 1000);

    let report = Pipeline::new(pool.clone(), config).run(None).await;
    assert!(report.is_success(), "report: {report}");

    let rows: Vec<(String, i64, i64)> = sqlx::query_as(
        "SELECT id_territoire, nombre_abstentions, nombre_blancs_nuls
         FROM resultat_participation ORDER BY id_territoire",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    // 100 - 80 = 20, not the reported 25; the coherent row is untouched.
    assert_eq!(rows[0], ("33063".into(), 20, 5));
    assert_eq!(rows[1], ("33075".into(), 50, 10));
    // The unrepairable territory never made it in.
    assert!(!rows.iter().any(|(t, _, _)| t == "33100"));
}

#[tokio::test]
async fn links_are_created_pending_validation() {
    let pool = store().await;
    let data = data_tree();
    let config = LoadConfig::new(data.path(), 1000);

    Pipeline::new(pool.clone(), config).run(None).await;

    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT type_territoire, granularite_source, statut_validation
         FROM election_territoire",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(rows.len(), 3);
    for (tt, granularite, statut) in rows {
        assert_eq!(tt, "COMMUNE");
        assert_eq!(granularite, "COMMUNE");
        assert_eq!(statut, "EN_COURS");
    }
}

#[tokio::test]
async fn rerun_inserts_nothing() {
    let pool = store().await;
    let data = data_tree();
    let config = LoadConfig::new(data.path(), 1000);

    let pipeline = Pipeline::new(pool.clone(), config);
    let first = pipeline.run(None).await;
    assert!(first.is_success());
    let before = count(&pool, "resultat_participation").await;

    let second = pipeline.run(None).await;
    assert!(second.is_success(), "report: {second}");
    assert_eq!(second.total_inserted(), 0);
    for stage in &second.stages {
        assert_eq!(stage.stats.parents_created, 0, "stage {}", stage.stage);
    }
    assert_eq!(count(&pool, "resultat_participation").await, before);
    assert_eq!(count(&pool, "candidat").await, 3);
    assert_eq!(count(&pool, "election_territoire").await, 3);
}

#[tokio::test]
async fn rows_for_unknown_election_year_are_skipped() {
    let pool = store().await;
    sqlx::query("INSERT INTO type_election (code_type, nom_type) VALUES ('PRES', 'Présidentielle')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO election (id_type_election, annee, date_tour1) VALUES (1, 2022, '2022-04-10')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO candidat (nom, prenom) VALUES ('MACRON', 'Emmanuel')")
        .execute(&pool)
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "elections/participation.csv",
        "annee,tour,id_territoire,nombre_inscrits,nombre_abstentions,nombre_votants,nombre_blancs_nuls,nombre_exprimes\n\
         2017,1,33063,100,20,80,5,75\n\
         2022,1,33063,100,20,80,5,75\n",
    );
    write(
        dir.path(),
        "elections/candidats.csv",
        "annee,tour,id_territoire,nom,prenom,nombre_voix\n",
    );

    let config = LoadConfig::new(dir.path(), 1000);
    let report = stages::results::run(&pool, &config).await.unwrap();
    assert_eq!(report.stats.inserted, 1);
    assert_eq!(report.stats.skipped_unresolvable, 1);
    assert_eq!(count(&pool, "resultat_participation").await, 1);
}

#[tokio::test]
async fn results_fail_fast_when_no_election_exists() {
    let pool = store().await;
    let data = data_tree();
    let config = LoadConfig::new(data.path(), 1000);

    let err = stages::results::run(&pool, &config).await.unwrap_err();
    assert!(
        matches!(err, LoadError::EmptyDependency { table: "election", .. }),
        "unexpected error: {err}"
    );
    assert_eq!(count(&pool, "resultat_participation").await, 0);
}

#[tokio::test]
async fn pipeline_stops_and_reports_the_failed_stage() {
    let pool = store().await;
    let data = data_tree();
    let config = LoadConfig::new(data.path(), 1000);

    // Results without referentials: the stage fails and nothing after runs.
    let report = Pipeline::new(pool.clone(), config)
        .run(Some(Stage::Resultats))
        .await;
    assert!(!report.is_success());
    let (stage, error) = report.failure.as_ref().unwrap();
    assert_eq!(*stage, "resultats");
    assert!(error.contains("election"), "unexpected error: {error}");
}

#[tokio::test]
async fn absent_candidate_referential_is_not_fatal() {
    let pool = store().await;
    let data = data_tree();
    fs::remove_file(data.path().join("elections/referentiel_candidats.csv")).unwrap();
    let config = LoadConfig::new(data.path(), 1000);

    let report = stages::referentials::run(&pool, &config).await.unwrap();
    assert_eq!(count(&pool, "candidat").await, 0);
    assert_eq!(count(&pool, "election").await, 2);
    assert!(count(&pool, "parti").await > 0);
    assert!(report.stats.inserted > 0);
}

#[tokio::test]
async fn affiliations_follow_the_party_mapping() {
    let pool = store().await;
    let data = data_tree();
    let config = LoadConfig::new(data.path(), 1000);

    stages::referentials::run(&pool, &config).await.unwrap();

    // MACRON and LE PEN are mapped; Dupont is not.
    assert_eq!(count(&pool, "candidat_parti").await, 2);
    let (code,): (String,) = sqlx::query_as(
        "SELECT p.code_parti FROM candidat_parti cp
         JOIN candidat c ON c.id_candidat = cp.id_candidat
         JOIN parti p ON p.id_parti = cp.id_parti
         WHERE c.nom = 'MACRON'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(code, "REM");
}

#[tokio::test]
async fn indicators_default_reliability_when_absent() {
    let pool = store().await;
    let data = data_tree();
    let config = LoadConfig::new(data.path(), 1000);

    Pipeline::new(pool.clone(), config).run(None).await;

    let (fiabilite,): (String,) =
        sqlx::query_as("SELECT fiabilite FROM indicateur WHERE id_territoire = '33075'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(fiabilite, "CONFIRME");
}

#[tokio::test]
async fn blank_geographic_key_aborts_the_stage() {
    let pool = store().await;
    let data = data_tree();
    write(
        data.path(),
        "geographie/regions.csv",
        "id_region,code_insee,nom_region\n\
         ,75,Nouvelle-Aquitaine\n",
    );
    let config = LoadConfig::new(data.path(), 1000);

    let err = stages::geography::run(&pool, &config).await.unwrap_err();
    assert!(
        matches!(err, LoadError::Validation { .. }),
        "unexpected error: {err}"
    );
    // Nothing was staged: the file failed before any row was touched.
    assert_eq!(count(&pool, "region").await, 0);
}

#[tokio::test]
async fn single_stage_run_touches_nothing_else() {
    let pool = store().await;
    let data = data_tree();
    let config = LoadConfig::new(data.path(), 1000);

    let report = Pipeline::new(pool.clone(), config)
        .run(Some(Stage::Geographie))
        .await;
    assert!(report.is_success());
    assert_eq!(report.stages.len(), 1);
    assert_eq!(count(&pool, "region").await, 2);
    assert_eq!(count(&pool, "election").await, 0);
    assert_eq!(count(&pool, "type_indicateur").await, 0);
}
