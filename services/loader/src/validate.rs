//! Pre-load validation. Runs over a whole parsed file before any row is
//! staged: a structurally invalid file aborts the stage (no partial load).

use std::collections::HashSet;

use crate::config::{INDICATOR_YEAR_RANGE, VALID_ELECTION_YEARS, VALID_ROUNDS};
use crate::domain::TerritoryType;
use crate::error::{LoadError, Result};
use crate::input::{
    CandidateResultRow, CommuneRow, DepartementRow, IndicatorRow, ParticipationRow, RegionRow,
};

const RELIABILITY_TAGS: &[&str] = &["CONFIRME", "ESTIME", "PROVISOIRE", "REVISION"];

fn ensure_territory_type(file: &str, tag: Option<&str>) -> Result<()> {
    TerritoryType::parse_or_commune(tag)
        .map(|_| ())
        .map_err(|e| LoadError::validation(file, e))
}

fn ensure_election_year(file: &str, annee: i32) -> Result<()> {
    if !VALID_ELECTION_YEARS.contains(&annee) {
        return Err(LoadError::validation(
            file,
            format!("election year {annee} outside accepted set {VALID_ELECTION_YEARS:?}"),
        ));
    }
    Ok(())
}

fn ensure_round(file: &str, tour: i32) -> Result<()> {
    if !VALID_ROUNDS.contains(&tour) {
        return Err(LoadError::validation(
            file,
            format!("round {tour} outside accepted set {VALID_ROUNDS:?}"),
        ));
    }
    Ok(())
}

fn ensure_non_negative(file: &str, name: &str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(LoadError::validation(
            file,
            format!("negative value {value} in column '{name}'"),
        ));
    }
    Ok(())
}

fn ensure_percentage(file: &str, name: &str, value: Option<f64>) -> Result<()> {
    if let Some(pct) = value {
        if !(0.0..=100.0).contains(&pct) {
            return Err(LoadError::validation(
                file,
                format!("percentage {pct} in column '{name}' outside [0, 100]"),
            ));
        }
    }
    Ok(())
}

fn ensure_not_blank(file: &str, name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LoadError::validation(
            file,
            format!("empty required column '{name}'"),
        ));
    }
    Ok(())
}

pub fn validate_regions(file: &str, rows: &[RegionRow]) -> Result<()> {
    for row in rows {
        ensure_not_blank(file, "id_region", &row.id_region)?;
    }
    Ok(())
}

pub fn validate_departements(file: &str, rows: &[DepartementRow]) -> Result<()> {
    for row in rows {
        ensure_not_blank(file, "id_departement", &row.id_departement)?;
        ensure_not_blank(file, "id_region", &row.id_region)?;
    }
    Ok(())
}

pub fn validate_communes(file: &str, rows: &[CommuneRow]) -> Result<()> {
    for row in rows {
        ensure_not_blank(file, "id_commune", &row.id_commune)?;
        ensure_not_blank(file, "id_departement", &row.id_departement)?;
    }
    Ok(())
}

pub fn validate_participation(file: &str, rows: &[ParticipationRow]) -> Result<()> {
    for row in rows {
        ensure_not_blank(file, "id_territoire", &row.id_territoire)?;
        ensure_territory_type(file, row.type_territoire.as_deref())?;
        ensure_election_year(file, row.annee)?;
        ensure_round(file, row.tour)?;
        ensure_non_negative(file, "nombre_inscrits", row.nombre_inscrits)?;
        ensure_non_negative(file, "nombre_abstentions", row.nombre_abstentions)?;
        ensure_non_negative(file, "nombre_votants", row.nombre_votants)?;
        ensure_non_negative(file, "nombre_blancs_nuls", row.nombre_blancs_nuls)?;
        ensure_non_negative(file, "nombre_exprimes", row.nombre_exprimes)?;
    }
    Ok(())
}

pub fn validate_candidate_results(file: &str, rows: &[CandidateResultRow]) -> Result<()> {
    for row in rows {
        ensure_not_blank(file, "id_territoire", &row.id_territoire)?;
        ensure_not_blank(file, "nom", &row.nom)?;
        ensure_not_blank(file, "prenom", &row.prenom)?;
        ensure_territory_type(file, row.type_territoire.as_deref())?;
        ensure_election_year(file, row.annee)?;
        ensure_round(file, row.tour)?;
        ensure_non_negative(file, "nombre_voix", row.nombre_voix)?;
        ensure_percentage(file, "pourcentage_voix_inscrits", row.pourcentage_voix_inscrits)?;
        ensure_percentage(file, "pourcentage_voix_exprimes", row.pourcentage_voix_exprimes)?;
    }
    Ok(())
}

/// Indicator files additionally declare a unique natural key per row; a
/// duplicate inside the file itself is a transformation bug, not a replay.
pub fn validate_indicators(file: &str, rows: &[IndicatorRow]) -> Result<()> {
    let mut seen: HashSet<(String, Option<String>, String, i32, Option<String>)> = HashSet::new();

    for row in rows {
        ensure_not_blank(file, "id_territoire", &row.id_territoire)?;
        ensure_not_blank(file, "code_type", &row.code_type)?;
        ensure_territory_type(file, row.type_territoire.as_deref())?;
        if let Some(fiabilite) = row.fiabilite.as_deref() {
            if !RELIABILITY_TAGS.contains(&fiabilite) {
                return Err(LoadError::validation(
                    file,
                    format!("unknown reliability tag '{fiabilite}'"),
                ));
            }
        }
        if !INDICATOR_YEAR_RANGE.contains(&row.annee) {
            return Err(LoadError::validation(
                file,
                format!(
                    "indicator year {} outside [{}, {}]",
                    row.annee,
                    INDICATOR_YEAR_RANGE.start(),
                    INDICATOR_YEAR_RANGE.end()
                ),
            ));
        }

        let key = (
            row.id_territoire.clone(),
            row.type_territoire.clone(),
            row.code_type.clone(),
            row.annee,
            row.periode.clone(),
        );
        if !seen.insert(key) {
            return Err(LoadError::validation(
                file,
                format!(
                    "duplicate key within input file: territoire={} type={} annee={} periode={:?}",
                    row.id_territoire, row.code_type, row.annee, row.periode
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participation(annee: i32, tour: i32) -> ParticipationRow {
        ParticipationRow {
            annee,
            tour,
            id_territoire: "33063".into(),
            type_territoire: None,
            nombre_inscrits: 100,
            nombre_abstentions: 20,
            nombre_votants: 80,
            nombre_blancs_nuls: 5,
            nombre_exprimes: 75,
        }
    }

    fn indicator(annee: i32, periode: Option<&str>) -> IndicatorRow {
        IndicatorRow {
            id_territoire: "33063".into(),
            type_territoire: None,
            code_type: "CRIMINALITE_TOTALE".into(),
            annee,
            periode: periode.map(str::to_string),
            valeur_numerique: 504.0,
            valeur_texte: None,
            source_detail: None,
            fiabilite: None,
        }
    }

    #[test]
    fn rejects_blank_geographic_keys() {
        let region = RegionRow {
            id_region: "  ".into(),
            code_insee: "75".into(),
            nom_region: "Nouvelle-Aquitaine".into(),
        };
        assert!(validate_regions("r.csv", &[region]).is_err());

        let departement = DepartementRow {
            id_departement: "33".into(),
            id_region: "".into(),
            code_insee: "33".into(),
            nom_departement: "Gironde".into(),
            population: None,
            chef_lieu: None,
        };
        assert!(validate_departements("d.csv", &[departement]).is_err());

        let commune = CommuneRow {
            id_commune: "".into(),
            id_departement: "33".into(),
            code_insee: "33063".into(),
            nom_commune: "Bordeaux".into(),
            population: None,
        };
        assert!(validate_communes("c.csv", &[commune]).is_err());
    }

    #[test]
    fn accepts_well_formed_participation() {
        assert!(validate_participation("p.csv", &[participation(2022, 1)]).is_ok());
    }

    #[test]
    fn rejects_year_outside_accepted_set() {
        let err = validate_participation("p.csv", &[participation(1995, 1)]).unwrap_err();
        assert!(matches!(err, LoadError::Validation { .. }));
    }

    #[test]
    fn rejects_round_three() {
        assert!(validate_participation("p.csv", &[participation(2022, 3)]).is_err());
    }

    #[test]
    fn rejects_negative_counts() {
        let mut row = participation(2022, 1);
        row.nombre_votants = -1;
        assert!(validate_participation("p.csv", &[row]).is_err());
    }

    #[test]
    fn rejects_percentage_out_of_range() {
        let row = CandidateResultRow {
            annee: 2022,
            tour: 1,
            id_territoire: "33063".into(),
            type_territoire: None,
            nom: "MACRON".into(),
            prenom: "Emmanuel".into(),
            nombre_voix: 100,
            pourcentage_voix_inscrits: Some(120.0),
            pourcentage_voix_exprimes: None,
        };
        assert!(validate_candidate_results("c.csv", &[row]).is_err());
    }

    #[test]
    fn rejects_unknown_territory_type_tag() {
        let mut row = participation(2022, 1);
        row.type_territoire = Some("GALAXY".into());
        assert!(validate_participation("p.csv", &[row]).is_err());
    }

    #[test]
    fn rejects_unknown_reliability_tag() {
        let mut row = indicator(2022, None);
        row.fiabilite = Some("DOUTEUX".into());
        assert!(validate_indicators("i.csv", &[row]).is_err());
    }

    #[test]
    fn rejects_duplicate_indicator_key_within_file() {
        let rows = vec![indicator(2022, None), indicator(2022, None)];
        let err = validate_indicators("i.csv", &rows).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("duplicate key"), "unexpected: {msg}");
    }

    #[test]
    fn distinct_sub_periods_are_not_duplicates() {
        let rows = vec![indicator(2022, Some("T1")), indicator(2022, Some("T2"))];
        assert!(validate_indicators("i.csv", &rows).is_ok());
    }

    #[test]
    fn rejects_indicator_year_outside_check_range() {
        assert!(validate_indicators("i.csv", &[indicator(1999, None)]).is_err());
    }
}
