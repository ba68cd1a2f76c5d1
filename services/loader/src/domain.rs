//! Domain types shared across the load stages.

use std::fmt;
use std::str::FromStr;

/// Territorial granularity. The store keys territories polymorphically by
/// `(id_territoire, type_territoire)`; the tag set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TerritoryType {
    Bureau,
    Canton,
    Commune,
    Arrondissement,
    Departement,
    Region,
    National,
}

impl TerritoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerritoryType::Bureau => "BUREAU",
            TerritoryType::Canton => "CANTON",
            TerritoryType::Commune => "COMMUNE",
            TerritoryType::Arrondissement => "ARRONDISSEMENT",
            TerritoryType::Departement => "DEPARTEMENT",
            TerritoryType::Region => "REGION",
            TerritoryType::National => "NATIONAL",
        }
    }
}

impl TerritoryType {
    /// Parse an optional CSV tag; the column defaults to COMMUNE when
    /// absent or blank.
    pub fn parse_or_commune(tag: Option<&str>) -> Result<Self, String> {
        match tag {
            None => Ok(TerritoryType::Commune),
            Some(s) if s.trim().is_empty() => Ok(TerritoryType::Commune),
            Some(s) => s.parse(),
        }
    }
}

impl FromStr for TerritoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUREAU" => Ok(TerritoryType::Bureau),
            "CANTON" => Ok(TerritoryType::Canton),
            "COMMUNE" => Ok(TerritoryType::Commune),
            "ARRONDISSEMENT" => Ok(TerritoryType::Arrondissement),
            "DEPARTEMENT" => Ok(TerritoryType::Departement),
            "REGION" => Ok(TerritoryType::Region),
            "NATIONAL" => Ok(TerritoryType::National),
            other => Err(format!("unknown territory type '{other}'")),
        }
    }
}

impl fmt::Display for TerritoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation lifecycle of an election-territory link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    EnCours,
    Valide,
    Erreur,
    Incomplet,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::EnCours => "EN_COURS",
            ValidationStatus::Valide => "VALIDE",
            ValidationStatus::Erreur => "ERREUR",
            ValidationStatus::Incomplet => "INCOMPLET",
        }
    }
}

/// The five participation tallies of one `(election, territory, round)` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipationCounts {
    pub inscrits: i64,
    pub abstentions: i64,
    pub votants: i64,
    pub blancs_nuls: i64,
    pub exprimes: i64,
}
