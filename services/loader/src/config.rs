//! Load configuration: input file layout, batch tuning, and the static
//! domain catalogs (indicator types, election calendar, nuance
//! classification, candidate-party mapping).

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Presidential election years with transformed result files.
pub const VALID_ELECTION_YEARS: &[i32] = &[2017, 2022];

/// Valid rounds for a two-round presidential election.
pub const VALID_ROUNDS: &[i32] = &[1, 2];

/// Accepted indicator reference years (matches the store check constraint).
pub const INDICATOR_YEAR_RANGE: RangeInclusive<i32> = 2000..=2100;

/// Where the transformation stage drops its cleaned CSVs.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub data_dir: PathBuf,
    pub batch_size: usize,
}

impl LoadConfig {
    pub fn new(data_dir: impl Into<PathBuf>, batch_size: usize) -> Self {
        LoadConfig {
            data_dir: data_dir.into(),
            batch_size: batch_size.max(1),
        }
    }

    fn geographie(&self) -> PathBuf {
        self.data_dir.join("geographie")
    }

    fn elections(&self) -> PathBuf {
        self.data_dir.join("elections")
    }

    fn indicateurs(&self) -> PathBuf {
        self.data_dir.join("indicateurs")
    }

    pub fn regions_csv(&self) -> PathBuf {
        self.geographie().join("regions.csv")
    }

    pub fn departements_csv(&self) -> PathBuf {
        self.geographie().join("departements.csv")
    }

    pub fn communes_csv(&self) -> PathBuf {
        self.geographie().join("communes.csv")
    }

    /// Unique-candidate referential. Optional: when the transformation
    /// stage has not produced it, the sub-stage is skipped with a warning.
    pub fn referentiel_candidats_csv(&self) -> PathBuf {
        self.elections().join("referentiel_candidats.csv")
    }

    pub fn participation_csv(&self) -> PathBuf {
        self.elections().join("participation.csv")
    }

    pub fn candidats_csv(&self) -> PathBuf {
        self.elections().join("candidats.csv")
    }

    pub fn securite_csv(&self) -> PathBuf {
        self.indicateurs().join("securite.csv")
    }
}

/// Short name of a path for logs and reports.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// =============================================================================
// Static catalogs (referential data that ships with the pipeline)
// =============================================================================

pub struct IndicatorTypeDef {
    pub code_type: &'static str,
    pub categorie: &'static str,
    pub nom_affichage: &'static str,
    pub description: &'static str,
    pub unite_mesure: &'static str,
    pub source_officielle: &'static str,
    pub frequence: &'static str,
}

/// Security indicator catalog (SSMSI nomenclature).
pub const INDICATOR_TYPES: &[IndicatorTypeDef] = &[
    IndicatorTypeDef {
        code_type: "CRIMINALITE_TOTALE",
        categorie: "SECURITE",
        nom_affichage: "Criminalité totale",
        description: "Nombre total de crimes et délits enregistrés",
        unite_mesure: "nombre",
        source_officielle: "SSMSI",
        frequence: "ANNUEL",
    },
    IndicatorTypeDef {
        code_type: "VOLS_SANS_VIOLENCE",
        categorie: "SECURITE",
        nom_affichage: "Vols sans violence",
        description: "Cambriolages, vols à la roulotte, vols de véhicules",
        unite_mesure: "nombre",
        source_officielle: "SSMSI",
        frequence: "ANNUEL",
    },
    IndicatorTypeDef {
        code_type: "VOLS_AVEC_VIOLENCE",
        categorie: "SECURITE",
        nom_affichage: "Vols avec violence",
        description: "Vols avec armes, vols violents",
        unite_mesure: "nombre",
        source_officielle: "SSMSI",
        frequence: "ANNUEL",
    },
    IndicatorTypeDef {
        code_type: "ATTEINTES_AUX_BIENS",
        categorie: "SECURITE",
        nom_affichage: "Atteintes aux biens",
        description: "Destructions et dégradations",
        unite_mesure: "nombre",
        source_officielle: "SSMSI",
        frequence: "ANNUEL",
    },
    IndicatorTypeDef {
        code_type: "ATTEINTES_AUX_PERSONNES",
        categorie: "SECURITE",
        nom_affichage: "Atteintes aux personnes",
        description: "Violences physiques, menaces",
        unite_mesure: "nombre",
        source_officielle: "SSMSI",
        frequence: "ANNUEL",
    },
];

pub struct ElectionKindDef {
    pub code_type: &'static str,
    pub nom_type: &'static str,
    pub mode_scrutin: &'static str,
    pub niveau_geographique: &'static str,
    pub description: &'static str,
}

pub const ELECTION_KIND_PRES: ElectionKindDef = ElectionKindDef {
    code_type: "PRES",
    nom_type: "Élection présidentielle",
    mode_scrutin: "uninominal_2tours",
    niveau_geographique: "national",
    description: "Élection du président de la République française",
};

pub struct ElectionDef {
    pub annee: i32,
    pub date_tour1: &'static str,
    pub date_tour2: &'static str,
    pub nombre_tours: i64,
    pub contexte: &'static str,
}

/// Election calendar for the loaded presidential elections.
pub const ELECTIONS: &[ElectionDef] = &[
    ElectionDef {
        annee: 2017,
        date_tour1: "2017-04-23",
        date_tour2: "2017-05-07",
        nombre_tours: 2,
        contexte: "Élection présidentielle 2017",
    },
    ElectionDef {
        annee: 2022,
        date_tour1: "2022-04-10",
        date_tour2: "2022-04-24",
        nombre_tours: 2,
        contexte: "Élection présidentielle 2022, contexte post-COVID",
    },
];

/// Nuance code -> (ideological classification, official name).
/// Source: Ministère de l'Intérieur nomenclature.
pub const NUANCE_CLASSIFICATION: &[(&str, &str, &str)] = &[
    ("EXG", "extreme_gauche", "Extrême gauche"),
    ("COM", "extreme_gauche", "Parti communiste français"),
    ("FI", "gauche", "La France insoumise"),
    ("SOC", "gauche", "Parti socialiste"),
    ("ECO", "gauche", "Europe Écologie Les Verts"),
    ("DVG", "gauche", "Divers gauche"),
    ("RDG", "gauche", "Radical de gauche"),
    ("VEC", "gauche", "Verts"),
    ("MDM", "centre", "Modem"),
    ("REM", "centre", "La République en Marche"),
    ("ENS", "centre", "Ensemble"),
    ("UDI", "centre_droit", "Union des démocrates et indépendants"),
    ("LR", "droite", "Les Républicains"),
    ("DVD", "droite", "Divers droite"),
    ("DLF", "droite", "Debout la France"),
    ("RN", "extreme_droite", "Rassemblement national"),
    ("REC", "extreme_droite", "Reconquête"),
    ("EXD", "extreme_droite", "Extrême droite"),
    ("DIV", "autre", "Divers"),
    ("DSV", "autre", "Divers souverainiste"),
];

/// Candidate surname (uppercase) -> nuance code, presidential rounds
/// 2017 and 2022.
pub const CANDIDATE_PARTY_MAP: &[(&str, &str)] = &[
    ("ARTHAUD", "EXG"),
    ("ASSELINEAU", "DIV"),
    ("CHEMINADE", "DIV"),
    ("DUPONT-AIGNAN", "DLF"),
    ("FILLON", "LR"),
    ("HAMON", "SOC"),
    ("LASSALLE", "DIV"),
    ("LE PEN", "RN"),
    ("MACRON", "REM"),
    ("MÉLENCHON", "FI"),
    ("POUTOU", "EXG"),
    ("HIDALGO", "SOC"),
    ("JADOT", "ECO"),
    ("PÉCRESSE", "LR"),
    ("ROUSSEL", "COM"),
    ("ZEMMOUR", "REC"),
];

pub fn nuance_for_candidate(surname: &str) -> Option<&'static str> {
    let upper = surname.trim().to_uppercase();
    CANDIDATE_PARTY_MAP
        .iter()
        .find(|(nom, _)| *nom == upper)
        .map(|(_, code)| *code)
}

pub fn classify_nuance(code: &str) -> (&'static str, String) {
    NUANCE_CLASSIFICATION
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, classification, nom)| (*classification, nom.to_string()))
        .unwrap_or(("autre", format!("Nuance {code}")))
}
