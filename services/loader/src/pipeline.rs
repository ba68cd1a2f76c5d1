//! Pipeline orchestration: stages run in dependency order, each reporting
//! its statistics; the first stage error stops the run and is carried in
//! the final report.

use clap::ValueEnum;
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::config::{file_label, LoadConfig};
use crate::error::{LoadError, Result};
use crate::input::{
    self, CandidateRefRow, CandidateResultRow, CommuneRow, DepartementRow, IndicatorRow,
    ParticipationRow, RegionRow,
};
use crate::report::{PipelineReport, StageReport};
use crate::stages;
use crate::validate;

/// Load stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    Geographie,
    TypesIndicateurs,
    Referentiels,
    Resultats,
    Indicateurs,
}

impl Stage {
    pub const ALL: &'static [Stage] = &[
        Stage::Geographie,
        Stage::TypesIndicateurs,
        Stage::Referentiels,
        Stage::Resultats,
        Stage::Indicateurs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Geographie => "geographie",
            Stage::TypesIndicateurs => "types_indicateurs",
            Stage::Referentiels => "referentiels",
            Stage::Resultats => "resultats",
            Stage::Indicateurs => "indicateurs",
        }
    }
}

pub struct Pipeline {
    pool: SqlitePool,
    config: LoadConfig,
}

impl Pipeline {
    pub fn new(pool: SqlitePool, config: LoadConfig) -> Self {
        Pipeline { pool, config }
    }

    async fn run_stage(&self, stage: Stage) -> Result<StageReport> {
        match stage {
            Stage::Geographie => stages::geography::run(&self.pool, &self.config).await,
            Stage::TypesIndicateurs => stages::indicator_types::run(&self.pool).await,
            Stage::Referentiels => stages::referentials::run(&self.pool, &self.config).await,
            Stage::Resultats => stages::results::run(&self.pool, &self.config).await,
            Stage::Indicateurs => stages::indicators::run(&self.pool, &self.config).await,
        }
    }

    /// Run the named stage, or the whole pipeline in order. Fail-fast:
    /// a stage error ends the run and is recorded in the report.
    pub async fn run(&self, only: Option<Stage>) -> PipelineReport {
        let mut report = PipelineReport::default();
        let stages: &[Stage] = match only {
            Some(ref s) => std::slice::from_ref(s),
            None => Stage::ALL,
        };

        for stage in stages {
            info!(stage = stage.name(), "stage starting");
            match self.run_stage(*stage).await {
                Ok(stage_report) => {
                    info!(
                        stage = stage.name(),
                        inserted = stage_report.stats.inserted,
                        skipped = stage_report.stats.skipped_total(),
                        "stage finished"
                    );
                    report.push(stage_report);
                }
                Err(e) => {
                    error!(stage = stage.name(), error = %e, "stage failed, pipeline stopped");
                    report.fail(stage.name(), e.to_string());
                    break;
                }
            }
        }

        report
    }
}

/// Read and validate every input file without touching the store. The
/// candidate referential stays optional here too.
pub fn preflight(config: &LoadConfig) -> Result<()> {
    let path = config.regions_csv();
    let rows: Vec<RegionRow> = input::read_rows(&path)?;
    validate::validate_regions(&file_label(&path), &rows)?;

    let path = config.departements_csv();
    let rows: Vec<DepartementRow> = input::read_rows(&path)?;
    validate::validate_departements(&file_label(&path), &rows)?;

    let path = config.communes_csv();
    let rows: Vec<CommuneRow> = input::read_rows(&path)?;
    validate::validate_communes(&file_label(&path), &rows)?;

    match input::read_rows::<CandidateRefRow>(&config.referentiel_candidats_csv()) {
        Ok(_) | Err(LoadError::MissingFile(_)) => {}
        Err(e) => return Err(e),
    }

    let path = config.participation_csv();
    let rows: Vec<ParticipationRow> = input::read_rows(&path)?;
    validate::validate_participation(&file_label(&path), &rows)?;
    info!(file = %file_label(&path), rows = rows.len(), "participation file valid");

    let path = config.candidats_csv();
    let rows: Vec<CandidateResultRow> = input::read_rows(&path)?;
    validate::validate_candidate_results(&file_label(&path), &rows)?;
    info!(file = %file_label(&path), rows = rows.len(), "candidate results file valid");

    let path = config.securite_csv();
    let rows: Vec<IndicatorRow> = input::read_rows(&path)?;
    validate::validate_indicators(&file_label(&path), &rows)?;
    info!(file = %file_label(&path), rows = rows.len(), "indicator file valid");

    Ok(())
}
