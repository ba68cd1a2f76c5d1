//! Structured end-of-run reporting.

use std::fmt;

use crate::engine::LoadStats;

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: &'static str,
    pub source: String,
    pub stats: LoadStats,
}

impl StageReport {
    pub fn new(stage: &'static str, source: impl Into<String>, stats: LoadStats) -> Self {
        StageReport {
            stage,
            source: source.into(),
            stats,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    /// Name of the failed stage and the error rendering, when any.
    pub failure: Option<(&'static str, String)>,
}

impl PipelineReport {
    pub fn push(&mut self, report: StageReport) {
        self.stages.push(report);
    }

    pub fn fail(&mut self, stage: &'static str, error: String) {
        self.failure = Some((stage, error));
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn total_inserted(&self) -> u64 {
        self.stages.iter().map(|s| s.stats.inserted).sum()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:=<78}", "")?;
        writeln!(f, "LOAD PIPELINE REPORT")?;
        writeln!(f, "{:=<78}", "")?;
        for s in &self.stages {
            writeln!(f, "\n  {} ({})", s.stage.to_uppercase(), s.source)?;
            writeln!(f, "    rows read:            {}", s.stats.rows_read)?;
            writeln!(f, "    inserted:             {}", s.stats.inserted)?;
            writeln!(f, "    skipped duplicates:   {}", s.stats.skipped_duplicate)?;
            writeln!(f, "    skipped unresolvable: {}", s.stats.skipped_unresolvable)?;
            writeln!(f, "    skipped incoherent:   {}", s.stats.skipped_incoherent)?;
            writeln!(f, "    corrections applied:  {}", s.stats.corrections)?;
            if s.stats.parents_created > 0 {
                writeln!(f, "    links created:        {}", s.stats.parents_created)?;
            }
            writeln!(f, "    batches committed:    {}", s.stats.batches)?;
        }
        writeln!(f, "\n{:-<78}", "")?;
        match &self.failure {
            None => writeln!(f, "RESULT: OK ({} rows inserted)", self.total_inserted())?,
            Some((stage, error)) => {
                writeln!(f, "RESULT: FAILED at stage '{stage}'")?;
                writeln!(f, "  {error}")?;
            }
        }
        writeln!(f, "{:=<78}", "")
    }
}
