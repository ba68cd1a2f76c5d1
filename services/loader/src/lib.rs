//! Loader service: batch-loads transformed CSVs into the analytical store.
//!
//! Stages run in dependency order: geographic hierarchy, indicator type
//! catalog, electoral referentials, election results, socio-economic
//! indicators. Each stage resolves references through preloaded caches,
//! repairs repairable tallies, deduplicates against natural keys, and
//! writes in fixed-size transactional batches.

pub mod cache;
pub mod coherence;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod stages;
pub mod validate;
