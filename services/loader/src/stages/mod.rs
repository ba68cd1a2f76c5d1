pub mod geography;
pub mod indicator_types;
pub mod indicators;
pub mod referentials;
pub mod results;
