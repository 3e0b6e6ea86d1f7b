pub mod achievements;
pub mod config;
pub mod error;
pub mod telemetry;
