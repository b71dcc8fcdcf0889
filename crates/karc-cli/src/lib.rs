//! Command-line front end for the karc research portal.

pub mod cli;
pub mod output;
pub mod telemetry;
