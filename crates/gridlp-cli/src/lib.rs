//! Scenario files and command definitions for the `gridlp` binary.

pub mod cli;
pub mod report;
pub mod scenario;
