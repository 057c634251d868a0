//! tsbridge - orchestration layer between an analysis host and the
//! out-of-process TypeScript engine (tslint + tsmetrics).
//!
//! Modules, leaves first:
//! - `rules`: tslint <-> host rule key table
//! - `resolver`: config unit grouping (nearest `tsconfig.json`)
//! - `engine`: command construction, process invocation, wire protocol
//! - `projector`: decoded output -> host sink calls
//! - `orchestrator`: a full run with the fatal/recoverable failure split
pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod projector;
pub mod report;
pub mod resolver;
pub mod rules;
