//! Season snapshot pipeline for a reality-competition fantasy pool.
//!
//! Fetches the castaway table of the current season from a MediaWiki site,
//! turns each castaway's finish into structured milestones and keeps a single
//! JSON snapshot current for a static front end.

pub mod cli;
pub mod config;
pub mod finish;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod roster;
pub mod snapshot;
pub mod source;
pub mod utils;
pub mod web;
pub mod wiki;
