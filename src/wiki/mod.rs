//! Client for MediaWiki `api.php` endpoints (Fandom, Wikipedia).

mod client;
pub mod envelope;
mod errors;

pub use client::{WikiClient, build_http_client};
pub use errors::{FetchFailure, FetchFailureKind};
