//! Read-only HTTP view of the persisted snapshot.

pub mod routes;
pub mod status;

pub use routes::*;
