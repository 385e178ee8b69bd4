//! Library half of the illustrative terminology HTTP binary: config
//! loading, the directory-backed resource catalog, and the axum router.
//! Split from `main.rs` the way the teacher splits `octofhir-server`'s
//! `lib.rs`/`main.rs`, so integration tests can build a router without
//! spawning the real process.

pub mod catalog;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use catalog::DirectoryCatalog;
pub use config::AppConfig;
pub use state::AppState;
