//! # Bindgraph - Entity model and binding resolution
//!
//! Builds a symbol table of program entities extracted from a codebase and
//! resolves every textual name reference into concrete entity/type bindings.
//!
//! Bindgraph provides:
//! - An arena of entities (files, packages, types, functions, variables,
//!   aliases, multi-declaration groups) with scope-aware lookup
//! - A two-phase protocol: parse everything, then resolve
//! - Cycle-safe alias indirection and redeclaration fusion
//! - Expression typing with member-access chaining
//! - Tree-sitter frontends for Python and Go
//! - SQLite-backed persistence of the resolved tree

pub mod entity;
pub mod repo;
pub mod scope;
pub mod adapter;
pub mod analyzer;
pub mod storage;
pub mod config;
pub mod ignore;
pub mod ui;

// Re-exports for convenient access
pub use entity::{Entity, EntityId, EntityKind, Expression, ExpressionKey};
pub use repo::EntityRepo;
pub use scope::{Inferer, Resolver};
pub use analyzer::{AnalysisReport, Analyzer};
pub use storage::SqliteStore;

/// Result type alias for Bindgraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Bindgraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid entity kind: {0}")]
    InvalidKind(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processor error: {0}")]
    Processor(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),
}

/// Message sent from parallel parser workers to the coordinator
#[derive(Debug)]
pub enum ParseMessage {
    Parsed(adapter::ParsedFile),
    Failed { path: String, message: String },
}
