//! Storage Layer - SQLite-backed persistence
//!
//! A resolved repository is written to SQLite with tables:
//! - entities(id, kind, name, qualified_name, display_name, parent, group_id, file)
//! - bindings(entity, role, target)
//! - expressions(container, identifier, raw_type, flags, type_id, referred)
//! - unresolved(name)

pub mod schema;
pub mod sqlite;

pub use sqlite::{BindingRecord, BindingRole, DbStats, EntityRecord, SqliteStore};
