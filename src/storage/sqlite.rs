//! SQLite storage implementation

use super::schema;
use crate::entity::{EntityId, EntityKind};
use crate::repo::EntityRepo;
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// What a persisted binding records about its entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingRole {
    /// Type of a variable, function, alias or group
    Type,
    Return,
    Throw,
    Inherits,
    Implements,
    Mixin,
    AliasTarget,
    Annotation,
    TypeParameter,
    /// A member of a multi-declaration group
    Member,
}

impl BindingRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingRole::Type => "type",
            BindingRole::Return => "return",
            BindingRole::Throw => "throw",
            BindingRole::Inherits => "inherits",
            BindingRole::Implements => "implements",
            BindingRole::Mixin => "mixin",
            BindingRole::AliasTarget => "alias_target",
            BindingRole::Annotation => "annotation",
            BindingRole::TypeParameter => "type_parameter",
            BindingRole::Member => "member",
        }
    }
}

impl FromStr for BindingRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "type" => Ok(BindingRole::Type),
            "return" => Ok(BindingRole::Return),
            "throw" => Ok(BindingRole::Throw),
            "inherits" => Ok(BindingRole::Inherits),
            "implements" => Ok(BindingRole::Implements),
            "mixin" => Ok(BindingRole::Mixin),
            "alias_target" => Ok(BindingRole::AliasTarget),
            "annotation" => Ok(BindingRole::Annotation),
            "type_parameter" => Ok(BindingRole::TypeParameter),
            "member" => Ok(BindingRole::Member),
            _ => Err(Error::InvalidKind(format!("Unknown binding role: {}", s))),
        }
    }
}

impl fmt::Display for BindingRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub id: u32,
    pub kind: EntityKind,
    pub name: String,
    pub qualified_name: String,
    pub display_name: String,
    pub parent: Option<u32>,
    pub group: Option<u32>,
    /// Path of the declaring file
    pub file: Option<String>,
}

/// A binding joined with the entity it points at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingRecord {
    pub role: BindingRole,
    pub target: EntityRecord,
}

const ENTITY_COLUMNS: &str = "id, kind, name, qualified_name, display_name, parent, group_id, file";

/// SQLite-backed storage for a resolved entity repository
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Repository Operations ==========

    /// Replace the stored data with a resolved repository in one transaction.
    pub fn save_repo(&mut self, repo: &EntityRepo, unresolved: &BTreeSet<String>) -> Result<()> {
        self.begin_transaction()?;
        let written = self.clear_all().and_then(|_| self.write_repo(repo, unresolved));
        match written {
            Ok(()) => {
                self.commit()?;
                info!("Saved {} entities", repo.len());
                Ok(())
            }
            Err(e) => {
                self.rollback()?;
                Err(e)
            }
        }
    }

    fn write_repo(&self, repo: &EntityRepo, unresolved: &BTreeSet<String>) -> Result<()> {
        let mut insert_entity = self.conn.prepare(
            "INSERT INTO entities (id, kind, name, qualified_name, display_name, parent, group_id, file) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        let mut insert_binding = self
            .conn
            .prepare("INSERT OR IGNORE INTO bindings (entity, role, target) VALUES (?1, ?2, ?3)")?;
        let mut insert_expression = self.conn.prepare(
            "INSERT INTO expressions (container, identifier, raw_type, is_call, is_dot, is_statement, type_id, referred) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        for entity in repo.iter() {
            let id = entity.id();
            let file = repo
                .file_of(id)
                .and_then(|f| repo.get(f))
                .map(|f| f.raw_name().to_string());
            insert_entity.execute(params![
                id.0,
                entity.kind().as_str(),
                entity.raw_name(),
                repo.qualified_name(id),
                repo.display_name(id),
                entity.parent().map(|p| p.0),
                entity.group().map(|g| g.0),
                file,
            ])?;

            for (role, target) in bindings(repo, id) {
                insert_binding.execute(params![id.0, role.as_str(), target.0])?;
            }

            let Some(container) = entity.container() else { continue };
            for expression in container.expressions().iter() {
                insert_expression.execute(params![
                    id.0,
                    expression.identifier,
                    expression.raw_type,
                    expression.is_call,
                    expression.is_dot,
                    expression.is_statement,
                    expression.get_type().map(|t| t.0),
                    expression.referred_entity().map(|r| r.0),
                ])?;
            }
        }

        let mut insert_unresolved = self
            .conn
            .prepare("INSERT OR IGNORE INTO unresolved (name) VALUES (?1)")?;
        for name in unresolved {
            insert_unresolved.execute([name])?;
        }
        debug!("Wrote {} unresolved names", unresolved.len());
        Ok(())
    }

    /// Get an entity by id
    pub fn get_entity(&self, id: EntityId) -> Result<Option<EntityRecord>> {
        let sql = format!("SELECT {} FROM entities WHERE id = ?1", ENTITY_COLUMNS);
        let record = self
            .conn
            .query_row(&sql, [id.0], |row| self.row_to_entity(row))
            .optional()?;
        Ok(record)
    }

    /// Find entities by raw or qualified name
    pub fn find_entities_by_name(&self, name: &str) -> Result<Vec<EntityRecord>> {
        let sql = format!(
            "SELECT {} FROM entities WHERE name = ?1 OR qualified_name = ?1 OR display_name = ?1 ORDER BY id",
            ENTITY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([name], |row| self.row_to_entity(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Direct children of an entity
    pub fn children_of(&self, id: EntityId) -> Result<Vec<EntityRecord>> {
        let sql = format!("SELECT {} FROM entities WHERE parent = ?1 ORDER BY id", ENTITY_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([id.0], |row| self.row_to_entity(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Resolved bindings of an entity, in insertion order
    pub fn bindings_of(&self, id: EntityId) -> Result<Vec<BindingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.id, e.kind, e.name, e.qualified_name, e.display_name, e.parent, e.group_id, e.file, b.role \
             FROM bindings b JOIN entities e ON e.id = b.target \
             WHERE b.entity = ?1 ORDER BY b.id",
        )?;
        let records = stmt
            .query_map([id.0], |row| {
                let role: String = row.get(8)?;
                let role: BindingRole = role.parse().map_err(|e: Error| {
                    rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
                })?;
                Ok(BindingRecord {
                    role,
                    target: self.row_to_entity(row)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Names left unresolved by the last saved analysis
    pub fn get_unresolved(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM unresolved ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Helper to convert a row to an EntityRecord
    fn row_to_entity(&self, row: &rusqlite::Row) -> rusqlite::Result<EntityRecord> {
        let kind_str: String = row.get(1)?;
        let kind: EntityKind = kind_str.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(EntityRecord {
            id: row.get(0)?,
            kind,
            name: row.get(2)?,
            qualified_name: row.get(3)?,
            display_name: row.get(4)?,
            parent: row.get(5)?,
            group: row.get(6)?,
            file: row.get(7)?,
        })
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    /// Delete all data (for re-analysis)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM expressions", [])?;
        self.conn.execute("DELETE FROM bindings", [])?;
        self.conn.execute("DELETE FROM unresolved", [])?;
        self.conn.execute("DELETE FROM entities", [])?;
        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM entities GROUP BY kind ORDER BY kind")?;
        let by_kind = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get::<_, String>(0)?, count as usize))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(DbStats {
            entities: self.count("SELECT COUNT(*) FROM entities")?,
            by_kind,
            bindings: self.count("SELECT COUNT(*) FROM bindings")?,
            expressions: self.count("SELECT COUNT(*) FROM expressions")?,
            typed_expressions: self.count("SELECT COUNT(*) FROM expressions WHERE type_id IS NOT NULL")?,
            unresolved: self.count("SELECT COUNT(*) FROM unresolved")?,
        })
    }
}

/// Resolved references of one entity, by role
fn bindings(repo: &EntityRepo, id: EntityId) -> Vec<(BindingRole, EntityId)> {
    let Some(entity) = repo.get(id) else { return Vec::new() };
    let mut bindings = Vec::new();
    match entity.kind() {
        EntityKind::Var | EntityKind::Function | EntityKind::Alias | EntityKind::MultiDeclare => {
            if let Some(ty) = repo.get_type(id) {
                bindings.push((BindingRole::Type, ty));
            }
        }
        _ => {}
    }
    let roles: [(BindingRole, &[EntityId]); 7] = [
        (BindingRole::Return, repo.return_types(id)),
        (BindingRole::Throw, repo.throw_types(id)),
        (BindingRole::Mixin, repo.resolved_mixins(id)),
        (BindingRole::Annotation, entity.decorations().map(|d| d.resolved_annotations()).unwrap_or(&[])),
        (
            BindingRole::TypeParameter,
            entity.decorations().map(|d| d.resolved_type_parameters()).unwrap_or(&[]),
        ),
        (BindingRole::Inherits, entity.inheritance().map(|i| i.inherited_types()).unwrap_or(&[])),
        (
            BindingRole::Implements,
            entity.inheritance().map(|i| i.implemented_types()).unwrap_or(&[]),
        ),
    ];
    for (role, targets) in roles {
        bindings.extend(targets.iter().map(|&t| (role, t)));
    }
    if let Some(target) = entity.as_alias().and_then(|a| a.target()) {
        bindings.push((BindingRole::AliasTarget, target));
    }
    if let Some(group) = entity.as_group() {
        bindings.extend(group.members().iter().map(|&m| (BindingRole::Member, m)));
    }
    bindings
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub entities: usize,
    pub by_kind: Vec<(String, usize)>,
    pub bindings: usize,
    pub expressions: usize,
    pub typed_expressions: usize,
    pub unresolved: usize,
}

impl fmt::Display for DbStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Entities: {}", self.entities)?;
        for (kind, count) in &self.by_kind {
            writeln!(f, "    {}: {}", kind, count)?;
        }
        writeln!(f, "  Bindings: {}", self.bindings)?;
        writeln!(f, "  Expressions: {} ({} typed)", self.expressions, self.typed_expressions)?;
        writeln!(f, "  Unresolved: {}", self.unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Expression, ExpressionKey};
    use crate::scope::{BuiltInTypes, Inferer};

    fn resolved_repo() -> (EntityRepo, BTreeSet<String>) {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("shapes.py", "shapes");
        repo.add_type(file, "Shape");
        let circle = repo.add_type(file, "Circle");
        repo.add_inherited_type(circle, "Shape");
        repo.add_inherited_type(circle, "Missing");
        let area = repo.add_function(circle, "area");
        repo.add_return_type(area, Some("float"));
        repo.add_alias(file, "Round", "Circle");
        let main = repo.add_function(file, "main");
        repo.add_expression(
            main,
            ExpressionKey(1),
            Expression::new().with_identifier("Circle").call().statement(true),
        );
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);
        let unresolved = inferer.resolve_all_bindings(&repo);
        (repo, unresolved)
    }

    fn saved_store() -> SqliteStore {
        let (repo, unresolved) = resolved_repo();
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save_repo(&repo, &unresolved).unwrap();
        store
    }

    fn entity(store: &SqliteStore, name: &str) -> EntityRecord {
        store.find_entities_by_name(name).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn test_save_and_find() {
        let store = saved_store();

        let circle = entity(&store, "shapes.Circle");
        assert_eq!(circle.kind, EntityKind::Type);
        assert_eq!(circle.name, "Circle");
        assert_eq!(circle.file.as_deref(), Some("shapes.py"));

        let area = entity(&store, "area");
        assert_eq!(area.display_name, "shapes.py(shapes.Circle.area())");
        assert_eq!(area.parent, Some(circle.id));
        assert_eq!(store.get_entity(EntityId(area.id)).unwrap(), Some(area));
        assert!(store.get_entity(EntityId(9999)).unwrap().is_none());
    }

    #[test]
    fn test_bindings_joined_with_targets() {
        let store = saved_store();
        let circle = entity(&store, "Circle");

        let bindings = store.bindings_of(EntityId(circle.id)).unwrap();
        let summary: Vec<(BindingRole, &str)> = bindings
            .iter()
            .map(|b| (b.role, b.target.name.as_str()))
            .collect();
        assert_eq!(summary, vec![(BindingRole::Inherits, "Shape")]);

        let round = entity(&store, "Round");
        let bindings = store.bindings_of(EntityId(round.id)).unwrap();
        assert!(bindings.iter().any(|b| b.role == BindingRole::AliasTarget && b.target.id == circle.id));

        let area = entity(&store, "area");
        let bindings = store.bindings_of(EntityId(area.id)).unwrap();
        assert!(bindings.iter().any(|b| b.role == BindingRole::Return && b.target.name == "float"));
    }

    #[test]
    fn test_children_and_unresolved() {
        let store = saved_store();
        let circle = entity(&store, "Circle");

        let children = store.children_of(EntityId(circle.id)).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "area");
        assert_eq!(store.get_unresolved().unwrap(), vec!["Missing".to_string()]);
    }

    #[test]
    fn test_stats_and_resave() {
        let (repo, unresolved) = resolved_repo();
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save_repo(&repo, &unresolved).unwrap();
        let first = store.stats().unwrap();
        store.save_repo(&repo, &unresolved).unwrap();
        let second = store.stats().unwrap();

        assert_eq!(first.entities, repo.len());
        assert_eq!(second.entities, first.entities);
        assert_eq!(second.bindings, first.bindings);
        assert_eq!(first.expressions, 1);
        assert_eq!(first.typed_expressions, 1);
        assert_eq!(first.unresolved, 1);
        assert!(first.to_string().starts_with("Database Statistics:"));
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bindgraph.db");
        {
            let (repo, unresolved) = resolved_repo();
            let mut store = SqliteStore::open(&path).unwrap();
            store.save_repo(&repo, &unresolved).unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.find_entities_by_name("Round").unwrap().len(), 1);
    }

    #[test]
    fn test_binding_role_round_trip_names() {
        assert_eq!("alias_target".parse::<BindingRole>().unwrap(), BindingRole::AliasTarget);
        assert!("calls".parse::<BindingRole>().is_err());
    }
}
