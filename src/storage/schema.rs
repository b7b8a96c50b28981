//! Database schema definitions

/// SQL to create the entities table
pub const CREATE_ENTITIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    display_name TEXT NOT NULL,
    parent INTEGER,
    group_id INTEGER,
    file TEXT
)
"#;

/// SQL to create the bindings table
/// One row per resolved reference of an entity, tagged with its role
pub const CREATE_BINDINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS bindings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity INTEGER NOT NULL,
    role TEXT NOT NULL,
    target INTEGER NOT NULL,
    UNIQUE(entity, role, target)
)
"#;

/// SQL to create the expressions table
pub const CREATE_EXPRESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS expressions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    container INTEGER NOT NULL,
    identifier TEXT,
    raw_type TEXT,
    is_call INTEGER NOT NULL,
    is_dot INTEGER NOT NULL,
    is_statement INTEGER NOT NULL,
    type_id INTEGER,
    referred INTEGER
)
"#;

/// SQL to create the unresolved table
pub const CREATE_UNRESOLVED_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS unresolved (
    name TEXT PRIMARY KEY
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_entities_name ON entities(name)",
    "CREATE INDEX IF NOT EXISTS idx_entities_qualified ON entities(qualified_name)",
    "CREATE INDEX IF NOT EXISTS idx_entities_parent ON entities(parent)",
    "CREATE INDEX IF NOT EXISTS idx_bindings_entity ON bindings(entity)",
    "CREATE INDEX IF NOT EXISTS idx_bindings_target ON bindings(target)",
    "CREATE INDEX IF NOT EXISTS idx_expressions_container ON expressions(container)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_ENTITIES_TABLE,
        CREATE_BINDINGS_TABLE,
        CREATE_EXPRESSIONS_TABLE,
        CREATE_UNRESOLVED_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
