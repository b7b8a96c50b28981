//! Files and packages - the roots of scope trees

use super::{Container, HasMembers};
use serde::{Deserialize, Serialize};

/// Whether an import names a member of a module or a module itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    /// `from pkg import Widget`
    #[default]
    Member,
    /// `import pkg.widgets`, a Go package path
    Module,
}

/// An imported name. Bound under its alias, or under the last segment of
/// the target when there is none; languages may bind differently through
/// their [`ImportLookup`](crate::scope::ImportLookup). A target ending in
/// `.*` imports every member of the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub target: String,
    pub alias: Option<String>,
    #[serde(default)]
    pub kind: ImportKind,
}

impl Import {
    pub fn new(target: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            target: target.into(),
            alias,
            kind: ImportKind::Member,
        }
    }

    /// Import of a whole module
    pub fn module(target: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            kind: ImportKind::Module,
            ..Self::new(target, alias)
        }
    }

    pub fn binding_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.target.rsplit('.').next().unwrap_or(&self.target),
        }
    }

    /// Module of a wildcard import
    pub fn wildcard_module(&self) -> Option<&str> {
        self.target.strip_suffix(".*")
    }
}

#[derive(Debug, Default)]
pub struct FileEntity {
    container: Container,
    namespace: String,
    imports: Vec<Import>,
}

impl FileEntity {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Qualified-name prefix of top-level declarations
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn add_import(&mut self, import: Import) {
        if !self.imports.contains(&import) {
            self.imports.push(import);
        }
    }
}

impl HasMembers for FileEntity {
    fn container(&self) -> &Container {
        &self.container
    }

    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }
}

#[derive(Debug, Default)]
pub struct PackageEntity {
    container: Container,
}

impl HasMembers for PackageEntity {
    fn container(&self) -> &Container {
        &self.container
    }

    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_binding_name() {
        assert_eq!(Import::new("pkg.widgets.Widget", None).binding_name(), "Widget");
        assert_eq!(Import::new("numpy", Some("np".to_string())).binding_name(), "np");
        assert_eq!(Import::new("fmt", None).binding_name(), "fmt");
    }

    #[test]
    fn test_wildcard_module() {
        assert_eq!(Import::new("pkg.shapes.*", None).wildcard_module(), Some("pkg.shapes"));
        assert_eq!(Import::new("pkg.shapes", None).wildcard_module(), None);
    }
}
