//! Import lookup strategies
//!
//! Each language decides which name an import binds in the importing file
//! and which qualified name that binding stands for. The resolver asks the
//! strategy of the file being resolved; it never inspects import syntax.

use crate::entity::{Import, ImportKind};
use std::sync::Arc;

pub trait ImportLookup: Send + Sync {
    /// Name under which `import` is visible in the importing file.
    fn binding_name<'a>(&self, import: &'a Import) -> &'a str {
        import.binding_name()
    }

    /// Qualified name the binding itself denotes. Dotted references whose
    /// head is the binding continue from here.
    fn bound_target<'a>(&self, import: &'a Import) -> &'a str {
        &import.target
    }
}

/// Alias, else last segment, bound to the whole target. Go packages and
/// member imports everywhere behave this way.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualifiedImports;

impl ImportLookup for QualifiedImports {}

/// Python: `import a.b` binds `a`, and `a.b.X` is spelled out in full from
/// there. Aliased module imports and `from` imports bind like
/// [`QualifiedImports`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonImports;

impl PythonImports {
    fn binds_root(import: &Import) -> bool {
        import.kind == ImportKind::Module && import.alias.is_none()
    }

    fn root(import: &Import) -> &str {
        import.target.split('.').next().unwrap_or(&import.target)
    }
}

impl ImportLookup for PythonImports {
    fn binding_name<'a>(&self, import: &'a Import) -> &'a str {
        if Self::binds_root(import) {
            Self::root(import)
        } else {
            import.binding_name()
        }
    }

    fn bound_target<'a>(&self, import: &'a Import) -> &'a str {
        if Self::binds_root(import) {
            Self::root(import)
        } else {
            &import.target
        }
    }
}

/// Strategies keyed by file suffix, with [`QualifiedImports`] for files no
/// language claims.
#[derive(Clone, Default)]
pub struct ImportLookups {
    by_suffix: Vec<(String, Arc<dyn ImportLookup>)>,
}

impl ImportLookups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, suffix: &str, lookup: Arc<dyn ImportLookup>) {
        self.by_suffix.push((suffix.to_string(), lookup));
    }

    /// Strategy for the file at `path`
    pub fn for_path(&self, path: &str) -> &dyn ImportLookup {
        let suffix = path.rsplit_once('.').map(|(_, s)| s).unwrap_or("");
        self.by_suffix
            .iter()
            .find(|(s, _)| s == suffix)
            .map(|(_, lookup)| lookup.as_ref())
            .unwrap_or(&QualifiedImports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_module_import_binds_root() {
        let plain = Import::module("app.models", None);
        assert_eq!(PythonImports.binding_name(&plain), "app");
        assert_eq!(PythonImports.bound_target(&plain), "app");

        let aliased = Import::module("app.models", Some("m".to_string()));
        assert_eq!(PythonImports.binding_name(&aliased), "m");
        assert_eq!(PythonImports.bound_target(&aliased), "app.models");

        let member = Import::new("app.models.User", None);
        assert_eq!(PythonImports.binding_name(&member), "User");
    }

    #[test]
    fn test_qualified_import_binds_last_segment() {
        let package = Import::module("math", Some("m".to_string()));
        assert_eq!(QualifiedImports.binding_name(&package), "m");
        assert_eq!(QualifiedImports.binding_name(&Import::module("app.models", None)), "models");
    }

    #[test]
    fn test_lookup_chosen_by_suffix() {
        let mut lookups = ImportLookups::new();
        lookups.register("py", Arc::new(PythonImports));
        let import = Import::module("app.models", None);

        assert_eq!(lookups.for_path("pkg/views.py").binding_name(&import), "app");
        assert_eq!(lookups.for_path("main.go").binding_name(&import), "models");
    }
}
