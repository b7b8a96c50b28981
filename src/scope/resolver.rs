//! Name Resolver - binds textual names to entities
//!
//! Resolution algorithm for a plain name:
//! 1. Walk outward through the scope chain (fused scopes searched as groups)
//! 2. Follow the imports of the enclosing file
//! 3. Try the enclosing file's namespace
//! 4. Fall back to the built-in types of the configured languages
//! 5. For type names only, take the first declaration anywhere with that name
//!
//! Dotted names are tried as a full qualified name first, then with the head
//! expanded through an import, then by member descent from the head.

use super::builtin::BuiltInTypes;
use super::imports::{ImportLookup, ImportLookups};
use crate::entity::{Entity, EntityId, EntityKind};
use crate::repo::EntityRepo;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// What entity resolution needs from the surrounding system.
pub trait Resolver {
    /// Entity bound to `name` as seen from `from`. With `type_only`, only
    /// entities that can stand for a type are admitted by scope lookups.
    fn resolve_name(&self, repo: &EntityRepo, from: EntityId, name: &str, type_only: bool) -> Option<EntityId>;

    /// Type denoted by a raw type name as seen from `from`.
    fn infer_type_from_name(&self, repo: &EntityRepo, from: EntityId, raw_name: &str) -> Option<EntityId>;

    /// Whether containers resolve their expressions during the global pass.
    fn is_eager_expression_resolve(&self) -> bool;

    /// Shared sentinel standing for any generic type parameter.
    fn generic_parameter_type(&self) -> EntityId;
}

const GENERIC_PARAMETER: &str = "<generic>";

/// Scope-chain resolver with import, namespace and built-in fallbacks.
pub struct Inferer {
    built_ins: HashMap<String, EntityId>,
    generic_parameter_type: EntityId,
    eager_expression_resolve: bool,
    import_lookups: ImportLookups,
}

impl Inferer {
    /// Register the built-in types and the generic sentinel as root types of
    /// `repo`.
    pub fn new(repo: &mut EntityRepo, built_ins: &BuiltInTypes, eager_expression_resolve: bool) -> Self {
        let built_ins = built_ins
            .iter()
            .map(|name| (name.to_string(), repo.add_root_type(name)))
            .collect();
        let generic_parameter_type = repo.add_root_type(GENERIC_PARAMETER);
        Self {
            built_ins,
            generic_parameter_type,
            eager_expression_resolve,
            import_lookups: ImportLookups::default(),
        }
    }

    /// Per-language import binding rules; files of unknown languages bind
    /// imports by alias or last segment.
    pub fn with_import_lookups(mut self, import_lookups: ImportLookups) -> Self {
        self.import_lookups = import_lookups;
        self
    }

    fn import_lookup(&self, file: &Entity) -> &dyn ImportLookup {
        self.import_lookups.for_path(file.raw_name())
    }

    pub fn built_in_type(&self, name: &str) -> Option<EntityId> {
        self.built_ins.get(name).copied()
    }

    /// Resolve declarations everywhere, then every file tree, then collect
    /// the names that stayed unbound. Bodies are inferred after all
    /// declarations so that a reference may point forward or across files.
    pub fn resolve_all_bindings(&self, repo: &EntityRepo) -> BTreeSet<String> {
        info!("Resolving bindings across {} files", repo.files().len());
        // Aliases first: declared types may name them.
        for entity in repo.iter().filter(|e| e.kind() == EntityKind::Alias) {
            repo.infer_declaration(entity.id(), self);
        }
        for entity in repo.iter() {
            repo.infer_declaration(entity.id(), self);
        }
        for &file in repo.files() {
            repo.infer_entities(file, self);
        }
        if self.eager_expression_resolve {
            // Expressions that named a function inferred later in the pass.
            for entity in repo.iter().filter(|e| e.container().is_some()) {
                repo.resolve_expressions(entity.id(), self);
            }
        }
        let unresolved = repo.unresolved_names();
        debug!("{} names left unresolved", unresolved.len());
        unresolved
    }

    fn admits(entity: &Entity, type_only: bool) -> bool {
        !type_only || entity.is_type_like()
    }

    /// Child of `scope` named `name`; a grouped scope also searches its
    /// fellow members. A grouped match yields its group.
    fn lookup_child(&self, repo: &EntityRepo, scope: EntityId, name: &str, type_only: bool) -> Option<EntityId> {
        let entity = repo.get(scope)?;
        let mut scopes = vec![scope];
        if let Some(group) = entity.group() {
            scopes.extend(repo.group_members(group).iter().filter(|&&m| m != scope));
        }
        for scope in scopes {
            for child in repo.get_children(scope) {
                let Some(candidate) = repo.get(child) else { continue };
                if candidate.raw_name() == name && Self::admits(candidate, type_only) {
                    return Some(candidate.group().unwrap_or(child));
                }
            }
        }
        None
    }

    fn lookup_in_scope_chain(&self, repo: &EntityRepo, from: EntityId, name: &str, type_only: bool) -> Option<EntityId> {
        let mut current = Some(from);
        while let Some(scope) = current {
            if let Some(found) = self.lookup_child(repo, scope, name, type_only) {
                return Some(found);
            }
            current = repo.get(scope).and_then(Entity::parent);
        }
        None
    }

    /// Import bindings name exactly one entity and are admitted whatever
    /// its kind.
    fn lookup_in_imports(&self, repo: &EntityRepo, from: EntityId, name: &str) -> Option<EntityId> {
        let entity = repo.file_of(from).and_then(|f| repo.get(f))?;
        let lookup = self.import_lookup(entity);
        let file = entity.as_file()?;
        for import in file.imports() {
            if import.wildcard_module().is_none() && lookup.binding_name(import) == name {
                if let Some(found) = repo.find_by_qualified_name(lookup.bound_target(import)) {
                    return Some(found);
                }
            }
        }
        file.imports()
            .iter()
            .filter_map(|import| import.wildcard_module())
            .find_map(|module| repo.find_by_qualified_name(&format!("{}.{}", module, name)))
    }

    fn lookup_in_namespace(&self, repo: &EntityRepo, from: EntityId, name: &str) -> Option<EntityId> {
        let file = repo.file_of(from).and_then(|f| repo.get(f))?.as_file()?;
        if file.namespace().is_empty() {
            return None;
        }
        repo.find_by_qualified_name(&format!("{}.{}", file.namespace(), name))
    }

    fn resolve_dotted_name(&self, repo: &EntityRepo, from: EntityId, name: &str, type_only: bool) -> Option<EntityId> {
        if let Some(found) = repo.find_by_qualified_name(name) {
            return Some(found);
        }
        let (head, rest) = name.split_once('.')?;
        if let Some(entity) = repo.file_of(from).and_then(|f| repo.get(f)) {
            let lookup = self.import_lookup(entity);
            let imports = entity.as_file().map(|f| f.imports()).unwrap_or(&[]);
            for import in imports {
                if import.wildcard_module().is_some() || lookup.binding_name(import) != head {
                    continue;
                }
                let expanded = format!("{}.{}", lookup.bound_target(import), rest);
                if let Some(found) = repo.find_by_qualified_name(&expanded) {
                    return Some(found);
                }
            }
        }
        let mut current = self.resolve_name(repo, from, head, false)?;
        for segment in rest.split('.') {
            current = self.member_named(repo, current, segment)?;
        }
        repo.get(current)
            .filter(|e| Self::admits(e, type_only))
            .map(|_| current)
    }

    fn member_named(&self, repo: &EntityRepo, scope: EntityId, name: &str) -> Option<EntityId> {
        let scope = repo.forward(scope);
        repo.get_children(scope).into_iter().find_map(|child| {
            let entity = repo.get(child)?;
            (entity.raw_name() == name).then(|| entity.group().unwrap_or(child))
        })
    }
}

impl Resolver for Inferer {
    fn resolve_name(&self, repo: &EntityRepo, from: EntityId, name: &str, type_only: bool) -> Option<EntityId> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if name.contains('.') {
            return self.resolve_dotted_name(repo, from, name, type_only);
        }
        self.lookup_in_scope_chain(repo, from, name, type_only)
            .or_else(|| self.lookup_in_imports(repo, from, name))
            .or_else(|| self.lookup_in_namespace(repo, from, name))
            .or_else(|| self.built_in_type(name))
            .or_else(|| {
                if type_only {
                    repo.find_declarations_by_name(name).first().copied()
                } else {
                    None
                }
            })
    }

    fn infer_type_from_name(&self, repo: &EntityRepo, from: EntityId, raw_name: &str) -> Option<EntityId> {
        let raw_name = raw_name.trim();
        if let Some(ty) = self.built_in_type(raw_name) {
            return Some(ty);
        }
        let entity = self.resolve_name(repo, from, raw_name, true)?;
        repo.get_type(entity)
    }

    fn is_eager_expression_resolve(&self) -> bool {
        self.eager_expression_resolve
    }

    fn generic_parameter_type(&self) -> EntityId {
        self.generic_parameter_type
    }
}
