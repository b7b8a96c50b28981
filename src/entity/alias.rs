//! Aliases - transparent indirection to another entity
//!
//! An alias resolves its origin name once; chains of aliases are followed
//! from each alias's own scope and a revisited alias ends the chain with no
//! target. Queries on an alias forward to its target.

use super::EntityId;
use crate::repo::EntityRepo;
use crate::scope::Resolver;
use std::collections::HashSet;
use std::sync::OnceLock;

#[derive(Debug)]
pub struct AliasEntity {
    origin_name: String,
    target: OnceLock<Option<EntityId>>,
}

impl AliasEntity {
    pub fn new(origin_name: impl Into<String>) -> Self {
        Self {
            origin_name: origin_name.into(),
            target: OnceLock::new(),
        }
    }

    pub fn origin_name(&self) -> &str {
        &self.origin_name
    }

    /// Non-alias entity the chain ended at
    pub fn target(&self) -> Option<EntityId> {
        self.target.get().copied().flatten()
    }

    pub fn is_resolved(&self) -> bool {
        self.target.get().is_some()
    }

    pub(crate) fn unresolved_name(&self) -> Option<&str> {
        match self.target.get() {
            Some(None) => Some(&self.origin_name),
            _ => None,
        }
    }

    pub(crate) fn remap(&mut self, offset: u32) {
        if let Some(Some(target)) = self.target.get_mut() {
            *target = target.offset(offset);
        }
    }
}

impl EntityRepo {
    pub(crate) fn infer_alias(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(alias) = self.get(id).and_then(|e| e.as_alias()) else {
            return;
        };
        if alias.is_resolved() {
            return;
        }
        let mut visited = HashSet::from([id]);
        let mut found = resolver.resolve_name(self, id, &alias.origin_name, true);
        while let Some(current) = found {
            let Some(next) = self.get(current).and_then(|e| e.as_alias()) else {
                break;
            };
            if !visited.insert(current) {
                found = None;
                break;
            }
            found = resolver.resolve_name(self, current, &next.origin_name, true);
        }
        let _ = alias.target.set(found);
    }

    /// Target of an alias
    pub fn alias_target(&self, id: EntityId) -> Option<EntityId> {
        self.get(id)?.as_alias()?.target()
    }

    /// The alias target when `id` is a resolved alias, else `id` itself.
    pub fn forward(&self, id: EntityId) -> EntityId {
        self.alias_target(id).unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::repo::EntityRepo;
    use crate::scope::{BuiltInTypes, Inferer};

    fn resolve(repo: &mut EntityRepo) -> Inferer {
        repo.seal();
        let inferer = Inferer::new(repo, &BuiltInTypes::python(), true);
        inferer.resolve_all_bindings(repo);
        inferer
    }

    #[test]
    fn test_self_alias_has_no_target() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let a = repo.add_alias(file, "A", "A");
        resolve(&mut repo);

        assert_eq!(repo.alias_target(a), None);
        assert_eq!(repo.get_type(a), None);
        assert!(repo.get_functions(a).is_empty());
    }

    #[test]
    fn test_alias_cycle_terminates() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let a = repo.add_alias(file, "A", "B");
        let b = repo.add_alias(file, "B", "A");
        resolve(&mut repo);

        assert_eq!(repo.alias_target(a), None);
        assert_eq!(repo.alias_target(b), None);
    }

    #[test]
    fn test_alias_chain_reaches_type() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let widget = repo.add_type(file, "Widget");
        let draw = repo.add_function(widget, "draw");
        let a = repo.add_alias(file, "A", "B");
        repo.add_alias(file, "B", "Widget");
        resolve(&mut repo);

        assert_eq!(repo.alias_target(a), Some(widget));
        assert_eq!(repo.get_type(a), Some(widget));
        assert_eq!(repo.get_functions(a), vec![draw]);
        assert_eq!(repo.lookup_function_locally(a, "draw"), Some(draw));
    }
}
