//! Types - classes, structs, interfaces and defined types

use super::{Container, EntityId, HasInheritance, HasMembers, ResolvedTypes};
use crate::repo::EntityRepo;
use crate::scope::Resolver;
use std::sync::OnceLock;

#[derive(Debug, Default)]
pub struct TypeEntity {
    container: Container,
    inherited_names: Vec<String>,
    implemented_names: Vec<String>,
    resolved: OnceLock<Supertypes>,
}

#[derive(Debug, Clone, Default)]
struct Supertypes {
    inherited: ResolvedTypes,
    implemented: ResolvedTypes,
}

impl TypeEntity {
    pub fn add_inherited(&mut self, name: impl Into<String>) {
        self.inherited_names.push(name.into());
    }

    pub fn add_implemented(&mut self, name: impl Into<String>) {
        self.implemented_names.push(name.into());
    }

    pub fn inherited_names(&self) -> &[String] {
        &self.inherited_names
    }

    pub fn implemented_names(&self) -> &[String] {
        &self.implemented_names
    }

    pub(crate) fn unresolved_names(&self) -> impl Iterator<Item = &str> {
        self.resolved.get().into_iter().flat_map(|s| {
            s.inherited
                .unresolved
                .iter()
                .chain(&s.implemented.unresolved)
                .map(String::as_str)
        })
    }

    pub(crate) fn remap(&mut self, offset: u32) {
        self.container.remap(offset);
        if let Some(supertypes) = self.resolved.get_mut() {
            supertypes.inherited.remap(offset);
            supertypes.implemented.remap(offset);
        }
    }
}

impl HasMembers for TypeEntity {
    fn container(&self) -> &Container {
        &self.container
    }

    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }
}

impl HasInheritance for TypeEntity {
    fn inherited_types(&self) -> &[EntityId] {
        self.resolved
            .get()
            .map(|s| s.inherited.types.as_slice())
            .unwrap_or(&[])
    }

    fn implemented_types(&self) -> &[EntityId] {
        self.resolved
            .get()
            .map(|s| s.implemented.types.as_slice())
            .unwrap_or(&[])
    }
}

impl EntityRepo {
    /// Supertypes first so member lookups in the body can reach them.
    pub(crate) fn infer_type(&self, id: EntityId, resolver: &dyn Resolver) {
        self.infer_supertypes(id, resolver);
        self.infer_container(id, resolver);
    }

    pub(crate) fn infer_supertypes(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(ty) = self.get(id).and_then(|e| e.as_type()) else {
            return;
        };
        if ty.resolved.get().is_some() {
            return;
        }
        let supertypes = Supertypes {
            inherited: self.identifiers_to_types(id, &ty.inherited_names, resolver),
            implemented: self.identifiers_to_types(id, &ty.implemented_names, resolver),
        };
        let _ = ty.resolved.set(supertypes);
    }

    pub fn inherited_types(&self, id: EntityId) -> &[EntityId] {
        let id = self.forward(id);
        self.get(id)
            .and_then(|e| e.inheritance())
            .map(HasInheritance::inherited_types)
            .unwrap_or(&[])
    }

    pub fn implemented_types(&self, id: EntityId) -> &[EntityId] {
        let id = self.forward(id);
        self.get(id)
            .and_then(|e| e.inheritance())
            .map(HasInheritance::implemented_types)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use crate::repo::EntityRepo;
    use crate::scope::{BuiltInTypes, Inferer};

    #[test]
    fn test_type_is_its_own_type() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let widget = repo.add_type(file, "Widget");

        assert_eq!(repo.get_type(widget), Some(widget));
    }

    #[test]
    fn test_supertypes_resolved() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("shapes.py", "shapes");
        let shape = repo.add_type(file, "Shape");
        let circle = repo.add_type(file, "Circle");
        repo.add_inherited_type(circle, "Shape");
        repo.add_implemented_type(circle, "Drawable");
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);
        let unresolved = inferer.resolve_all_bindings(&repo);

        assert_eq!(repo.inherited_types(circle), [shape]);
        assert!(repo.implemented_types(circle).is_empty());
        assert!(unresolved.contains("Drawable"));
    }
}
