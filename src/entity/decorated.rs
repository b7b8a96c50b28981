//! Decorations - generic type parameters and annotations of a declaration

use super::{EntityId, ResolvedTypes};
use crate::repo::EntityRepo;
use crate::scope::Resolver;
use std::sync::OnceLock;

#[derive(Debug, Default)]
pub struct Decorations {
    type_parameter_names: Vec<String>,
    annotation_names: Vec<String>,
    resolved: OnceLock<ResolvedDecorations>,
}

#[derive(Debug, Clone, Default)]
struct ResolvedDecorations {
    type_parameters: ResolvedTypes,
    annotations: ResolvedTypes,
}

impl Decorations {
    pub fn add_type_parameter(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.type_parameter_names.contains(&name) {
            self.type_parameter_names.push(name);
        }
    }

    pub fn add_annotation(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.annotation_names.contains(&name) {
            self.annotation_names.push(name);
        }
    }

    pub fn type_parameter_names(&self) -> &[String] {
        &self.type_parameter_names
    }

    pub fn annotation_names(&self) -> &[String] {
        &self.annotation_names
    }

    pub fn has_type_parameter(&self, name: &str) -> bool {
        self.type_parameter_names.iter().any(|n| n == name)
    }

    pub fn resolved_type_parameters(&self) -> &[EntityId] {
        self.resolved
            .get()
            .map(|r| r.type_parameters.types.as_slice())
            .unwrap_or(&[])
    }

    pub fn resolved_annotations(&self) -> &[EntityId] {
        self.resolved
            .get()
            .map(|r| r.annotations.types.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn unresolved_names(&self) -> impl Iterator<Item = &str> {
        self.resolved.get().into_iter().flat_map(|r| {
            r.type_parameters
                .unresolved
                .iter()
                .chain(&r.annotations.unresolved)
                .map(String::as_str)
        })
    }

    pub(crate) fn remap(&mut self, offset: u32) {
        if let Some(resolved) = self.resolved.get_mut() {
            resolved.type_parameters.remap(offset);
            resolved.annotations.remap(offset);
        }
    }
}

impl EntityRepo {
    /// Whether `name` is a type parameter declared by the entity or by any
    /// of its enclosing containers.
    pub fn is_generic_type_parameter(&self, id: EntityId, name: &str) -> bool {
        let mut current = Some(id);
        while let Some(scope) = current {
            let Some(entity) = self.get(scope) else { return false };
            if entity.decorations().is_some_and(|d| d.has_type_parameter(name)) {
                return true;
            }
            current = entity
                .parent()
                .filter(|&p| self.get(p).is_some_and(|e| e.is_container()));
        }
        false
    }

    /// Resolve type names from the scope of `from`, substituting the generic
    /// sentinel for visible type parameters.
    pub(crate) fn identifiers_to_types(
        &self,
        from: EntityId,
        names: &[String],
        resolver: &dyn Resolver,
    ) -> ResolvedTypes {
        let mut resolved = ResolvedTypes::default();
        for name in names {
            match resolver.infer_type_from_name(self, from, name) {
                Some(ty) => resolved.types.push(ty),
                None if self.is_generic_type_parameter(from, name) => {
                    resolved.types.push(resolver.generic_parameter_type());
                }
                None => resolved.unresolved.push(name.clone()),
            }
        }
        resolved
    }

    pub(crate) fn infer_decorations(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(decorations) = self.get(id).and_then(|e| e.decorations()) else {
            return;
        };
        if decorations.resolved.get().is_some() {
            return;
        }
        let resolved = ResolvedDecorations {
            type_parameters: self.identifiers_to_types(id, &decorations.type_parameter_names, resolver),
            annotations: self.identifiers_to_types(id, &decorations.annotation_names, resolver),
        };
        let _ = decorations.resolved.set(resolved);
    }

    pub fn resolved_type_parameters(&self, id: EntityId) -> &[EntityId] {
        let id = self.forward(id);
        self.get(id)
            .and_then(|e| e.decorations())
            .map(Decorations::resolved_type_parameters)
            .unwrap_or(&[])
    }

    pub fn resolved_annotations(&self, id: EntityId) -> &[EntityId] {
        let id = self.forward(id);
        self.get(id)
            .and_then(|e| e.decorations())
            .map(Decorations::resolved_annotations)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{BuiltInTypes, Inferer};

    #[test]
    fn test_duplicate_decorations_ignored() {
        let mut decorations = Decorations::default();
        decorations.add_type_parameter("T");
        decorations.add_type_parameter("T");
        decorations.add_annotation("dataclass");
        decorations.add_annotation("dataclass");

        assert_eq!(decorations.type_parameter_names(), ["T"]);
        assert_eq!(decorations.annotation_names(), ["dataclass"]);
    }

    #[test]
    fn test_generic_parameter_visible_from_nested_scope() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("box.py", "box");
        let class = repo.add_type(file, "Box");
        repo.add_type_parameter(class, "T");
        let method = repo.add_function(class, "get");
        repo.add_return_type(method, Some("T"));
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);

        assert!(repo.is_generic_type_parameter(method, "T"));
        assert!(!repo.is_generic_type_parameter(file, "T"));

        inferer.resolve_all_bindings(&repo);
        assert_eq!(repo.get_type(method), Some(inferer.generic_parameter_type()));
    }

    #[test]
    fn test_unknown_annotation_reported() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("a.py", "a");
        let function = repo.add_function(file, "handler");
        repo.add_annotation(function, "route");
        repo.add_annotation(function, "staticmethod");
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);

        let unresolved = inferer.resolve_all_bindings(&repo);
        assert!(unresolved.contains("route"));
        assert!(!unresolved.contains("staticmethod"));
        assert_eq!(repo.resolved_annotations(function).len(), 1);
    }
}
